// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # WSRM - WS-ReliableMessaging core
//!
//! A pure Rust implementation of the WS-ReliableMessaging sequencing,
//! acknowledgement and retransmission state machine: at-least-once
//! (optionally exactly-once, in-order) delivery of application messages
//! between a source and a destination endpoint over an unreliable
//! transport.
//!
//! The SOAP envelope, XML serialization, WSDL model and HTTP transport
//! are external collaborators: this crate exchanges plain protocol
//! records with the binding layer through the [`Transport`] seam and the
//! [`RmHandler`] dispositions.
//!
//! ## Protocol Flow
//!
//! ```text
//! Source                                        Destination
//!   |                                                |
//!   |--- CreateSequence (acksTo, offer?) ----------->|
//!   |<-- CreateSequenceResponse (id, accept?) -------|
//!   |                                                |
//!   |--- Sequence(id, 1) + payload ----------------->|
//!   |--- Sequence(id, 2) + payload ------X (lost)    |
//!   |--- Sequence(id, 3) + payload ----------------->|
//!   |                                                |
//!   |<-- SequenceAcknowledgement [1,1] [3,3] --------|
//!   |                                                |
//!   |--- Sequence(id, 2) [retransmit] -------------->|
//!   |<-- SequenceAcknowledgement [1,3] --------------|  (gap closed!)
//!   |                                                |
//!   |--- TerminateSequence (id) -------------------->|
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use wsrm::{Disposition, EndpointReference, RmHandler};
//! # struct HttpBinding;
//! # impl wsrm::Transport for HttpBinding {
//! #     fn request(&self, _: &EndpointReference, _: wsrm::ProtocolMessage)
//! #         -> wsrm::Result<wsrm::ProtocolMessage> { unimplemented!() }
//! #     fn send(&self, _: &EndpointReference, _: wsrm::ProtocolMessage)
//! #         -> wsrm::Result<()> { unimplemented!() }
//! # }
//!
//! fn main() -> wsrm::Result<()> {
//!     let transport = Arc::new(HttpBinding);
//!     let handler = RmHandler::builder(
//!         transport,
//!         EndpointReference::new("http://peer.example.com/service"),
//!     )
//!     .build()?;
//!
//!     // outbound: stamp, track, then let the binding layer send
//!     let stamped = handler.handle_outbound(b"<greet/>".as_slice())?;
//!
//!     // inbound: act on the disposition
//!     # let inbound = wsrm::ProtocolMessage::Application(stamped);
//!     match handler.handle_inbound(inbound)? {
//!         Disposition::Deliver => { /* hand payload to the application */ }
//!         Disposition::Respond(_msg) => { /* send it back to the peer */ }
//!         _ => {}
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Components
//!
//! | Component | Role |
//! |-----------|------|
//! | [`SourceSequence`] / [`DestinationSequence`] | per-sequence numbering and acknowledgement state |
//! | [`RetransmissionQueue`] | in-flight store, resend deadlines, eviction |
//! | [`RmSource`] / [`RmDestination`] | per-endpoint sequence registries |
//! | [`RmProxy`] / [`RmServant`] | CreateSequence / TerminateSequence exchanges |
//! | [`RmHandler`] | pipeline interceptor tying it all together |
//!
//! ## Modules Overview
//!
//! - [`handler`] - pipeline integration (start here)
//! - [`sequence`] - identifiers, ranges, the two sequence roles
//! - [`retransmission`] - in-flight store and resend driver
//! - [`endpoint`] - sequence registries
//! - [`protocol`] - message records, proxy and servant
//! - [`policy`] - injected RM policies
//!
//! ## See Also
//!
//! - [WS-ReliableMessaging (Feb 2005)](http://schemas.xmlsoap.org/ws/2005/02/rm/)
//! - [WS-Addressing (Aug 2004)](http://schemas.xmlsoap.org/ws/2004/08/addressing/)

/// Opaque addressable-endpoint references.
pub mod addressing;
/// Protocol constants: namespaces, action URIs, default intervals.
pub mod config;
/// Per-endpoint sequence registries.
pub mod endpoint;
/// Error taxonomy and fault codes.
pub mod error;
/// Message-pipeline integration.
pub mod handler;
/// Reliability metrics counters.
pub mod metrics;
/// Injected reliable-messaging policies.
pub mod policy;
/// Protocol message records, client proxy and server servant.
pub mod protocol;
/// Unacknowledged-message store and resend driver.
pub mod retransmission;
/// Sequence model: identifiers, ranges, roles.
pub mod sequence;
/// Binding-layer seam.
pub mod transport;

pub use addressing::{EndpointMetadata, EndpointReference};
pub use endpoint::{RmDestination, RmSource};
pub use error::{Error, FaultCode, Result};
pub use handler::{Disposition, RmHandler, RmHandlerBuilder};
pub use metrics::{MetricsSnapshot, ReliabilityMetrics};
pub use policy::{
    DeliveryAssurance, DestinationPolicy, RetransmissionPolicy, SequenceTerminationPolicy,
    SourcePolicy,
};
pub use protocol::{
    Accept, AckRequested, ApplicationMessage, CreateSequence, CreateSequenceResponse, Offer,
    ProtocolAction, ProtocolMessage, RmProxy, RmServant, SequenceAcknowledgementMsg,
    SequenceFaultMsg, SequenceHeader, SequenceInfo, TerminateSequence,
};
pub use retransmission::{InFlightMessage, RetransmissionDriver, RetransmissionQueue};
pub use sequence::{
    AckRange, AcknowledgementSet, Delivery, DestinationSequence, NextMessage, SequenceIdentifier,
    SourceSequence,
};
pub use transport::Transport;

#[cfg(feature = "policy-loaders")]
pub use policy::{load_policy_file, PolicyFile};
