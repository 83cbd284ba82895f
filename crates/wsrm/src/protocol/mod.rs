// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Protocol actions: message records, the client-side proxy and the
//! server-side servant.
//!
//! ```text
//! Source endpoint                           Destination endpoint
//!   RmProxy                                     RmServant
//!     |-- CreateSequence {acksTo, offer?} ------->|  mint id, negotiate
//!     |<-- CreateSequenceResponse {id, accept?} --|  expiry, answer offer
//!     |                                           |
//!     |-- TerminateSequence {id} ---------------->|  drop sequence
//!     |-- SequenceInfo {ackRequested} ----------->|  flush acks
//! ```

mod messages;
mod proxy;
mod servant;

pub use messages::{
    Accept, AckRequested, ApplicationMessage, CreateSequence, CreateSequenceResponse, Offer,
    ProtocolAction, ProtocolMessage, SequenceAcknowledgementMsg, SequenceFaultMsg, SequenceHeader,
    SequenceInfo, TerminateSequence,
};
pub use proxy::RmProxy;
pub use servant::RmServant;
