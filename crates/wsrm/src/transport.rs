// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Binding-layer seam.
//!
//! The reliability core never touches sockets or envelopes; it hands
//! protocol records to a [`Transport`] owned by the surrounding stack,
//! which serializes them into whatever wire format it speaks. Inbound
//! traffic takes the reverse path: the binding layer deserializes and
//! feeds records into `RmHandler::handle_inbound`.

use crate::addressing::EndpointReference;
use crate::error::Result;
use crate::protocol::ProtocolMessage;

/// Outbound half of the binding layer.
///
/// # Blocking
///
/// [`request`](Transport::request) is a synchronous request/response
/// exchange: the calling thread blocks until the peer responds or the
/// exchange fails. The CreateSequence round-trip relies on this — the
/// first application send on a connection stalls until its sequence
/// exists.
pub trait Transport: Send + Sync {
    /// Request/response exchange of a protocol message.
    fn request(&self, to: &EndpointReference, message: ProtocolMessage)
        -> Result<ProtocolMessage>;

    /// One-way send of a protocol message.
    fn send(&self, to: &EndpointReference, message: ProtocolMessage) -> Result<()>;
}

impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    fn request(
        &self,
        to: &EndpointReference,
        message: ProtocolMessage,
    ) -> Result<ProtocolMessage> {
        (**self).request(to, message)
    }

    fn send(&self, to: &EndpointReference, message: ProtocolMessage) -> Result<()> {
        (**self).send(to, message)
    }
}
