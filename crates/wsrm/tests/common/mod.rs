// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! In-memory transport harness for integration tests.
//!
//! `RecordingTransport` swallows and records everything (the far side of
//! the server). `PeerTransport` dispatches directly into a server-side
//! handler, so a client handler built on it exercises the full
//! CreateSequence / acknowledge / terminate paths without sockets.

// not every test binary uses every helper
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use wsrm::{
    Disposition, EndpointReference, Error, ProtocolMessage, Result, RmHandler, Transport,
};

/// Records every message instead of sending it.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<(EndpointReference, ProtocolMessage)>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<(EndpointReference, ProtocolMessage)> {
        self.sent.lock().expect("recording lock").clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().expect("recording lock").len()
    }
}

impl Transport for RecordingTransport {
    fn request(
        &self,
        _to: &EndpointReference,
        _message: ProtocolMessage,
    ) -> Result<ProtocolMessage> {
        Err(Error::Io(std::io::Error::other(
            "recording transport cannot answer requests",
        )))
    }

    fn send(&self, to: &EndpointReference, message: ProtocolMessage) -> Result<()> {
        self.sent
            .lock()
            .expect("recording lock")
            .push((to.clone(), message));
        Ok(())
    }
}

/// Client-side transport delivering straight into a server handler.
pub struct PeerTransport {
    server: Arc<RmHandler<RecordingTransport>>,
    delivered: Mutex<Vec<ProtocolMessage>>,
}

impl PeerTransport {
    pub fn new(server: Arc<RmHandler<RecordingTransport>>) -> Self {
        Self {
            server,
            delivered: Mutex::new(Vec::new()),
        }
    }

    /// Every message pushed through `send`, in order.
    pub fn delivered(&self) -> Vec<ProtocolMessage> {
        self.delivered.lock().expect("delivery lock").clone()
    }

    pub fn delivered_count(&self) -> usize {
        self.delivered.lock().expect("delivery lock").len()
    }
}

impl Transport for PeerTransport {
    fn request(
        &self,
        _to: &EndpointReference,
        message: ProtocolMessage,
    ) -> Result<ProtocolMessage> {
        match self.server.handle_inbound(message)? {
            Disposition::Respond(response) => Ok(response),
            Disposition::Fault(fault) => Ok(ProtocolMessage::Fault(fault)),
            other => Err(Error::Io(std::io::Error::other(format!(
                "peer produced no response: {:?}",
                other
            )))),
        }
    }

    fn send(&self, _to: &EndpointReference, message: ProtocolMessage) -> Result<()> {
        self.delivered
            .lock()
            .expect("delivery lock")
            .push(message.clone());
        self.server.handle_inbound(message)?;
        Ok(())
    }
}

/// Address the tests use for the server endpoint.
pub fn server_address() -> EndpointReference {
    EndpointReference::new("http://server.example.com/service")
}

/// Address the tests use for the client's acksTo endpoint.
pub fn client_acks_address() -> EndpointReference {
    EndpointReference::new("http://client.example.com/acks")
}
