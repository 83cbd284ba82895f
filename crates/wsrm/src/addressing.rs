// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Opaque addressable-endpoint references.
//!
//! The reliability core never interprets an endpoint reference beyond
//! equality and the two well-known WS-Addressing values (anonymous / none);
//! it only routes CreateSequence and acknowledgement traffic by it. The
//! addressing collaborator owns the real representation.

use std::fmt;
use std::sync::Arc;

use crate::config;

/// Optional endpoint metadata carried alongside the address.
///
/// Passed through untouched; the core routes by address only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointMetadata {
    /// Qualified service name, if known.
    pub service_name: Option<String>,
    /// Port name within the service, if known.
    pub port_name: Option<String>,
    /// WSDL location hint, if known.
    pub wsdl_location: Option<String>,
}

/// An addressable endpoint: an address string plus optional metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointReference {
    address: Arc<str>,
    metadata: Option<EndpointMetadata>,
}

impl EndpointReference {
    /// Create a reference from a plain address.
    pub fn new(address: impl Into<Arc<str>>) -> Self {
        Self {
            address: address.into(),
            metadata: None,
        }
    }

    /// Attach endpoint metadata (service/port/WSDL hints).
    #[must_use]
    pub fn with_metadata(mut self, metadata: EndpointMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// The WS-Addressing anonymous endpoint ("reply on the same connection").
    #[must_use]
    pub fn anonymous() -> Self {
        Self::new(config::WSA_ANONYMOUS_URI)
    }

    /// The WS-Addressing none endpoint ("send nothing").
    #[must_use]
    pub fn none() -> Self {
        Self::new(config::WSA_NONE_URI)
    }

    /// Address string.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Metadata, if any was attached.
    #[must_use]
    pub fn metadata(&self) -> Option<&EndpointMetadata> {
        self.metadata.as_ref()
    }

    /// True for the anonymous well-known address.
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.address() == config::WSA_ANONYMOUS_URI
    }

    /// True for the none well-known address (declined offer marker).
    #[must_use]
    pub fn is_none_address(&self) -> bool {
        self.address() == config::WSA_NONE_URI
    }
}

impl fmt::Display for EndpointReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.address())
    }
}
