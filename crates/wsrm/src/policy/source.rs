// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Source-side sequence policy.
//!
//! Controls how a reliable source establishes sequences: where the peer
//! should deliver acknowledgements, the lifetime requested for new
//! sequences, and whether CreateSequence requests carry an offer for the
//! inverse (duplex) sequence.

use std::time::Duration;

use crate::addressing::EndpointReference;

/// Policy applied by a reliable source when creating sequences.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourcePolicy {
    /// Endpoint to which the peer must send acknowledgements.
    ///
    /// `None` falls back to the WS-Addressing anonymous endpoint (acks ride
    /// the response flow of the connection).
    pub acks_to: Option<EndpointReference>,

    /// Lifetime requested for new sequences. `None` requests no expiry.
    pub sequence_expiration: Option<Duration>,

    /// Include an offer for the inverse sequence in CreateSequence,
    /// establishing a duplex reliable channel in one round-trip.
    pub include_offer: bool,

    /// Lifetime proposed for the offered inverse sequence.
    pub offered_sequence_expiration: Option<Duration>,
}

impl SourcePolicy {
    /// Policy requesting duplex establishment.
    #[must_use]
    pub fn with_offer() -> Self {
        Self {
            include_offer: true,
            ..Self::default()
        }
    }

    /// Effective acksTo: configured endpoint or the anonymous fallback.
    #[must_use]
    pub fn effective_acks_to(&self) -> EndpointReference {
        self.acks_to
            .clone()
            .unwrap_or_else(EndpointReference::anonymous)
    }
}
