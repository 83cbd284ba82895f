// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Server-side protocol actions.
//!
//! Services inbound CreateSequence and TerminateSequence against the
//! destination registry. Stateless: everything it needs arrives as
//! parameters.

use std::sync::Arc;

use crate::addressing::EndpointReference;
use crate::endpoint::RmDestination;
use crate::error::{Error, Result};
use crate::metrics::ReliabilityMetrics;
use crate::protocol::messages::{Accept, CreateSequence, CreateSequenceResponse};
use crate::sequence::{DestinationSequence, SequenceIdentifier};

/// Server-side handler of protocol requests.
#[derive(Default)]
pub struct RmServant;

impl RmServant {
    /// Create a stateless servant.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Service an inbound CreateSequence request.
    ///
    /// Mints the destination identifier, negotiates the granted expiry
    /// (minimum of policy and requested, zero/absent requested = policy
    /// default), answers an offer with an accept — the destination's own
    /// address `to` when policy accepts offers, the none address to
    /// decline — and registers the new destination sequence.
    ///
    /// Duplicate deliveries of the same CreateSequence are not detected;
    /// each one mints an independent sequence. The requester's
    /// retransmission of the request is expected to be rare and the spare
    /// sequence merely idles until it expires.
    ///
    /// Accepting an offer does not register a reverse source sequence
    /// here; only the offering side realizes duplex establishment from
    /// the accept.
    pub fn create_sequence(
        &self,
        destination: &RmDestination,
        request: &CreateSequence,
        to: &EndpointReference,
        metrics: &ReliabilityMetrics,
    ) -> Result<CreateSequenceResponse> {
        let identifier = destination.generate_sequence_identifier();
        let policy = destination.destination_policy();
        let expires = policy.negotiate_expiration(request.expires);

        let accept = request.offer.as_ref().map(|_| {
            if policy.accept_offers {
                Accept {
                    acks_to: to.clone(),
                }
            } else {
                Accept {
                    acks_to: EndpointReference::none(),
                }
            }
        });

        let sequence = Arc::new(DestinationSequence::new(
            identifier.clone(),
            request.acks_to.clone(),
            expires,
            destination.delivery_assurance(),
        ));
        destination.add_sequence(sequence);
        metrics.increment_sequences_created();
        log::debug!(
            "created destination sequence {} (acksTo {})",
            identifier,
            request.acks_to
        );

        Ok(CreateSequenceResponse {
            identifier,
            expires,
            accept,
        })
    }

    /// Service an inbound TerminateSequence notification.
    ///
    /// Removes the sequence and drops its state. The exchange is one-way,
    /// so an unknown identifier is reported to the local caller only.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownSequence`] when no sequence matches.
    pub fn terminate_sequence(
        &self,
        destination: &RmDestination,
        id: &SequenceIdentifier,
        metrics: &ReliabilityMetrics,
    ) -> Result<()> {
        match destination.remove_sequence(id) {
            Some(sequence) => {
                if !sequence.is_complete() {
                    log::debug!(
                        "sequence {} terminated before its last message arrived",
                        id
                    );
                }
                metrics.increment_sequences_terminated();
                Ok(())
            }
            None => Err(Error::UnknownSequence(id.clone())),
        }
    }
}
