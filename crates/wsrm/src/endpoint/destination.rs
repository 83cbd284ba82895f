// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Destination-side endpoint state: the registry of inbound sequences.

use std::sync::Arc;

use dashmap::DashMap;

use crate::error::{Error, Result};
use crate::policy::{DeliveryAssurance, DestinationPolicy};
use crate::protocol::{SequenceAcknowledgementMsg, SequenceHeader};
use crate::sequence::{Delivery, DestinationSequence, SequenceIdentifier};

/// Registry of a reliable destination's sequences.
pub struct RmDestination {
    sequences: DashMap<SequenceIdentifier, Arc<DestinationSequence>>,
    policy: DestinationPolicy,
    assurance: DeliveryAssurance,
}

impl RmDestination {
    /// Create an empty destination registry with the given policies.
    #[must_use]
    pub fn new(policy: DestinationPolicy, assurance: DeliveryAssurance) -> Self {
        Self {
            sequences: DashMap::new(),
            policy,
            assurance,
        }
    }

    /// Destination policy applied when negotiating CreateSequence.
    #[must_use]
    pub fn destination_policy(&self) -> DestinationPolicy {
        self.policy
    }

    /// Delivery assurance injected into new sequences.
    #[must_use]
    pub fn delivery_assurance(&self) -> DeliveryAssurance {
        self.assurance
    }

    /// Mint a fresh sequence identifier (`urn:uuid:` + UUID v4).
    #[must_use]
    pub fn generate_sequence_identifier(&self) -> SequenceIdentifier {
        SequenceIdentifier::generate()
    }

    /// Register a sequence.
    pub fn add_sequence(&self, sequence: Arc<DestinationSequence>) {
        self.sequences
            .insert(sequence.identifier().clone(), sequence);
    }

    /// Look up a sequence. `None` is a normal precondition, not an error.
    #[must_use]
    pub fn get_sequence(&self, id: &SequenceIdentifier) -> Option<Arc<DestinationSequence>> {
        self.sequences.get(id).map(|entry| Arc::clone(&entry))
    }

    /// Unregister a sequence.
    pub fn remove_sequence(&self, id: &SequenceIdentifier) -> Option<Arc<DestinationSequence>> {
        self.sequences.remove(id).map(|(_, seq)| seq)
    }

    /// Record an inbound sequence header against its sequence.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownSequence`] when the header references an unknown
    /// identifier; sequence-level faults propagate from
    /// [`DestinationSequence::accept`].
    pub fn acknowledge(&self, header: &SequenceHeader) -> Result<Delivery> {
        let sequence = self
            .get_sequence(&header.identifier)
            .ok_or_else(|| Error::UnknownSequence(header.identifier.clone()))?;
        sequence.accept(header.message_number, header.last_message)
    }

    /// Drain pending acknowledgements of every sequence, paired with the
    /// endpoint each must be sent to. Used for piggybacking onto outbound
    /// application messages.
    #[must_use]
    pub fn pending_acknowledgements(
        &self,
    ) -> Vec<(crate::addressing::EndpointReference, SequenceAcknowledgementMsg)> {
        self.drain_pending(|_| true)
    }

    /// Drain pending acknowledgements only for sequences whose acksTo is
    /// an addressable endpoint. Anonymous acksTo sequences keep their
    /// pending flag; their acknowledgements can only ride the response
    /// flow as piggybacks. Used by the standalone flush driver.
    #[must_use]
    pub fn flushable_acknowledgements(
        &self,
    ) -> Vec<(crate::addressing::EndpointReference, SequenceAcknowledgementMsg)> {
        self.drain_pending(|acks_to| !acks_to.is_anonymous() && !acks_to.is_none_address())
    }

    fn drain_pending(
        &self,
        eligible: impl Fn(&crate::addressing::EndpointReference) -> bool,
    ) -> Vec<(crate::addressing::EndpointReference, SequenceAcknowledgementMsg)> {
        let mut pending = Vec::new();
        for entry in self.sequences.iter() {
            let seq = entry.value();
            if !eligible(seq.acks_to()) {
                continue;
            }
            if let Some(ranges) = seq.take_pending_acknowledgement() {
                pending.push((
                    seq.acks_to().clone(),
                    SequenceAcknowledgementMsg {
                        identifier: seq.identifier().clone(),
                        ranges,
                    },
                ));
            }
        }
        pending
    }

    /// Current acknowledgement state of the given sequences, pending or
    /// not. Used to answer AckRequested.
    #[must_use]
    pub fn acknowledgement_state(
        &self,
        ids: &[SequenceIdentifier],
    ) -> Vec<SequenceAcknowledgementMsg> {
        ids.iter()
            .filter_map(|id| self.get_sequence(id))
            .map(|seq| SequenceAcknowledgementMsg {
                identifier: seq.identifier().clone(),
                ranges: seq.acknowledged(),
            })
            .collect()
    }

    /// Snapshot of all registered sequences.
    #[must_use]
    pub fn sequences(&self) -> Vec<Arc<DestinationSequence>> {
        self.sequences
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }
}
