// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Destination-side sequence state.
//!
//! A destination sequence records which message numbers arrived, enforces
//! the declared final message number, applies the delivery-assurance
//! policy, and batches its acknowledgements for piggybacking or standalone
//! flushing to the sequence's acksTo endpoint.

use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::addressing::EndpointReference;
use crate::error::{Error, Result};
use crate::policy::DeliveryAssurance;
use crate::sequence::{AcknowledgementSet, SequenceIdentifier};

/// Verdict on an inbound application message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Deliver to the application now.
    Deliver,
    /// Already acknowledged and the policy is at-most-once: drop.
    Duplicate,
    /// In-order delivery with predecessors missing: hold. The binding
    /// layer parks the payload and replays it when
    /// [`DestinationSequence::deliverable_watermark`] reaches its number.
    Held,
}

#[derive(Debug)]
struct DestinationState {
    acknowledged: AcknowledgementSet,
    /// Declared final message number, set when the message carrying the
    /// last-message flag arrives. Terminal: nothing beyond it is legal.
    last_message_number: Option<u64>,
    /// Acknowledgements recorded since the last ack emission.
    ack_pending: bool,
}

/// Per-sequence state of the destination role.
#[derive(Debug)]
pub struct DestinationSequence {
    id: SequenceIdentifier,
    acks_to: EndpointReference,
    expires: Option<Instant>,
    assurance: DeliveryAssurance,
    state: Mutex<DestinationState>,
}

impl DestinationSequence {
    /// Construct a destination sequence.
    ///
    /// Created when a CreateSequence request is serviced (identifier
    /// minted locally) or when a peer accepts an offered inverse sequence
    /// (identifier from the offer).
    #[must_use]
    pub fn new(
        id: SequenceIdentifier,
        acks_to: EndpointReference,
        expires: Option<Duration>,
        assurance: DeliveryAssurance,
    ) -> Self {
        Self {
            id,
            acks_to,
            expires: expires.filter(|d| !d.is_zero()).map(|d| Instant::now() + d),
            assurance,
            state: Mutex::new(DestinationState {
                acknowledged: AcknowledgementSet::new(),
                last_message_number: None,
                ack_pending: false,
            }),
        }
    }

    /// Sequence identifier.
    #[must_use]
    pub fn identifier(&self) -> &SequenceIdentifier {
        &self.id
    }

    /// Endpoint acknowledgements for this sequence must be sent to.
    #[must_use]
    pub fn acks_to(&self) -> &EndpointReference {
        &self.acks_to
    }

    /// Record an inbound message and return its delivery verdict.
    ///
    /// `last_message` is the flag from the inbound sequence header; it
    /// declares `message_number` as the final number of the sequence.
    ///
    /// # Errors
    ///
    /// [`Error::LastMessageNumberExceeded`] when a final number was
    /// declared and `message_number` lies beyond it, and
    /// [`Error::InvalidAcknowledgement`] for message number zero.
    pub fn accept(&self, message_number: u64, last_message: bool) -> Result<Delivery> {
        if message_number == 0 {
            return Err(Error::InvalidAcknowledgement(
                "message number 0 does not exist".into(),
            ));
        }

        let mut state = self.state.lock();

        if let Some(last) = state.last_message_number {
            if message_number > last {
                return Err(Error::LastMessageNumberExceeded {
                    identifier: self.id.clone(),
                    last,
                    attempted: message_number,
                });
            }
        }

        let duplicate = !state.acknowledged.insert(message_number);
        if !duplicate {
            state.ack_pending = true;
        }
        if last_message {
            state.last_message_number = Some(message_number);
        }

        if duplicate && self.assurance.at_most_once {
            return Ok(Delivery::Duplicate);
        }
        if self.assurance.in_order && message_number > state.acknowledged.contiguous_prefix() {
            return Ok(Delivery::Held);
        }
        Ok(Delivery::Deliver)
    }

    /// Record an acknowledgement without a delivery verdict.
    ///
    /// Same enforcement as [`accept`](Self::accept); used where only the
    /// bookkeeping matters (e.g. tests, replayed journals).
    pub fn acknowledge(&self, message_number: u64) -> Result<()> {
        self.accept(message_number, false).map(|_| ())
    }

    /// Whether message `n` was received.
    #[must_use]
    pub fn is_acknowledged(&self, n: u64) -> bool {
        self.state.lock().acknowledged.contains(n)
    }

    /// Snapshot of the recorded acknowledgement ranges.
    #[must_use]
    pub fn acknowledged(&self) -> AcknowledgementSet {
        self.state.lock().acknowledged.clone()
    }

    /// Declared final message number, if the last message arrived.
    #[must_use]
    pub fn last_message_number(&self) -> Option<u64> {
        self.state.lock().last_message_number
    }

    /// Highest message number deliverable in order: every number up to and
    /// including it has been received.
    #[must_use]
    pub fn deliverable_watermark(&self) -> u64 {
        self.state.lock().acknowledged.contiguous_prefix()
    }

    /// Whether the declared final message and all its predecessors have
    /// been received.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        let state = self.state.lock();
        state
            .last_message_number
            .is_some_and(|last| state.acknowledged.covers_from_one(last))
    }

    /// Re-arm the pending flag so the next flush or piggyback emits the
    /// current acknowledgement state. Called when the peer requests an
    /// acknowledgement.
    pub fn request_acknowledgement(&self) {
        self.state.lock().ack_pending = true;
    }

    /// Take the pending acknowledgement snapshot, clearing the pending
    /// flag. Returns `None` when nothing new was recorded since the last
    /// emission.
    #[must_use]
    pub fn take_pending_acknowledgement(&self) -> Option<AcknowledgementSet> {
        let mut state = self.state.lock();
        if !state.ack_pending {
            return None;
        }
        state.ack_pending = false;
        Some(state.acknowledged.clone())
    }

    /// Whether the granted lifetime has passed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires.is_some_and(|at| Instant::now() > at)
    }
}
