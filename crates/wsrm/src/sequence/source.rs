// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Source-side sequence state.
//!
//! A source sequence assigns strictly increasing message numbers to
//! outbound application messages, closes itself when the termination
//! policy says so, and caches the peer's view of what has been delivered.
//! It never records acknowledgements itself; that is the destination
//! role's job ([`super::DestinationSequence`]).

use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::policy::SequenceTerminationPolicy;
use crate::sequence::{AcknowledgementSet, SequenceIdentifier};

#[derive(Debug)]
struct SourceState {
    /// Last assigned message number (0 = nothing sent yet).
    current_message_number: u64,
    /// Irreversible: once true, no further numbers are assigned.
    last_message: bool,
    /// Peer's acknowledgement view, replaced wholesale on each received
    /// acknowledgement (the peer is authoritative).
    acknowledged: AcknowledgementSet,
}

/// Result of assigning a message number.
///
/// `last_message` is decided together with the number, under the sequence
/// lock: only the message that actually closed the sequence carries the
/// flag, whatever the interleaving of concurrent senders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextMessage {
    /// The assigned message number.
    pub number: u64,
    /// Whether this number closed the sequence (stamp the last-message
    /// flag onto the outbound header).
    pub last_message: bool,
}

/// Per-sequence state of the source role.
///
/// # Thread Safety
///
/// All methods take `&self`; interior state is guarded by a mutex, so
/// concurrent senders on the same sequence observe strictly increasing,
/// duplicate-free message numbers.
#[derive(Debug)]
pub struct SourceSequence {
    id: SequenceIdentifier,
    /// Identifier offered for the inverse sequence in the CreateSequence
    /// that established this one, if any.
    offered_id: Option<SequenceIdentifier>,
    /// Absolute expiry computed from the granted duration.
    expires: Option<Instant>,
    termination: SequenceTerminationPolicy,
    state: Mutex<SourceState>,
}

impl SourceSequence {
    /// Construct a source sequence from a CreateSequenceResponse.
    ///
    /// `expires` is the granted lifetime; zero or absent means the
    /// sequence never expires.
    #[must_use]
    pub fn new(
        id: SequenceIdentifier,
        expires: Option<Duration>,
        termination: SequenceTerminationPolicy,
        offered_id: Option<SequenceIdentifier>,
    ) -> Self {
        Self {
            id,
            offered_id,
            expires: expires.filter(|d| !d.is_zero()).map(|d| Instant::now() + d),
            termination,
            state: Mutex::new(SourceState {
                current_message_number: 0,
                last_message: false,
                acknowledged: AcknowledgementSet::new(),
            }),
        }
    }

    /// Sequence identifier.
    #[must_use]
    pub fn identifier(&self) -> &SequenceIdentifier {
        &self.id
    }

    /// Identifier offered for the inverse sequence, if the establishing
    /// CreateSequence carried an offer.
    #[must_use]
    pub fn offered_identifier(&self) -> Option<&SequenceIdentifier> {
        self.offered_id.as_ref()
    }

    /// Whether this sequence was established by a CreateSequence offering
    /// the given inverse-sequence identifier.
    #[must_use]
    pub fn offered_by(&self, id: &SequenceIdentifier) -> bool {
        self.offered_id.as_ref() == Some(id)
    }

    /// Assign the next message number.
    ///
    /// Atomically increments the counter, then closes the sequence when
    /// the termination policy trips on the new number, the current
    /// acknowledgement range count, or `in_flight` (the caller samples the
    /// retransmission queue before the new message enters it).
    ///
    /// # Errors
    ///
    /// [`Error::SequenceTerminated`] once the last message was assigned.
    pub fn next_message_number(&self, in_flight: usize) -> Result<NextMessage> {
        let mut state = self.state.lock();
        if state.last_message {
            return Err(Error::SequenceTerminated(self.id.clone()));
        }
        state.current_message_number += 1;
        let number = state.current_message_number;
        if self
            .termination
            .should_close(number, state.acknowledged.range_count(), in_flight)
        {
            log::debug!("sequence {}: closing at message {}", self.id, number);
            state.last_message = true;
        }
        Ok(NextMessage {
            number,
            last_message: state.last_message,
        })
    }

    /// Assign the next message number and close the sequence with it,
    /// regardless of the termination policy. Used for a standalone
    /// last-message stamp that ends the sequence without a payload.
    pub fn next_and_last_message_number(&self, in_flight: usize) -> Result<NextMessage> {
        let mut state = self.state.lock();
        if state.last_message {
            return Err(Error::SequenceTerminated(self.id.clone()));
        }
        state.current_message_number += 1;
        state.last_message = true;
        Ok(NextMessage {
            number: state.current_message_number,
            last_message: true,
        })
    }

    /// Last assigned message number (0 = nothing sent).
    #[must_use]
    pub fn current_message_number(&self) -> u64 {
        self.state.lock().current_message_number
    }

    /// Whether the last message of this sequence has been assigned.
    #[must_use]
    pub fn is_last_message(&self) -> bool {
        self.state.lock().last_message
    }

    /// Replace the cached acknowledgement view with one received from the
    /// peer. No merge: the peer's view is authoritative.
    pub fn set_acknowledged(&self, acknowledged: AcknowledgementSet) {
        self.state.lock().acknowledged = acknowledged;
    }

    /// Whether the peer confirmed delivery of message `n`.
    #[must_use]
    pub fn is_acknowledged(&self, n: u64) -> bool {
        self.state.lock().acknowledged.contains(n)
    }

    /// Snapshot of the peer's acknowledgement view.
    #[must_use]
    pub fn acknowledged(&self) -> AcknowledgementSet {
        self.state.lock().acknowledged.clone()
    }

    /// Whether the sequence is fully drained: its last message has been
    /// assigned AND a single range covers every number from 1 to the
    /// current message number. A drained sequence is eligible for
    /// termination and garbage collection.
    #[must_use]
    pub fn all_acknowledged(&self) -> bool {
        let state = self.state.lock();
        state.last_message
            && state
                .acknowledged
                .covers_from_one(state.current_message_number)
    }

    /// Whether the granted lifetime has passed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires.is_some_and(|at| Instant::now() > at)
    }
}
