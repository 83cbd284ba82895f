// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Unacknowledged-message store for source-side retransmission.
//!
//! Every stamped outbound message enters the queue before it is sent and
//! leaves only through acknowledgement-driven eviction or sequence
//! termination. Each record carries its resend deadline; the resend driver
//! polls [`RetransmissionQueue::due`] and backs the deadline off after
//! each attempt. Records are never dropped on their own: at-least-once
//! delivery means a message without an acknowledgement keeps its place,
//! however stale.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;

use crate::addressing::EndpointReference;
use crate::policy::RetransmissionPolicy;
use crate::protocol::ApplicationMessage;
use crate::sequence::{SequenceIdentifier, SourceSequence};

/// One unacknowledged outbound message.
#[derive(Debug, Clone)]
pub struct InFlightMessage {
    /// The stamped message, resent verbatim (payload is shared, clones are
    /// cheap). Piggybacked acknowledgements are stripped on resend; they
    /// would be stale.
    pub message: ApplicationMessage,
    /// Destination endpoint.
    pub to: EndpointReference,
    /// Completed send attempts (1 = initial send only).
    pub attempts: u32,
    /// Deadline of the next resend.
    pub next_retransmit: Instant,
}

impl InFlightMessage {
    /// Message number of the record.
    #[must_use]
    pub fn message_number(&self) -> u64 {
        self.message.header.message_number
    }
}

/// Store of in-flight messages keyed by sequence identifier.
pub struct RetransmissionQueue {
    /// One entry per message number per sequence; resends update the
    /// record in place instead of appending copies.
    unacked: Mutex<HashMap<SequenceIdentifier, Vec<InFlightMessage>>>,
    policy: RetransmissionPolicy,
}

impl RetransmissionQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new(policy: RetransmissionPolicy) -> Self {
        Self {
            unacked: Mutex::new(HashMap::new()),
            policy,
        }
    }

    /// Timing policy driving the resend deadlines.
    #[must_use]
    pub fn policy(&self) -> &RetransmissionPolicy {
        &self.policy
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<SequenceIdentifier, Vec<InFlightMessage>>> {
        match self.unacked.lock() {
            Ok(guard) => guard,
            Err(e) => {
                log::debug!("[RetransmissionQueue] Lock poisoned, recovering");
                e.into_inner()
            }
        }
    }

    /// Register a freshly stamped outbound message.
    ///
    /// Called after numbering and before the initial send. The piggybacked
    /// acknowledgements are dropped from the stored copy; a resend carries
    /// only the sequence header and payload.
    pub fn put(&self, message: &ApplicationMessage, to: &EndpointReference) {
        let stored = ApplicationMessage {
            header: message.header.clone(),
            acknowledgements: Vec::new(),
            ack_requests: Vec::new(),
            payload: message.payload.clone(),
        };
        let record = InFlightMessage {
            message: stored,
            to: to.clone(),
            attempts: 1,
            next_retransmit: Instant::now() + self.policy.interval_after(0),
        };

        let mut unacked = self.lock();
        unacked
            .entry(message.header.identifier.clone())
            .or_default()
            .push(record);
    }

    /// Drop every record of `sequence` whose message number the peer has
    /// acknowledged. Called after each acknowledgement update; this is the
    /// cancellation point for scheduled resends. Returns the eviction count.
    pub fn evict(&self, sequence: &SourceSequence) -> usize {
        let mut unacked = self.lock();
        let Some(records) = unacked.get_mut(sequence.identifier()) else {
            return 0;
        };
        let before = records.len();
        records.retain(|r| !sequence.is_acknowledged(r.message_number()));
        let evicted = before - records.len();
        if records.is_empty() {
            unacked.remove(sequence.identifier());
        }
        if evicted > 0 {
            log::debug!("sequence {}: evicted {} acknowledged record(s)", sequence.identifier(), evicted);
        }
        evicted
    }

    /// Number of in-flight messages of a sequence. Feeds the
    /// max-unacknowledged termination threshold.
    #[must_use]
    pub fn count_unacknowledged(&self, id: &SequenceIdentifier) -> usize {
        self.lock().get(id).map_or(0, Vec::len)
    }

    /// Message numbers currently in flight for a sequence, ascending.
    #[must_use]
    pub fn unacknowledged(&self, id: &SequenceIdentifier) -> Vec<u64> {
        let mut numbers: Vec<u64> = self
            .lock()
            .get(id)
            .map(|records| records.iter().map(InFlightMessage::message_number).collect())
            .unwrap_or_default();
        numbers.sort_unstable();
        numbers
    }

    /// Records whose resend deadline has passed.
    ///
    /// Each returned record has its attempt counter bumped and its
    /// deadline backed off in place; the caller performs the actual send.
    pub fn due(&self, now: Instant) -> Vec<InFlightMessage> {
        let mut due = Vec::new();
        let mut unacked = self.lock();
        for records in unacked.values_mut() {
            for record in records.iter_mut() {
                if record.next_retransmit <= now {
                    due.push(record.clone());
                    record.next_retransmit = now + self.policy.interval_after(record.attempts);
                    record.attempts = record.attempts.saturating_add(1);
                }
            }
        }
        due
    }

    /// Remove a terminated sequence's records wholesale. Returns the count.
    pub fn purge(&self, id: &SequenceIdentifier) -> usize {
        self.lock().remove(id).map_or(0, |records| records.len())
    }

    /// Total in-flight messages across all sequences.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().values().map(Vec::len).sum()
    }

    /// Whether nothing is in flight.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().values().all(Vec::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::SequenceTerminationPolicy;
    use crate::protocol::SequenceHeader;
    use crate::sequence::{AckRange, AcknowledgementSet};
    use std::time::Duration;

    fn fast_policy() -> RetransmissionPolicy {
        RetransmissionPolicy {
            base_interval: Duration::from_millis(10),
            exponential_backoff: true,
            max_interval: Duration::from_millis(80),
            ack_interval: Duration::from_millis(5),
        }
    }

    fn app_message(id: &SequenceIdentifier, n: u64) -> ApplicationMessage {
        ApplicationMessage {
            header: SequenceHeader {
                identifier: id.clone(),
                message_number: n,
                last_message: false,
            },
            acknowledgements: Vec::new(),
            ack_requests: Vec::new(),
            payload: b"payload".as_slice().into(),
        }
    }

    fn source(id: &SequenceIdentifier) -> SourceSequence {
        SourceSequence::new(
            id.clone(),
            None,
            SequenceTerminationPolicy::default(),
            None,
        )
    }

    #[test]
    fn test_put_and_count() {
        let queue = RetransmissionQueue::new(fast_policy());
        let id = SequenceIdentifier::new("urn:uuid:q1");
        let to = EndpointReference::anonymous();

        for n in 1..=3 {
            queue.put(&app_message(&id, n), &to);
        }
        assert_eq!(queue.count_unacknowledged(&id), 3);
        assert_eq!(queue.unacknowledged(&id), vec![1, 2, 3]);
        assert_eq!(queue.len(), 3);
    }

    #[test]
    fn test_eviction_roundtrip() {
        let queue = RetransmissionQueue::new(fast_policy());
        let id = SequenceIdentifier::new("urn:uuid:q2");
        let seq = source(&id);
        let to = EndpointReference::anonymous();

        let n = 5;
        for i in 1..=n {
            queue.put(&app_message(&id, i), &to);
        }

        seq.set_acknowledged(AcknowledgementSet::from_ranges([AckRange::new(1, n)]));
        let evicted = queue.evict(&seq);
        assert_eq!(evicted, n as usize);
        assert_eq!(queue.count_unacknowledged(&id), 0);
    }

    #[test]
    fn test_partial_eviction() {
        let queue = RetransmissionQueue::new(fast_policy());
        let id = SequenceIdentifier::new("urn:uuid:q3");
        let seq = source(&id);
        let to = EndpointReference::anonymous();

        for i in 1..=4 {
            queue.put(&app_message(&id, i), &to);
        }
        seq.set_acknowledged(AcknowledgementSet::from_ranges([
            AckRange::new(1, 1),
            AckRange::new(3, 3),
        ]));
        assert_eq!(queue.evict(&seq), 2);
        assert_eq!(queue.unacknowledged(&id), vec![2, 4]);
    }

    #[test]
    fn test_due_bumps_attempts_and_backs_off() {
        let queue = RetransmissionQueue::new(fast_policy());
        let id = SequenceIdentifier::new("urn:uuid:q4");
        let to = EndpointReference::anonymous();
        queue.put(&app_message(&id, 1), &to);

        // before the base interval nothing is due
        assert!(queue.due(Instant::now()).is_empty());

        let later = Instant::now() + Duration::from_millis(15);
        let due = queue.due(later);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].attempts, 1);

        // deadline was backed off relative to the poll instant
        assert!(queue.due(later).is_empty());
        let much_later = later + Duration::from_millis(25);
        let due = queue.due(much_later);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].attempts, 2);
    }

    #[test]
    fn test_resend_strips_piggybacked_acks() {
        let queue = RetransmissionQueue::new(fast_policy());
        let id = SequenceIdentifier::new("urn:uuid:q5");
        let to = EndpointReference::anonymous();

        let mut message = app_message(&id, 1);
        message
            .acknowledgements
            .push(crate::protocol::SequenceAcknowledgementMsg {
                identifier: SequenceIdentifier::new("urn:uuid:other"),
                ranges: AcknowledgementSet::new(),
            });
        queue.put(&message, &to);

        let due = queue.due(Instant::now() + Duration::from_millis(15));
        assert_eq!(due.len(), 1);
        assert!(due[0].message.acknowledgements.is_empty());
        assert_eq!(due[0].message.payload, message.payload);
    }

    #[test]
    fn test_purge() {
        let queue = RetransmissionQueue::new(fast_policy());
        let id = SequenceIdentifier::new("urn:uuid:q6");
        let to = EndpointReference::anonymous();
        for i in 1..=3 {
            queue.put(&app_message(&id, i), &to);
        }
        assert_eq!(queue.purge(&id), 3);
        assert!(queue.is_empty());
        assert_eq!(queue.purge(&id), 0);
    }
}
