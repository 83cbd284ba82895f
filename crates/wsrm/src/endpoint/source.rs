// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Source-side endpoint state: the registry of outbound sequences.
//!
//! Owns every [`SourceSequence`] of an endpoint plus the "current"
//! sequence new application messages are stamped against. Sequence
//! creation is single-flight: concurrent first-senders discovering "no
//! current sequence" serialize on a creation lock so exactly one
//! CreateSequence exchange runs and exactly one sequence survives as
//! current.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use dashmap::DashMap;
use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::policy::{SequenceTerminationPolicy, SourcePolicy};
use crate::protocol::SequenceAcknowledgementMsg;
use crate::retransmission::RetransmissionQueue;
use crate::sequence::{SequenceIdentifier, SourceSequence};

/// Registry of a reliable source's sequences.
pub struct RmSource {
    sequences: DashMap<SequenceIdentifier, Arc<SourceSequence>>,
    /// Offered-inverse-sequence identifier -> owning sequence, for
    /// correlating duplex traffic back to the sequence that offered it.
    by_offer: DashMap<SequenceIdentifier, Arc<SourceSequence>>,
    /// Sequence new application messages are stamped against.
    current: ArcSwapOption<SourceSequence>,
    /// Serializes sequence creation (check-then-create must be atomic).
    creation: Mutex<()>,
    policy: SourcePolicy,
    termination: SequenceTerminationPolicy,
}

impl RmSource {
    /// Create an empty source registry with the given policies.
    #[must_use]
    pub fn new(policy: SourcePolicy, termination: SequenceTerminationPolicy) -> Self {
        Self {
            sequences: DashMap::new(),
            by_offer: DashMap::new(),
            current: ArcSwapOption::empty(),
            creation: Mutex::new(()),
            policy,
            termination,
        }
    }

    /// Source policy applied when establishing sequences.
    #[must_use]
    pub fn source_policy(&self) -> &SourcePolicy {
        &self.policy
    }

    /// Termination policy injected into new sequences.
    #[must_use]
    pub fn termination_policy(&self) -> SequenceTerminationPolicy {
        self.termination
    }

    /// Mint an identifier for an offered inverse sequence.
    #[must_use]
    pub fn offer(&self) -> SequenceIdentifier {
        SequenceIdentifier::generate()
    }

    /// Register a sequence.
    pub fn add_sequence(&self, sequence: Arc<SourceSequence>) {
        self.sequences
            .insert(sequence.identifier().clone(), sequence);
    }

    /// Look up a sequence. `None` is a normal precondition ("no sequence
    /// yet"), not an error.
    #[must_use]
    pub fn get_sequence(&self, id: &SequenceIdentifier) -> Option<Arc<SourceSequence>> {
        self.sequences.get(id).map(|entry| Arc::clone(&entry))
    }

    /// Unregister a sequence, clearing the current slot and offer alias if
    /// they point at it.
    pub fn remove_sequence(&self, id: &SequenceIdentifier) -> Option<Arc<SourceSequence>> {
        let removed = self.sequences.remove(id).map(|(_, seq)| seq);
        if let Some(seq) = &removed {
            if let Some(offer_id) = seq.offered_identifier() {
                self.by_offer.remove(offer_id);
            }
            let current = self.current.load();
            if current
                .as_ref()
                .is_some_and(|c| c.identifier() == seq.identifier())
            {
                self.current.store(None);
            }
        }
        removed
    }

    /// The current outbound sequence, if any.
    #[must_use]
    pub fn current(&self) -> Option<Arc<SourceSequence>> {
        self.current.load_full()
    }

    /// Set the current sequence, aliasing it by its offered identifier.
    pub fn set_current(&self, sequence: &Arc<SourceSequence>) {
        if let Some(offer_id) = sequence.offered_identifier() {
            self.by_offer
                .insert(offer_id.clone(), Arc::clone(sequence));
        }
        self.current.store(Some(Arc::clone(sequence)));
    }

    /// The sequence that offered the given inverse-sequence identifier.
    #[must_use]
    pub fn sequence_for_offer(&self, offer_id: &SequenceIdentifier) -> Option<Arc<SourceSequence>> {
        self.by_offer.get(offer_id).map(|entry| Arc::clone(&entry))
    }

    /// Get the current usable sequence, or run `create` to establish one.
    ///
    /// A current sequence that is expired or already carried its last
    /// message does not count; a successor is created. `create` must
    /// register the new sequence and set it current (the proxy does).
    ///
    /// The creation lock makes the check-then-create atomic: of N threads
    /// racing here with no current sequence, one creates, the rest observe
    /// the sequence it registered.
    pub fn current_or_create<F>(&self, create: F) -> Result<Arc<SourceSequence>>
    where
        F: FnOnce() -> Result<Arc<SourceSequence>>,
    {
        if let Some(seq) = self.usable_current() {
            return Ok(seq);
        }
        let _guard = self.creation.lock();
        if let Some(seq) = self.usable_current() {
            return Ok(seq);
        }
        let seq = create()?;
        debug_assert!(
            self.current()
                .is_some_and(|c| c.identifier() == seq.identifier()),
            "create() must register the sequence as current"
        );
        Ok(seq)
    }

    fn usable_current(&self) -> Option<Arc<SourceSequence>> {
        let seq = self.current.load_full()?;
        if seq.is_last_message() || seq.is_expired() {
            None
        } else {
            Some(seq)
        }
    }

    /// Apply a received acknowledgement: replace the matching sequence's
    /// cached view and evict the now-acknowledged in-flight records.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownSequence`] when no sequence matches. Other
    /// sequences are unaffected by the fault.
    pub fn set_acknowledged(
        &self,
        ack: &SequenceAcknowledgementMsg,
        queue: &RetransmissionQueue,
    ) -> Result<()> {
        let sequence = self
            .get_sequence(&ack.identifier)
            .ok_or_else(|| Error::UnknownSequence(ack.identifier.clone()))?;
        sequence.set_acknowledged(ack.ranges.clone());
        queue.evict(&sequence);
        Ok(())
    }

    /// Snapshot of all registered sequences.
    #[must_use]
    pub fn sequences(&self) -> Vec<Arc<SourceSequence>> {
        self.sequences
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    /// Fully drained sequences (last message assigned, everything
    /// acknowledged): eligible for TerminateSequence.
    #[must_use]
    pub fn drained_sequences(&self) -> Vec<Arc<SourceSequence>> {
        self.sequences
            .iter()
            .filter(|entry| entry.value().all_acknowledged())
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    /// Expired sequences that still have unacknowledged in-flight
    /// messages. Surfaced for the operator; never auto-purged, since
    /// dropping the backlog silently would defeat at-least-once delivery.
    #[must_use]
    pub fn expired_backlog(&self, queue: &RetransmissionQueue) -> Vec<(SequenceIdentifier, usize)> {
        let mut backlog = Vec::new();
        for entry in self.sequences.iter() {
            let seq = entry.value();
            if seq.is_expired() {
                let outstanding = queue.count_unacknowledged(seq.identifier());
                if outstanding > 0 {
                    log::warn!(
                        "sequence {} expired with {} unacknowledged message(s)",
                        seq.identifier(),
                        outstanding
                    );
                    backlog.push((seq.identifier().clone(), outstanding));
                }
            }
        }
        backlog
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::RetransmissionPolicy;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    fn new_sequence(source: &RmSource) -> Arc<SourceSequence> {
        Arc::new(SourceSequence::new(
            SequenceIdentifier::generate(),
            None,
            source.termination_policy(),
            None,
        ))
    }

    #[test]
    fn test_registry_roundtrip() {
        let source = RmSource::new(SourcePolicy::default(), SequenceTerminationPolicy::default());
        let seq = new_sequence(&source);
        let id = seq.identifier().clone();

        assert!(source.get_sequence(&id).is_none());
        source.add_sequence(Arc::clone(&seq));
        assert!(source.get_sequence(&id).is_some());
        source.remove_sequence(&id);
        assert!(source.get_sequence(&id).is_none());
    }

    #[test]
    fn test_remove_clears_current() {
        let source = RmSource::new(SourcePolicy::default(), SequenceTerminationPolicy::default());
        let seq = new_sequence(&source);
        source.add_sequence(Arc::clone(&seq));
        source.set_current(&seq);
        assert!(source.current().is_some());

        source.remove_sequence(&seq.identifier().clone());
        assert!(source.current().is_none());
    }

    #[test]
    fn test_single_flight_creation() {
        let source = Arc::new(RmSource::new(
            SourcePolicy::default(),
            SequenceTerminationPolicy::default(),
        ));
        let creations = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let source = Arc::clone(&source);
                let creations = Arc::clone(&creations);
                thread::spawn(move || {
                    source
                        .current_or_create(|| {
                            creations.fetch_add(1, Ordering::SeqCst);
                            // widen the race window
                            thread::sleep(Duration::from_millis(10));
                            let seq = Arc::new(SourceSequence::new(
                                SequenceIdentifier::generate(),
                                None,
                                source.termination_policy(),
                                None,
                            ));
                            source.add_sequence(Arc::clone(&seq));
                            source.set_current(&seq);
                            Ok(seq)
                        })
                        .expect("creation")
                        .identifier()
                        .clone()
                })
            })
            .collect();

        let ids: Vec<_> = handles
            .into_iter()
            .map(|h| h.join().expect("thread"))
            .collect();

        assert_eq!(creations.load(Ordering::SeqCst), 1, "one creation only");
        assert!(ids.windows(2).all(|w| w[0] == w[1]), "one surviving current");
    }

    #[test]
    fn test_closed_current_is_replaced() {
        let source = RmSource::new(
            SourcePolicy::default(),
            SequenceTerminationPolicy::with_max_length(1),
        );
        let seq = Arc::new(SourceSequence::new(
            SequenceIdentifier::generate(),
            None,
            source.termination_policy(),
            None,
        ));
        source.add_sequence(Arc::clone(&seq));
        source.set_current(&seq);

        // exhaust the sequence
        seq.next_message_number(0).expect("number");
        assert!(seq.is_last_message());

        let successor = source
            .current_or_create(|| {
                let seq = Arc::new(SourceSequence::new(
                    SequenceIdentifier::generate(),
                    None,
                    source.termination_policy(),
                    None,
                ));
                source.add_sequence(Arc::clone(&seq));
                source.set_current(&seq);
                Ok(seq)
            })
            .expect("creation");
        assert_ne!(successor.identifier(), seq.identifier());
    }

    #[test]
    fn test_set_acknowledged_unknown_sequence() {
        let source = RmSource::new(SourcePolicy::default(), SequenceTerminationPolicy::default());
        let queue = RetransmissionQueue::new(RetransmissionPolicy::default());
        let ack = SequenceAcknowledgementMsg {
            identifier: SequenceIdentifier::new("urn:uuid:nobody"),
            ranges: crate::sequence::AcknowledgementSet::new(),
        };
        assert!(matches!(
            source.set_acknowledged(&ack, &queue),
            Err(Error::UnknownSequence(_))
        ));
    }

    #[test]
    fn test_offer_correlation() {
        let source = RmSource::new(SourcePolicy::with_offer(), SequenceTerminationPolicy::default());
        let offer_id = source.offer();
        let seq = Arc::new(SourceSequence::new(
            SequenceIdentifier::generate(),
            None,
            source.termination_policy(),
            Some(offer_id.clone()),
        ));
        source.add_sequence(Arc::clone(&seq));
        source.set_current(&seq);

        let found = source
            .sequence_for_offer(&offer_id)
            .expect("offer correlation");
        assert_eq!(found.identifier(), seq.identifier());
    }
}
