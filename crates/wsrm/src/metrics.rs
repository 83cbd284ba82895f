// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Reliability metrics.
//!
//! Lock-free atomic counters covering the observable behavior of the
//! core: sequence lifecycle, stamping, retransmission, and acknowledgement
//! traffic. Snapshots are cheap and safe to export from a monitoring
//! thread.

use std::sync::atomic::{AtomicU64, Ordering};

/// Reliability metrics collector.
///
/// # Thread Safety
///
/// All methods use atomic operations (Relaxed ordering) for lock-free
/// updates from any thread.
#[derive(Debug, Default)]
pub struct ReliabilityMetrics {
    /// Sequences established (source or destination role).
    sequences_created: AtomicU64,
    /// Sequences terminated.
    sequences_terminated: AtomicU64,
    /// Outbound application messages stamped with a sequence header.
    messages_stamped: AtomicU64,
    /// Resends performed by the retransmission driver.
    retransmits_sent: AtomicU64,
    /// Acknowledgement messages processed (piggybacked or standalone).
    acks_received: AtomicU64,
    /// Acknowledgement messages emitted (piggybacked or standalone).
    acks_sent: AtomicU64,
    /// Inbound duplicates dropped under at-most-once.
    duplicates_dropped: AtomicU64,
    /// Inbound messages held for in-order delivery.
    messages_held: AtomicU64,
    /// Sequence faults raised while processing inbound traffic.
    sequence_faults: AtomicU64,
}

/// Point-in-time copy of all counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Sequences established.
    pub sequences_created: u64,
    /// Sequences terminated.
    pub sequences_terminated: u64,
    /// Messages stamped.
    pub messages_stamped: u64,
    /// Resends performed.
    pub retransmits_sent: u64,
    /// Acknowledgements processed.
    pub acks_received: u64,
    /// Acknowledgements emitted.
    pub acks_sent: u64,
    /// Duplicates dropped.
    pub duplicates_dropped: u64,
    /// Messages held for ordering.
    pub messages_held: u64,
    /// Sequence faults raised.
    pub sequence_faults: u64,
}

impl ReliabilityMetrics {
    /// Create a collector with all counters at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn increment_sequences_created(&self) {
        self.sequences_created.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn increment_sequences_terminated(&self) {
        self.sequences_terminated.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn increment_messages_stamped(&self) {
        self.messages_stamped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn increment_retransmits_sent(&self, n: u64) {
        self.retransmits_sent.fetch_add(n, Ordering::Relaxed);
    }

    pub(crate) fn increment_acks_received(&self, n: u64) {
        self.acks_received.fetch_add(n, Ordering::Relaxed);
    }

    pub(crate) fn increment_acks_sent(&self, n: u64) {
        self.acks_sent.fetch_add(n, Ordering::Relaxed);
    }

    pub(crate) fn increment_duplicates_dropped(&self) {
        self.duplicates_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn increment_messages_held(&self) {
        self.messages_held.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn increment_sequence_faults(&self) {
        self.sequence_faults.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy all counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            sequences_created: self.sequences_created.load(Ordering::Relaxed),
            sequences_terminated: self.sequences_terminated.load(Ordering::Relaxed),
            messages_stamped: self.messages_stamped.load(Ordering::Relaxed),
            retransmits_sent: self.retransmits_sent.load(Ordering::Relaxed),
            acks_received: self.acks_received.load(Ordering::Relaxed),
            acks_sent: self.acks_sent.load(Ordering::Relaxed),
            duplicates_dropped: self.duplicates_dropped.load(Ordering::Relaxed),
            messages_held: self.messages_held.load(Ordering::Relaxed),
            sequence_faults: self.sequence_faults.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let metrics = ReliabilityMetrics::new();
        metrics.increment_sequences_created();
        metrics.increment_messages_stamped();
        metrics.increment_messages_stamped();
        metrics.increment_retransmits_sent(3);

        let snap = metrics.snapshot();
        assert_eq!(snap.sequences_created, 1);
        assert_eq!(snap.messages_stamped, 2);
        assert_eq!(snap.retransmits_sent, 3);
        assert_eq!(snap.sequence_faults, 0);
    }

    #[test]
    fn test_concurrent_updates() {
        use std::sync::Arc;
        use std::thread;

        let metrics = Arc::new(ReliabilityMetrics::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let metrics = Arc::clone(&metrics);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        metrics.increment_acks_received(1);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("thread");
        }
        assert_eq!(metrics.snapshot().acks_received, 4000);
    }
}
