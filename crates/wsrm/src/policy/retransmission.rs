// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Retransmission timing policy.

use std::time::Duration;

use crate::config;

/// Timing knobs for the retransmission queue and the resend driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetransmissionPolicy {
    /// Deadline for the first resend of an unacknowledged message.
    pub base_interval: Duration,

    /// Double the resend interval after each attempt.
    ///
    /// When false every resend waits `base_interval`.
    pub exponential_backoff: bool,

    /// Cap on the backed-off interval. Resends never stop on their own
    /// (at-least-once); this bounds how sparse they become.
    pub max_interval: Duration,

    /// Batching window for standalone acknowledgements: destination-side
    /// acknowledgements not piggybacked within this window are flushed as
    /// a sequence-info message to the sequence's acksTo endpoint.
    pub ack_interval: Duration,
}

impl Default for RetransmissionPolicy {
    fn default() -> Self {
        Self {
            base_interval: config::DEFAULT_BASE_RETRANSMISSION_INTERVAL,
            exponential_backoff: true,
            max_interval: config::DEFAULT_MAX_RETRANSMISSION_INTERVAL,
            ack_interval: config::DEFAULT_ACKNOWLEDGEMENT_INTERVAL,
        }
    }
}

impl RetransmissionPolicy {
    /// Resend interval after the given number of completed attempts.
    ///
    /// Attempt 0 is the initial send; the first resend waits
    /// `base_interval`, later ones double up to `max_interval` when
    /// backoff is enabled.
    #[must_use]
    pub fn interval_after(&self, attempts: u32) -> Duration {
        if !self.exponential_backoff {
            return self.base_interval;
        }
        // 2^attempts with the shift saturated well below overflow
        let factor = 1u32 << attempts.min(16);
        (self.base_interval * factor).min(self.max_interval)
    }

    /// Tick period for the resend driver: fine enough to honor both the
    /// ack-batching window and the base resend interval.
    #[must_use]
    pub fn driver_tick(&self) -> Duration {
        (self.ack_interval.min(self.base_interval) / 2).max(Duration::from_millis(5))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetransmissionPolicy {
            base_interval: Duration::from_millis(100),
            exponential_backoff: true,
            max_interval: Duration::from_millis(350),
            ack_interval: Duration::from_millis(50),
        };
        assert_eq!(policy.interval_after(0), Duration::from_millis(100));
        assert_eq!(policy.interval_after(1), Duration::from_millis(200));
        assert_eq!(policy.interval_after(2), Duration::from_millis(350));
        assert_eq!(policy.interval_after(30), Duration::from_millis(350));
    }

    #[test]
    fn test_constant_interval_without_backoff() {
        let policy = RetransmissionPolicy {
            exponential_backoff: false,
            ..RetransmissionPolicy::default()
        };
        assert_eq!(policy.interval_after(7), policy.base_interval);
    }

    #[test]
    fn test_driver_tick_bounded() {
        let policy = RetransmissionPolicy::default();
        assert!(policy.driver_tick() >= Duration::from_millis(5));
        assert!(policy.driver_tick() <= policy.ack_interval);
    }
}
