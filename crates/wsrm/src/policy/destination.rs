// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Destination-side sequence policy.

use std::time::Duration;

/// Policy applied by a reliable destination when servicing CreateSequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DestinationPolicy {
    /// Longest sequence lifetime this destination supports.
    ///
    /// `None` supports unlimited lifetimes. The granted expiry is the
    /// minimum of this value and the requested one; a requested zero or
    /// absent duration means "use the policy value".
    pub sequence_expiration: Option<Duration>,

    /// Accept offers for inverse sequences embedded in CreateSequence.
    ///
    /// When false, offers are explicitly declined by accepting with the
    /// none address.
    pub accept_offers: bool,
}

impl Default for DestinationPolicy {
    /// Unlimited lifetime, offers accepted.
    fn default() -> Self {
        Self {
            sequence_expiration: None,
            accept_offers: true,
        }
    }
}

impl DestinationPolicy {
    /// Negotiate the expiry granted to a new sequence.
    ///
    /// Minimum of the supported and requested durations; a requested
    /// zero/absent duration selects the policy value.
    #[must_use]
    pub fn negotiate_expiration(&self, requested: Option<Duration>) -> Option<Duration> {
        match (self.sequence_expiration, requested) {
            (None, r) => r.filter(|d| !d.is_zero()),
            (Some(p), None) => Some(p),
            (Some(p), Some(r)) if r.is_zero() => Some(p),
            (Some(p), Some(r)) => Some(p.min(r)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negotiate_picks_minimum() {
        let policy = DestinationPolicy {
            sequence_expiration: Some(Duration::from_secs(60)),
            ..DestinationPolicy::default()
        };
        assert_eq!(
            policy.negotiate_expiration(Some(Duration::from_secs(600))),
            Some(Duration::from_secs(60))
        );
        assert_eq!(
            policy.negotiate_expiration(Some(Duration::from_secs(30))),
            Some(Duration::from_secs(30))
        );
    }

    #[test]
    fn test_negotiate_zero_means_policy_default() {
        let policy = DestinationPolicy {
            sequence_expiration: Some(Duration::from_secs(60)),
            ..DestinationPolicy::default()
        };
        assert_eq!(
            policy.negotiate_expiration(Some(Duration::ZERO)),
            Some(Duration::from_secs(60))
        );
        assert_eq!(
            policy.negotiate_expiration(None),
            Some(Duration::from_secs(60))
        );
    }

    #[test]
    fn test_negotiate_unlimited_policy_grants_request() {
        let policy = DestinationPolicy::default();
        assert_eq!(
            policy.negotiate_expiration(Some(Duration::from_secs(30))),
            Some(Duration::from_secs(30))
        );
        assert_eq!(policy.negotiate_expiration(None), None);
        assert_eq!(policy.negotiate_expiration(Some(Duration::ZERO)), None);
    }
}
