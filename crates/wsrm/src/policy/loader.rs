// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! YAML policy-file loading (feature `policy-loaders`).
//!
//! The file model is deliberately separate from the runtime policy types:
//! durations are plain millisecond integers in the file and converted on
//! load, and every section is optional (absent = defaults).
//!
//! ```yaml
//! source:
//!   acks_to: "http://localhost:9000/acks"
//!   sequence_expiration_ms: 600000
//!   include_offer: true
//! destination:
//!   accept_offers: true
//! termination:
//!   max_length: 1000
//! delivery:
//!   at_most_once: true
//!   in_order: true
//! retransmission:
//!   base_interval_ms: 3000
//!   exponential_backoff: true
//! ```

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::addressing::EndpointReference;
use crate::error::{Error, Result};
use crate::policy::{
    DeliveryAssurance, DestinationPolicy, RetransmissionPolicy, SequenceTerminationPolicy,
    SourcePolicy,
};

#[derive(Debug, Default, Deserialize)]
struct SourceSection {
    acks_to: Option<String>,
    sequence_expiration_ms: Option<u64>,
    #[serde(default)]
    include_offer: bool,
    offered_sequence_expiration_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct DestinationSection {
    sequence_expiration_ms: Option<u64>,
    #[serde(default = "default_true")]
    accept_offers: bool,
}

#[derive(Debug, Default, Deserialize)]
struct TerminationSection {
    #[serde(default)]
    max_length: u64,
    #[serde(default)]
    max_ranges: usize,
    #[serde(default)]
    max_unacknowledged: usize,
}

#[derive(Debug, Deserialize)]
struct DeliverySection {
    #[serde(default)]
    at_most_once: bool,
    #[serde(default = "default_true")]
    at_least_once: bool,
    #[serde(default)]
    in_order: bool,
}

#[derive(Debug, Deserialize)]
struct RetransmissionSection {
    base_interval_ms: Option<u64>,
    #[serde(default = "default_true")]
    exponential_backoff: bool,
    max_interval_ms: Option<u64>,
    ack_interval_ms: Option<u64>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Default, Deserialize)]
struct FileModel {
    source: Option<SourceSection>,
    destination: Option<DestinationSection>,
    termination: Option<TerminationSection>,
    delivery: Option<DeliverySection>,
    retransmission: Option<RetransmissionSection>,
}

/// All reliability policies of one endpoint, as loaded from a file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolicyFile {
    /// Source-side policy.
    pub source: SourcePolicy,
    /// Destination-side policy.
    pub destination: DestinationPolicy,
    /// Sequence termination thresholds.
    pub termination: SequenceTerminationPolicy,
    /// Delivery assurance.
    pub delivery: DeliveryAssurance,
    /// Retransmission timing.
    pub retransmission: RetransmissionPolicy,
}

/// Load endpoint policies from a YAML file. Absent sections use defaults.
pub fn load_policy_file(path: impl AsRef<Path>) -> Result<PolicyFile> {
    let text = std::fs::read_to_string(path.as_ref())?;
    parse_policy_file(&text)
}

fn parse_policy_file(text: &str) -> Result<PolicyFile> {
    let model: FileModel =
        serde_yaml::from_str(text).map_err(|e| Error::Config(format!("policy file: {}", e)))?;

    let mut policies = PolicyFile::default();

    if let Some(s) = model.source {
        policies.source = SourcePolicy {
            acks_to: s.acks_to.map(EndpointReference::new),
            sequence_expiration: s.sequence_expiration_ms.map(Duration::from_millis),
            include_offer: s.include_offer,
            offered_sequence_expiration: s
                .offered_sequence_expiration_ms
                .map(Duration::from_millis),
        };
    }
    if let Some(d) = model.destination {
        policies.destination = DestinationPolicy {
            sequence_expiration: d.sequence_expiration_ms.map(Duration::from_millis),
            accept_offers: d.accept_offers,
        };
    }
    if let Some(t) = model.termination {
        policies.termination = SequenceTerminationPolicy {
            max_length: t.max_length,
            max_ranges: t.max_ranges,
            max_unacknowledged: t.max_unacknowledged,
        };
    }
    if let Some(d) = model.delivery {
        policies.delivery = DeliveryAssurance {
            at_most_once: d.at_most_once,
            at_least_once: d.at_least_once,
            in_order: d.in_order,
        };
    }
    if let Some(r) = model.retransmission {
        let defaults = RetransmissionPolicy::default();
        policies.retransmission = RetransmissionPolicy {
            base_interval: r
                .base_interval_ms
                .map_or(defaults.base_interval, Duration::from_millis),
            exponential_backoff: r.exponential_backoff,
            max_interval: r
                .max_interval_ms
                .map_or(defaults.max_interval, Duration::from_millis),
            ack_interval: r
                .ack_interval_ms
                .map_or(defaults.ack_interval, Duration::from_millis),
        };
    }

    Ok(policies)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn test_empty_file_yields_defaults() {
        let policies = parse_policy_file("{}").expect("empty mapping should parse");
        assert_eq!(policies, PolicyFile::default());
    }

    #[test]
    fn test_full_file() {
        let text = "
source:
  acks_to: \"http://localhost:9000/acks\"
  sequence_expiration_ms: 600000
  include_offer: true
destination:
  sequence_expiration_ms: 300000
  accept_offers: false
termination:
  max_length: 1000
delivery:
  at_most_once: true
  in_order: true
retransmission:
  base_interval_ms: 500
  exponential_backoff: false
";
        let policies = parse_policy_file(text).expect("policy file should parse");
        assert_eq!(
            policies.source.acks_to,
            Some(EndpointReference::new("http://localhost:9000/acks"))
        );
        assert!(policies.source.include_offer);
        assert_eq!(
            policies.destination.sequence_expiration,
            Some(Duration::from_secs(300))
        );
        assert!(!policies.destination.accept_offers);
        assert_eq!(policies.termination.max_length, 1000);
        assert!(policies.delivery.at_most_once);
        assert!(policies.delivery.in_order);
        assert!(policies.delivery.at_least_once);
        assert_eq!(
            policies.retransmission.base_interval,
            Duration::from_millis(500)
        );
        assert!(!policies.retransmission.exponential_backoff);
    }

    #[test]
    fn test_invalid_yaml_is_config_error() {
        let err = parse_policy_file(": not yaml :").expect_err("garbage should not parse");
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_load_from_disk() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "termination:\n  max_length: 42").expect("write");
        let policies = load_policy_file(file.path()).expect("load should succeed");
        assert_eq!(policies.termination.max_length, 42);
    }
}
