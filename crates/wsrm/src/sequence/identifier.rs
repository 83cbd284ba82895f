// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Sequence identifiers.
//!
//! An identifier is an opaque string token, `urn:uuid:...` by convention,
//! compared by value and used as the map key everywhere in the core.

use std::fmt;
use std::sync::Arc;

use crate::config;

/// Unique identifier of a sequence.
///
/// Cheap to clone (`Arc<str>` inside); equality and hashing are by string
/// value, so identifiers echoed back by a peer compare equal to the locally
/// minted ones.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SequenceIdentifier(Arc<str>);

impl SequenceIdentifier {
    /// Wrap an existing identifier value (e.g. one echoed by a peer).
    pub fn new(value: impl Into<Arc<str>>) -> Self {
        Self(value.into())
    }

    /// Mint a fresh identifier: `urn:uuid:` + UUID v4.
    ///
    /// Collision-free in practice; two endpoints can mint independently.
    #[must_use]
    pub fn generate() -> Self {
        Self::new(format!(
            "{}{}",
            config::SEQUENCE_IDENTIFIER_PREFIX,
            uuid::Uuid::new_v4()
        ))
    }

    /// Identifier value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SequenceIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SequenceIdentifier {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}
