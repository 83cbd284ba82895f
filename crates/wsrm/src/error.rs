// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error taxonomy for the reliability core.
//!
//! Sequence faults (the first section) are protocol-level conditions with a
//! WS-RM fault code: they are turned into a fault message sent back to the
//! peer, not a local crash. Everything else is local: either propagated to
//! the caller (transport failures during a protocol exchange) or a
//! programming/configuration problem.

use crate::sequence::SequenceIdentifier;

/// Errors returned by WSRM operations.
#[derive(Debug)]
pub enum Error {
    // ========================================================================
    // Sequence faults (peer-visible, carry a WS-RM fault code)
    // ========================================================================
    /// A message or acknowledgement referenced a sequence identifier with no
    /// matching sequence at this endpoint.
    UnknownSequence(SequenceIdentifier),
    /// An acknowledgement or message number exceeded the declared final
    /// message number of a closed sequence.
    LastMessageNumberExceeded {
        /// Sequence the violation occurred on.
        identifier: SequenceIdentifier,
        /// Declared final message number.
        last: u64,
        /// Offending message number.
        attempted: u64,
    },
    /// An acknowledgement was structurally invalid (e.g. inverted range,
    /// message number zero).
    InvalidAcknowledgement(String),

    // ========================================================================
    // Local sequence lifecycle errors
    // ========================================================================
    /// No further message numbers may be assigned: the sequence already
    /// carried its last message.
    SequenceTerminated(SequenceIdentifier),
    /// TerminateSequence refused: unacknowledged messages are still in
    /// flight and the caller did not force termination.
    OutstandingMessages {
        /// Sequence with backlog.
        identifier: SequenceIdentifier,
        /// Number of unacknowledged in-flight messages.
        count: usize,
    },
    /// The sequence passed its negotiated expiry.
    SequenceExpired(SequenceIdentifier),

    // ========================================================================
    // Protocol exchange errors
    // ========================================================================
    /// The CreateSequence exchange failed at the protocol level (unexpected
    /// response kind, missing accept for an offer, ...).
    CreateSequenceFailed(String),

    // ========================================================================
    // Transport / configuration
    // ========================================================================
    /// I/O failure in the underlying transport during a protocol exchange.
    Io(std::io::Error),
    /// Invalid configuration or policy value.
    Config(String),
}

/// WS-RM fault codes for peer-visible sequence faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultCode {
    /// `wsrm:UnknownSequence`
    UnknownSequence,
    /// `wsrm:LastMessageNumberExceeded`
    LastMessageNumberExceeded,
    /// `wsrm:InvalidAcknowledgement`
    InvalidAcknowledgement,
}

impl FaultCode {
    /// Qualified fault code string used in fault messages.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FaultCode::UnknownSequence => "wsrm:UnknownSequence",
            FaultCode::LastMessageNumberExceeded => "wsrm:LastMessageNumberExceeded",
            FaultCode::InvalidAcknowledgement => "wsrm:InvalidAcknowledgement",
        }
    }
}

impl Error {
    /// Fault code for peer-visible sequence faults, `None` for local errors.
    ///
    /// Errors with a fault code are converted into a fault message sent back
    /// to the peer; the rest propagate to the local caller.
    #[must_use]
    pub fn fault_code(&self) -> Option<FaultCode> {
        match self {
            Error::UnknownSequence(_) => Some(FaultCode::UnknownSequence),
            Error::LastMessageNumberExceeded { .. } => Some(FaultCode::LastMessageNumberExceeded),
            Error::InvalidAcknowledgement(_) => Some(FaultCode::InvalidAcknowledgement),
            _ => None,
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // Sequence faults
            Error::UnknownSequence(id) => write!(f, "Unknown sequence: {}", id),
            Error::LastMessageNumberExceeded {
                identifier,
                last,
                attempted,
            } => write!(
                f,
                "Last message number exceeded on {}: declared last {}, attempted {}",
                identifier, last, attempted
            ),
            Error::InvalidAcknowledgement(msg) => write!(f, "Invalid acknowledgement: {}", msg),
            // Lifecycle
            Error::SequenceTerminated(id) => {
                write!(f, "Sequence {} already carried its last message", id)
            }
            Error::OutstandingMessages { identifier, count } => write!(
                f,
                "Sequence {} has {} unacknowledged message(s) in flight",
                identifier, count
            ),
            Error::SequenceExpired(id) => write!(f, "Sequence {} is expired", id),
            // Protocol
            Error::CreateSequenceFailed(msg) => write!(f, "CreateSequence failed: {}", msg),
            // Transport / config
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

/// Convenient alias for API results using the public `Error` type.
pub type Result<T> = core::result::Result<T, Error>;
