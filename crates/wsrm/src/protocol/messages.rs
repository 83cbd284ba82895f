// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Reliable-messaging protocol records.
//!
//! Plain data exchanged with the binding layer, which owns the actual
//! SOAP envelope and XML serialization:
//! - CREATE_SEQUENCE / CREATE_SEQUENCE_RESPONSE: sequence establishment,
//!   optionally negotiating the inverse (offered) sequence
//! - TERMINATE_SEQUENCE: one-way sequence teardown
//! - SEQUENCE_INFO: standalone acknowledgements, acknowledgement requests
//!   and last-message stamps
//! - APPLICATION: an opaque payload stamped with a sequence header, plus
//!   piggybacked acknowledgements
//!
//! Inbound traffic is classified exactly once into a [`ProtocolAction`];
//! all downstream dispatch matches on the enum, never on action strings.

use std::sync::Arc;
use std::time::Duration;

use crate::addressing::EndpointReference;
use crate::config;
use crate::error::FaultCode;
use crate::sequence::{AcknowledgementSet, SequenceIdentifier};

// ============================================================================
// SEQUENCE HEADER & ACKNOWLEDGEMENTS
// ============================================================================

/// Sequence header stamped onto every reliable application message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceHeader {
    /// Sequence the message belongs to.
    pub identifier: SequenceIdentifier,
    /// Message number within the sequence (starts at 1).
    pub message_number: u64,
    /// Declares `message_number` as the final number of the sequence.
    pub last_message: bool,
}

/// Acknowledgement ranges for one sequence, piggybacked or standalone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceAcknowledgementMsg {
    /// Sequence the ranges belong to.
    pub identifier: SequenceIdentifier,
    /// Message numbers confirmed received.
    pub ranges: AcknowledgementSet,
}

/// Request for an immediate acknowledgement of one sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AckRequested {
    /// Sequence to acknowledge.
    pub identifier: SequenceIdentifier,
}

// ============================================================================
// CREATE SEQUENCE
// ============================================================================

/// Inline proposal to establish the reverse-direction sequence alongside
/// the requested one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Offer {
    /// Identifier the offering side minted for the inverse sequence.
    pub identifier: SequenceIdentifier,
    /// Proposed lifetime of the inverse sequence.
    pub expires: Option<Duration>,
}

/// CreateSequence request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateSequence {
    /// Where acknowledgements for the new sequence must be sent.
    pub acks_to: EndpointReference,
    /// Requested sequence lifetime (zero/absent = destination default).
    pub expires: Option<Duration>,
    /// Optional inverse-sequence offer.
    pub offer: Option<Offer>,
}

/// Acceptance of an offered inverse sequence.
///
/// Always carries an address when present: the destination's own acksTo
/// when accepting, the none address when declining.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accept {
    /// Where acknowledgements for the offered sequence must be sent.
    pub acks_to: EndpointReference,
}

impl Accept {
    /// Whether the offer was actually accepted (not the none address).
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        !self.acks_to.is_none_address()
    }
}

/// CreateSequenceResponse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateSequenceResponse {
    /// Identifier minted by the destination for the new sequence.
    pub identifier: SequenceIdentifier,
    /// Granted lifetime (min of requested and destination policy).
    pub expires: Option<Duration>,
    /// Present iff the request carried an offer.
    pub accept: Option<Accept>,
}

// ============================================================================
// TERMINATE SEQUENCE & SEQUENCE INFO
// ============================================================================

/// One-way sequence teardown notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminateSequence {
    /// Sequence being terminated.
    pub identifier: SequenceIdentifier,
}

/// Standalone out-of-band sequence information.
///
/// Carries any combination of acknowledgements, acknowledgement requests
/// and a payload-less last-message stamp.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SequenceInfo {
    /// Acknowledgement ranges per sequence.
    pub acknowledgements: Vec<SequenceAcknowledgementMsg>,
    /// Sequences whose acknowledgement is requested.
    pub ack_requests: Vec<AckRequested>,
    /// Header closing a sequence without an application payload.
    pub last_message: Option<SequenceHeader>,
}

impl SequenceInfo {
    /// Info message requesting acknowledgement of the given sequences.
    #[must_use]
    pub fn requesting(identifiers: impl IntoIterator<Item = SequenceIdentifier>) -> Self {
        Self {
            ack_requests: identifiers
                .into_iter()
                .map(|identifier| AckRequested { identifier })
                .collect(),
            ..Self::default()
        }
    }

    /// Info message carrying the given acknowledgements.
    #[must_use]
    pub fn acknowledging(acknowledgements: Vec<SequenceAcknowledgementMsg>) -> Self {
        Self {
            acknowledgements,
            ..Self::default()
        }
    }
}

// ============================================================================
// APPLICATION MESSAGE & FAULT
// ============================================================================

/// A reliable application message as seen by this core: a sequence header,
/// piggybacked sequence information, and the opaque payload owned by the
/// binding layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationMessage {
    /// Sequence stamp.
    pub header: SequenceHeader,
    /// Piggybacked acknowledgements for inbound sequences.
    pub acknowledgements: Vec<SequenceAcknowledgementMsg>,
    /// Piggybacked acknowledgement requests.
    pub ack_requests: Vec<AckRequested>,
    /// Opaque serialized payload (resent verbatim on retransmission).
    pub payload: Arc<[u8]>,
}

/// Peer-visible sequence fault message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceFaultMsg {
    /// WS-RM fault code.
    pub code: FaultCode,
    /// Human-readable detail.
    pub detail: String,
}

// ============================================================================
// PROTOCOL MESSAGE & ACTION CLASSIFICATION
// ============================================================================

/// Any message crossing the reliability boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolMessage {
    /// Sequence establishment request.
    CreateSequence(CreateSequence),
    /// Sequence establishment response.
    CreateSequenceResponse(CreateSequenceResponse),
    /// Sequence teardown notification.
    TerminateSequence(TerminateSequence),
    /// Standalone sequence information.
    SequenceInfo(SequenceInfo),
    /// Reliable application message.
    Application(ApplicationMessage),
    /// Sequence fault response.
    Fault(SequenceFaultMsg),
}

impl ProtocolMessage {
    /// The action kind of this message.
    #[must_use]
    pub fn action(&self) -> ProtocolAction {
        match self {
            ProtocolMessage::CreateSequence(_) => ProtocolAction::CreateSequence,
            ProtocolMessage::CreateSequenceResponse(_) => ProtocolAction::CreateSequenceResponse,
            ProtocolMessage::TerminateSequence(_) => ProtocolAction::TerminateSequence,
            ProtocolMessage::SequenceInfo(_) | ProtocolMessage::Fault(_) => {
                ProtocolAction::SequenceInfo
            }
            ProtocolMessage::Application(_) => ProtocolAction::Application,
        }
    }

    /// WS-Addressing action URI the binding layer stamps on the envelope.
    #[must_use]
    pub fn action_uri(&self) -> &'static str {
        self.action().uri()
    }
}

/// Closed set of protocol action kinds, decided once at classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolAction {
    /// CreateSequence request.
    CreateSequence,
    /// CreateSequenceResponse.
    CreateSequenceResponse,
    /// TerminateSequence notification.
    TerminateSequence,
    /// Standalone sequence information (acks, ack requests, faults).
    SequenceInfo,
    /// Anything else: a reliable application message.
    Application,
}

impl ProtocolAction {
    /// Classify a WS-Addressing action URI.
    ///
    /// Every URI outside the RM action set is an application message.
    #[must_use]
    pub fn classify(action_uri: &str) -> Self {
        match action_uri {
            config::CREATE_SEQUENCE_ACTION => ProtocolAction::CreateSequence,
            config::CREATE_SEQUENCE_RESPONSE_ACTION => ProtocolAction::CreateSequenceResponse,
            config::TERMINATE_SEQUENCE_ACTION => ProtocolAction::TerminateSequence,
            config::SEQUENCE_INFO_ACTION
            | config::SEQUENCE_ACKNOWLEDGEMENT_ACTION
            | config::LAST_MESSAGE_ACTION => ProtocolAction::SequenceInfo,
            _ => ProtocolAction::Application,
        }
    }

    /// Whether this is an RM protocol action (not an application message).
    #[must_use]
    pub fn is_protocol(&self) -> bool {
        !matches!(self, ProtocolAction::Application)
    }

    /// Canonical action URI of this kind.
    #[must_use]
    pub fn uri(&self) -> &'static str {
        match self {
            ProtocolAction::CreateSequence => config::CREATE_SEQUENCE_ACTION,
            ProtocolAction::CreateSequenceResponse => config::CREATE_SEQUENCE_RESPONSE_ACTION,
            ProtocolAction::TerminateSequence => config::TERMINATE_SEQUENCE_ACTION,
            ProtocolAction::SequenceInfo => config::SEQUENCE_INFO_ACTION,
            ProtocolAction::Application => "",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_protocol_actions() {
        assert_eq!(
            ProtocolAction::classify(config::CREATE_SEQUENCE_ACTION),
            ProtocolAction::CreateSequence
        );
        assert_eq!(
            ProtocolAction::classify(config::CREATE_SEQUENCE_RESPONSE_ACTION),
            ProtocolAction::CreateSequenceResponse
        );
        assert_eq!(
            ProtocolAction::classify(config::TERMINATE_SEQUENCE_ACTION),
            ProtocolAction::TerminateSequence
        );
        assert_eq!(
            ProtocolAction::classify(config::LAST_MESSAGE_ACTION),
            ProtocolAction::SequenceInfo
        );
    }

    #[test]
    fn test_classify_everything_else_is_application() {
        let action = ProtocolAction::classify("http://example.com/greeter/sayHi");
        assert_eq!(action, ProtocolAction::Application);
        assert!(!action.is_protocol());
    }

    #[test]
    fn test_accept_none_address_declines() {
        assert!(!Accept {
            acks_to: EndpointReference::none(),
        }
        .is_accepted());
        assert!(Accept {
            acks_to: EndpointReference::new("http://example.com/acks"),
        }
        .is_accepted());
    }

    #[test]
    fn test_sequence_info_constructors() {
        let id = SequenceIdentifier::new("urn:uuid:x");
        let info = SequenceInfo::requesting([id.clone()]);
        assert_eq!(info.ack_requests.len(), 1);
        assert!(info.acknowledgements.is_empty());

        let info = SequenceInfo::acknowledging(vec![SequenceAcknowledgementMsg {
            identifier: id,
            ranges: AcknowledgementSet::new(),
        }]);
        assert_eq!(info.acknowledgements.len(), 1);
        assert!(info.ack_requests.is_empty());
    }
}
