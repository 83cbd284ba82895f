// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! WSRM Global Configuration - Single Source of Truth
//!
//! This module centralizes ALL WS-ReliableMessaging protocol constants.
//! **NEVER hardcode elsewhere!**
//!
//! # Layout
//!
//! - Protocol namespace and per-operation WS-Addressing action URIs
//! - WS-Addressing well-known endpoint URIs (anonymous / none)
//! - Sequence identifier URN prefix
//! - Default timing intervals (retransmission, acknowledgement batching)

use std::time::Duration;

// =======================================================================
// WS-ReliableMessaging (Feb 2005 submission) namespace and actions
// =======================================================================

/// WS-RM protocol namespace.
///
/// All action URIs below are derived from this value.
/// **NEVER hardcode the namespace elsewhere!**
pub const WSRM_NAMESPACE: &str = "http://schemas.xmlsoap.org/ws/2005/02/rm";

/// Action URI of a CreateSequence request.
pub const CREATE_SEQUENCE_ACTION: &str = "http://schemas.xmlsoap.org/ws/2005/02/rm/CreateSequence";

/// Action URI of a CreateSequenceResponse.
pub const CREATE_SEQUENCE_RESPONSE_ACTION: &str =
    "http://schemas.xmlsoap.org/ws/2005/02/rm/CreateSequenceResponse";

/// Action URI of a TerminateSequence notification.
pub const TERMINATE_SEQUENCE_ACTION: &str =
    "http://schemas.xmlsoap.org/ws/2005/02/rm/TerminateSequence";

/// Action URI of a standalone sequence-info message (out-of-band
/// acknowledgements, acknowledgement requests, last-message stamps).
pub const SEQUENCE_INFO_ACTION: &str = "http://schemas.xmlsoap.org/ws/2005/02/rm/SequenceInfo";

/// Action URI of a standalone SequenceAcknowledgement.
pub const SEQUENCE_ACKNOWLEDGEMENT_ACTION: &str =
    "http://schemas.xmlsoap.org/ws/2005/02/rm/SequenceAcknowledgement";

/// Action URI of a last-message stamp sent without an application payload.
pub const LAST_MESSAGE_ACTION: &str = "http://schemas.xmlsoap.org/ws/2005/02/rm/LastMessage";

// =======================================================================
// WS-Addressing (Aug 2004 submission) well-known endpoint URIs
// =======================================================================

/// Anonymous endpoint URI: "reply over the connection the request came in on".
///
/// Used as the default `acksTo` when the source policy does not name an
/// explicit acknowledgement endpoint.
pub const WSA_ANONYMOUS_URI: &str =
    "http://schemas.xmlsoap.org/ws/2004/08/addressing/role/anonymous";

/// None endpoint URI: "send nothing, nowhere".
///
/// An `accept` carrying this address declines an offered inverse sequence.
pub const WSA_NONE_URI: &str = "http://schemas.xmlsoap.org/ws/2004/08/addressing/role/none";

// =======================================================================
// Sequence identifiers
// =======================================================================

/// URN prefix for generated sequence identifiers (`urn:uuid:<v4>`).
pub const SEQUENCE_IDENTIFIER_PREFIX: &str = "urn:uuid:";

// =======================================================================
// Default timing intervals
// =======================================================================

/// Default base retransmission interval (WS-RM policy default: 3 s).
///
/// First resend deadline for an unacknowledged message; subsequent
/// deadlines back off exponentially when enabled by policy.
pub const DEFAULT_BASE_RETRANSMISSION_INTERVAL: Duration = Duration::from_millis(3000);

/// Default cap on the backed-off retransmission interval.
pub const DEFAULT_MAX_RETRANSMISSION_INTERVAL: Duration = Duration::from_secs(60);

/// Default acknowledgement batching interval (WS-RM policy default: 200 ms).
///
/// Pending destination-side acknowledgements not piggybacked onto an
/// outbound application message within this window are flushed as a
/// standalone sequence-info message.
pub const DEFAULT_ACKNOWLEDGEMENT_INTERVAL: Duration = Duration::from_millis(200);
