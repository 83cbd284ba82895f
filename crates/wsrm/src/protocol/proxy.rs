// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Client-side protocol actions.
//!
//! Issues the out-of-band exchanges of the protocol: CreateSequence
//! (blocking request/response), TerminateSequence (one-way), and
//! standalone sequence-info messages (acknowledgement requests,
//! last-message stamps). Registries are passed in explicitly; the proxy
//! itself holds only the transport.

use std::sync::Arc;

use crate::addressing::EndpointReference;
use crate::endpoint::{RmDestination, RmSource};
use crate::error::{Error, Result};
use crate::metrics::ReliabilityMetrics;
use crate::protocol::messages::{
    CreateSequence, Offer, ProtocolMessage, SequenceHeader, SequenceInfo, TerminateSequence,
};
use crate::retransmission::RetransmissionQueue;
use crate::sequence::{DestinationSequence, SequenceIdentifier, SourceSequence};
use crate::transport::Transport;

/// Client-side issuer of protocol exchanges.
pub struct RmProxy<T: Transport> {
    transport: Arc<T>,
    metrics: Arc<ReliabilityMetrics>,
}

impl<T: Transport> RmProxy<T> {
    /// Create a proxy over the given transport.
    pub fn new(transport: Arc<T>, metrics: Arc<ReliabilityMetrics>) -> Self {
        Self { transport, metrics }
    }

    /// Establish a new source sequence with the peer at `to`.
    ///
    /// Builds the CreateSequence from the source policy (acksTo or the
    /// anonymous fallback, requested expiry, optional inverse-sequence
    /// offer), performs the blocking request/response exchange, registers
    /// the resulting sequence and sets it current. When an offer went out
    /// and the peer accepted it (accept address != none), the matching
    /// destination sequence is registered too — duplex establishment in a
    /// single round-trip.
    ///
    /// # Errors
    ///
    /// Transport failures and protocol violations propagate; the caller's
    /// send attempt aborts. Sequence creation is not retried here.
    pub fn create_sequence(
        &self,
        source: &RmSource,
        destination: &RmDestination,
        to: &EndpointReference,
    ) -> Result<Arc<SourceSequence>> {
        let policy = source.source_policy();

        let offer = policy.include_offer.then(|| Offer {
            identifier: source.offer(),
            expires: policy.offered_sequence_expiration,
        });
        let offered_id = offer.as_ref().map(|o| o.identifier.clone());

        let request = CreateSequence {
            acks_to: policy.effective_acks_to(),
            expires: policy.sequence_expiration,
            offer: offer.clone(),
        };

        log::debug!("requesting sequence creation from {}", to);
        let response = self
            .transport
            .request(to, ProtocolMessage::CreateSequence(request))?;
        let csr = match response {
            ProtocolMessage::CreateSequenceResponse(csr) => csr,
            ProtocolMessage::Fault(fault) => {
                return Err(Error::CreateSequenceFailed(format!(
                    "{}: {}",
                    fault.code.as_str(),
                    fault.detail
                )));
            }
            other => {
                return Err(Error::CreateSequenceFailed(format!(
                    "unexpected response kind: {:?}",
                    other.action()
                )));
            }
        };

        let sequence = Arc::new(SourceSequence::new(
            csr.identifier.clone(),
            csr.expires,
            source.termination_policy(),
            offered_id,
        ));
        source.add_sequence(Arc::clone(&sequence));
        source.set_current(&sequence);
        self.metrics.increment_sequences_created();
        log::debug!("established sequence {}", sequence.identifier());

        if let Some(offer) = offer {
            let accept = csr.accept.as_ref().ok_or_else(|| {
                Error::CreateSequenceFailed("offer sent but response carried no accept".into())
            })?;
            if accept.is_accepted() {
                let inverse = Arc::new(DestinationSequence::new(
                    offer.identifier,
                    accept.acks_to.clone(),
                    offer.expires,
                    destination.delivery_assurance(),
                ));
                log::debug!(
                    "offer accepted, registered inverse sequence {}",
                    inverse.identifier()
                );
                destination.add_sequence(inverse);
                self.metrics.increment_sequences_created();
            }
        }

        Ok(sequence)
    }

    /// Terminate a source sequence with a one-way notification.
    ///
    /// Refuses while unacknowledged messages are in flight unless `force`
    /// is set; forcing abandons the backlog (purged from the queue).
    ///
    /// # Errors
    ///
    /// [`Error::UnknownSequence`] for an unregistered identifier,
    /// [`Error::OutstandingMessages`] when backlog remains and `force` is
    /// false, and transport failures from the send.
    pub fn terminate_sequence(
        &self,
        source: &RmSource,
        queue: &RetransmissionQueue,
        id: &SequenceIdentifier,
        to: &EndpointReference,
        force: bool,
    ) -> Result<()> {
        if source.get_sequence(id).is_none() {
            return Err(Error::UnknownSequence(id.clone()));
        }

        let outstanding = queue.count_unacknowledged(id);
        if outstanding > 0 && !force {
            return Err(Error::OutstandingMessages {
                identifier: id.clone(),
                count: outstanding,
            });
        }

        self.transport.send(
            to,
            ProtocolMessage::TerminateSequence(TerminateSequence {
                identifier: id.clone(),
            }),
        )?;

        if outstanding > 0 {
            log::warn!(
                "sequence {} terminated with {} unacknowledged message(s) abandoned",
                id,
                outstanding
            );
        }
        queue.purge(id);
        source.remove_sequence(id);
        self.metrics.increment_sequences_terminated();
        Ok(())
    }

    /// Request an immediate acknowledgement for the given sequences.
    pub fn request_acknowledgement(
        &self,
        sequences: &[Arc<SourceSequence>],
        to: &EndpointReference,
    ) -> Result<()> {
        let info =
            SequenceInfo::requesting(sequences.iter().map(|seq| seq.identifier().clone()));
        self.transport
            .send(to, ProtocolMessage::SequenceInfo(info))
    }

    /// Close a sequence with a payload-less last-message stamp.
    ///
    /// Assigns the sequence's next message number, marks it last, and
    /// sends the stamp as a standalone sequence-info message. The stamped
    /// number enters the retransmission queue like any other message.
    pub fn last_message(
        &self,
        queue: &RetransmissionQueue,
        sequence: &SourceSequence,
        to: &EndpointReference,
    ) -> Result<()> {
        let in_flight = queue.count_unacknowledged(sequence.identifier());
        let next = sequence.next_and_last_message_number(in_flight)?;
        let header = SequenceHeader {
            identifier: sequence.identifier().clone(),
            message_number: next.number,
            last_message: true,
        };
        let info = SequenceInfo {
            last_message: Some(header.clone()),
            ..SequenceInfo::default()
        };
        // track the stamp for retransmission: an empty payload under the
        // closing header
        let message = crate::protocol::ApplicationMessage {
            header,
            acknowledgements: Vec::new(),
            ack_requests: Vec::new(),
            payload: Vec::new().into(),
        };
        queue.put(&message, to);
        self.transport
            .send(to, ProtocolMessage::SequenceInfo(info))
    }
}
