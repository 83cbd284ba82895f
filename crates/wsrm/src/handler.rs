// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Message-pipeline integration.
//!
//! [`RmHandler`] wires the reliability core into the surrounding stack's
//! message pipeline. The binding layer calls
//! [`handle_outbound`](RmHandler::handle_outbound) for every outbound
//! application payload and [`handle_inbound`](RmHandler::handle_inbound)
//! for every inbound protocol record, and acts on the returned
//! [`Disposition`].
//!
//! ## Outbound
//!
//! ```text
//! payload -> current sequence (minted on demand, single-flight)
//!         -> next message number, sequence header stamp
//!         -> retransmission queue (in-flight tracking)
//!         -> piggyback pending acknowledgements
//!         -> stamped message back to the binding layer, which sends it
//! ```
//!
//! ## Inbound
//!
//! | Message | Handling |
//! |---------|----------|
//! | CreateSequence | servant negotiation, `Respond(CreateSequenceResponse)` |
//! | CreateSequenceResponse | none (consumed at the proxy's blocking call site) |
//! | TerminateSequence | servant teardown |
//! | SequenceInfo | process acks / answer ack requests / last-message stamp |
//! | Application | process piggybacked acks, acknowledge, delivery verdict |
//!
//! The handler holds no per-call state; the registries are the shared
//! state and carry their own synchronization, so one handler instance
//! serves concurrently handled messages.

use std::sync::Arc;

use crate::addressing::EndpointReference;
use crate::endpoint::{RmDestination, RmSource};
use crate::error::{Error, Result};
use crate::metrics::ReliabilityMetrics;
use crate::policy::{
    DeliveryAssurance, DestinationPolicy, RetransmissionPolicy, SequenceTerminationPolicy,
    SourcePolicy,
};
use crate::protocol::{
    ApplicationMessage, ProtocolMessage, RmProxy, RmServant, SequenceAcknowledgementMsg,
    SequenceFaultMsg, SequenceHeader, SequenceInfo,
};
use crate::retransmission::{RetransmissionDriver, RetransmissionQueue};
use crate::sequence::Delivery;
use crate::transport::Transport;

/// What the binding layer must do with an inbound message.
#[derive(Debug)]
pub enum Disposition {
    /// Deliver the application payload now.
    Deliver,
    /// Duplicate under at-most-once: drop the payload.
    Duplicate,
    /// In-order delivery with predecessors missing: park the payload and
    /// replay when the sequence's deliverable watermark reaches it.
    Held,
    /// Send this response back to the peer.
    Respond(ProtocolMessage),
    /// Send this sequence fault back to the peer.
    Fault(SequenceFaultMsg),
    /// Nothing further; the message was consumed.
    None,
}

/// Configures and builds an [`RmHandler`].
pub struct RmHandlerBuilder<T: Transport> {
    transport: Arc<T>,
    peer: EndpointReference,
    reply_to: EndpointReference,
    source_policy: SourcePolicy,
    destination_policy: DestinationPolicy,
    termination: SequenceTerminationPolicy,
    assurance: DeliveryAssurance,
    retransmission: RetransmissionPolicy,
    spawn_driver: bool,
}

impl<T: Transport + 'static> RmHandlerBuilder<T> {
    /// Source-side policy for sequence establishment.
    #[must_use]
    pub fn source_policy(mut self, policy: SourcePolicy) -> Self {
        self.source_policy = policy;
        self
    }

    /// Destination-side policy for CreateSequence negotiation.
    #[must_use]
    pub fn destination_policy(mut self, policy: DestinationPolicy) -> Self {
        self.destination_policy = policy;
        self
    }

    /// Termination thresholds injected into new source sequences.
    #[must_use]
    pub fn termination_policy(mut self, policy: SequenceTerminationPolicy) -> Self {
        self.termination = policy;
        self
    }

    /// Delivery assurance applied by destination sequences.
    #[must_use]
    pub fn delivery_assurance(mut self, assurance: DeliveryAssurance) -> Self {
        self.assurance = assurance;
        self
    }

    /// Retransmission timing.
    #[must_use]
    pub fn retransmission_policy(mut self, policy: RetransmissionPolicy) -> Self {
        self.retransmission = policy;
        self
    }

    /// This endpoint's own address, used as the accept address when
    /// servicing offers. Defaults to the anonymous address.
    #[must_use]
    pub fn reply_to(mut self, reply_to: EndpointReference) -> Self {
        self.reply_to = reply_to;
        self
    }

    /// Do not spawn the background resend driver. The embedder must then
    /// drive [`RetransmissionQueue::due`] itself.
    #[must_use]
    pub fn without_driver(mut self) -> Self {
        self.spawn_driver = false;
        self
    }

    /// Build the handler (and its resend driver unless disabled).
    pub fn build(self) -> Result<RmHandler<T>> {
        let metrics = Arc::new(ReliabilityMetrics::new());
        let source = Arc::new(RmSource::new(self.source_policy, self.termination));
        let destination = Arc::new(RmDestination::new(self.destination_policy, self.assurance));
        let queue = Arc::new(RetransmissionQueue::new(self.retransmission));
        let proxy = RmProxy::new(Arc::clone(&self.transport), Arc::clone(&metrics));

        let driver = if self.spawn_driver {
            Some(RetransmissionDriver::spawn(
                Arc::clone(&queue),
                Arc::clone(&destination),
                Arc::clone(&self.transport),
                Arc::clone(&metrics),
            )?)
        } else {
            None
        };

        Ok(RmHandler {
            source,
            destination,
            queue,
            proxy,
            servant: RmServant::new(),
            peer: self.peer,
            reply_to: self.reply_to,
            metrics,
            driver,
        })
    }
}

/// Reliability interceptor for one endpoint pair.
pub struct RmHandler<T: Transport> {
    source: Arc<RmSource>,
    destination: Arc<RmDestination>,
    queue: Arc<RetransmissionQueue>,
    proxy: RmProxy<T>,
    servant: RmServant,
    /// Default destination of outbound traffic (and CreateSequence).
    peer: EndpointReference,
    /// Own address, offered as the accept address for inbound offers.
    reply_to: EndpointReference,
    metrics: Arc<ReliabilityMetrics>,
    driver: Option<RetransmissionDriver>,
}

impl<T: Transport + 'static> RmHandler<T> {
    /// Start configuring a handler for traffic towards `peer`.
    #[must_use]
    pub fn builder(transport: Arc<T>, peer: EndpointReference) -> RmHandlerBuilder<T> {
        RmHandlerBuilder {
            transport,
            peer,
            reply_to: EndpointReference::anonymous(),
            source_policy: SourcePolicy::default(),
            destination_policy: DestinationPolicy::default(),
            termination: SequenceTerminationPolicy::default(),
            assurance: DeliveryAssurance::default(),
            retransmission: RetransmissionPolicy::default(),
            spawn_driver: true,
        }
    }

    /// Stamp an outbound application payload.
    ///
    /// Obtains the current source sequence — establishing one through a
    /// blocking CreateSequence exchange if none is usable — assigns the
    /// next message number, registers the stamped message in the
    /// retransmission queue, and piggybacks pending destination-side
    /// acknowledgements. The returned message goes back to the binding
    /// layer for the actual send.
    ///
    /// # Errors
    ///
    /// A failed CreateSequence aborts the send attempt (no silent
    /// fallback to unreliable delivery).
    pub fn handle_outbound(&self, payload: impl Into<Arc<[u8]>>) -> Result<ApplicationMessage> {
        let (sequence, next) = loop {
            let sequence = self.source.current_or_create(|| {
                self.proxy
                    .create_sequence(&self.source, &self.destination, &self.peer)
            })?;

            let in_flight = self.queue.count_unacknowledged(sequence.identifier());
            match sequence.next_message_number(in_flight) {
                Ok(next) => break (sequence, next),
                // a concurrent sender took the last number between the
                // lookup and ours; mint the successor and go again
                Err(Error::SequenceTerminated(_)) => continue,
                Err(e) => return Err(e),
            }
        };
        let header = SequenceHeader {
            identifier: sequence.identifier().clone(),
            message_number: next.number,
            last_message: next.last_message,
        };

        let acknowledgements: Vec<SequenceAcknowledgementMsg> = self
            .destination
            .pending_acknowledgements()
            .into_iter()
            .map(|(_, ack)| ack)
            .collect();
        self.metrics
            .increment_acks_sent(acknowledgements.len() as u64);

        let message = ApplicationMessage {
            header,
            acknowledgements,
            ack_requests: Vec::new(),
            payload: payload.into(),
        };
        self.queue.put(&message, &self.peer);
        self.metrics.increment_messages_stamped();
        Ok(message)
    }

    /// Process an inbound protocol record.
    ///
    /// Sequence faults raised by the inbound message surface as
    /// [`Disposition::Fault`]; they never crash processing for other
    /// sequences. Local errors (transport, configuration) propagate.
    pub fn handle_inbound(&self, message: ProtocolMessage) -> Result<Disposition> {
        match message {
            ProtocolMessage::CreateSequence(request) => {
                let response = self.servant.create_sequence(
                    &self.destination,
                    &request,
                    &self.reply_to,
                    &self.metrics,
                )?;
                Ok(Disposition::Respond(
                    ProtocolMessage::CreateSequenceResponse(response),
                ))
            }
            // handled synchronously at the proxy's blocking call site
            ProtocolMessage::CreateSequenceResponse(_) => Ok(Disposition::None),
            ProtocolMessage::TerminateSequence(terminate) => {
                match self.servant.terminate_sequence(
                    &self.destination,
                    &terminate.identifier,
                    &self.metrics,
                ) {
                    Ok(()) => Ok(Disposition::None),
                    Err(e) => {
                        // one-way exchange: nothing to fault back to
                        self.metrics.increment_sequence_faults();
                        log::warn!("terminate failed: {}", e);
                        Ok(Disposition::None)
                    }
                }
            }
            ProtocolMessage::SequenceInfo(info) => self.handle_sequence_info(&info),
            ProtocolMessage::Application(app) => self.handle_application(&app),
            ProtocolMessage::Fault(fault) => {
                log::warn!(
                    "peer reported sequence fault {}: {}",
                    fault.code.as_str(),
                    fault.detail
                );
                Ok(Disposition::None)
            }
        }
    }

    fn handle_sequence_info(&self, info: &SequenceInfo) -> Result<Disposition> {
        self.process_acknowledgements(&info.acknowledgements);

        if let Some(header) = &info.last_message {
            if let Err(e) = self.destination.acknowledge(header) {
                return Ok(self.fault_disposition(e));
            }
        }

        if !info.ack_requests.is_empty() {
            let ids: Vec<_> = info
                .ack_requests
                .iter()
                .map(|r| r.identifier.clone())
                .collect();
            let state = self.destination.acknowledgement_state(&ids);
            self.metrics.increment_acks_sent(state.len() as u64);
            return Ok(Disposition::Respond(ProtocolMessage::SequenceInfo(
                SequenceInfo::acknowledging(state),
            )));
        }
        Ok(Disposition::None)
    }

    fn handle_application(&self, app: &ApplicationMessage) -> Result<Disposition> {
        self.process_acknowledgements(&app.acknowledgements);

        // an ack request piggybacked on an application message re-arms the
        // batching flush rather than forcing an inline response
        for request in &app.ack_requests {
            if let Some(sequence) = self.destination.get_sequence(&request.identifier) {
                sequence.request_acknowledgement();
            }
        }

        match self.destination.acknowledge(&app.header) {
            Ok(Delivery::Deliver) => Ok(Disposition::Deliver),
            Ok(Delivery::Duplicate) => {
                self.metrics.increment_duplicates_dropped();
                Ok(Disposition::Duplicate)
            }
            Ok(Delivery::Held) => {
                self.metrics.increment_messages_held();
                Ok(Disposition::Held)
            }
            Err(e) => Ok(self.fault_disposition(e)),
        }
    }

    /// Apply piggybacked acknowledgements to the matching source
    /// sequences. An unknown identifier is logged and counted but does
    /// not disturb the other acknowledgements.
    fn process_acknowledgements(&self, acks: &[SequenceAcknowledgementMsg]) {
        for ack in acks {
            match self.source.set_acknowledged(ack, &self.queue) {
                Ok(()) => self.metrics.increment_acks_received(1),
                Err(e) => {
                    self.metrics.increment_sequence_faults();
                    log::warn!("acknowledgement dropped: {}", e);
                }
            }
        }
    }

    fn fault_disposition(&self, error: Error) -> Disposition {
        self.metrics.increment_sequence_faults();
        match error.fault_code() {
            Some(code) => Disposition::Fault(SequenceFaultMsg {
                code,
                detail: error.to_string(),
            }),
            // not peer-visible; report locally and consume the message
            None => {
                log::warn!("inbound message dropped: {}", error);
                Disposition::None
            }
        }
    }

    /// Terminate every fully drained source sequence (last message
    /// assigned and acknowledged). Returns the number terminated.
    pub fn terminate_drained(&self) -> Result<usize> {
        let drained = self.source.drained_sequences();
        let count = drained.len();
        for sequence in drained {
            self.proxy.terminate_sequence(
                &self.source,
                &self.queue,
                sequence.identifier(),
                &self.peer,
                false,
            )?;
        }
        Ok(count)
    }

    /// Request immediate acknowledgement of all open source sequences.
    pub fn request_acknowledgement(&self) -> Result<()> {
        let sequences = self.source.sequences();
        if sequences.is_empty() {
            return Ok(());
        }
        self.proxy.request_acknowledgement(&sequences, &self.peer)
    }

    /// Source-side registry.
    #[must_use]
    pub fn source(&self) -> &Arc<RmSource> {
        &self.source
    }

    /// Destination-side registry.
    #[must_use]
    pub fn destination(&self) -> &Arc<RmDestination> {
        &self.destination
    }

    /// Retransmission queue.
    #[must_use]
    pub fn queue(&self) -> &Arc<RetransmissionQueue> {
        &self.queue
    }

    /// Client-side protocol proxy.
    #[must_use]
    pub fn proxy(&self) -> &RmProxy<T> {
        &self.proxy
    }

    /// Metrics collector.
    #[must_use]
    pub fn metrics(&self) -> &Arc<ReliabilityMetrics> {
        &self.metrics
    }

    /// Stop the resend driver and release the handler.
    pub fn shutdown(mut self) {
        if let Some(driver) = self.driver.take() {
            driver.shutdown();
        }
    }
}
