// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Background resend and acknowledgement-flush thread.
//!
//! One driver per endpoint, not per message: a single thread ticks at the
//! policy's driver interval, resends every due in-flight record through
//! the transport, and flushes acknowledgements that were not piggybacked
//! within the batching window. Eviction from the queue is the cancellation
//! point — an acknowledged message simply has no record left to resend.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use crossbeam::channel::{bounded, tick, Sender};

use crate::endpoint::RmDestination;
use crate::metrics::ReliabilityMetrics;
use crate::protocol::{ProtocolMessage, SequenceInfo};
use crate::retransmission::RetransmissionQueue;
use crate::transport::Transport;

enum Control {
    Shutdown,
}

/// Handle of the background resend thread.
///
/// Shutting down (explicitly or on drop) stops the thread after its
/// current iteration; in-flight records stay in the queue.
pub struct RetransmissionDriver {
    control: Sender<Control>,
    handle: Option<JoinHandle<()>>,
}

impl RetransmissionDriver {
    /// Spawn the driver thread.
    ///
    /// # Errors
    ///
    /// Propagates the OS error if the thread cannot be spawned.
    pub fn spawn<T: Transport + 'static>(
        queue: Arc<RetransmissionQueue>,
        destination: Arc<RmDestination>,
        transport: Arc<T>,
        metrics: Arc<ReliabilityMetrics>,
    ) -> crate::error::Result<Self> {
        let (control_tx, control_rx) = bounded::<Control>(1);
        let ticker = tick(queue.policy().driver_tick());
        let ack_interval = queue.policy().ack_interval;

        let handle = std::thread::Builder::new()
            .name("wsrm-retransmit".into())
            .spawn(move || {
                let mut last_ack_flush = Instant::now();
                loop {
                    crossbeam::select! {
                        recv(control_rx) -> msg => {
                            if matches!(msg, Ok(Control::Shutdown) | Err(_)) {
                                break;
                            }
                        }
                        recv(ticker) -> _ => {
                            let now = Instant::now();
                            resend_due(&queue, &transport, &metrics, now);
                            if now.duration_since(last_ack_flush) >= ack_interval {
                                flush_acknowledgements(&destination, &transport, &metrics);
                                last_ack_flush = now;
                            }
                        }
                    }
                }
            })?;

        Ok(Self {
            control: control_tx,
            handle: Some(handle),
        })
    }

    /// Stop the driver and join its thread.
    pub fn shutdown(mut self) {
        self.shutdown_inner();
    }

    fn shutdown_inner(&mut self) {
        let _ = self.control.send(Control::Shutdown);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("retransmission driver thread panicked");
            }
        }
    }
}

impl Drop for RetransmissionDriver {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.shutdown_inner();
        }
    }
}

fn resend_due<T: Transport>(
    queue: &RetransmissionQueue,
    transport: &T,
    metrics: &ReliabilityMetrics,
    now: Instant,
) {
    for record in queue.due(now) {
        log::debug!(
            "resending message {} of sequence {} (attempt {})",
            record.message_number(),
            record.message.header.identifier,
            record.attempts + 1
        );
        match transport.send(&record.to, ProtocolMessage::Application(record.message.clone())) {
            Ok(()) => metrics.increment_retransmits_sent(1),
            Err(e) => {
                // the record stays queued; the next deadline retries
                log::warn!(
                    "resend of message {} on sequence {} failed: {}",
                    record.message_number(),
                    record.message.header.identifier,
                    e
                );
            }
        }
    }
}

fn flush_acknowledgements<T: Transport>(
    destination: &RmDestination,
    transport: &T,
    metrics: &ReliabilityMetrics,
) {
    // anonymous acksTo sequences are skipped here: their acknowledgements
    // can only ride the response flow as piggybacks
    for (acks_to, ack) in destination.flushable_acknowledgements() {
        let info = SequenceInfo::acknowledging(vec![ack]);
        match transport.send(&acks_to, ProtocolMessage::SequenceInfo(info)) {
            Ok(()) => metrics.increment_acks_sent(1),
            Err(e) => log::warn!("standalone acknowledgement to {} failed: {}", acks_to, e),
        }
    }
}
