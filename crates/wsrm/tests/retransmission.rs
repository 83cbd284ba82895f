// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Driver-based retransmission: unacknowledged messages are resent until
//! eviction cancels them, and batched acknowledgements are flushed to the
//! acksTo endpoint.

mod common;

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use common::{client_acks_address, server_address, PeerTransport, RecordingTransport};
use wsrm::{
    DeliveryAssurance, DestinationPolicy, ProtocolMessage, RetransmissionPolicy, RmHandler,
    SequenceInfo, SourcePolicy,
};

fn fast_policy() -> RetransmissionPolicy {
    RetransmissionPolicy {
        base_interval: Duration::from_millis(20),
        exponential_backoff: false,
        max_interval: Duration::from_millis(100),
        ack_interval: Duration::from_millis(20),
    }
}

fn server() -> Arc<RmHandler<RecordingTransport>> {
    Arc::new(
        RmHandler::builder(Arc::new(RecordingTransport::new()), server_address())
            .without_driver()
            .build()
            .expect("server handler"),
    )
}

#[test]
fn test_unacknowledged_message_is_resent() {
    let server = server();
    let transport = Arc::new(PeerTransport::new(Arc::clone(&server)));
    let client = RmHandler::builder(Arc::clone(&transport), server_address())
        .retransmission_policy(fast_policy())
        .build()
        .expect("client handler");

    client.handle_outbound(b"lost".as_slice()).expect("outbound");

    // the initial send is the binding layer's job; the driver alone must
    // produce resends while the message stays unacknowledged
    thread::sleep(Duration::from_millis(150));
    let resends = transport
        .delivered()
        .into_iter()
        .filter(|m| matches!(m, ProtocolMessage::Application(_)))
        .count();
    assert!(resends >= 2, "expected repeated resends, saw {}", resends);
    assert!(client.metrics().snapshot().retransmits_sent >= 2);

    client.shutdown();
}

#[test]
fn test_acknowledgement_cancels_resends() {
    let server = server();
    let transport = Arc::new(PeerTransport::new(Arc::clone(&server)));
    let client = RmHandler::builder(Arc::clone(&transport), server_address())
        .retransmission_policy(fast_policy())
        .build()
        .expect("client handler");

    let stamped = client.handle_outbound(b"ackme".as_slice()).expect("outbound");
    let id = stamped.header.identifier.clone();

    // deliver once and return the acknowledgement
    server
        .handle_inbound(ProtocolMessage::Application(stamped))
        .expect("inbound");
    let acks = server
        .destination()
        .pending_acknowledgements()
        .into_iter()
        .map(|(_, ack)| ack)
        .collect();
    client
        .handle_inbound(ProtocolMessage::SequenceInfo(SequenceInfo::acknowledging(
            acks,
        )))
        .expect("ack inbound");
    assert_eq!(client.queue().count_unacknowledged(&id), 0);

    // resends already in flight may land, but the count must stop growing
    thread::sleep(Duration::from_millis(60));
    let settled = transport.delivered_count();
    thread::sleep(Duration::from_millis(120));
    assert_eq!(
        transport.delivered_count(),
        settled,
        "evicted message kept being resent"
    );

    client.shutdown();
}

#[test]
fn test_pending_acks_flushed_to_acks_to_endpoint() {
    // server WITH driver: its destination-side acknowledgements must be
    // flushed as standalone sequence-info messages to the client's acksTo
    let server_transport = Arc::new(RecordingTransport::new());
    let server = Arc::new(
        RmHandler::builder(Arc::clone(&server_transport), server_address())
            .destination_policy(DestinationPolicy::default())
            .delivery_assurance(DeliveryAssurance::default())
            .retransmission_policy(fast_policy())
            .build()
            .expect("server handler"),
    );

    let client = RmHandler::builder(
        Arc::new(PeerTransport::new(Arc::clone(&server))),
        server_address(),
    )
    .source_policy(SourcePolicy {
        acks_to: Some(client_acks_address()),
        ..SourcePolicy::default()
    })
    .without_driver()
    .build()
    .expect("client handler");

    let stamped = client.handle_outbound(b"m1".as_slice()).expect("outbound");
    server
        .handle_inbound(ProtocolMessage::Application(stamped))
        .expect("inbound");

    thread::sleep(Duration::from_millis(150));

    let flushed: Vec<_> = server_transport
        .sent()
        .into_iter()
        .filter(|(to, msg)| {
            to == &client_acks_address() && matches!(msg, ProtocolMessage::SequenceInfo(_))
        })
        .collect();
    assert!(
        !flushed.is_empty(),
        "driver never flushed the pending acknowledgement"
    );
    match &flushed[0].1 {
        ProtocolMessage::SequenceInfo(info) => {
            assert_eq!(info.acknowledgements.len(), 1);
            assert!(info.acknowledgements[0].ranges.contains(1));
        }
        _ => unreachable!("filtered to SequenceInfo"),
    }

    // acknowledgements are not re-flushed while nothing new arrives
    let settled = server_transport.sent_count();
    thread::sleep(Duration::from_millis(100));
    assert_eq!(server_transport.sent_count(), settled);
}

#[test]
fn test_resend_carries_header_and_payload_only() {
    let server = server();
    let transport = Arc::new(PeerTransport::new(Arc::clone(&server)));
    let client = RmHandler::builder(Arc::clone(&transport), server_address())
        .retransmission_policy(fast_policy())
        .build()
        .expect("client handler");

    let stamped = client.handle_outbound(b"payload".as_slice()).expect("outbound");

    thread::sleep(Duration::from_millis(80));
    let resend = transport
        .delivered()
        .into_iter()
        .find_map(|m| match m {
            ProtocolMessage::Application(app) => Some(app),
            _ => None,
        })
        .expect("at least one resend");

    assert_eq!(resend.header, stamped.header);
    assert_eq!(resend.payload, stamped.payload);
    assert!(resend.acknowledgements.is_empty(), "stale acks stripped");

    client.shutdown();
}
