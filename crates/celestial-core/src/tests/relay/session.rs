use crate::{DispatchOutcome, Outbound, RelaySession, ServerMessage, StreamStatus};

use serde_json::{Value, json};
use tokio::sync::mpsc;

/// Pop every queued item as parsed JSON, stopping at a close.
fn drain(rx: &mut mpsc::Receiver<Outbound>) -> Vec<Value> {
    let mut received = Vec::new();
    while let Ok(Outbound::Text(text)) = rx.try_recv() {
        if let Ok(value) = serde_json::from_str(&text) {
            received.push(value);
        }
    }
    received
}

/// WHAT: Joining queues a connection greeting
/// WHY: Peers confirm the relay is live before any traffic
#[test]
fn given_new_peer_when_joining_then_greeting_queued() {
    // Given: An empty session
    let session = RelaySession::new(16);

    // When: A peer joins
    let (_, mut rx) = session.join();

    // Then: First message is the greeting
    let received = drain(&mut rx);
    assert_eq!(received.len(), 1);
    assert_eq!(received[0]["type"], "connection");
    assert_eq!(received[0]["message"], "Connected to Celestial Live Stream");
    assert_eq!(session.peer_count(), 1);
}

/// WHAT: Three-peer stream start, chunk, and stop
/// WHY: Chunks reach everyone but the sender; status reaches everyone
#[test]
fn given_three_peers_when_producer_streams_then_fanout_matches_rules() {
    // Given: Producer A and viewers B and C, greetings consumed
    let session = RelaySession::new(16);
    let (a, mut a_rx) = session.join();
    let (_, mut b_rx) = session.join();
    let (_, mut c_rx) = session.join();
    drain(&mut a_rx);
    drain(&mut b_rx);
    drain(&mut c_rx);

    // When: A starts the stream
    let outcome = session.dispatch(a, r#"{"type":"stream-start","timestamp":1}"#);

    // Then: All three get the status, A included
    assert_eq!(
        outcome,
        DispatchOutcome::StatusBroadcast {
            status: StreamStatus::Started,
            recipients: 3
        }
    );
    assert!(session.is_stream_active());
    for rx in [&mut a_rx, &mut b_rx, &mut c_rx] {
        let received = drain(rx);
        assert_eq!(received.len(), 1);
        assert_eq!(received[0]["type"], "stream-status");
        assert_eq!(received[0]["status"], "started");
    }

    // When: A sends a chunk
    let outcome = session.dispatch(
        a,
        r#"{"type":"video-chunk","chunk":"AAEC","timestamp":2,"frameId":7}"#,
    );

    // Then: B and C get it verbatim, A does not
    assert_eq!(outcome, DispatchOutcome::Relayed { recipients: 2 });
    assert!(drain(&mut a_rx).is_empty());
    for rx in [&mut b_rx, &mut c_rx] {
        assert_eq!(
            drain(rx),
            vec![json!({"type": "video-chunk", "chunk": "AAEC", "timestamp": 2, "frameId": 7})]
        );
    }

    // When: A stops the stream
    session.dispatch(a, r#"{"type":"stream-stop"}"#);

    // Then: Flag cleared and everyone is told
    assert!(!session.is_stream_active());
    for rx in [&mut a_rx, &mut b_rx, &mut c_rx] {
        assert_eq!(drain(rx)[0]["status"], "stopped");
    }
}

/// WHAT: Malformed messages are dropped and the sender stays connected
/// WHY: One bad frame must not affect the peer or anyone else
#[test]
fn given_connected_peers_when_malformed_message_arrives_then_dropped_and_peer_kept() {
    // Given: Two peers
    let session = RelaySession::new(16);
    let (a, _a_rx) = session.join();
    let (_, mut b_rx) = session.join();
    drain(&mut b_rx);

    // When: A sends invalid JSON
    let outcome = session.dispatch(a, "{not json");

    // Then: Dropped, nothing relayed, both peers still present
    assert_eq!(outcome, DispatchOutcome::Dropped);
    assert!(drain(&mut b_rx).is_empty());
    assert_eq!(session.peer_count(), 2);
}

/// WHAT: Unknown message types are ignored
/// WHY: Only the three relay types have effects
#[test]
fn given_connected_peers_when_unknown_type_arrives_then_ignored() {
    // Given: Two peers
    let session = RelaySession::new(16);
    let (a, _a_rx) = session.join();
    let (_, mut b_rx) = session.join();
    drain(&mut b_rx);

    // When: A sends an unknown type
    let outcome = session.dispatch(a, r#"{"type":"subscribe"}"#);

    // Then: Ignored with no side effects
    assert_eq!(outcome, DispatchOutcome::Ignored);
    assert!(drain(&mut b_rx).is_empty());
    assert!(!session.is_stream_active());
}

/// WHAT: A departed peer stops receiving and others are unaffected
/// WHY: Disconnects remove exactly one peer
#[test]
fn given_three_peers_when_one_leaves_then_excluded_from_fanout() {
    // Given: Three peers
    let session = RelaySession::new(16);
    let (a, _a_rx) = session.join();
    let (b, _b_rx) = session.join();
    let (_, mut c_rx) = session.join();
    drain(&mut c_rx);

    // When: B leaves and A sends a chunk
    assert!(session.leave(b));
    let outcome = session.dispatch(a, r#"{"type":"video-chunk","chunk":"x"}"#);

    // Then: Only C receives it; leaving twice is a no-op
    assert_eq!(outcome, DispatchOutcome::Relayed { recipients: 1 });
    assert_eq!(drain(&mut c_rx).len(), 1);
    assert!(!session.leave(b));
    assert_eq!(session.peer_count(), 2);
}

/// WHAT: A peer with a full queue misses messages but stays connected
/// WHY: One slow viewer must not block or disconnect the producer
#[test]
fn given_slow_peer_when_queue_full_then_message_dropped_for_that_peer_only() {
    // Given: Buffer of one; B's greeting is still queued so B is full
    let session = RelaySession::new(1);
    let (a, mut a_rx) = session.join();
    let (_, mut b_rx) = session.join();
    let (_, mut c_rx) = session.join();
    drain(&mut a_rx);
    drain(&mut c_rx);

    // When: A sends a chunk
    let outcome = session.dispatch(a, r#"{"type":"video-chunk","chunk":"x"}"#);

    // Then: C gets it, B only has its greeting, and B is still connected
    assert_eq!(outcome, DispatchOutcome::Relayed { recipients: 1 });
    assert_eq!(drain(&mut c_rx).len(), 1);
    let b_received = drain(&mut b_rx);
    assert_eq!(b_received.len(), 1);
    assert_eq!(b_received[0]["type"], "connection");
    assert_eq!(session.peer_count(), 3);
}

/// WHAT: A peer whose receiver is gone is removed on the next broadcast
/// WHY: Dead writers must not accumulate in the peer set
#[test]
fn given_peer_with_closed_queue_when_broadcasting_then_peer_removed() {
    // Given: B's writer has gone away
    let session = RelaySession::new(16);
    let (a, _a_rx) = session.join();
    let (_, b_rx) = session.join();
    drop(b_rx);

    // When: A starts the stream
    let outcome = session.dispatch(a, r#"{"type":"stream-start"}"#);

    // Then: Only A received it and B was removed
    assert_eq!(
        outcome,
        DispatchOutcome::StatusBroadcast {
            status: StreamStatus::Started,
            recipients: 1
        }
    );
    assert_eq!(session.peer_count(), 1);
}

/// WHAT: Chunks from one sender arrive in send order
/// WHY: Per-sender FIFO is the only ordering guarantee
#[test]
fn given_sequence_of_chunks_when_relayed_then_order_preserved() {
    // Given: Producer and viewer
    let session = RelaySession::new(64);
    let (a, _a_rx) = session.join();
    let (_, mut b_rx) = session.join();
    drain(&mut b_rx);

    // When: Sending ten chunks
    for frame in 0..10 {
        session.dispatch(a, &format!(r#"{{"type":"video-chunk","frameId":{frame}}}"#));
    }

    // Then: Viewer sees frame ids 0..10 in order
    let frame_ids: Vec<Value> = drain(&mut b_rx)
        .into_iter()
        .map(|message| message["frameId"].clone())
        .collect();
    assert_eq!(frame_ids, (0..10).map(|n| json!(n)).collect::<Vec<_>>());
}

/// WHAT: Shutdown closes every peer and resets the stream flag
/// WHY: Server shutdown must end all connections
#[test]
fn given_active_stream_when_shutting_down_then_peers_closed() {
    // Given: Two peers and an active stream
    let session = RelaySession::new(16);
    let (a, mut a_rx) = session.join();
    let (_, mut b_rx) = session.join();
    session.dispatch(a, r#"{"type":"stream-start"}"#);
    drain(&mut a_rx);
    drain(&mut b_rx);

    // When: Shutting down
    let closed = session.shutdown();

    // Then: Both received Close and the session is empty
    assert_eq!(closed, 2);
    assert_eq!(a_rx.try_recv().ok(), Some(Outbound::Close));
    assert_eq!(b_rx.try_recv().ok(), Some(Outbound::Close));
    assert_eq!(session.peer_count(), 0);
    assert!(!session.is_stream_active());
}

/// WHAT: Peer listing is ordered by connection time
/// WHY: The clients endpoint reports peers oldest first
#[test]
fn given_peers_when_listing_then_ids_match_and_oldest_first() {
    // Given: Two peers
    let session = RelaySession::new(16);
    let (a, _a_rx) = session.join();
    let (b, _b_rx) = session.join();

    // When: Listing
    let peers = session.peers();

    // Then: Both listed, non-decreasing connect times
    assert_eq!(peers.len(), 2);
    assert!(peers.iter().any(|peer| peer.peer_id == a));
    assert!(peers.iter().any(|peer| peer.peer_id == b));
    assert!(peers[0].connected_at <= peers[1].connected_at);
}

/// WHAT: Direct broadcast can exclude a peer
/// WHY: Server-originated messages reuse the same fan-out path
#[test]
fn given_exclusion_when_broadcasting_then_excluded_peer_skipped() {
    // Given: Two peers
    let session = RelaySession::new(16);
    let (a, mut a_rx) = session.join();
    let (_, mut b_rx) = session.join();
    drain(&mut a_rx);
    drain(&mut b_rx);

    // When: Broadcasting a status excluding A
    let recipients = session.broadcast(
        &ServerMessage::StreamStatus {
            status: StreamStatus::Stopped,
            timestamp: chrono::Utc::now(),
        },
        Some(a),
    );

    // Then: Only B received it
    assert_eq!(recipients, 1);
    assert!(drain(&mut a_rx).is_empty());
    assert_eq!(drain(&mut b_rx).len(), 1);
}
