//! Relay session state: the peer set and the stream-active flag.
//!
//! One `RelaySession` lives for the lifetime of a relay server. Every peer has
//! a bounded FIFO outbound queue drained by its socket writer, which keeps
//! per-sender ordering. A peer whose queue is full misses that message; there
//! is no flow control and no retransmission.

use crate::relay::{ClientMessage, ServerMessage, StreamStatus};

use std::{
    collections::HashMap,
    sync::{
        Mutex, MutexGuard,
        atomic::{AtomicBool, Ordering},
    },
};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

const CONNECTION_GREETING: &str = "Connected to Celestial Live Stream";

/// Identity of one connection. Not stable across reconnects.
pub type PeerId = Uuid;

/// Item queued for a peer's socket writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Serialized [`ServerMessage`].
    Text(String),
    /// Close the connection.
    Close,
}

/// Public view of a connected peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerInfo {
    /// Connection id.
    pub peer_id: PeerId,
    /// When the peer connected.
    pub connected_at: DateTime<Utc>,
}

/// What [`RelaySession::dispatch`] did with a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A video chunk was queued for this many other peers.
    Relayed {
        /// Peers the chunk was queued for.
        recipients: usize,
    },
    /// The flag changed and every peer, sender included, was notified.
    StatusBroadcast {
        /// New stream state.
        status: StreamStatus,
        /// Peers the status was queued for.
        recipients: usize,
    },
    /// Well-formed but not a relay message type.
    Ignored,
    /// Malformed; logged and dropped.
    Dropped,
}

struct PeerEntry {
    tx: mpsc::Sender<Outbound>,
    connected_at: DateTime<Utc>,
}

/// Peer registry and stream flag for one relay server.
pub struct RelaySession {
    peers: Mutex<HashMap<PeerId, PeerEntry>>,
    stream_active: AtomicBool,
    peer_buffer: usize,
    started_at: DateTime<Utc>,
}

impl RelaySession {
    /// Create an empty session. `peer_buffer` bounds each peer's queue.
    pub fn new(peer_buffer: usize) -> Self {
        Self {
            peers: Mutex::new(HashMap::new()),
            stream_active: AtomicBool::new(false),
            peer_buffer: peer_buffer.max(1),
            started_at: Utc::now(),
        }
    }

    /// When the session was created.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Whether a producer has announced `stream-start` without a later `stream-stop`.
    pub fn is_stream_active(&self) -> bool {
        self.stream_active.load(Ordering::Acquire)
    }

    /// Number of connected peers.
    pub fn peer_count(&self) -> usize {
        self.lock_peers().len()
    }

    /// Connected peers, oldest first.
    pub fn peers(&self) -> Vec<PeerInfo> {
        let mut peers: Vec<PeerInfo> = self
            .lock_peers()
            .iter()
            .map(|(peer_id, entry)| PeerInfo {
                peer_id: *peer_id,
                connected_at: entry.connected_at,
            })
            .collect();
        peers.sort_by_key(|peer| peer.connected_at);
        peers
    }

    /// Register a new peer and queue its `connection` greeting.
    ///
    /// The returned receiver must be drained into the peer's socket.
    #[instrument(skip(self))]
    pub fn join(&self) -> (PeerId, mpsc::Receiver<Outbound>) {
        let peer_id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(self.peer_buffer);

        let greeting = ServerMessage::Connection {
            message: CONNECTION_GREETING.to_string(),
            timestamp: Utc::now(),
        };
        if let Some(text) = encode(&greeting) {
            // Fresh queue with capacity >= 1: cannot be full.
            let _ = tx.try_send(Outbound::Text(text));
        }

        let mut peers = self.lock_peers();
        peers.insert(
            peer_id,
            PeerEntry {
                tx,
                connected_at: Utc::now(),
            },
        );

        info!(peer_id = %peer_id, peers = peers.len(), "Peer connected");

        (peer_id, rx)
    }

    /// Remove a peer. Remaining peers are not notified.
    #[instrument(skip(self))]
    pub fn leave(&self, peer_id: PeerId) -> bool {
        let mut peers = self.lock_peers();
        let removed = peers.remove(&peer_id).is_some();
        if removed {
            info!(peer_id = %peer_id, peers = peers.len(), "Peer disconnected");
        }
        removed
    }

    /// Handle one inbound text frame from `sender`.
    #[instrument(skip(self, raw), fields(bytes = raw.len()))]
    pub fn dispatch(&self, sender: PeerId, raw: &str) -> DispatchOutcome {
        let message = match ClientMessage::parse(raw) {
            Ok(message) => message,
            Err(e) => {
                warn!(peer_id = %sender, error = %e, "Dropping malformed message");
                return DispatchOutcome::Dropped;
            }
        };

        match message {
            ClientMessage::VideoChunk {
                chunk,
                timestamp,
                frame_id,
            } => {
                let relayed = ServerMessage::VideoChunk {
                    chunk,
                    timestamp,
                    frame_id,
                };
                let recipients = self.broadcast(&relayed, Some(sender));
                debug!(peer_id = %sender, recipients, "Relayed video chunk");
                DispatchOutcome::Relayed { recipients }
            }
            ClientMessage::StreamStart { .. } => self.set_stream_status(StreamStatus::Started),
            ClientMessage::StreamStop { .. } => self.set_stream_status(StreamStatus::Stopped),
            ClientMessage::Unknown => {
                debug!(peer_id = %sender, "Ignoring unknown message type");
                DispatchOutcome::Ignored
            }
        }
    }

    /// Queue `message` for every peer except `exclude`.
    ///
    /// Returns how many peers it was queued for. Peers with a full queue miss
    /// it; peers whose queue is closed are removed.
    pub fn broadcast(&self, message: &ServerMessage, exclude: Option<PeerId>) -> usize {
        let Some(text) = encode(message) else {
            return 0;
        };

        let mut peers = self.lock_peers();
        let mut recipients = 0;
        let mut gone = Vec::new();

        for (peer_id, entry) in peers.iter() {
            if Some(*peer_id) == exclude {
                continue;
            }
            match entry.tx.try_send(Outbound::Text(text.clone())) {
                Ok(()) => recipients += 1,
                Err(TrySendError::Full(_)) => {
                    warn!(peer_id = %peer_id, "Peer queue full, message dropped");
                }
                Err(TrySendError::Closed(_)) => gone.push(*peer_id),
            }
        }

        for peer_id in gone {
            peers.remove(&peer_id);
            debug!(peer_id = %peer_id, "Removed peer with closed queue");
        }

        recipients
    }

    /// Close every peer and empty the session.
    #[instrument(skip(self))]
    pub fn shutdown(&self) -> usize {
        let mut peers = self.lock_peers();
        let count = peers.len();
        for entry in peers.values() {
            let _ = entry.tx.try_send(Outbound::Close);
        }
        peers.clear();
        self.stream_active.store(false, Ordering::Release);
        info!(peers = count, "Relay session closed");
        count
    }

    fn set_stream_status(&self, status: StreamStatus) -> DispatchOutcome {
        self.stream_active
            .store(status == StreamStatus::Started, Ordering::Release);
        info!(status = ?status, "Live stream status changed");

        let recipients = self.broadcast(
            &ServerMessage::StreamStatus {
                status,
                timestamp: Utc::now(),
            },
            None,
        );

        DispatchOutcome::StatusBroadcast { status, recipients }
    }

    fn lock_peers(&self) -> MutexGuard<'_, HashMap<PeerId, PeerEntry>> {
        self.peers.lock().unwrap_or_else(|e| {
            error!("Peer set lock poisoned, recovering: {}", e);
            e.into_inner()
        })
    }
}

fn encode(message: &ServerMessage) -> Option<String> {
    match serde_json::to_string(message) {
        Ok(text) => Some(text),
        Err(e) => {
            error!(error = %e, "Failed to serialize relay message");
            None
        }
    }
}
