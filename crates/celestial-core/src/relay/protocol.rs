//! JSON messages exchanged with relay peers.

use crate::{CoreError, CoreResult};

use std::panic::Location;

use base64::{Engine, prelude::BASE64_STANDARD};
use chrono::{DateTime, Utc};
use error_location::ErrorLocation;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Message sent by a peer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    /// A piece of live video to fan out to every other peer.
    VideoChunk {
        /// Opaque payload, relayed verbatim.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        chunk: Option<Value>,
        /// Producer timestamp, relayed verbatim.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<Value>,
        /// Producer frame id, relayed verbatim.
        #[serde(default, rename = "frameId", skip_serializing_if = "Option::is_none")]
        frame_id: Option<Value>,
    },
    /// The producer went live.
    StreamStart {
        /// Producer timestamp.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<Value>,
    },
    /// The producer stopped.
    StreamStop {
        /// Producer timestamp.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<Value>,
    },
    /// Any other `type`. Ignored.
    #[serde(other)]
    Unknown,
}

impl ClientMessage {
    /// Parse one inbound text frame.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Parse`] if the text is not a JSON object with a
    /// `type` field.
    #[track_caller]
    pub fn parse(raw: &str) -> CoreResult<Self> {
        serde_json::from_str(raw).map_err(|e| CoreError::Parse {
            reason: e.to_string(),
            location: ErrorLocation::from(Location::caller()),
        })
    }

    /// `stream-start` stamped with `at` in epoch milliseconds.
    pub fn stream_start(at: DateTime<Utc>) -> Self {
        Self::StreamStart {
            timestamp: Some(Value::from(at.timestamp_millis())),
        }
    }

    /// `stream-stop` stamped with `at` in epoch milliseconds.
    pub fn stream_stop(at: DateTime<Utc>) -> Self {
        Self::StreamStop {
            timestamp: Some(Value::from(at.timestamp_millis())),
        }
    }

    /// One live JPEG frame. The chunk is bare base64, without a data-URL
    /// prefix; `frame_id` is sent as a string.
    pub fn video_chunk(jpeg: &[u8], frame_id: u64, at: DateTime<Utc>) -> Self {
        Self::VideoChunk {
            chunk: Some(Value::String(BASE64_STANDARD.encode(jpeg))),
            timestamp: Some(Value::from(at.timestamp_millis())),
            frame_id: Some(Value::String(frame_id.to_string())),
        }
    }

    /// Serialize as one outbound text frame.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Parse`] if serialization fails.
    #[track_caller]
    pub fn to_json(&self) -> CoreResult<String> {
        serde_json::to_string(self).map_err(|e| CoreError::Parse {
            reason: format!("Failed to serialize message: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })
    }
}

/// Live stream state announced to peers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamStatus {
    /// `stream-start` received.
    Started,
    /// `stream-stop` received.
    Stopped,
}

/// Message sent to a peer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// Greeting sent to a peer right after it connects.
    Connection {
        /// Human-readable greeting.
        message: String,
        /// Server time.
        timestamp: DateTime<Utc>,
    },
    /// A chunk relayed from another peer.
    VideoChunk {
        /// Opaque payload.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        chunk: Option<Value>,
        /// Producer timestamp.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<Value>,
        /// Producer frame id.
        #[serde(default, rename = "frameId", skip_serializing_if = "Option::is_none")]
        frame_id: Option<Value>,
    },
    /// The stream was started or stopped.
    StreamStatus {
        /// New state.
        status: StreamStatus,
        /// Server time.
        timestamp: DateTime<Utc>,
    },
}
