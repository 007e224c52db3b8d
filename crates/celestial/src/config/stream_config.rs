use crate::config::{default_relay_url, default_stream_fps};

use serde::{Deserialize, Serialize};

/// Live producer configuration for stream mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Relay WebSocket URL.
    #[serde(default = "default_relay_url")]
    pub relay_url: String,
    /// Frames sent per second.
    #[serde(default = "default_stream_fps")]
    pub fps: u32,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            relay_url: default_relay_url(),
            fps: default_stream_fps(),
        }
    }
}
