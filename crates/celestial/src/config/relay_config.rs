use crate::config::{default_peer_buffer, default_relay_port};

use serde::{Deserialize, Serialize};

/// Live relay server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Port for the WebSocket relay.
    #[serde(default = "default_relay_port")]
    pub port: u16,
    /// Outbound messages queued per peer before new ones are dropped.
    #[serde(default = "default_peer_buffer")]
    pub peer_buffer: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            port: default_relay_port(),
            peer_buffer: default_peer_buffer(),
        }
    }
}
