use crate::config::{default_body_limit_mb, default_frames_dir, default_receiver_port};

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Frame receiver server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiverConfig {
    /// Port for the frame receiver.
    #[serde(default = "default_receiver_port")]
    pub port: u16,
    /// Directory received frames are written to. Created on startup.
    #[serde(default = "default_frames_dir")]
    pub frames_dir: PathBuf,
    /// Largest accepted request body, in MiB.
    #[serde(default = "default_body_limit_mb")]
    pub body_limit_mb: usize,
}

impl ReceiverConfig {
    /// Body limit in bytes.
    pub fn body_limit_bytes(&self) -> usize {
        self.body_limit_mb.saturating_mul(1024 * 1024)
    }
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            port: default_receiver_port(),
            frames_dir: default_frames_dir(),
            body_limit_mb: default_body_limit_mb(),
        }
    }
}
