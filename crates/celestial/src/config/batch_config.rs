use crate::config::{default_batch_fps, default_frame_count, default_receiver_url};

use serde::{Deserialize, Serialize};

/// Still-frame capture configuration for batch mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Frame receiver base URL, without `/frames`.
    #[serde(default = "default_receiver_url")]
    pub receiver_url: String,
    /// Frames captured before the batch is sent.
    #[serde(default = "default_frame_count")]
    pub frame_count: usize,
    /// Capture rate in frames per second.
    #[serde(default = "default_batch_fps")]
    pub fps: u32,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            receiver_url: default_receiver_url(),
            frame_count: default_frame_count(),
            fps: default_batch_fps(),
        }
    }
}
