use crate::config::{default_backend_url, default_camera_id};

use serde::{Deserialize, Serialize};

/// Capture and upload configuration for monitor mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Camera id sent with every uploaded segment.
    #[serde(default = "default_camera_id")]
    pub camera_id: String,
    /// Backend base URL, without the upload path.
    #[serde(default = "default_backend_url")]
    pub backend_url: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            camera_id: default_camera_id(),
            backend_url: default_backend_url(),
        }
    }
}
