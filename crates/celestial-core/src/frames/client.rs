//! Sender side of `POST /frames`.

use crate::{CoreError, CoreResult, frames::FrameBatch};

use std::panic::Location;

use error_location::ErrorLocation;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

const FRAMES_PATH: &str = "/frames";

/// Receiver acknowledgment for a stored batch.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FramesAck {
    /// Human-readable summary from the receiver.
    #[serde(default)]
    pub message: String,
    /// Frames the receiver wrote to disk.
    #[serde(default)]
    pub frames_received: usize,
    /// Directory the receiver wrote into.
    #[serde(default)]
    pub saved_to: String,
}

/// Posts frame batches to a receiver at `{base_url}/frames`.
#[derive(Debug, Clone)]
pub struct FrameBatchClient {
    client: Client,
    base_url: String,
}

impl FrameBatchClient {
    /// Create a client for the receiver at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Upload`] if the HTTP client cannot be built.
    #[track_caller]
    pub fn new(base_url: impl Into<String>) -> CoreResult<Self> {
        let client = Client::builder().build().map_err(|e| CoreError::Upload {
            reason: format!("Failed to build HTTP client: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Receiver base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send one batch. Nothing is retried.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Upload`] on transport failure or a non-2xx
    /// response, carrying the receiver's `error` text when it sent one.
    #[instrument(skip_all, fields(base_url = %self.base_url, frame_count = batch.frames.len()))]
    pub async fn send(&self, batch: &FrameBatch) -> CoreResult<FramesAck> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, FRAMES_PATH))
            .json(batch)
            .send()
            .await
            .map_err(|e| CoreError::Upload {
                reason: e.to_string(),
                location: ErrorLocation::from(Location::caller()),
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| CoreError::Upload {
            reason: format!("Failed to read response: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        if !status.is_success() {
            let reason = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|value| value.get("error").and_then(|e| e.as_str()).map(str::to_string))
                .unwrap_or_else(|| format!("Request failed with status code {}", status.as_u16()));
            return Err(CoreError::Upload {
                reason,
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let ack = serde_json::from_str(&body).map_err(|e| CoreError::Upload {
            reason: format!("Unexpected receiver response: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        debug!(status = status.as_u16(), "Receiver acknowledged batch");

        Ok(ack)
    }
}
