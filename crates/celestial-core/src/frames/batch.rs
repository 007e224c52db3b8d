use crate::{CoreError, CoreResult};

use std::panic::Location;

use base64::{Engine, prelude::BASE64_STANDARD};
use chrono::{DateTime, Utc};
use error_location::ErrorLocation;
use serde::{Deserialize, Serialize};

/// Data-URL prefix for captured JPEG frames.
const JPEG_DATA_URL_PREFIX: &str = "data:image/jpeg;base64,";

/// A batch of captured frames posted in one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameBatch {
    /// Frames in capture order.
    pub frames: Vec<FrameRecord>,
    /// Batch description supplied by the sender.
    pub metadata: BatchMetadata,
}

impl FrameBatch {
    /// Wrap captured frames, filling in the count and send time.
    pub fn new(frames: Vec<FrameRecord>, resolution: Resolution, sent_at: DateTime<Utc>) -> Self {
        Self {
            metadata: BatchMetadata {
                total_frames: frames.len() as u64,
                timestamp: sent_at.timestamp_millis(),
                resolution,
            },
            frames,
        }
    }
}

/// One captured still frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameRecord {
    /// Sender-assigned id, a string or a number.
    pub id: serde_json::Value,
    /// Capture time as sent; not interpreted.
    #[serde(default)]
    pub timestamp: serde_json::Value,
    /// Data URL, e.g. `data:image/jpeg;base64,/9j/4AAQ...`.
    pub data: String,
}

impl FrameRecord {
    /// A JPEG captured at `at`, id'd by its epoch milliseconds.
    pub fn jpeg(jpeg: &[u8], at: DateTime<Utc>) -> Self {
        let millis = at.timestamp_millis();
        Self {
            id: serde_json::Value::String(millis.to_string()),
            timestamp: serde_json::Value::from(millis),
            data: format!("{}{}", JPEG_DATA_URL_PREFIX, BASE64_STANDARD.encode(jpeg)),
        }
    }

    /// The id as it appears in file names.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::DecodeWrite`] for ids that are neither strings nor
    /// numbers, or that could escape the frames directory.
    #[track_caller]
    pub fn file_id(&self) -> CoreResult<String> {
        let id = match &self.id {
            serde_json::Value::String(id) => id.clone(),
            serde_json::Value::Number(id) => id.to_string(),
            other => {
                return Err(CoreError::DecodeWrite {
                    reason: format!("Frame id must be a string or number, got {}", other),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
        };

        if id.is_empty() || id.contains(['/', '\\']) || id.contains("..") {
            return Err(CoreError::DecodeWrite {
                reason: format!("Invalid frame id: {:?}", id),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        Ok(id)
    }
}

/// Sender-side description of a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchMetadata {
    /// Frames the sender captured.
    pub total_frames: u64,
    /// Send time, milliseconds since the Unix epoch.
    pub timestamp: i64,
    /// Capture resolution.
    pub resolution: Resolution,
}

/// Frame dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Strip the data-URL prefix and decode the base64 payload.
///
/// The prefix is everything up to and including the first comma. Data with no
/// comma is not a data URL and is rejected.
///
/// # Errors
///
/// Returns [`CoreError::DecodeWrite`] on a missing prefix or invalid base64.
#[track_caller]
pub fn decode_frame_data(data: &str) -> CoreResult<Vec<u8>> {
    let (_, payload) = data.split_once(',').ok_or_else(|| CoreError::DecodeWrite {
        reason: "Frame data is not a data URL".to_string(),
        location: ErrorLocation::from(Location::caller()),
    })?;

    BASE64_STANDARD
        .decode(payload)
        .map_err(|e| CoreError::DecodeWrite {
            reason: format!("Invalid base64 frame data: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })
}
