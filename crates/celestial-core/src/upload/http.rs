//! Segment upload over HTTP multipart.

use crate::{
    CoreError, CoreResult,
    capture::{Segment, SegmentLabel},
    upload::{SegmentUploader, UploadAck},
};

use std::panic::Location;

use async_trait::async_trait;
use error_location::ErrorLocation;
use reqwest::{
    Client,
    multipart::{Form, Part},
};
use tracing::{debug, instrument};

const UPLOAD_PATH: &str = "/api/monitor/upload-chunk";
const SEGMENT_FILE_NAME: &str = "chunk.webm";
const SEGMENT_MIME: &str = "video/webm";

/// Uploads segments to `{base_url}/api/monitor/upload-chunk`.
///
/// No request timeout is set beyond the client default and nothing is
/// retried.
#[derive(Debug, Clone)]
pub struct HttpSegmentUploader {
    client: Client,
    base_url: String,
}

impl HttpSegmentUploader {
    /// Create an uploader for the backend at `base_url`.
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

    /// Backend base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Whether the backend answers `GET /` with a success status.
    #[instrument(skip(self), fields(base_url = %self.base_url))]
    pub async fn is_reachable(&self) -> bool {
        match self.client.get(format!("{}/", self.base_url)).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!(error = %e, "Backend health check failed");
                false
            }
        }
    }
}

#[async_trait]
impl SegmentUploader for HttpSegmentUploader {
    #[instrument(skip(self, segment), fields(bytes = segment.len(), start = %label.start_param()))]
    async fn upload(&self, segment: Segment, label: &SegmentLabel) -> CoreResult<UploadAck> {
        let part = Part::bytes(segment.into_data())
            .file_name(SEGMENT_FILE_NAME)
            .mime_str(SEGMENT_MIME)
            .map_err(|e| CoreError::Upload {
                reason: format!("Failed to build multipart body: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;
        let form = Form::new().part("video", part);

        let start_time = label.start_param();
        let end_time = label.end_param();

        let response = self
            .client
            .post(format!("{}{}", self.base_url, UPLOAD_PATH))
            .query(&[
                ("camera_id", label.camera_id.as_str()),
                ("start_time", start_time.as_str()),
                ("end_time", end_time.as_str()),
            ])
            .multipart(form)
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
            return Err(CoreError::Upload {
                reason: failure_reason(status, &body),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        debug!(status = status.as_u16(), "Backend acknowledged segment");

        Ok(UploadAck {
            status: status.as_u16(),
            payload: parse_payload(&body),
        })
    }
}

/// Prefer the backend's `detail` field, falling back to the status line.
fn failure_reason(status: reqwest::StatusCode, body: &str) -> String {
    let detail = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| value.get("detail").cloned());

    match detail {
        Some(serde_json::Value::String(detail)) => detail,
        Some(detail) => detail.to_string(),
        None => format!("Request failed with status code {}", status.as_u16()),
    }
}

fn parse_payload(body: &str) -> serde_json::Value {
    if body.is_empty() {
        return serde_json::Value::Null;
    }
    serde_json::from_str(body).unwrap_or_else(|_| serde_json::Value::String(body.to_string()))
}
