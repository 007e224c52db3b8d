mod http;
mod tracker;

pub use {
    http::HttpSegmentUploader,
    tracker::{UploadReport, UploadTracker},
};

use crate::{
    CoreResult,
    capture::{Segment, SegmentLabel},
};

use async_trait::async_trait;
use serde::Serialize;

/// Backend acknowledgment for one uploaded segment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadAck {
    /// HTTP status returned by the backend.
    pub status: u16,
    /// Response body; JSON when the backend sent JSON, otherwise the raw text.
    pub payload: serde_json::Value,
}

/// Transmits a sealed segment to the backend.
///
/// Called on a detached task per segment. Implementations must not retry:
/// a failed upload is reported once and the segment is dropped.
#[async_trait]
pub trait SegmentUploader: Send + Sync {
    /// Upload `segment` under `label`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Upload`](crate::CoreError::Upload) on transport
    /// failure or a non-2xx response.
    async fn upload(&self, segment: Segment, label: &SegmentLabel) -> CoreResult<UploadAck>;
}
