use crate::capture::SegmentWindow;

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

/// Timestamp layout used in upload labels, second precision, local wall-clock time.
const LABEL_TIME_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// A sealed, minute-bounded unit of recorded video.
///
/// Immutable once built. Ownership moves into the upload task and the bytes
/// are dropped when the upload finishes, whatever its outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    window: SegmentWindow,
    data: Vec<u8>,
}

impl Segment {
    /// Seal the bytes recorded during `window`.
    pub fn seal(window: SegmentWindow, data: Vec<u8>) -> Self {
        Self { window, data }
    }

    /// The window this segment covers.
    pub fn window(&self) -> SegmentWindow {
        self.window
    }

    /// Encoded media bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Number of encoded bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the recorder produced no bytes.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Consume the segment, returning its bytes.
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}

/// Addressing triple attached to a segment at upload time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentLabel {
    /// Camera the segment was recorded from.
    pub camera_id: String,
    /// Window start.
    pub start_time: DateTime<Utc>,
    /// Window end, always after `start_time`.
    pub end_time: DateTime<Utc>,
}

impl SegmentLabel {
    /// Label a window recorded by `camera_id`.
    pub fn new(camera_id: impl Into<String>, window: SegmentWindow) -> Self {
        Self {
            camera_id: camera_id.into(),
            start_time: window.start,
            end_time: window.end,
        }
    }

    /// `start_time` as sent to the backend, e.g. `2025-03-14_12-01-00`.
    ///
    /// Rendered in the host's local time zone; the backend files and looks up
    /// chunks by local wall-clock names.
    pub fn start_param(&self) -> String {
        format_label_time(self.start_time)
    }

    /// `end_time` as sent to the backend.
    pub fn end_param(&self) -> String {
        format_label_time(self.end_time)
    }
}

fn format_label_time(time: DateTime<Utc>) -> String {
    time.with_timezone(&Local).format(LABEL_TIME_FORMAT).to_string()
}
