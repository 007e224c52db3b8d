use crate::{
    CoreError,
    capture::SegmentLabel,
    upload::UploadAck,
};

use std::sync::{Arc, Mutex};

use serde::Serialize;
use tracing::error;

/// Aggregate upload outcomes for status reporting.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UploadReport {
    /// Uploads dispatched and not yet finished.
    pub in_flight: u64,
    /// Uploads acknowledged by the backend.
    pub succeeded: u64,
    /// Uploads that failed. Each one is a lost segment.
    pub failed: u64,
    /// Retries performed. Always zero: failed uploads are not retried.
    pub retries: u64,
    /// Acknowledgment of the most recent successful upload.
    pub last_ack: Option<UploadAck>,
    /// Label of the most recent successful upload.
    pub last_uploaded: Option<SegmentLabel>,
    /// Message of the most recent failure.
    pub last_error: Option<String>,
    /// Label of the most recent failed upload.
    pub last_failed: Option<SegmentLabel>,
}

/// Shared, cloneable sink for upload outcomes.
///
/// Upload tasks write here; status readers take snapshots. The scheduler
/// itself never reads it.
#[derive(Debug, Clone, Default)]
pub struct UploadTracker {
    report: Arc<Mutex<UploadReport>>,
}

impl UploadTracker {
    /// Current outcomes.
    pub fn snapshot(&self) -> UploadReport {
        self.lock().clone()
    }

    pub(crate) fn record_dispatch(&self) {
        self.lock().in_flight += 1;
    }

    pub(crate) fn record_success(&self, label: SegmentLabel, ack: UploadAck) {
        let mut report = self.lock();
        report.in_flight = report.in_flight.saturating_sub(1);
        report.succeeded += 1;
        report.last_ack = Some(ack);
        report.last_uploaded = Some(label);
    }

    pub(crate) fn record_failure(&self, label: SegmentLabel, err: &CoreError) {
        let mut report = self.lock();
        report.in_flight = report.in_flight.saturating_sub(1);
        report.failed += 1;
        report.last_error = Some(format!("Upload failed: {}", err.reason()));
        report.last_failed = Some(label);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, UploadReport> {
        self.report.lock().unwrap_or_else(|e| {
            error!("Upload report lock poisoned, recovering: {}", e);
            e.into_inner()
        })
    }
}
