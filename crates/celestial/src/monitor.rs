//! Monitor mode: continuous minute-aligned capture with segment upload.

use crate::{
    AppError, AppResult,
    config::{CameraConfig, MonitorConfig},
    shutdown::shutdown_signal,
};

use celestial_core::{
    CaptureScheduler, FfmpegCamera, HttpSegmentUploader, SchedulerHandle, SystemClock,
};

use std::{future::Future, panic::Location, sync::Arc, time::Duration};

use error_location::ErrorLocation;
use tokio::sync::watch;
use tracing::{error, info, instrument, warn};

const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(10);

/// Record and upload until a shutdown signal. An open segment at shutdown is
/// discarded.
///
/// Returns [`AppError::CaptureStopped`] if recording stops on its own first.
#[instrument(skip_all, fields(camera_id = %config.camera_id))]
pub(crate) async fn run_monitor(camera: &CameraConfig, config: &MonitorConfig) -> AppResult<()> {
    let uploader = Arc::new(HttpSegmentUploader::new(config.backend_url.as_str())?);
    let scheduler = CaptureScheduler::new(
        config.camera_id.clone(),
        Arc::new(SystemClock),
        Box::new(FfmpegCamera::new(camera.camera_config())),
        uploader.clone(),
    );

    let (handle, task) = scheduler.spawn();
    handle.start().await?;

    info!(backend_url = %uploader.base_url(), "Monitoring started");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let health = tokio::spawn(watch_backend(Arc::clone(&uploader), shutdown_rx));

    let outcome = supervise(handle.clone(), shutdown_signal()).await;

    let _ = shutdown_tx.send(true);
    handle.shutdown().await?;

    if let Err(e) = task.await {
        error!(error = ?e, "Capture scheduler task failed");
    }
    if let Err(e) = health.await {
        warn!(error = ?e, "Backend health check task failed");
    }

    let report = handle.uploads().snapshot();
    info!(
        succeeded = report.succeeded,
        failed = report.failed,
        in_flight = report.in_flight,
        "Monitoring stopped"
    );

    outcome
}

/// Wait for `shutdown`, or for the scheduler to stop itself after a recorder
/// failure, whichever comes first.
pub(crate) async fn supervise(
    mut watcher: SchedulerHandle,
    shutdown: impl Future<Output = ()>,
) -> AppResult<()> {
    tokio::pin!(shutdown);

    let mut status = watcher.status();
    while !status.faulted {
        tokio::select! {
            () = &mut shutdown => return Ok(()),
            changed = watcher.changed() => status = changed?,
        }
    }

    warn!(
        segments_started = status.segments_started,
        "Recording stopped without a stop request"
    );

    Err(AppError::CaptureStopped {
        reason: "Recorder failed, monitoring is no longer running".to_string(),
        location: ErrorLocation::from(Location::caller()),
    })
}

/// Log backend reachability whenever it changes.
async fn watch_backend(uploader: Arc<HttpSegmentUploader>, mut shutdown_rx: watch::Receiver<bool>) {
    let mut interval = tokio::time::interval(HEALTH_CHECK_INTERVAL);
    let mut reachable = None;

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => break,
            _ = interval.tick() => {
                let now_reachable = uploader.is_reachable().await;
                if reachable != Some(now_reachable) {
                    if now_reachable {
                        info!(backend_url = %uploader.base_url(), "Backend reachable");
                    } else {
                        warn!(backend_url = %uploader.base_url(), "Backend unreachable, uploads will fail");
                    }
                    reachable = Some(now_reachable);
                }
            }
        }
    }
}
