//! Minute-aligned capture loop.
//!
//! The scheduler owns the camera for as long as monitoring is active and
//! turns it into a gap-free run of one-minute [`Segment`]s. Each sealed
//! segment is handed to a [`SegmentUploader`] on its own task; the loop never
//! waits for an upload, and a failed upload is recorded and then forgotten.

use crate::{
    CoreError, CoreResult,
    capture::{
        CameraSource, CameraStream, Clock, Segment, SegmentLabel, SegmentWindow, SchedulerState,
    },
    upload::{SegmentUploader, UploadTracker},
};

use std::{panic::Location, sync::Arc, time::Duration};

use error_location::ErrorLocation;
use tokio::{
    sync::{mpsc, oneshot, watch},
    task::JoinHandle,
};
use tracing::{debug, error, info, instrument, warn};

const COMMAND_BUFFER: usize = 8;

/// Commands accepted by a running scheduler.
#[derive(Debug)]
pub enum SchedulerCommand {
    /// Acquire the camera and wait for the next minute mark.
    Start {
        /// Receives the camera acquisition result.
        reply: oneshot::Sender<CoreResult<()>>,
    },
    /// Stop monitoring. An open segment is discarded.
    Stop,
    /// Stop monitoring and end the scheduler task.
    Shutdown,
}

/// Point-in-time view of the scheduler for status reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerStatus {
    /// Current state.
    pub state: SchedulerState,
    /// Recording windows begun since the last start.
    pub segments_started: u64,
    /// Monitoring ended on its own after a recorder failure. Cleared by the
    /// next successful start.
    pub faulted: bool,
}

/// Cloneable handle to a spawned [`CaptureScheduler`].
#[derive(Debug, Clone)]
pub struct SchedulerHandle {
    command_tx: mpsc::Sender<SchedulerCommand>,
    status_rx: watch::Receiver<SchedulerStatus>,
    uploads: UploadTracker,
}

impl SchedulerHandle {
    /// Start monitoring.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::CameraAccess`] if the camera cannot be acquired;
    /// the scheduler stays idle.
    pub async fn start(&self) -> CoreResult<()> {
        let (reply, reply_rx) = oneshot::channel();

        self.command_tx
            .send(SchedulerCommand::Start { reply })
            .await
            .map_err(|e| CoreError::ChannelClosed {
                message: format!("Failed to send Start: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        reply_rx.await.map_err(|e| CoreError::ChannelClosed {
            message: format!("Scheduler dropped Start reply: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?
    }

    /// Stop monitoring, discarding any open segment.
    pub async fn stop(&self) -> CoreResult<()> {
        self.send(SchedulerCommand::Stop).await
    }

    /// Stop monitoring and end the scheduler task.
    pub async fn shutdown(&self) -> CoreResult<()> {
        self.send(SchedulerCommand::Shutdown).await
    }

    /// Latest scheduler status.
    pub fn status(&self) -> SchedulerStatus {
        *self.status_rx.borrow()
    }

    /// Wait for the next status change and return it.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ChannelClosed`] once the scheduler task has ended.
    pub async fn changed(&mut self) -> CoreResult<SchedulerStatus> {
        self.status_rx
            .changed()
            .await
            .map_err(|e| CoreError::ChannelClosed {
                message: format!("Scheduler status closed: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        Ok(*self.status_rx.borrow_and_update())
    }

    /// Upload outcomes reported by the scheduler's upload tasks.
    pub fn uploads(&self) -> &UploadTracker {
        &self.uploads
    }

    async fn send(&self, command: SchedulerCommand) -> CoreResult<()> {
        self.command_tx
            .send(command)
            .await
            .map_err(|e| CoreError::ChannelClosed {
                message: format!("Failed to send scheduler command: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })
    }
}

/// Produces contiguous, minute-aligned segments while monitoring is active.
///
/// Drive it directly with [`start`](Self::start), [`on_wake`](Self::on_wake)
/// and [`stop`](Self::stop), or hand it to a task with [`spawn`](Self::spawn).
pub struct CaptureScheduler {
    camera_id: String,
    clock: Arc<dyn Clock>,
    camera: Box<dyn CameraSource>,
    uploader: Arc<dyn SegmentUploader>,
    uploads: UploadTracker,
    state: SchedulerState,
    stream: Option<Box<dyn CameraStream>>,
    segments_started: u64,
    faulted: bool,
    status_tx: watch::Sender<SchedulerStatus>,
}

impl CaptureScheduler {
    /// Create an idle scheduler.
    pub fn new(
        camera_id: impl Into<String>,
        clock: Arc<dyn Clock>,
        camera: Box<dyn CameraSource>,
        uploader: Arc<dyn SegmentUploader>,
    ) -> Self {
        let (status_tx, _) = watch::channel(SchedulerStatus {
            state: SchedulerState::Idle,
            segments_started: 0,
            faulted: false,
        });

        Self {
            camera_id: camera_id.into(),
            clock,
            camera,
            uploader,
            uploads: UploadTracker::default(),
            state: SchedulerState::Idle,
            stream: None,
            segments_started: 0,
            faulted: false,
            status_tx,
        }
    }

    /// Current state.
    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Recording windows begun since the last start.
    pub fn segments_started(&self) -> u64 {
        self.segments_started
    }

    /// Shared upload outcome tracker.
    pub fn uploads(&self) -> UploadTracker {
        self.uploads.clone()
    }

    /// When the scheduler next needs [`on_wake`](Self::on_wake).
    pub fn next_wake(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.state.next_wake()
    }

    /// Acquire the camera and arm the first minute boundary.
    ///
    /// Starting an already running scheduler does nothing.
    ///
    /// # Errors
    ///
    /// Returns the camera's acquisition error; the scheduler stays idle.
    #[instrument(skip(self), fields(camera_id = %self.camera_id))]
    pub async fn start(&mut self) -> CoreResult<()> {
        if !self.state.is_idle() {
            debug!("Monitoring already active");
            return Ok(());
        }

        let stream = self.camera.open().await?;
        self.stream = Some(stream);
        self.segments_started = 0;
        self.faulted = false;

        let now = self.clock.now();
        let armed = SchedulerState::armed_at(now);
        self.set_state(armed);

        if let Some(boundary) = armed.next_wake() {
            info!(now = %now, boundary = %boundary, "Waiting for minute boundary");
        }

        Ok(())
    }

    /// Stop monitoring.
    ///
    /// An open segment is stopped and dropped without being uploaded: only
    /// fully bounded segments leave the scheduler.
    #[instrument(skip(self), fields(camera_id = %self.camera_id))]
    pub async fn stop(&mut self) {
        if let SchedulerState::Recording { window } = self.state {
            if let Some(stream) = self.stream.as_mut() {
                match stream.stop_recording().await {
                    Ok(data) => info!(
                        start = %window.start,
                        bytes = data.len(),
                        "Recording stopped without upload (incomplete segment)"
                    ),
                    Err(e) => warn!(error = ?e, "Failed to stop incomplete segment"),
                }
            }
        }

        self.release_stream().await;

        if !self.state.is_idle() {
            info!(segments_started = self.segments_started, "Monitoring stopped");
        }
        self.set_state(SchedulerState::Idle);
    }

    /// Take the transition due at [`next_wake`](Self::next_wake).
    ///
    /// Opens the first segment, or seals the open one, dispatches it for
    /// upload, and opens the next. Must be called inside a tokio runtime.
    ///
    /// # Errors
    ///
    /// A recorder failure stops monitoring, releases the camera and marks the
    /// status as faulted.
    #[instrument(skip(self), fields(camera_id = %self.camera_id))]
    pub async fn on_wake(&mut self) -> CoreResult<()> {
        if self.state.is_idle() {
            return Ok(());
        }

        let (next, sealed) = self.state.advance();
        let result = self.transition(next, sealed).await;

        if result.is_err() {
            self.release_stream().await;
            self.faulted = true;
            self.set_state(SchedulerState::Idle);
        }

        result
    }

    /// Run the scheduler on its own task.
    pub fn spawn(self) -> (SchedulerHandle, JoinHandle<()>) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let handle = SchedulerHandle {
            command_tx,
            status_rx: self.status_tx.subscribe(),
            uploads: self.uploads.clone(),
        };

        let task = tokio::spawn(self.run(command_rx));

        (handle, task)
    }

    /// Command and timer loop. Returns on `Shutdown` or when every handle is dropped.
    #[instrument(skip_all, fields(camera_id = %self.camera_id))]
    pub async fn run(mut self, mut command_rx: mpsc::Receiver<SchedulerCommand>) {
        info!("Capture scheduler running");

        loop {
            // Recomputed from the absolute wake time on every pass.
            let delay = self.delay_until_wake();

            tokio::select! {
                command = command_rx.recv() => match command {
                    Some(SchedulerCommand::Start { reply }) => {
                        let result = self.start().await;
                        if let Err(e) = &result {
                            error!(error = ?e, "Failed to start monitoring");
                        }
                        let _ = reply.send(result);
                    }
                    Some(SchedulerCommand::Stop) => self.stop().await,
                    Some(SchedulerCommand::Shutdown) | None => {
                        self.stop().await;
                        break;
                    }
                },

                () = sleep_for(delay) => {
                    if let Err(e) = self.on_wake().await {
                        error!(error = ?e, "Recording cycle failed, monitoring stopped");
                    }
                }
            }
        }

        info!("Capture scheduler stopped");
    }

    async fn transition(
        &mut self,
        next: SchedulerState,
        sealed: Option<SegmentWindow>,
    ) -> CoreResult<()> {
        if let Some(window) = sealed {
            let data = self.stream_mut()?.stop_recording().await?;
            self.dispatch_upload(Segment::seal(window, data));
        }

        self.stream_mut()?.start_recording().await?;
        self.segments_started += 1;
        self.set_state(next);

        if let SchedulerState::Recording { window } = next {
            info!(
                segment = self.segments_started,
                start = %window.start,
                end = %window.end,
                "Recording segment"
            );
        }

        Ok(())
    }

    fn dispatch_upload(&self, segment: Segment) {
        let label = SegmentLabel::new(self.camera_id.clone(), segment.window());
        let uploader = Arc::clone(&self.uploader);
        let uploads = self.uploads.clone();

        debug!(bytes = segment.len(), start = %label.start_time, "Segment sealed");
        uploads.record_dispatch();

        tokio::spawn(async move {
            match uploader.upload(segment, &label).await {
                Ok(ack) => {
                    info!(start = %label.start_param(), end = %label.end_param(), "Chunk uploaded");
                    uploads.record_success(label, ack);
                }
                Err(e) => {
                    warn!(start = %label.start_param(), error = %e, "Chunk upload failed, segment lost");
                    uploads.record_failure(label, &e);
                }
            }
        });
    }

    #[track_caller]
    fn stream_mut(&mut self) -> CoreResult<&mut Box<dyn CameraStream>> {
        self.stream.as_mut().ok_or_else(|| CoreError::CameraAccess {
            reason: "Camera stream not acquired".to_string(),
            location: ErrorLocation::from(Location::caller()),
        })
    }

    async fn release_stream(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.release().await;
        }
    }

    fn set_state(&mut self, state: SchedulerState) {
        self.state = state;
        self.status_tx.send_replace(SchedulerStatus {
            state,
            segments_started: self.segments_started,
            faulted: self.faulted,
        });
    }

    fn delay_until_wake(&self) -> Option<Duration> {
        self.next_wake()
            .map(|wake| (wake - self.clock.now()).to_std().unwrap_or(Duration::ZERO))
    }
}

async fn sleep_for(delay: Option<Duration>) {
    match delay {
        Some(delay) => tokio::time::sleep(delay).await,
        None => std::future::pending().await,
    }
}
