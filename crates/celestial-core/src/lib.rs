//! Celestial Core Library
//!
//! Minute-aligned camera capture with fire-and-forget segment upload, a live
//! video-chunk relay session, base64 frame batch storage, and the camera
//! frame feed and batch client that produce relay and receiver traffic.
//!
//! # Example
//!
//! ```no_run
//! use celestial_core::{
//!     CaptureScheduler, CoreResult, FfmpegCamera, FfmpegCameraConfig, HttpSegmentUploader,
//!     SystemClock,
//! };
//!
//! use std::{sync::Arc, time::Duration};
//!
//! #[tokio::main]
//! async fn main() -> CoreResult<()> {
//!     let camera = FfmpegCamera::new(FfmpegCameraConfig::default());
//!     let uploader = HttpSegmentUploader::new("http://localhost:8000")?;
//!     let scheduler = CaptureScheduler::new(
//!         "cam_1",
//!         Arc::new(SystemClock),
//!         Box::new(camera),
//!         Arc::new(uploader),
//!     );
//!
//!     let (handle, task) = scheduler.spawn();
//!     handle.start().await?;
//!     tokio::time::sleep(Duration::from_secs(180)).await;
//!     handle.shutdown().await?;
//!     let _ = task.await;
//!     Ok(())
//! }
//! ```

mod capture;
mod error;
mod frames;
mod relay;
mod upload;

pub use {
    capture::{
        CameraSource, CameraStream, CaptureScheduler, Clock, FfmpegCamera, FfmpegCameraConfig,
        FrameFeed, JpegSplitter, SchedulerCommand, SchedulerHandle, SchedulerState,
        SchedulerStatus, Segment, SegmentLabel, SegmentWindow, SystemClock, next_minute_boundary,
    },
    error::CoreError,
    error::Result as CoreResult,
    frames::{
        BatchMetadata, FrameBatch, FrameBatchClient, FrameRecord, FrameStore, FramesAck,
        Resolution, decode_frame_data,
    },
    relay::{
        ClientMessage, DispatchOutcome, Outbound, PeerId, PeerInfo, RelaySession, ServerMessage,
        StreamStatus,
    },
    upload::{HttpSegmentUploader, SegmentUploader, UploadAck, UploadReport, UploadTracker},
};
