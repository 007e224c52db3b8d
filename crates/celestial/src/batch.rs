//! Batch mode: capture still frames and post them to a frame receiver.

use crate::{
    AppError, AppResult,
    config::{BatchConfig, CameraConfig},
    shutdown::shutdown_signal,
    stream::feed_frames,
};

use celestial_core::{
    CoreResult, FfmpegCamera, FrameBatch, FrameBatchClient, FrameRecord, FramesAck, Resolution,
};

use std::{future::Future, panic::Location};

use chrono::Utc;
use error_location::ErrorLocation;
use futures::{Stream, StreamExt};
use tracing::{info, instrument, warn};

const FALLBACK_RESOLUTION: Resolution = Resolution {
    width: 1280,
    height: 720,
};

/// Capture `frame_count` frames, or fewer if interrupted, and send them in
/// one batch.
#[instrument(skip_all, fields(receiver_url = %config.receiver_url, frame_count = config.frame_count))]
pub(crate) async fn run_batch(camera: &CameraConfig, config: &BatchConfig) -> AppResult<()> {
    let resolution = camera.resolution().unwrap_or_else(|| {
        warn!(video_size = %camera.video_size, "Unrecognised video size, reporting 1280x720");
        FALLBACK_RESOLUTION
    });
    let client = FrameBatchClient::new(config.receiver_url.as_str())?;

    let feed = FfmpegCamera::new(camera.camera_config())
        .open_feed(config.fps)
        .await?;
    let frames = capture_frames(feed_frames(feed), config.frame_count, shutdown_signal()).await?;

    let ack = send_batch(&client, frames, resolution).await?;

    info!(
        frames_received = ack.frames_received,
        saved_to = %ack.saved_to,
        "{}",
        ack.message
    );

    Ok(())
}

/// Stamp frames as they arrive until `frame_count` are held, the source ends,
/// or `shutdown` completes.
pub(crate) async fn capture_frames<S>(
    frames: S,
    frame_count: usize,
    shutdown: impl Future<Output = ()>,
) -> AppResult<Vec<FrameRecord>>
where
    S: Stream<Item = CoreResult<Vec<u8>>>,
{
    tokio::pin!(frames);
    tokio::pin!(shutdown);

    let mut records = Vec::with_capacity(frame_count);
    while records.len() < frame_count {
        tokio::select! {
            () = &mut shutdown => {
                info!(captured = records.len(), "Capture interrupted, sending what was captured");
                break;
            }
            frame = frames.next() => match frame {
                Some(jpeg) => records.push(FrameRecord::jpeg(&jpeg?, Utc::now())),
                None => {
                    warn!(captured = records.len(), "Camera feed ended early");
                    break;
                }
            },
        }
    }

    Ok(records)
}

/// Post `frames` as one batch.
///
/// Returns [`AppError::CaptureStopped`] when there is nothing to send.
pub(crate) async fn send_batch(
    client: &FrameBatchClient,
    frames: Vec<FrameRecord>,
    resolution: Resolution,
) -> AppResult<FramesAck> {
    if frames.is_empty() {
        return Err(AppError::CaptureStopped {
            reason: "No frames to send".to_string(),
            location: ErrorLocation::from(Location::caller()),
        });
    }

    let batch = FrameBatch::new(frames, resolution, Utc::now());
    Ok(client.send(&batch).await?)
}
