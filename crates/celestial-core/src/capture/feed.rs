//! Still-frame feed from the camera, one JPEG per frame.

use crate::{CoreError, CoreResult, FfmpegCamera};

use std::{collections::VecDeque, panic::Location, process::Stdio};

use error_location::ErrorLocation;
use tokio::{
    io::AsyncReadExt,
    process::{Child, ChildStdout},
};
use tracing::{debug, info, instrument, warn};

const SOI: [u8; 2] = [0xff, 0xd8];
const EOI: [u8; 2] = [0xff, 0xd9];

/// Largest frame kept while waiting for its end marker.
///
/// **Memory footprint at max capacity:** 16MB, well above any single 1080p
/// JPEG; a longer run without an end marker means the stream is corrupt.
const MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

const READ_CHUNK_BYTES: usize = 64 * 1024;

/// JPEG quality passed to ffmpeg's `-q:v` (2 best, 31 worst).
const JPEG_QSCALE: &str = "5";

/// Splits a concatenated MJPEG byte stream into whole JPEG images.
///
/// Bytes before a start-of-image marker are skipped. A frame is emitted once
/// its end-of-image marker has arrived.
#[derive(Debug, Default)]
pub struct JpegSplitter {
    pending: Vec<u8>,
}

impl JpegSplitter {
    /// Create an empty splitter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `bytes` and return every frame they complete, in order.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<Vec<u8>> {
        self.pending.extend_from_slice(bytes);

        let mut frames = Vec::new();
        loop {
            let Some(start) = find_marker(&self.pending, SOI, 0) else {
                // Keep a trailing 0xff in case it is the first half of a marker.
                let keep_from = self.pending.len().saturating_sub(1);
                self.pending.drain(..keep_from);
                break;
            };
            self.pending.drain(..start);

            match find_marker(&self.pending, EOI, SOI.len()) {
                Some(end) => {
                    let frame: Vec<u8> = self.pending.drain(..end + EOI.len()).collect();
                    frames.push(frame);
                }
                None => {
                    if self.pending.len() > MAX_FRAME_BYTES {
                        warn!(
                            max_bytes = MAX_FRAME_BYTES,
                            "No end of image within frame limit, discarding"
                        );
                        self.pending.clear();
                    }
                    break;
                }
            }
        }

        frames
    }

    /// Bytes held back waiting for more input.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

fn find_marker(haystack: &[u8], marker: [u8; 2], from: usize) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(2)
        .position(|pair| pair == marker)
        .map(|i| i + from)
}

/// Live JPEG frames read from the camera at a fixed rate.
///
/// The encoder process is killed when the feed is dropped.
pub struct FrameFeed {
    child: Child,
    stdout: ChildStdout,
    splitter: JpegSplitter,
    ready: VecDeque<Vec<u8>>,
    chunk: Vec<u8>,
}

impl FrameFeed {
    /// Next complete JPEG, or `None` once the encoder has exited.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::CameraAccess`] if reading the encoder output fails.
    pub async fn next_frame(&mut self) -> CoreResult<Option<Vec<u8>>> {
        loop {
            if let Some(frame) = self.ready.pop_front() {
                return Ok(Some(frame));
            }

            let n = self
                .stdout
                .read(&mut self.chunk)
                .await
                .map_err(|e| CoreError::CameraAccess {
                    reason: format!("Failed to read camera frames: {}", e),
                    location: ErrorLocation::from(Location::caller()),
                })?;

            if n == 0 {
                debug!("Frame feed ended");
                return Ok(None);
            }

            let frames = self.splitter.push(self.chunk.get(..n).unwrap_or_default());
            self.ready.extend(frames);
        }
    }

    /// Stop the encoder and give the device back.
    pub async fn close(mut self) {
        let _ = self.child.kill().await;
        info!("Frame feed closed");
    }
}

impl FfmpegCamera {
    /// Acquire the camera and start a JPEG feed at `fps` frames per second.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::CameraAccess`] if the device cannot deliver a
    /// frame or the encoder cannot be started.
    #[instrument(skip(self), fields(device = %self.config().device))]
    pub async fn open_feed(&self, fps: u32) -> CoreResult<FrameFeed> {
        self.check_device().await?;

        let rate = fps.max(1).to_string();
        let mut command = self.config().command();
        command
            .args([
                "-an",
                "-r",
                rate.as_str(),
                "-c:v",
                "mjpeg",
                "-q:v",
                JPEG_QSCALE,
                "-f",
                "image2pipe",
                "pipe:1",
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());

        let mut child = command.spawn().map_err(|e| CoreError::CameraAccess {
            reason: format!("Failed to start frame encoder: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let Some(stdout) = child.stdout.take() else {
            let _ = child.kill().await;
            return Err(CoreError::CameraAccess {
                reason: "Failed to capture frame encoder stdout".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        };

        info!(fps = fps.max(1), "Frame feed started");

        Ok(FrameFeed {
            child,
            stdout,
            splitter: JpegSplitter::new(),
            ready: VecDeque::new(),
            chunk: vec![0u8; READ_CHUNK_BYTES],
        })
    }
}
