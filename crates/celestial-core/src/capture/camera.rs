use crate::{CoreError, CoreResult};

use std::{
    panic::Location,
    path::PathBuf,
    process::Stdio,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use error_location::ErrorLocation;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    process::{Child, ChildStdout, Command},
    task::JoinHandle,
};
use tracing::{debug, error, info, instrument, warn};

/// Hard cap on bytes buffered for one segment.
///
/// **Memory footprint at max capacity:** 256MB. A one-minute 720p VP8 segment
/// at realtime settings is typically 5-15MB, so hitting the cap means the
/// encoder is misconfigured; further output is dropped rather than buffered.
const MAX_SEGMENT_BYTES: usize = 256 * 1024 * 1024;

/// Time allowed for the encoder to finalize its container after `q`.
const STOP_GRACE: Duration = Duration::from_secs(5);

/// Time allowed for the single-frame device check in [`CameraSource::open`].
const OPEN_TIMEOUT: Duration = Duration::from_secs(10);

const READ_CHUNK_BYTES: usize = 64 * 1024;

/// Something that can hand out exclusive access to a camera.
#[async_trait]
pub trait CameraSource: Send + Sync {
    /// Acquire the camera.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::CameraAccess`] if the device is missing or
    /// permission is denied.
    async fn open(&self) -> CoreResult<Box<dyn CameraStream>>;
}

/// An acquired camera that records one segment at a time.
#[async_trait]
pub trait CameraStream: Send {
    /// Begin encoding a new segment.
    async fn start_recording(&mut self) -> CoreResult<()>;

    /// Finish the open segment and return its encoded bytes.
    async fn stop_recording(&mut self) -> CoreResult<Vec<u8>>;

    /// Stop everything and give the device back.
    async fn release(&mut self);
}

/// Settings for the `ffmpeg`-backed camera.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FfmpegCameraConfig {
    /// Path to the `ffmpeg` binary.
    pub ffmpeg_path: PathBuf,
    /// Input demuxer (`v4l2`, `avfoundation`, `dshow`).
    pub input_format: String,
    /// Device name or path passed to `-i`.
    pub device: String,
    /// Capture size, `WIDTHxHEIGHT`.
    pub video_size: String,
}

impl Default for FfmpegCameraConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            input_format: "v4l2".to_string(),
            device: "/dev/video0".to_string(),
            video_size: "1280x720".to_string(),
        }
    }
}

impl FfmpegCameraConfig {
    /// `-f <format> -video_size <size> -i <device>`, shared by every capture.
    pub(crate) fn input_args(&self) -> [&str; 6] {
        [
            "-f",
            self.input_format.as_str(),
            "-video_size",
            self.video_size.as_str(),
            "-i",
            self.device.as_str(),
        ]
    }

    /// An `ffmpeg` command reading from the configured device.
    ///
    /// The child is killed if its handle is dropped.
    pub(crate) fn command(&self) -> Command {
        let mut command = Command::new(&self.ffmpeg_path);
        command
            .args(["-hide_banner", "-loglevel", "error"])
            .args(self.input_args())
            .kill_on_drop(true);
        command
    }
}

/// Camera that records WebM/VP8 segments through an `ffmpeg` child process.
#[derive(Debug, Clone)]
pub struct FfmpegCamera {
    config: FfmpegCameraConfig,
}

impl FfmpegCamera {
    /// Create a camera source. Nothing is touched until [`CameraSource::open`].
    pub fn new(config: FfmpegCameraConfig) -> Self {
        Self { config }
    }

    /// Settings this camera was built with.
    pub fn config(&self) -> &FfmpegCameraConfig {
        &self.config
    }

    /// Read one frame from the device and throw it away.
    ///
    /// Fails the same way a recording would: missing device, permission
    /// denied, busy device, or a missing `ffmpeg`.
    pub(crate) async fn check_device(&self) -> CoreResult<()> {
        let mut command = self.config.command();
        command
            .args(["-frames:v", "1", "-f", "null", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        let output = tokio::time::timeout(OPEN_TIMEOUT, command.output())
            .await
            .map_err(|_| CoreError::CameraAccess {
                reason: format!(
                    "No frame from {} within {}s",
                    self.config.device,
                    OPEN_TIMEOUT.as_secs()
                ),
                location: ErrorLocation::from(Location::caller()),
            })?
            .map_err(|e| CoreError::CameraAccess {
                reason: format!("Failed to run {}: {}", self.config.ffmpeg_path.display(), e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = stderr
                .lines()
                .rev()
                .find(|line| !line.trim().is_empty())
                .unwrap_or("no diagnostic output");
            return Err(CoreError::CameraAccess {
                reason: format!(
                    "Cannot open {} ({}): {}",
                    self.config.device, output.status, detail
                ),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        Ok(())
    }
}

#[async_trait]
impl CameraSource for FfmpegCamera {
    #[instrument(skip(self), fields(device = %self.config.device))]
    async fn open(&self) -> CoreResult<Box<dyn CameraStream>> {
        self.check_device().await?;

        info!(
            input_format = %self.config.input_format,
            video_size = %self.config.video_size,
            "Camera acquired"
        );

        Ok(Box::new(FfmpegStream {
            config: self.config.clone(),
            recorder: None,
        }))
    }
}

struct ActiveRecorder {
    child: Child,
    reader: JoinHandle<Vec<u8>>,
    started_at: Instant,
}

struct FfmpegStream {
    config: FfmpegCameraConfig,
    recorder: Option<ActiveRecorder>,
}

impl FfmpegStream {
    fn encoder_command(&self) -> Command {
        let mut command = self.config.command();
        command
            .args([
                "-an",
                "-c:v",
                "libvpx",
                "-deadline",
                "realtime",
                "-b:v",
                "1M",
                "-f",
                "webm",
                "pipe:1",
            ])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());
        command
    }
}

#[async_trait]
impl CameraStream for FfmpegStream {
    #[instrument(skip(self))]
    async fn start_recording(&mut self) -> CoreResult<()> {
        if self.recorder.is_some() {
            return Err(CoreError::CameraAccess {
                reason: "A segment is already being recorded".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let mut child = self
            .encoder_command()
            .spawn()
            .map_err(|e| CoreError::CameraAccess {
                reason: format!("Failed to start encoder: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        let Some(stdout) = child.stdout.take() else {
            let _ = child.kill().await;
            return Err(CoreError::CameraAccess {
                reason: "Failed to capture encoder stdout".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        };

        // Drained continuously so the encoder never blocks on a full pipe,
        // even once the cap has been hit.
        let reader = tokio::spawn(drain_encoder_output(stdout));

        self.recorder = Some(ActiveRecorder {
            child,
            reader,
            started_at: Instant::now(),
        });

        debug!("Encoder started");

        Ok(())
    }

    #[instrument(skip(self))]
    async fn stop_recording(&mut self) -> CoreResult<Vec<u8>> {
        let ActiveRecorder {
            mut child,
            reader,
            started_at,
        } = self.recorder.take().ok_or_else(|| CoreError::CameraAccess {
            reason: "No segment is being recorded".to_string(),
            location: ErrorLocation::from(Location::caller()),
        })?;

        // `q` on stdin asks ffmpeg to flush and close the container cleanly.
        if let Some(mut stdin) = child.stdin.take() {
            let _ = stdin.write_all(b"q").await;
        }

        let status = match tokio::time::timeout(STOP_GRACE, child.wait()).await {
            Ok(Ok(status)) => Some(status),
            Ok(Err(e)) => {
                warn!(error = %e, "Failed to wait for encoder");
                let _ = child.kill().await;
                None
            }
            Err(_) => {
                warn!("Encoder did not finalize in time, killing");
                let _ = child.kill().await;
                None
            }
        };

        let data = reader.await.unwrap_or_else(|e| {
            error!("Encoder output reader failed: {}", e);
            Vec::new()
        });

        if data.is_empty() {
            return Err(CoreError::CameraAccess {
                reason: match status {
                    Some(status) => format!("Encoder produced no output (exit: {})", status),
                    None => "Encoder produced no output".to_string(),
                },
                location: ErrorLocation::from(Location::caller()),
            });
        }

        debug!(
            bytes = data.len(),
            elapsed_ms = started_at.elapsed().as_millis(),
            "Encoder stopped"
        );

        Ok(data)
    }

    async fn release(&mut self) {
        if let Some(mut recorder) = self.recorder.take() {
            let _ = recorder.child.kill().await;
            recorder.reader.abort();
        }
        info!("Camera released");
    }
}

async fn drain_encoder_output(mut stdout: ChildStdout) -> Vec<u8> {
    let mut data = Vec::new();
    let mut chunk = vec![0u8; READ_CHUNK_BYTES];
    let mut capped = false;

    loop {
        match stdout.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => {
                if data.len() + n <= MAX_SEGMENT_BYTES {
                    data.extend_from_slice(chunk.get(..n).unwrap_or_default());
                } else if !capped {
                    capped = true;
                    warn!(
                        max_bytes = MAX_SEGMENT_BYTES,
                        "Segment buffer full, dropping encoder output"
                    );
                }
            }
            Err(e) => {
                warn!(error = %e, "Encoder output read failed");
                break;
            }
        }
    }

    data
}
