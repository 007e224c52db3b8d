use celestial_core::{FfmpegCameraConfig, Resolution};

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Capture device settings shared by the monitor, stream and batch modes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Capture device passed to ffmpeg's `-i`.
    #[serde(default = "default_device")]
    pub device: String,
    /// ffmpeg input format (`v4l2`, `avfoundation`, `dshow`).
    #[serde(default = "default_input_format")]
    pub input_format: String,
    /// Capture size, `WIDTHxHEIGHT`.
    #[serde(default = "default_video_size")]
    pub video_size: String,
    /// Path to the ffmpeg binary.
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,
}

impl CameraConfig {
    /// Settings for [`celestial_core::FfmpegCamera`].
    pub fn camera_config(&self) -> FfmpegCameraConfig {
        FfmpegCameraConfig {
            ffmpeg_path: self.ffmpeg_path.clone(),
            input_format: self.input_format.clone(),
            device: self.device.clone(),
            video_size: self.video_size.clone(),
        }
    }

    /// `video_size` as pixels, or `None` if it is not `WIDTHxHEIGHT`.
    pub fn resolution(&self) -> Option<Resolution> {
        let (width, height) = self.video_size.split_once('x')?;
        Some(Resolution {
            width: width.trim().parse().ok()?,
            height: height.trim().parse().ok()?,
        })
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        let camera = FfmpegCameraConfig::default();
        Self {
            device: camera.device,
            input_format: camera.input_format,
            video_size: camera.video_size,
            ffmpeg_path: camera.ffmpeg_path,
        }
    }
}

fn default_device() -> String {
    FfmpegCameraConfig::default().device
}

fn default_input_format() -> String {
    FfmpegCameraConfig::default().input_format
}

fn default_video_size() -> String {
    FfmpegCameraConfig::default().video_size
}

fn default_ffmpeg_path() -> PathBuf {
    FfmpegCameraConfig::default().ffmpeg_path
}
