mod batch_config;
mod camera_config;
#[allow(clippy::module_inception)]
mod config;
mod monitor_config;
mod receiver_config;
mod relay_config;
mod stream_config;

pub(crate) use {
    batch_config::BatchConfig, camera_config::CameraConfig, config::Config,
    monitor_config::MonitorConfig, receiver_config::ReceiverConfig, relay_config::RelayConfig,
    stream_config::StreamConfig,
};

use std::path::PathBuf;

use directories::ProjectDirs;

pub(crate) const DEFAULT_RELAY_PORT: u16 = 3001;
pub(crate) const DEFAULT_PEER_BUFFER: usize = 256;
pub(crate) const DEFAULT_RECEIVER_PORT: u16 = 3002;
pub(crate) const DEFAULT_BODY_LIMIT_MB: usize = 50;
pub(crate) const DEFAULT_CAMERA_ID: &str = "cam_1";
pub(crate) const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
pub(crate) const DEFAULT_RELAY_URL: &str = "ws://localhost:3001/ws";
pub(crate) const DEFAULT_STREAM_FPS: u32 = 60;
pub(crate) const DEFAULT_RECEIVER_URL: &str = "http://localhost:3002";
pub(crate) const DEFAULT_FRAME_COUNT: usize = 50;
pub(crate) const DEFAULT_BATCH_FPS: u32 = 10;

const FRAMES_DIR_NAME: &str = "received-frames";

pub(crate) fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "celestial", "Celestial")
}

pub(crate) fn default_relay_port() -> u16 {
    DEFAULT_RELAY_PORT
}

pub(crate) fn default_peer_buffer() -> usize {
    DEFAULT_PEER_BUFFER
}

pub(crate) fn default_receiver_port() -> u16 {
    DEFAULT_RECEIVER_PORT
}

pub(crate) fn default_body_limit_mb() -> usize {
    DEFAULT_BODY_LIMIT_MB
}

/// `<data dir>/received-frames`, or a relative `received-frames` when the
/// platform has no home directory.
pub(crate) fn default_frames_dir() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_dir().join(FRAMES_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(FRAMES_DIR_NAME))
}

pub(crate) fn default_camera_id() -> String {
    DEFAULT_CAMERA_ID.to_string()
}

pub(crate) fn default_backend_url() -> String {
    DEFAULT_BACKEND_URL.to_string()
}

pub(crate) fn default_relay_url() -> String {
    DEFAULT_RELAY_URL.to_string()
}

pub(crate) fn default_stream_fps() -> u32 {
    DEFAULT_STREAM_FPS
}

pub(crate) fn default_receiver_url() -> String {
    DEFAULT_RECEIVER_URL.to_string()
}

pub(crate) fn default_frame_count() -> usize {
    DEFAULT_FRAME_COUNT
}

pub(crate) fn default_batch_fps() -> u32 {
    DEFAULT_BATCH_FPS
}
