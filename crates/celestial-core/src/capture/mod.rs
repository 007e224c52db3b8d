mod boundary;
mod camera;
mod clock;
mod feed;
mod scheduler;
mod segment;
mod state;

pub use {
    boundary::{SegmentWindow, next_minute_boundary},
    camera::{CameraSource, CameraStream, FfmpegCamera, FfmpegCameraConfig},
    clock::{Clock, SystemClock},
    feed::{FrameFeed, JpegSplitter},
    scheduler::{CaptureScheduler, SchedulerCommand, SchedulerHandle, SchedulerStatus},
    segment::{Segment, SegmentLabel},
    state::SchedulerState,
};
