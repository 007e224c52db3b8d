mod batch;
mod client;
mod store;

pub use {
    batch::{BatchMetadata, FrameBatch, FrameRecord, Resolution, decode_frame_data},
    client::{FrameBatchClient, FramesAck},
    store::FrameStore,
};
