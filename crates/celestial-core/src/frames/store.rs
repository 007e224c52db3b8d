//! On-disk storage for received frame batches.

use crate::{CoreError, CoreResult, frames::FrameBatch, frames::decode_frame_data};

use std::{
    fs,
    panic::Location,
    path::{Path, PathBuf},
};

use error_location::ErrorLocation;
use tracing::{debug, info, instrument};

/// Writes each frame of a batch to its own file in one directory.
#[derive(Debug, Clone)]
pub struct FrameStore {
    dir: PathBuf,
}

impl FrameStore {
    /// Store frames under `dir`. Call [`ensure_dir`](Self::ensure_dir) before use.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory frames are written to.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the frames directory if it does not exist.
    #[track_caller]
    pub fn ensure_dir(&self) -> CoreResult<()> {
        fs::create_dir_all(&self.dir).map_err(|e| CoreError::DecodeWrite {
            reason: format!("Failed to create {}: {}", self.dir.display(), e),
            location: ErrorLocation::from(Location::caller()),
        })
    }

    /// File name for the frame at zero-based `index` within its batch.
    pub fn file_name(frame_id: &str, index: usize) -> String {
        format!("frame_{}_{}.jpg", frame_id, index + 1)
    }

    /// Decode and write every frame in order, returning the count written.
    ///
    /// The first bad frame aborts the batch. Files written before it are left
    /// on disk: a batch is all-or-nothing in its response, not on disk.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::DecodeWrite`] for the first frame that fails.
    #[track_caller]
    #[instrument(skip(self, batch), fields(frame_count = batch.frames.len()))]
    pub fn persist_batch(&self, batch: &FrameBatch) -> CoreResult<usize> {
        info!(
            total_frames = batch.metadata.total_frames,
            sent_at = batch.metadata.timestamp,
            resolution = %format!("{}x{}", batch.metadata.resolution.width, batch.metadata.resolution.height),
            "Received frame batch"
        );

        let count = batch.frames.len();
        for (index, frame) in batch.frames.iter().enumerate() {
            let bytes = decode_frame_data(&frame.data)?;
            let file_name = Self::file_name(&frame.file_id()?, index);
            let path = self.dir.join(&file_name);

            fs::write(&path, &bytes).map_err(|e| CoreError::DecodeWrite {
                reason: format!("Failed to write {}: {}", path.display(), e),
                location: ErrorLocation::from(Location::caller()),
            })?;

            debug!(frame = index + 1, of = count, file = %file_name, "Saved frame");
        }

        Ok(count)
    }
}
