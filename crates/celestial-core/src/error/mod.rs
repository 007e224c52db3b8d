use error_location::ErrorLocation;
use thiserror::Error;

/// Capture, relay, and frame-storage errors with source location tracking.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Camera could not be opened or the recorder failed.
    #[error("Camera access error: {reason} {location}")]
    CameraAccess {
        /// Description of the camera failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Segment upload failed. Uploads are never retried.
    #[error("Upload failed: {reason} {location}")]
    Upload {
        /// Human-readable failure, preferring the backend's `detail` field.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// A frame in a batch could not be decoded or written.
    #[error("Frame decode/write failed: {reason} {location}")]
    DecodeWrite {
        /// Description of the decode or write failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// An inbound relay message was not valid JSON for the protocol.
    #[error("Malformed message: {reason} {location}")]
    Parse {
        /// Parser error message.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// A WebSocket transport failed.
    #[error("Connection error: {reason} {location}")]
    Connection {
        /// Description of the transport failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// A scheduler command could not be delivered.
    #[error("Channel closed: {message} {location}")]
    ChannelClosed {
        /// Human-readable error message.
        message: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },
}

impl CoreError {
    /// Message without the location suffix, suitable for API responses.
    pub fn reason(&self) -> &str {
        match self {
            CoreError::CameraAccess { reason, .. }
            | CoreError::Upload { reason, .. }
            | CoreError::DecodeWrite { reason, .. }
            | CoreError::Parse { reason, .. }
            | CoreError::Connection { reason, .. } => reason,
            CoreError::ChannelClosed { message, .. } => message,
        }
    }
}

/// Result type alias using [`CoreError`].
pub type Result<T> = std::result::Result<T, CoreError>;
