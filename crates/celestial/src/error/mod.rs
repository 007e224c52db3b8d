use celestial_core::CoreError;

use std::{panic::Location, result::Result as StdResult};

use error_location::ErrorLocation;
use thiserror::Error;

/// Application-level errors for the celestial binary.
///
/// All variants include `ErrorLocation` for call-site tracking.
#[derive(Error, Debug)]
pub enum AppError {
    /// Capture, upload, relay, or frame error from celestial-core.
    #[error("Core error: {source} {location}")]
    Core {
        /// The underlying core error.
        #[source]
        source: CoreError,
        /// Location where this error was created.
        location: ErrorLocation,
    },

    /// Configuration loading or saving error.
    #[error("Configuration error: {reason} {location}")]
    ConfigError {
        /// Human-readable reason for failure.
        reason: String,
        /// Location where this error was created.
        location: ErrorLocation,
    },

    /// Failed to bind or run an HTTP server.
    #[error("Server error: {reason} {location}")]
    ServerError {
        /// Human-readable reason for failure.
        reason: String,
        /// Location where this error was created.
        location: ErrorLocation,
    },

    /// Capture ended on its own, or produced nothing to send.
    #[error("Capture stopped: {reason} {location}")]
    CaptureStopped {
        /// Human-readable reason for failure.
        reason: String,
        /// Location where this error was created.
        location: ErrorLocation,
    },

    /// IO error from filesystem operations.
    #[error("IO error: {source} {location}")]
    IoError {
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
        /// Location where this error was created.
        location: ErrorLocation,
    },
}

// Manual From<CoreError> with location tracking.
// Cannot use #[from] because it does not support extra fields.
impl From<CoreError> for AppError {
    #[track_caller]
    fn from(source: CoreError) -> Self {
        AppError::Core {
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<std::io::Error> for AppError {
    #[track_caller]
    fn from(source: std::io::Error) -> Self {
        AppError::IoError {
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

/// Convenience type alias for Results using `AppError`.
pub type Result<T> = StdResult<T, AppError>;
