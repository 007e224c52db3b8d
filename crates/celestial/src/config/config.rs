//! Configuration management for celestial.
//!
//! Handles loading and saving TOML configuration files with cross-platform
//! paths and atomic write operations.

use crate::{
    AppError, AppResult,
    config::{
        BatchConfig, CameraConfig, MonitorConfig, ReceiverConfig, RelayConfig, StreamConfig,
        project_dirs,
    },
};

use std::{
    fs,
    io::Write,
    panic::Location,
    path::{Path, PathBuf},
};

use error_location::ErrorLocation;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

/// Main configuration struct.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Live relay server settings.
    #[serde(default)]
    pub relay: RelayConfig,
    /// Frame receiver server settings.
    #[serde(default)]
    pub receiver: ReceiverConfig,
    /// Capture device settings.
    #[serde(default)]
    pub camera: CameraConfig,
    /// Capture scheduler and uploader settings.
    #[serde(default)]
    pub monitor: MonitorConfig,
    /// Live producer settings.
    #[serde(default)]
    pub stream: StreamConfig,
    /// Still-frame batch settings.
    #[serde(default)]
    pub batch: BatchConfig,
}

impl Config {
    /// Load configuration from the platform config directory, creating a
    /// default file if none exists.
    #[track_caller]
    #[instrument]
    pub fn load() -> AppResult<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            info!("No config found, creating default");
            let config = Config::default();
            config.save_to(&config_path)?;
            Ok(config)
        }
    }

    /// Read and parse the TOML file at `path`.
    #[track_caller]
    #[instrument]
    pub fn load_from(path: &Path) -> AppResult<Self> {
        let contents = fs::read_to_string(path).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to read config: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let config = Self::from_toml_str(&contents)?;

        info!(config_path = ?path, "Configuration loaded");

        Ok(config)
    }

    /// Parse TOML text. Missing sections and fields take their defaults.
    #[track_caller]
    pub fn from_toml_str(contents: &str) -> AppResult<Self> {
        toml::from_str(contents).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to parse config: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })
    }

    /// Save configuration to `path` using atomic write pattern.
    ///
    /// Writes to a temporary file first, then renames to prevent corruption
    /// if the process crashes during the write.
    #[track_caller]
    #[instrument(skip(self))]
    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        let contents = toml::to_string_pretty(self).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to serialize config: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let temp_path = path.with_extension("toml.tmp");

        let mut temp_file = fs::File::create(&temp_path).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to create temp config file: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        temp_file
            .write_all(contents.as_bytes())
            .map_err(|e| AppError::ConfigError {
                reason: format!("Failed to write temp config file: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        temp_file.sync_all().map_err(|e| AppError::ConfigError {
            reason: format!("Failed to sync temp config file: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        fs::rename(&temp_path, path).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to rename temp config to final: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        info!(config_path = ?path, "Configuration saved (atomic write)");

        Ok(())
    }

    #[track_caller]
    fn config_path() -> AppResult<PathBuf> {
        let proj_dirs = project_dirs().ok_or_else(|| AppError::ConfigError {
            reason: "Failed to get config directory".to_string(),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let config_dir = proj_dirs.config_dir();

        if !config_dir.exists() {
            fs::create_dir_all(config_dir)?;
            debug!(config_dir = ?config_dir, "Created config directory");
        }

        Ok(config_dir.join("config.toml"))
    }
}
