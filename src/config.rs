//! Configuration for patient feature runs.

use crate::core::{AsOfParams, EventWindowParams, SlidingWindowParams};
use crate::table::TableFormat;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Lab types used when nothing else is configured.
pub const DEFAULT_LAB_TYPES: [&str; 4] = ["glucose", "creatinine", "sodium", "potassium"];

pub fn default_lab_types() -> Vec<String> {
    DEFAULT_LAB_TYPES.iter().map(|s| s.to_string()).collect()
}

/// Main configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// As-of lab join settings
    pub as_of: AsOfParams,
    /// Sliding window aggregate settings
    pub sliding_window: SlidingWindowParams,
    /// Event window collector settings
    pub event_window: EventWindowParams,
    /// Worker threads for patient-partitioned evaluation
    pub workers: usize,
    /// Layout used when writing feature tables
    pub output_format: TableFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            as_of: AsOfParams::default(),
            sliding_window: SlidingWindowParams::default(),
            event_window: EventWindowParams::default(),
            workers: 1,
            output_format: TableFormat::Json,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from `path`, falling back to defaults when the
    /// file does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&content).map_err(ConfigError::Parse)?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("patient-features")
            .join("config.json")
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[source] serde_json::Error),
    #[error("Serialize error: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Parse a comma-separated list of names, dropping blanks.
pub fn parse_name_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse a comma-separated list of window lengths in days.
pub fn parse_windows(s: &str) -> Result<Vec<u32>, String> {
    s.split(',')
        .map(str::trim)
        .filter(|w| !w.is_empty())
        .map(|w| {
            w.parse::<u32>()
                .map_err(|_| format!("invalid window length in days: {w}"))
        })
        .collect()
}
