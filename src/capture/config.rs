//! Frame source and file configuration.
//!
//! Only the subset of camera settings a scanning loop cares about is
//! exposed. Exposure and focus stay under device control so printed codes
//! held at varying distances remain readable.

use crate::session::ScannerConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Which camera to prefer when several are available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    /// Rear camera, pointing away from the operator.
    #[default]
    Environment,
    /// Front camera, pointing at the operator.
    User,
}

impl Facing {
    /// Name fragments device drivers commonly use for this facing.
    pub fn name_hints(self) -> &'static [&'static str] {
        match self {
            Facing::Environment => &["back", "rear", "environment", "world"],
            Facing::User => &["front", "user", "facetime", "selfie"],
        }
    }
}

/// Configuration for acquiring a frame source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Camera device index used when no device matches the preferred facing.
    pub device_index: u32,
    /// Requested frame width in pixels.
    pub width: u32,
    /// Requested frame height in pixels.
    pub height: u32,
    /// Requested frames per second.
    pub fps: u32,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            device_index: 0,
            width: 640,
            height: 480,
            fps: 30,
        }
    }
}

impl SourceConfig {
    /// Creates a new configuration with the specified dimensions.
    pub fn with_dimensions(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::InvalidDimensions);
        }
        if self.fps == 0 || self.fps > 120 {
            return Err(ConfigError::InvalidFrameRate);
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// Width or height is zero.
    #[error("invalid frame dimensions")]
    InvalidDimensions,
    /// Frame rate outside 1-120 fps.
    #[error("invalid frame rate (must be 1-120 fps)")]
    InvalidFrameRate,
    /// A per-session cap of zero would close before the first scan.
    #[error("max accepted per session must be at least 1")]
    ZeroAcceptCap,
    /// A zero cycle interval would spin without pausing.
    #[error("cycle interval must be at least 1 ms")]
    ZeroCycleInterval,
    /// The config file could not be read.
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    /// The config file is not valid TOML for this schema.
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

/// Full configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    /// Frame source acquisition.
    #[serde(default)]
    pub source: SourceConfig,
    /// Scan session behaviour.
    #[serde(default)]
    pub scanner: ScannerConfig,
    /// Loop pacing and metrics export.
    #[serde(default)]
    pub output: OutputConfig,
}

/// Output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Interval between scan cycles in milliseconds.
    pub cycle_interval_ms: u64,
    /// Metrics server port (0 to disable).
    pub metrics_port: u16,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            cycle_interval_ms: 16, // ~60 Hz display refresh
            metrics_port: 0,
        }
    }
}

impl OutputConfig {
    /// Validates the loop pacing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cycle_interval_ms == 0 {
            return Err(ConfigError::ZeroCycleInterval);
        }
        Ok(())
    }
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: FileConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.source.validate()?;
        config.scanner.validate()?;
        config.output.validate()?;
        Ok(config)
    }
}
