//! Scanner behaviour configuration.

use crate::capture::{ConfigError, Facing};
use serde::{Deserialize, Serialize};

/// Default minimum spacing between two accepted detections.
pub const DEFAULT_SUPPRESS_WINDOW_MS: u64 = 2000;

/// Default pause before decoding again after a decoder fault.
pub const DEFAULT_FAULT_BACKOFF_MS: u64 = 1000;

/// Configuration for a scan session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Minimum time between two accepted detections, in milliseconds.
    pub suppress_window_ms: u64,
    /// Maximum accepted detections before the session closes itself.
    /// `None` keeps scanning until closed.
    pub max_accepted_per_session: Option<u32>,
    /// Camera facing to request when the source offers a choice.
    pub preferred_facing: Facing,
    /// Time to wait after a decoder fault before decoding again.
    /// Zero retries on the very next cycle.
    pub fault_backoff_ms: u64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            suppress_window_ms: DEFAULT_SUPPRESS_WINDOW_MS,
            max_accepted_per_session: None,
            preferred_facing: Facing::Environment,
            fault_backoff_ms: DEFAULT_FAULT_BACKOFF_MS,
        }
    }
}

impl ScannerConfig {
    /// Unbounded scanning for adding items at a till. Re-scanning the same
    /// item after the window counts again.
    pub fn continuous() -> Self {
        Self::default()
    }

    /// Library-backed dialog: slower window and a hard cap per opening.
    pub fn bounded() -> Self {
        Self {
            suppress_window_ms: 3000,
            max_accepted_per_session: Some(5),
            ..Self::default()
        }
    }

    /// Closes after the first accepted code, e.g. to fill one input field.
    pub fn single_shot() -> Self {
        Self {
            max_accepted_per_session: Some(1),
            ..Self::default()
        }
    }

    /// Sets the suppression window.
    pub fn with_window_ms(mut self, window_ms: u64) -> Self {
        self.suppress_window_ms = window_ms;
        self
    }

    /// Sets the per-session cap.
    pub fn with_max_accepted(mut self, max: u32) -> Self {
        self.max_accepted_per_session = Some(max);
        self
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_accepted_per_session == Some(0) {
            return Err(ConfigError::ZeroAcceptCap);
        }
        Ok(())
    }
}
