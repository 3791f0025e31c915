//! Accepted detections handed to callers.

use crate::decode::{Symbol, SymbolFormat};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One accepted decode result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detection {
    /// Decoded payload.
    pub value: String,
    /// Symbology of the payload.
    pub format: SymbolFormat,
    /// Monotonic milliseconds since the session opened.
    pub timestamp_ms: u64,
    /// Wall-clock time of acceptance. Display only.
    pub captured_at: DateTime<Utc>,
    /// Sequence number of the frame the symbol was read from.
    pub frame_sequence: u64,
}

impl Detection {
    pub(crate) fn from_symbol(symbol: Symbol, timestamp_ms: u64, frame_sequence: u64) -> Self {
        Self {
            value: symbol.value,
            format: symbol.format,
            timestamp_ms,
            captured_at: Utc::now(),
            frame_sequence,
        }
    }
}

/// Error type detection handlers may return.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Result type detection handlers return.
pub type HandlerResult = Result<(), HandlerError>;
