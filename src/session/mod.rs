//! Scan sessions.
//!
//! A session couples one frame source with one resolved decoder and turns
//! the noisy stream of raw decode results into a rate-limited stream of
//! accepted detections. It is single threaded and cooperative: each cycle
//! finishes, handler included, before the next one is scheduled.

mod clock;
mod config;
mod detection;
mod error;
mod gate;
mod pacer;
mod scanner;
mod stats;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::{ScannerConfig, DEFAULT_FAULT_BACKOFF_MS, DEFAULT_SUPPRESS_WINDOW_MS};
pub use detection::{Detection, HandlerError, HandlerResult};
pub use error::ScanError;
pub use gate::{SuppressionGate, Verdict};
pub use pacer::{Immediate, IntervalPacer, Pacer, DISPLAY_REFRESH};
pub use scanner::{
    scan_image, CloseHandle, CloseReason, CycleOutcome, ImageOutcome, ScanSession, SessionState,
};
pub use stats::ScanStats;
