//! Prometheus metrics exporter for scan monitoring.
//!
//! This module exposes the counters of a scan session in Prometheus
//! format, optionally over an HTTP endpoint with `/metrics`, `/health`
//! and `/status` routes.
//!
//! # Metrics Exposed
//!
//! ## Session Metrics
//! - `symbol_scanner_session_active` - Whether a session is scanning (1/0)
//! - `symbol_scanner_suppress_window_ms` - Configured suppression window
//!
//! ## Loop Metrics
//! - `symbol_scanner_cycles_total` - Scan cycles run
//! - `symbol_scanner_frames_analyzed_total` - Frames handed to the decoder
//! - `symbol_scanner_idle_polls_total` - Polls with no new frame
//! - `symbol_scanner_empty_frames_total` - Frames with no symbol
//! - `symbol_scanner_decode_faults_total` - Decoder faults absorbed
//!
//! ## Detection Metrics
//! - `symbol_scanner_suppressed_total` - Detections dropped inside the window
//! - `symbol_scanner_accepted_total` - Detections passed to the handler
//! - `symbol_scanner_hit_rate` - Share of analyzed frames holding a symbol
//!
//! # Example
//!
//! ```no_run
//! use symbol_scanner::metrics::{MetricsRegistry, MetricsSnapshot};
//!
//! let registry = MetricsRegistry::new().expect("Failed to create registry");
//!
//! let snapshot = MetricsSnapshot {
//!     is_active: true,
//!     cycles: 120,
//!     frames_analyzed: 118,
//!     accepted: 3,
//!     suppressed: 21,
//!     suppress_window_ms: 2000,
//!     ..Default::default()
//! };
//!
//! registry.update(&snapshot);
//! ```

mod collector;
#[cfg(feature = "metrics")]
mod server;

pub use collector::{MetricsError, MetricsRegistry, MetricsSnapshot};
#[cfg(feature = "metrics")]
pub use server::{
    router, MetricsServer, MetricsServerConfig, MetricsState, ServerError, SessionPhase,
    SharedMetricsState, DEFAULT_METRICS_PORT,
};
