//! Metrics collection and registry.

use crate::capture::FrameSource;
use crate::session::{ScanSession, SessionState};
use prometheus::{Encoder, Gauge, IntCounter, IntGauge, Registry, TextEncoder};
use serde::Serialize;
use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// The registry rejected a metric.
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// A snapshot of session state for metrics update.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MetricsSnapshot {
    /// Whether the session is currently scanning.
    pub is_active: bool,
    /// Scan cycles run.
    pub cycles: u64,
    /// Frames handed to the decoder.
    pub frames_analyzed: u64,
    /// Polls with no new frame.
    pub idle_polls: u64,
    /// Frames with no symbol.
    pub empty_frames: u64,
    /// Detections dropped inside the suppression window.
    pub suppressed: u64,
    /// Detections handed to the handler.
    pub accepted: u64,
    /// Decoder faults absorbed.
    pub decode_faults: u64,
    /// Share of analyzed frames that held a symbol.
    pub hit_rate: f64,
    /// Configured suppression window.
    pub suppress_window_ms: u64,
}

/// Prometheus metrics registry for scan monitoring.
pub struct MetricsRegistry {
    registry: Registry,

    // Session metrics
    session_active: IntGauge,
    suppress_window_ms: IntGauge,

    // Loop metrics
    cycles_total: IntCounter,
    frames_analyzed_total: IntCounter,
    idle_polls_total: IntCounter,
    empty_frames_total: IntCounter,
    decode_faults_total: IntCounter,

    // Detection metrics
    suppressed_total: IntCounter,
    accepted_total: IntCounter,
    hit_rate: Gauge,
}

impl MetricsRegistry {
    /// Creates a new metrics registry with all scan metrics registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let session_active = IntGauge::new(
            "symbol_scanner_session_active",
            "Whether a scan session is active (1=active, 0=closed)",
        )?;
        let suppress_window_ms = IntGauge::new(
            "symbol_scanner_suppress_window_ms",
            "Configured minimum spacing between accepted detections",
        )?;

        let cycles_total = IntCounter::new(
            "symbol_scanner_cycles_total",
            "Total scan cycles run",
        )?;
        let frames_analyzed_total = IntCounter::new(
            "symbol_scanner_frames_analyzed_total",
            "Total frames handed to the decoder",
        )?;
        let idle_polls_total = IntCounter::new(
            "symbol_scanner_idle_polls_total",
            "Total polls where the source had no new frame",
        )?;
        let empty_frames_total = IntCounter::new(
            "symbol_scanner_empty_frames_total",
            "Total frames that decoded to no symbol",
        )?;
        let decode_faults_total = IntCounter::new(
            "symbol_scanner_decode_faults_total",
            "Total decoder faults absorbed by the scan loop",
        )?;

        let suppressed_total = IntCounter::new(
            "symbol_scanner_suppressed_total",
            "Total detections dropped inside the suppression window",
        )?;
        let accepted_total = IntCounter::new(
            "symbol_scanner_accepted_total",
            "Total detections passed to the handler",
        )?;
        let hit_rate = Gauge::new(
            "symbol_scanner_hit_rate",
            "Share of analyzed frames that contained a symbol",
        )?;

        registry.register(Box::new(session_active.clone()))?;
        registry.register(Box::new(suppress_window_ms.clone()))?;
        registry.register(Box::new(cycles_total.clone()))?;
        registry.register(Box::new(frames_analyzed_total.clone()))?;
        registry.register(Box::new(idle_polls_total.clone()))?;
        registry.register(Box::new(empty_frames_total.clone()))?;
        registry.register(Box::new(decode_faults_total.clone()))?;
        registry.register(Box::new(suppressed_total.clone()))?;
        registry.register(Box::new(accepted_total.clone()))?;
        registry.register(Box::new(hit_rate.clone()))?;

        Ok(Self {
            registry,
            session_active,
            suppress_window_ms,
            cycles_total,
            frames_analyzed_total,
            idle_polls_total,
            empty_frames_total,
            decode_faults_total,
            suppressed_total,
            accepted_total,
            hit_rate,
        })
    }

    /// Updates all metrics from a snapshot of session state.
    pub fn update(&self, snapshot: &MetricsSnapshot) {
        self.session_active.set(if snapshot.is_active { 1 } else { 0 });
        self.suppress_window_ms
            .set(snapshot.suppress_window_ms as i64);
        self.hit_rate.set(snapshot.hit_rate);

        // Counters only move forward; apply the difference.
        advance(&self.cycles_total, snapshot.cycles);
        advance(&self.frames_analyzed_total, snapshot.frames_analyzed);
        advance(&self.idle_polls_total, snapshot.idle_polls);
        advance(&self.empty_frames_total, snapshot.empty_frames);
        advance(&self.decode_faults_total, snapshot.decode_faults);
        advance(&self.suppressed_total, snapshot.suppressed);
        advance(&self.accepted_total, snapshot.accepted);
    }

    /// Returns the underlying Prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

fn advance(counter: &IntCounter, total: u64) {
    let current = counter.get();
    if total > current {
        counter.inc_by(total - current);
    }
}

impl MetricsSnapshot {
    /// Creates a snapshot from the current state of a scan session.
    pub fn from_session<S: FrameSource>(session: &ScanSession<S>) -> Self {
        let stats = session.stats();
        Self {
            is_active: session.state() == SessionState::Active,
            cycles: stats.cycles,
            frames_analyzed: stats.frames_analyzed,
            idle_polls: stats.idle_polls,
            empty_frames: stats.empty_frames,
            suppressed: stats.suppressed,
            accepted: stats.accepted,
            decode_faults: stats.decode_faults,
            hit_rate: stats.hit_rate(),
            suppress_window_ms: session.config().suppress_window_ms,
        }
    }
}
