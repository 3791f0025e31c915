//! Duplicate suppression for decoded values.
//!
//! Consecutive camera frames usually contain the same code, so a single
//! physical scan would otherwise be reported many times. The gate accepts a
//! value only when the suppression window has elapsed since the previous
//! acceptance. Repeating the previous value after the window is a new
//! event: scanning the same item twice is how quantities go up.

use super::ScannerConfig;

/// Outcome of offering a value to the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The value counts as a new detection.
    Accepted,
    /// Too close to the previous acceptance; drop it.
    Suppressed {
        /// Time since the previous acceptance.
        elapsed_ms: u64,
    },
    /// The per-session cap has already been reached.
    Exhausted,
}

/// Acceptance state of one scan session.
#[derive(Debug, Clone)]
pub struct SuppressionGate {
    /// Minimum spacing between acceptances.
    suppress_window_ms: u64,
    /// Optional cap on acceptances.
    max_accepted: Option<u32>,
    /// Most recently accepted value.
    last_accepted_value: Option<String>,
    /// Time of the most recent acceptance; `None` until the first one.
    last_accepted_at_ms: Option<u64>,
    /// Acceptances so far.
    accepted_count: u32,
}

impl SuppressionGate {
    /// Creates a gate with the given window and optional cap.
    pub fn new(suppress_window_ms: u64, max_accepted: Option<u32>) -> Self {
        Self {
            suppress_window_ms,
            max_accepted,
            last_accepted_value: None,
            last_accepted_at_ms: None,
            accepted_count: 0,
        }
    }

    /// Creates a gate from scanner configuration.
    pub fn from_config(config: &ScannerConfig) -> Self {
        Self::new(config.suppress_window_ms, config.max_accepted_per_session)
    }

    /// Offers a decoded value observed at `now_ms`.
    pub fn evaluate(&mut self, value: &str, now_ms: u64) -> Verdict {
        if self.is_exhausted() {
            return Verdict::Exhausted;
        }

        if let Some(last) = self.last_accepted_at_ms {
            let elapsed_ms = now_ms.saturating_sub(last);
            if elapsed_ms < self.suppress_window_ms {
                return Verdict::Suppressed { elapsed_ms };
            }
        }

        self.last_accepted_at_ms = Some(now_ms);
        self.last_accepted_value = Some(value.to_string());
        self.accepted_count += 1;
        Verdict::Accepted
    }

    /// Returns true once the cap is reached.
    pub fn is_exhausted(&self) -> bool {
        self.max_accepted
            .is_some_and(|max| self.accepted_count >= max)
    }

    /// Number of accepted values.
    pub fn accepted_count(&self) -> u32 {
        self.accepted_count
    }

    /// Most recently accepted value.
    pub fn last_accepted_value(&self) -> Option<&str> {
        self.last_accepted_value.as_deref()
    }

    /// Time of the most recent acceptance.
    pub fn last_accepted_at_ms(&self) -> Option<u64> {
        self.last_accepted_at_ms
    }

    /// Configured suppression window.
    pub fn suppress_window_ms(&self) -> u64 {
        self.suppress_window_ms
    }

    /// Configured cap.
    pub fn max_accepted(&self) -> Option<u32> {
        self.max_accepted
    }
}
