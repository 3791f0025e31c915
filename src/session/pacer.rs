//! Cycle pacing for the scan loop.

use std::time::{Duration, Instant};

/// Frame interval of a 60 Hz display.
pub const DISPLAY_REFRESH: Duration = Duration::from_millis(16);

/// Schedules the next scan cycle.
pub trait Pacer {
    /// Blocks until the next cycle is due.
    fn wait_next(&mut self);
}

/// Runs cycles at a fixed cadence.
///
/// The interval is measured from the previous tick, so slow decodes eat
/// into the wait instead of stretching the cadence.
#[derive(Debug, Clone)]
pub struct IntervalPacer {
    interval: Duration,
    last_tick: Option<Instant>,
}

impl IntervalPacer {
    /// Paces cycles `interval` apart.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_tick: None,
        }
    }

    /// One cycle per display refresh.
    pub fn display_refresh() -> Self {
        Self::new(DISPLAY_REFRESH)
    }

    /// Slower cadence for image-polling fallbacks (100-200 ms typical).
    pub fn polling(interval_ms: u64) -> Self {
        Self::new(Duration::from_millis(interval_ms))
    }

    /// Returns the configured interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Pacer for IntervalPacer {
    fn wait_next(&mut self) {
        if let Some(last) = self.last_tick {
            let elapsed = last.elapsed();
            if elapsed < self.interval {
                std::thread::sleep(self.interval - elapsed);
            }
        }
        self.last_tick = Some(Instant::now());
    }
}

/// Never waits. For hosts that drive cycles themselves, and for tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct Immediate;

impl Pacer for Immediate {
    fn wait_next(&mut self) {}
}
