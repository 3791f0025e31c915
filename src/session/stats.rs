//! Per-session counters.

/// Counters accumulated over the lifetime of one scan session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    /// Cycles run while active.
    pub cycles: u64,
    /// Frames handed to the decoder.
    pub frames_analyzed: u64,
    /// Polls where the source had no new frame.
    pub idle_polls: u64,
    /// Frames that decoded to no symbol.
    pub empty_frames: u64,
    /// Detections dropped inside the suppression window.
    pub suppressed: u64,
    /// Detections passed to the handler.
    pub accepted: u64,
    /// Decoder faults absorbed by the loop.
    pub decode_faults: u64,
    /// Cycles skipped while backing off after a fault.
    pub backoff_cycles: u64,
}

impl ScanStats {
    /// Share of analyzed frames that produced at least one symbol.
    pub fn hit_rate(&self) -> f64 {
        if self.frames_analyzed == 0 {
            return 0.0;
        }
        let hits = self.suppressed + self.accepted;
        hits as f64 / self.frames_analyzed as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate() {
        let stats = ScanStats {
            frames_analyzed: 10,
            accepted: 1,
            suppressed: 3,
            ..Default::default()
        };
        assert!((stats.hit_rate() - 0.4).abs() < f64::EPSILON);
        assert_eq!(ScanStats::default().hit_rate(), 0.0);
    }
}
