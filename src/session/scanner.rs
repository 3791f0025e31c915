//! Scan session lifecycle and the live scan loop.
//!
//! A session moves `Idle -> Opening -> Active -> Closed`. Opening resolves a
//! decoder and acquires the source; a failure at either point goes straight
//! to `Closed`. While active, each call to [`ScanSession::step`] runs one
//! cooperative cycle: pull a frame, decode, gate, hand accepted detections
//! to the caller. `Closed` is terminal and always releases the source.

use super::{
    Clock, Detection, HandlerResult, MonotonicClock, Pacer, ScanError, ScanStats,
    ScannerConfig, SuppressionGate, Verdict,
};
use crate::capture::{FrameSource, ImageSource, SourceConfig};
use crate::decode::{Decoder, DecoderResolver};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Lifecycle state of a scan session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created, not yet opened.
    Idle,
    /// Resolving a decoder and acquiring the source.
    Opening,
    /// Scanning.
    Active,
    /// Terminal; the source is released.
    Closed,
}

/// Why a session reached `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// `close()` was called or a [`CloseHandle`] fired.
    Requested,
    /// The per-session acceptance cap was reached.
    CapReached,
    /// The source stopped delivering frames.
    SourceLost,
    /// The detection handler returned an error.
    HandlerFailed,
    /// Decoder resolution or source acquisition failed.
    OpenFailed,
}

/// What a single scan cycle did.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// The source had no new frame.
    NoFrame,
    /// The frame held no symbol.
    Empty,
    /// A symbol was read but fell inside the suppression window.
    Suppressed {
        /// The decoded value that was dropped.
        value: String,
        /// Time since the previous acceptance.
        elapsed_ms: u64,
    },
    /// A symbol was accepted and handed to the handler.
    Accepted(Detection),
    /// The decoder failed on this frame; scanning continues.
    DecodeFault,
    /// Decoding is paused after a recent fault.
    BackingOff,
    /// The session is closed; no further cycles will run.
    Closed(CloseReason),
}

/// Result of decoding a single still image.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageOutcome {
    /// A symbol was decoded and handed to the handler.
    Found(Detection),
    /// Expected and common; callers usually stay silent and let the user
    /// try another picture.
    NoSymbolFound,
}

/// Requests closure of a session from outside the scan loop.
///
/// The session observes the request at the start of its next cycle.
#[derive(Debug, Clone)]
pub struct CloseHandle {
    flag: Arc<AtomicBool>,
}

impl CloseHandle {
    /// Asks the session to close.
    pub fn close(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Returns true once closure was requested or the session closed.
    pub fn is_closed(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// One open-to-close scanning interaction over a live source.
///
/// The session owns its source; dropping the session closes it.
pub struct ScanSession<S: FrameSource> {
    source: S,
    source_config: SourceConfig,
    config: ScannerConfig,
    clock: Box<dyn Clock>,
    decoder: Option<Box<dyn Decoder>>,
    gate: SuppressionGate,
    state: SessionState,
    close_reason: Option<CloseReason>,
    close_requested: Arc<AtomicBool>,
    stats: ScanStats,
    opened_at_ms: u64,
    backoff_until_ms: Option<u64>,
}

impl<S: FrameSource> ScanSession<S> {
    /// Creates an idle session over `source`.
    pub fn new(source: S, config: ScannerConfig) -> Self {
        let gate = SuppressionGate::from_config(&config);
        Self {
            source,
            source_config: SourceConfig::default(),
            config,
            clock: Box::new(MonotonicClock::new()),
            decoder: None,
            gate,
            state: SessionState::Idle,
            close_reason: None,
            close_requested: Arc::new(AtomicBool::new(false)),
            stats: ScanStats::default(),
            opened_at_ms: 0,
            backoff_until_ms: None,
        }
    }

    /// Overrides the source acquisition settings.
    pub fn with_source_config(mut self, source_config: SourceConfig) -> Self {
        self.source_config = source_config;
        self
    }

    /// Replaces the monotonic clock used for acceptance decisions.
    pub fn with_clock<C: Clock + 'static>(mut self, clock: C) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Resolves a decoder and acquires the source.
    ///
    /// On failure the session is `Closed` and cannot be reopened.
    pub fn open(&mut self, resolver: &mut DecoderResolver) -> Result<(), ScanError> {
        if self.state != SessionState::Idle {
            return Err(ScanError::AlreadyOpened);
        }
        if let Err(e) = self.config.validate() {
            self.shutdown(CloseReason::OpenFailed);
            return Err(e.into());
        }

        self.state = SessionState::Opening;

        let decoder = match resolver.resolve() {
            Ok(decoder) => decoder,
            Err(failures) => {
                tracing::warn!(
                    backends_tried = failures.len(),
                    "No decode capability available"
                );
                self.shutdown(CloseReason::OpenFailed);
                return Err(ScanError::CapabilityUnavailable { failures });
            }
        };

        if let Err(e) = self
            .source
            .acquire(&self.source_config, self.config.preferred_facing)
        {
            tracing::warn!(error = %e, "Failed to acquire frame source");
            self.shutdown(CloseReason::OpenFailed);
            return Err(ScanError::SourceUnavailable(e));
        }

        tracing::info!(
            backend = decoder.name(),
            kind = %decoder.kind(),
            window_ms = self.config.suppress_window_ms,
            max_accepted = ?self.config.max_accepted_per_session,
            "Scan session active"
        );

        self.decoder = Some(decoder);
        self.gate = SuppressionGate::from_config(&self.config);
        self.opened_at_ms = self.clock.now_ms();
        self.state = SessionState::Active;
        Ok(())
    }

    /// Runs one scan cycle.
    ///
    /// `handler` is invoked synchronously for an accepted detection. If it
    /// fails the session closes and the error is returned.
    pub fn step<H>(&mut self, mut handler: H) -> Result<CycleOutcome, ScanError>
    where
        H: FnMut(&Detection) -> HandlerResult,
    {
        match self.state {
            SessionState::Active => {}
            SessionState::Closed => {
                let reason = self.close_reason.unwrap_or(CloseReason::Requested);
                return Ok(CycleOutcome::Closed(reason));
            }
            SessionState::Idle | SessionState::Opening => return Err(ScanError::NotOpen),
        }

        if self.close_requested.load(Ordering::SeqCst) {
            self.shutdown(CloseReason::Requested);
            return Ok(CycleOutcome::Closed(CloseReason::Requested));
        }

        self.stats.cycles += 1;
        let now = self.elapsed_ms();

        if let Some(until) = self.backoff_until_ms {
            if now < until {
                self.stats.backoff_cycles += 1;
                return Ok(CycleOutcome::BackingOff);
            }
            self.backoff_until_ms = None;
        }

        let frame = match self.source.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                self.stats.idle_polls += 1;
                return Ok(CycleOutcome::NoFrame);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Frame source lost");
                self.shutdown(CloseReason::SourceLost);
                return Err(ScanError::SourceUnavailable(e));
            }
        };

        let Some(decoder) = self.decoder.as_mut() else {
            return Err(ScanError::NotOpen);
        };

        self.stats.frames_analyzed += 1;
        let symbols = match decoder.detect(&frame) {
            Ok(symbols) => symbols,
            Err(e) => {
                self.stats.decode_faults += 1;
                tracing::warn!(
                    error = %e,
                    backend = decoder.name(),
                    sequence = frame.sequence(),
                    "Decode failed, retrying"
                );
                if self.config.fault_backoff_ms > 0 {
                    self.backoff_until_ms = Some(now + self.config.fault_backoff_ms);
                }
                return Ok(CycleOutcome::DecodeFault);
            }
        };

        let Some(symbol) = symbols.into_iter().next() else {
            self.stats.empty_frames += 1;
            tracing::trace!(sequence = frame.sequence(), "No symbol in frame");
            return Ok(CycleOutcome::Empty);
        };

        match self.gate.evaluate(&symbol.value, now) {
            Verdict::Suppressed { elapsed_ms } => {
                self.stats.suppressed += 1;
                tracing::debug!(
                    value = %symbol.value,
                    elapsed_ms,
                    window_ms = self.gate.suppress_window_ms(),
                    "Suppressed detection"
                );
                Ok(CycleOutcome::Suppressed {
                    value: symbol.value,
                    elapsed_ms,
                })
            }
            // Reaching the cap closes the session right after the handler,
            // so `step` only sees this for a gate exhausted elsewhere.
            Verdict::Exhausted => {
                self.shutdown(CloseReason::CapReached);
                Ok(CycleOutcome::Closed(CloseReason::CapReached))
            }
            Verdict::Accepted => {
                self.stats.accepted += 1;
                let detection = Detection::from_symbol(symbol, now, frame.sequence());
                tracing::info!(
                    value = %detection.value,
                    format = %detection.format,
                    accepted = self.gate.accepted_count(),
                    "Accepted detection"
                );

                if let Err(e) = handler(&detection) {
                    tracing::warn!(error = %e, "Detection handler failed, closing session");
                    self.shutdown(CloseReason::HandlerFailed);
                    return Err(ScanError::HandlerFailed(e));
                }

                if self.gate.is_exhausted() {
                    self.shutdown(CloseReason::CapReached);
                }
                Ok(CycleOutcome::Accepted(detection))
            }
        }
    }

    /// Runs cycles paced by `pacer` until the session closes.
    ///
    /// Returns the close reason for orderly endings (close request or cap
    /// reached) and the error for fatal ones.
    pub fn run<P, H>(&mut self, pacer: &mut P, mut handler: H) -> Result<CloseReason, ScanError>
    where
        P: Pacer + ?Sized,
        H: FnMut(&Detection) -> HandlerResult,
    {
        loop {
            if let CycleOutcome::Closed(reason) = self.step(&mut handler)? {
                return Ok(reason);
            }
            if self.state == SessionState::Active {
                pacer.wait_next();
            }
        }
    }

    /// Releases the source and stops scanning. Idempotent.
    pub fn close(&mut self) {
        self.shutdown(CloseReason::Requested);
    }

    /// Returns a handle that can close this session from elsewhere.
    pub fn close_handle(&self) -> CloseHandle {
        CloseHandle {
            flag: Arc::clone(&self.close_requested),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Returns true while the scan loop may run.
    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    /// Why the session closed, once it has.
    pub fn close_reason(&self) -> Option<CloseReason> {
        self.close_reason
    }

    /// Acceptance state: last value, last time, count.
    pub fn gate(&self) -> &SuppressionGate {
        &self.gate
    }

    /// Session counters.
    pub fn stats(&self) -> &ScanStats {
        &self.stats
    }

    /// Session configuration.
    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    /// The owned source.
    pub fn source(&self) -> &S {
        &self.source
    }

    fn elapsed_ms(&self) -> u64 {
        self.clock.now_ms().saturating_sub(self.opened_at_ms)
    }

    fn shutdown(&mut self, reason: CloseReason) {
        if self.state == SessionState::Closed {
            return;
        }
        if self.state != SessionState::Idle {
            self.source.release();
        }
        let was_active = self.state == SessionState::Active;

        self.decoder = None;
        self.backoff_until_ms = None;
        self.state = SessionState::Closed;
        self.close_reason = Some(reason);
        self.close_requested.store(true, Ordering::SeqCst);

        if was_active {
            tracing::info!(
                ?reason,
                accepted = self.stats.accepted,
                suppressed = self.stats.suppressed,
                frames = self.stats.frames_analyzed,
                faults = self.stats.decode_faults,
                "Scan session closed"
            );
        } else {
            tracing::debug!(?reason, "Scan session closed before becoming active");
        }
    }
}

impl<S: FrameSource> Drop for ScanSession<S> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<S: FrameSource> std::fmt::Debug for ScanSession<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanSession")
            .field("state", &self.state)
            .field("close_reason", &self.close_reason)
            .field("decoder", &self.decoder.as_ref().map(|d| d.name()))
            .field("gate", &self.gate)
            .field("stats", &self.stats)
            .finish()
    }
}

/// Decodes a single still image.
///
/// Performs exactly one decode attempt. The handler runs only when a symbol
/// is found. A decoder fault on a still image is reported as
/// [`ImageOutcome::NoSymbolFound`]; the user's remedy is the same.
pub fn scan_image<I, H>(
    image: &mut I,
    resolver: &mut DecoderResolver,
    mut handler: H,
) -> Result<ImageOutcome, ScanError>
where
    I: ImageSource + ?Sized,
    H: FnMut(&Detection) -> HandlerResult,
{
    let mut decoder = resolver
        .resolve()
        .map_err(|failures| ScanError::CapabilityUnavailable { failures })?;
    let frame = image.load()?;

    let symbols = decoder.detect(&frame).unwrap_or_else(|e| {
        tracing::warn!(error = %e, backend = decoder.name(), "Still image decode failed");
        Vec::new()
    });

    let Some(symbol) = symbols.into_iter().next() else {
        tracing::info!("No symbol found in image");
        return Ok(ImageOutcome::NoSymbolFound);
    };

    let detection = Detection::from_symbol(symbol, 0, frame.sequence());
    tracing::info!(value = %detection.value, format = %detection.format, "Decoded still image");
    handler(&detection).map_err(ScanError::HandlerFailed)?;
    Ok(ImageOutcome::Found(detection))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{
        Facing, Frame, ScriptStep, ScriptedSource, SourceError,
    };
    use crate::decode::{DecodeError, DecoderKind, Preloaded, ScriptedDecoder, Symbol, SymbolFormat};
    use crate::session::{Immediate, ManualClock};
    use proptest::prelude::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn sym(value: &str) -> Symbol {
        Symbol::new(value, SymbolFormat::QrCode)
    }

    fn resolver(decoder: ScriptedDecoder) -> DecoderResolver {
        DecoderResolver::new().with(Preloaded::new(decoder))
    }

    fn open_session(
        decoder: ScriptedDecoder,
        config: ScannerConfig,
        clock: &ManualClock,
    ) -> ScanSession<ScriptedSource> {
        let mut session = ScanSession::new(ScriptedSource::new(), config).with_clock(clock.clone());
        session.open(&mut resolver(decoder)).unwrap();
        session
    }

    #[test]
    fn test_window_scenario() {
        let clock = ManualClock::new();
        let decoder = ScriptedDecoder::new(DecoderKind::Native)
            .then_symbols([sym("A")])
            .then_symbols([sym("A")])
            .then_symbols([sym("B")])
            .then_symbols([sym("A")]);
        let mut session = open_session(decoder, ScannerConfig::default().with_window_ms(2000), &clock);
        let mut seen = Vec::new();

        for t in [0, 500, 1000, 2100] {
            clock.set(t);
            session
                .step(|d| {
                    seen.push((d.timestamp_ms, d.value.clone()));
                    Ok(())
                })
                .unwrap();
        }

        assert_eq!(seen, vec![(0, "A".to_string()), (2100, "A".to_string())]);
        assert_eq!(session.stats().suppressed, 2);
        assert_eq!(session.gate().accepted_count(), 2);
        assert!(session.is_active());
    }

    #[test]
    fn test_cap_of_one_halts_before_next_decode() {
        let clock = ManualClock::new();
        let decoder = ScriptedDecoder::new(DecoderKind::Bundled)
            .then_symbols([sym("A")])
            .then_symbols([sym("B")]);
        let mut session = open_session(decoder, ScannerConfig::single_shot(), &clock);
        let mut calls = 0;

        let first = session
            .step(|_| {
                calls += 1;
                Ok(())
            })
            .unwrap();
        assert!(matches!(first, CycleOutcome::Accepted(ref d) if d.value == "A"));
        assert_eq!(session.state(), SessionState::Closed);
        assert_eq!(session.close_reason(), Some(CloseReason::CapReached));

        clock.advance(10_000);
        let second = session
            .step(|_| {
                calls += 1;
                Ok(())
            })
            .unwrap();

        assert_eq!(second, CycleOutcome::Closed(CloseReason::CapReached));
        assert_eq!(calls, 1);
        assert_eq!(session.stats().frames_analyzed, 1);
        assert_eq!(session.source().frames_served(), 1);
        assert_eq!(session.source().release_count(), 1);
    }

    #[test]
    fn test_first_reported_symbol_wins() {
        let clock = ManualClock::new();
        let decoder = ScriptedDecoder::new(DecoderKind::Native)
            .then_symbols([Symbol::new("B", SymbolFormat::Ean13), sym("A")]);
        let mut session = open_session(decoder, ScannerConfig::default(), &clock);

        let outcome = session.step(|_| Ok(())).unwrap();
        match outcome {
            CycleOutcome::Accepted(d) => {
                assert_eq!(d.value, "B");
                assert_eq!(d.format, SymbolFormat::Ean13);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_no_handler_calls_after_close_handle() {
        let clock = ManualClock::new();
        let decoder = ScriptedDecoder::new(DecoderKind::Native)
            .then_symbols([sym("A")])
            .then_symbols([sym("B")]);
        let mut session = open_session(decoder, ScannerConfig::default().with_window_ms(0), &clock);
        let handle = session.close_handle();
        let mut calls = 0;

        handle.close();
        for _ in 0..3 {
            let outcome = session
                .step(|_| {
                    calls += 1;
                    Ok(())
                })
                .unwrap();
            assert_eq!(outcome, CycleOutcome::Closed(CloseReason::Requested));
        }

        assert_eq!(calls, 0);
        assert_eq!(session.source().frames_served(), 0);
        assert!(!session.source().is_acquired());
    }

    #[test]
    fn test_close_is_idempotent() {
        let clock = ManualClock::new();
        let mut session = open_session(
            ScriptedDecoder::new(DecoderKind::Native),
            ScannerConfig::default(),
            &clock,
        );

        session.close();
        session.close();

        assert_eq!(session.state(), SessionState::Closed);
        assert_eq!(session.source().release_count(), 1);
        assert!(session.close_handle().is_closed());
        assert!(matches!(
            session.open(&mut DecoderResolver::new()),
            Err(ScanError::AlreadyOpened)
        ));
    }

    /// Wraps a scripted source and counts releases where the test can see
    /// them after the session is gone.
    struct SharedReleases {
        inner: ScriptedSource,
        releases: Rc<Cell<u32>>,
    }

    impl FrameSource for SharedReleases {
        fn acquire(&mut self, config: &SourceConfig, facing: Facing) -> Result<(), SourceError> {
            self.inner.acquire(config, facing)
        }

        fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
            self.inner.next_frame()
        }

        fn is_acquired(&self) -> bool {
            self.inner.is_acquired()
        }

        fn release(&mut self) {
            if self.inner.is_acquired() {
                self.releases.set(self.releases.get() + 1);
            }
            self.inner.release();
        }
    }

    #[test]
    fn test_drop_releases_open_session_once() {
        let releases = Rc::new(Cell::new(0));
        {
            let source = SharedReleases {
                inner: ScriptedSource::new(),
                releases: Rc::clone(&releases),
            };
            let mut session = ScanSession::new(source, ScannerConfig::default())
                .with_clock(ManualClock::new());
            session
                .open(&mut resolver(ScriptedDecoder::new(DecoderKind::Native)))
                .unwrap();
            session.step(|_| Ok(())).unwrap();
            assert!(session.source().is_acquired());
            assert_eq!(releases.get(), 0);
        }
        assert_eq!(releases.get(), 1);
    }

    #[test]
    fn test_drop_after_close_does_not_release_again() {
        let releases = Rc::new(Cell::new(0));
        {
            let source = SharedReleases {
                inner: ScriptedSource::new(),
                releases: Rc::clone(&releases),
            };
            let mut session = ScanSession::new(source, ScannerConfig::default());
            session
                .open(&mut resolver(ScriptedDecoder::new(DecoderKind::Native)))
                .unwrap();
            session.close();
        }
        assert_eq!(releases.get(), 1);
    }

    #[test]
    fn test_close_handle_observed_during_fault_backoff() {
        let clock = ManualClock::new();
        let decoder = ScriptedDecoder::new(DecoderKind::Native)
            .then_error(DecodeError::Timeout)
            .then_symbols([sym("A")]);
        let mut session = open_session(decoder, ScannerConfig::default(), &clock);
        let handle = session.close_handle();

        assert_eq!(session.step(|_| Ok(())).unwrap(), CycleOutcome::DecodeFault);
        clock.set(200);
        assert_eq!(session.step(|_| Ok(())).unwrap(), CycleOutcome::BackingOff);

        clock.set(400);
        handle.close();
        let mut calls = 0;
        let outcome = session
            .step(|_| {
                calls += 1;
                Ok(())
            })
            .unwrap();

        assert_eq!(outcome, CycleOutcome::Closed(CloseReason::Requested));
        assert_eq!(calls, 0);
        assert_eq!(session.stats().backoff_cycles, 1);
        assert_eq!(session.stats().frames_analyzed, 1);
        assert_eq!(session.source().release_count(), 1);
        assert!(!session.source().is_acquired());
    }

    #[test]
    fn test_permission_denied_closes_without_loop() {
        let source = ScriptedSource::denied(SourceError::PermissionDenied("camera".into()));
        let mut session = ScanSession::new(source, ScannerConfig::default());
        let mut resolver = resolver(ScriptedDecoder::new(DecoderKind::Native));

        let err = session.open(&mut resolver).unwrap_err();
        assert!(matches!(
            err,
            ScanError::SourceUnavailable(SourceError::PermissionDenied(_))
        ));
        assert!(err.suggests_manual_entry());
        assert_eq!(session.state(), SessionState::Closed);
        assert_eq!(session.close_reason(), Some(CloseReason::OpenFailed));

        let outcome = session.step(|_| Ok(())).unwrap();
        assert_eq!(outcome, CycleOutcome::Closed(CloseReason::OpenFailed));
        assert_eq!(session.stats().cycles, 0);
    }

    #[test]
    fn test_missing_capability_never_acquires_source() {
        let mut session = ScanSession::new(ScriptedSource::new(), ScannerConfig::default());

        let err = session.open(&mut DecoderResolver::new()).unwrap_err();

        assert!(matches!(err, ScanError::CapabilityUnavailable { .. }));
        assert_eq!(session.state(), SessionState::Closed);
        assert!(!session.source().is_acquired());
        assert_eq!(session.source().acquired_facing(), None);
    }

    #[test]
    fn test_invalid_config_fails_open() {
        let config = ScannerConfig::default().with_max_accepted(0);
        let mut session = ScanSession::new(ScriptedSource::new(), config);

        let err = session
            .open(&mut resolver(ScriptedDecoder::new(DecoderKind::Native)))
            .unwrap_err();
        assert!(matches!(err, ScanError::Config(_)));
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[test]
    fn test_preferred_facing_reaches_source() {
        let clock = ManualClock::new();
        let config = ScannerConfig {
            preferred_facing: Facing::User,
            ..ScannerConfig::default()
        };
        let session = open_session(ScriptedDecoder::new(DecoderKind::Native), config, &clock);
        assert_eq!(session.source().acquired_facing(), Some(Facing::User));
    }

    #[test]
    fn test_step_before_open_is_error() {
        let mut session = ScanSession::new(ScriptedSource::new(), ScannerConfig::default());
        assert!(matches!(session.step(|_| Ok(())), Err(ScanError::NotOpen)));
    }

    #[test]
    fn test_decode_fault_backs_off_then_retries() {
        let clock = ManualClock::new();
        let decoder = ScriptedDecoder::new(DecoderKind::Native)
            .then_error(DecodeError::Timeout)
            .then_symbols([sym("A")]);
        let mut session = open_session(decoder, ScannerConfig::default(), &clock);

        assert_eq!(session.step(|_| Ok(())).unwrap(), CycleOutcome::DecodeFault);
        clock.set(500);
        assert_eq!(session.step(|_| Ok(())).unwrap(), CycleOutcome::BackingOff);
        clock.set(1000);
        assert!(matches!(
            session.step(|_| Ok(())).unwrap(),
            CycleOutcome::Accepted(_)
        ));

        let stats = session.stats();
        assert_eq!(stats.decode_faults, 1);
        assert_eq!(stats.backoff_cycles, 1);
        assert_eq!(stats.frames_analyzed, 2);
        assert!(session.is_active());
    }

    #[test]
    fn test_decode_fault_without_backoff_retries_next_cycle() {
        let clock = ManualClock::new();
        let decoder = ScriptedDecoder::new(DecoderKind::Native)
            .then_error(DecodeError::Backend("glitch".into()))
            .then_symbols([sym("A")]);
        let config = ScannerConfig {
            fault_backoff_ms: 0,
            ..ScannerConfig::default()
        };
        let mut session = open_session(decoder, config, &clock);

        assert_eq!(session.step(|_| Ok(())).unwrap(), CycleOutcome::DecodeFault);
        assert!(matches!(
            session.step(|_| Ok(())).unwrap(),
            CycleOutcome::Accepted(_)
        ));
    }

    #[test]
    fn test_source_loss_closes_session() {
        let source = ScriptedSource::with_script([ScriptStep::Idle, ScriptStep::Lose]);
        let mut session = ScanSession::new(source, ScannerConfig::default())
            .with_clock(ManualClock::new());
        session
            .open(&mut resolver(ScriptedDecoder::new(DecoderKind::Native)))
            .unwrap();

        assert_eq!(session.step(|_| Ok(())).unwrap(), CycleOutcome::NoFrame);
        let err = session.step(|_| Ok(())).unwrap_err();

        assert!(matches!(
            err,
            ScanError::SourceUnavailable(SourceError::Lost(_))
        ));
        assert_eq!(session.close_reason(), Some(CloseReason::SourceLost));
        assert_eq!(session.stats().idle_polls, 1);
    }

    #[test]
    fn test_handler_failure_is_fatal_to_session() {
        let clock = ManualClock::new();
        let decoder = ScriptedDecoder::new(DecoderKind::Native)
            .then_symbols([sym("A")])
            .then_symbols([sym("B")]);
        let mut session = open_session(decoder, ScannerConfig::default(), &clock);

        let err = session.step(|_| Err("lookup failed".into())).unwrap_err();

        assert!(matches!(err, ScanError::HandlerFailed(_)));
        assert_eq!(session.close_reason(), Some(CloseReason::HandlerFailed));
        assert!(!session.source().is_acquired());
    }

    #[test]
    fn test_run_until_cap() {
        let clock = ManualClock::new();
        let decoder = ScriptedDecoder::new(DecoderKind::Native)
            .then_symbols([sym("A")])
            .then_empty()
            .then_symbols([sym("B")])
            .then_symbols([sym("C")])
            .then_symbols([sym("D")]);
        let config = ScannerConfig::default().with_window_ms(0).with_max_accepted(3);
        let mut session = open_session(decoder, config, &clock);
        let mut values = Vec::new();

        let reason = session
            .run(&mut Immediate, |d| {
                values.push(d.value.clone());
                Ok(())
            })
            .unwrap();

        assert_eq!(reason, CloseReason::CapReached);
        assert_eq!(values, vec!["A", "B", "C"]);
        assert_eq!(session.stats().empty_frames, 1);
    }

    #[test]
    fn test_run_stops_on_close_from_handler() {
        let clock = ManualClock::new();
        let decoder = ScriptedDecoder::new(DecoderKind::Native)
            .then_symbols([sym("A")])
            .then_symbols([sym("B")]);
        let mut session = open_session(decoder, ScannerConfig::default().with_window_ms(0), &clock);
        let handle = session.close_handle();
        let mut calls = 0;

        let reason = session
            .run(&mut Immediate, |_| {
                calls += 1;
                handle.close();
                Ok(())
            })
            .unwrap();

        assert_eq!(reason, CloseReason::Requested);
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_repeat_value_after_window_counts_again() {
        let clock = ManualClock::new();
        let decoder = ScriptedDecoder::new(DecoderKind::Native)
            .then_symbols([sym("SKU-1")])
            .then_symbols([sym("SKU-1")]);
        let mut session = open_session(decoder, ScannerConfig::continuous(), &clock);
        let mut quantity = 0;

        for t in [0, 2000] {
            clock.set(t);
            session
                .step(|_| {
                    quantity += 1;
                    Ok(())
                })
                .unwrap();
        }

        assert_eq!(quantity, 2);
        assert_eq!(session.gate().last_accepted_value(), Some("SKU-1"));
    }

    #[test]
    fn test_image_without_symbol() {
        let mut image = Frame::blank(16, 16, 1);
        let mut resolver = resolver(ScriptedDecoder::new(DecoderKind::Native).then_empty());
        let mut calls = 0;

        let outcome = scan_image(&mut image, &mut resolver, |_| {
            calls += 1;
            Ok(())
        })
        .unwrap();

        assert_eq!(outcome, ImageOutcome::NoSymbolFound);
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_image_with_symbol_invokes_handler_once() {
        let mut image = Frame::blank(16, 16, 1);
        let mut resolver = resolver(
            ScriptedDecoder::new(DecoderKind::Bundled).then_symbols([sym("8935049500123")]),
        );
        let mut seen = Vec::new();

        let outcome = scan_image(&mut image, &mut resolver, |d| {
            seen.push(d.value.clone());
            Ok(())
        })
        .unwrap();

        assert!(matches!(outcome, ImageOutcome::Found(ref d) if d.value == "8935049500123"));
        assert_eq!(seen, vec!["8935049500123"]);
    }

    #[test]
    fn test_image_decode_fault_reports_no_symbol() {
        let mut image = Frame::blank(16, 16, 1);
        let mut resolver =
            resolver(ScriptedDecoder::new(DecoderKind::Native).then_error(DecodeError::Timeout));

        let outcome = scan_image(&mut image, &mut resolver, |_| Ok(())).unwrap();
        assert_eq!(outcome, ImageOutcome::NoSymbolFound);
    }

    #[test]
    fn test_unreadable_image_is_source_unavailable() {
        let mut image = Frame::new(vec![0u8; 3], 16, 16, 1);
        let mut resolver = resolver(ScriptedDecoder::new(DecoderKind::Native));

        let err = scan_image(&mut image, &mut resolver, |_| Ok(())).unwrap_err();
        assert!(matches!(
            err,
            ScanError::SourceUnavailable(SourceError::Unreadable(_))
        ));
    }

    proptest! {
        #[test]
        fn prop_session_respects_cap_and_window(
            cap in 1u32..5,
            window in 0u64..2500,
            frames in prop::collection::vec((0u64..1200, any::<bool>()), 1..60),
        ) {
            let clock = ManualClock::new();
            let mut decoder = ScriptedDecoder::new(DecoderKind::Native);
            for (_, hit) in &frames {
                decoder = if *hit { decoder.then_symbols([sym("A")]) } else { decoder.then_empty() };
            }
            let config = ScannerConfig::default().with_window_ms(window).with_max_accepted(cap);
            let mut session = open_session(decoder, config, &clock);
            let mut accepted_at: Vec<u64> = Vec::new();

            for (dt, _) in &frames {
                clock.advance(*dt);
                session.step(|d| {
                    accepted_at.push(d.timestamp_ms);
                    Ok(())
                }).unwrap();
            }

            prop_assert!((accepted_at.len() as u32) <= cap);
            for pair in accepted_at.windows(2) {
                prop_assert!(pair[1] - pair[0] >= window);
            }
        }
    }
}
