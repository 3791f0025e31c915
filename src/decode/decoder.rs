//! Decoder trait and a scripted implementation.

use super::Symbol;
use crate::capture::Frame;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use thiserror::Error;

/// Errors a decoder can raise for a single frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The backend gave up on this frame.
    #[error("decode timed out")]
    Timeout,
    /// The frame cannot be decoded at all.
    #[error("frame unusable: {0}")]
    InvalidFrame(String),
    /// The backend reported an error.
    #[error("decoder backend failed: {0}")]
    Backend(String),
    /// The backend cannot run here.
    #[error("decoder unavailable: {0}")]
    Unavailable(String),
}

/// Family a decoder belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecoderKind {
    /// Detector provided by the platform.
    Native,
    /// Decoding library shipped with the application.
    Bundled,
}

impl fmt::Display for DecoderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native => f.write_str("native"),
            Self::Bundled => f.write_str("bundled"),
        }
    }
}

/// A decode capability.
///
/// Implementations return zero or more symbols per frame. The order of the
/// returned symbols carries no meaning beyond "first is as good as any";
/// callers take the first one.
pub trait Decoder {
    /// Backend family.
    fn kind(&self) -> DecoderKind;

    /// Human-readable backend name for logs.
    fn name(&self) -> &str;

    /// Analyzes one frame.
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Symbol>, DecodeError>;
}

impl<D: Decoder + ?Sized> Decoder for Box<D> {
    fn kind(&self) -> DecoderKind {
        (**self).kind()
    }

    fn name(&self) -> &str {
        (**self).name()
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<Symbol>, DecodeError> {
        (**self).detect(frame)
    }
}

/// Decoder replaying a fixed list of per-frame results.
///
/// Each call to [`Decoder::detect`] consumes one scripted result; once the
/// script runs out every frame decodes to nothing.
#[derive(Debug, Clone)]
pub struct ScriptedDecoder {
    kind: DecoderKind,
    script: VecDeque<Result<Vec<Symbol>, DecodeError>>,
    calls: u64,
}

impl ScriptedDecoder {
    /// Creates an empty script reporting `kind`.
    pub fn new(kind: DecoderKind) -> Self {
        Self {
            kind,
            script: VecDeque::new(),
            calls: 0,
        }
    }

    /// Appends a frame that decodes to `symbols`.
    pub fn then_symbols(mut self, symbols: impl IntoIterator<Item = Symbol>) -> Self {
        self.script.push_back(Ok(symbols.into_iter().collect()));
        self
    }

    /// Appends a frame that decodes to nothing.
    pub fn then_empty(self) -> Self {
        self.then_symbols(std::iter::empty())
    }

    /// Appends a frame whose decode fails.
    pub fn then_error(mut self, error: DecodeError) -> Self {
        self.script.push_back(Err(error));
        self
    }

    /// Number of frames analyzed.
    pub fn calls(&self) -> u64 {
        self.calls
    }
}

impl Decoder for ScriptedDecoder {
    fn kind(&self) -> DecoderKind {
        self.kind
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn detect(&mut self, _frame: &Frame) -> Result<Vec<Symbol>, DecodeError> {
        self.calls += 1;
        self.script.pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::SymbolFormat;

    #[test]
    fn test_scripted_decoder_replays_in_order() {
        let frame = Frame::blank(4, 4, 1);
        let mut decoder = ScriptedDecoder::new(DecoderKind::Native)
            .then_symbols([Symbol::new("A", SymbolFormat::Ean13)])
            .then_error(DecodeError::Timeout)
            .then_empty();

        assert_eq!(decoder.detect(&frame).unwrap()[0].value, "A");
        assert_eq!(decoder.detect(&frame), Err(DecodeError::Timeout));
        assert!(decoder.detect(&frame).unwrap().is_empty());
        assert!(decoder.detect(&frame).unwrap().is_empty());
        assert_eq!(decoder.calls(), 4);
    }
}
