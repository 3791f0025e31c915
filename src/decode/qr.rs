//! Bundled QR decoder built on `rqrr`.

use super::{DecodeError, Decoder, DecoderKind, DecoderProvider, Symbol, SymbolFormat};
use crate::capture::Frame;

/// QR-only decoder that runs entirely in-process.
#[derive(Debug, Default)]
pub struct QrDecoder;

impl QrDecoder {
    /// Creates the decoder.
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for QrDecoder {
    fn kind(&self) -> DecoderKind {
        DecoderKind::Bundled
    }

    fn name(&self) -> &str {
        "rqrr"
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<Symbol>, DecodeError> {
        if !frame.is_valid() {
            return Err(DecodeError::InvalidFrame(format!("{:?}", frame)));
        }

        let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
            frame.width() as usize,
            frame.height() as usize,
            |x, y| frame.luma(x, y),
        );

        let mut symbols = Vec::new();
        for grid in prepared.detect_grids() {
            match grid.decode() {
                Ok((_meta, content)) => symbols.push(Symbol::new(content, SymbolFormat::QrCode)),
                // Partially visible codes fail here on most frames.
                Err(e) => tracing::trace!(error = %e, "QR grid did not decode"),
            }
        }
        Ok(symbols)
    }
}

/// Provider for [`QrDecoder`]; always available.
#[derive(Debug, Default, Clone, Copy)]
pub struct QrProvider;

impl DecoderProvider for QrProvider {
    fn kind(&self) -> DecoderKind {
        DecoderKind::Bundled
    }

    fn name(&self) -> &str {
        "rqrr"
    }

    fn instantiate(&mut self) -> Result<Box<dyn Decoder>, DecodeError> {
        Ok(Box::new(QrDecoder::new()))
    }
}
