//! Live Symbol Scanner Library
//!
//! Turns a stream of camera frames, or a single still image, into a clean
//! stream of barcode/QR detections. Consecutive frames of the same code
//! are collapsed by a suppression window, and an optional cap limits how
//! many codes one session may accept.
//!
//! # Architecture
//!
//! ```text
//! capture (FrameSource) → decode (Decoder) → session (gate) → handler
//!                                   ↑
//!                        DecoderResolver (native → bundled)
//! ```
//!
//! # Design Principles
//!
//! - **Injected capabilities**: the decoder is resolved once when a session
//!   opens, from an explicit list of providers
//! - **Scoped resources**: a session owns its source and releases it on
//!   every exit path, including drop
//! - **Retry while active**: a failing frame never ends a session; losing
//!   the source does
//! - **Monotonic time**: acceptance uses a monotonic clock, never wall time
//!
//! # Example
//!
//! ```no_run
//! use symbol_scanner::{
//!     capture::ScriptedSource,
//!     decode::{DecoderKind, DecoderResolver, Preloaded, ScriptedDecoder, Symbol, SymbolFormat},
//!     session::{IntervalPacer, ScanSession, ScannerConfig},
//! };
//!
//! let decoder = ScriptedDecoder::new(DecoderKind::Native)
//!     .then_symbols([Symbol::new("8935049500123", SymbolFormat::Ean13)]);
//! let mut resolver = DecoderResolver::bundled().prefer(Preloaded::new(decoder));
//!
//! let mut session = ScanSession::new(ScriptedSource::new(), ScannerConfig::single_shot());
//! session.open(&mut resolver).unwrap();
//!
//! let reason = session
//!     .run(&mut IntervalPacer::display_refresh(), |detection| {
//!         println!("scanned {}", detection.value);
//!         Ok(())
//!     })
//!     .unwrap();
//! println!("session closed: {:?}", reason);
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod capture;
pub mod decode;
pub mod metrics;
pub mod session;

// Re-export commonly used types at crate root
pub use capture::{FileConfig, Frame, FrameSource, ImageFile, ImageSource, SourceConfig};
pub use decode::{Decoder, DecoderResolver, Symbol, SymbolFormat};
pub use session::{
    scan_image, CloseHandle, Detection, ImageOutcome, ScanError, ScanSession, ScannerConfig,
};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
