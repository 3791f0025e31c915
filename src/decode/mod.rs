//! Decode capabilities.
//!
//! A decoder turns one frame into zero or more symbols. Backends are
//! selected once per session through a [`DecoderResolver`], which tries a
//! platform detector before falling back to a bundled library.

mod decoder;
#[cfg(feature = "qr")]
mod qr;
mod resolver;
mod symbol;

pub use decoder::{DecodeError, Decoder, DecoderKind, ScriptedDecoder};
#[cfg(feature = "qr")]
pub use qr::{QrDecoder, QrProvider};
pub use resolver::{DecoderProvider, DecoderResolver, Preloaded, ProviderFailure};
pub use symbol::{Symbol, SymbolFormat};
