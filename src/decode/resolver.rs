//! Decode capability resolution.
//!
//! Backends are registered in preference order and resolved once, when a
//! session opens. The first provider that can hand out a decoder wins.

use super::{DecodeError, Decoder, DecoderKind};

/// Something that can produce a decoder on demand.
pub trait DecoderProvider {
    /// Backend family this provider yields.
    fn kind(&self) -> DecoderKind;

    /// Human-readable provider name.
    fn name(&self) -> &str;

    /// Creates a decoder, or explains why this backend cannot be used.
    fn instantiate(&mut self) -> Result<Box<dyn Decoder>, DecodeError>;
}

/// Provider wrapping an already constructed decoder.
///
/// The decoder is handed out once; later resolutions report the backend
/// as in use.
pub struct Preloaded {
    kind: DecoderKind,
    name: String,
    decoder: Option<Box<dyn Decoder>>,
}

impl Preloaded {
    /// Wraps `decoder` so it can be handed out once.
    pub fn new<D: Decoder + 'static>(decoder: D) -> Self {
        Self {
            kind: decoder.kind(),
            name: decoder.name().to_string(),
            decoder: Some(Box::new(decoder)),
        }
    }
}

impl DecoderProvider for Preloaded {
    fn kind(&self) -> DecoderKind {
        self.kind
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn instantiate(&mut self) -> Result<Box<dyn Decoder>, DecodeError> {
        self.decoder
            .take()
            .ok_or_else(|| DecodeError::Unavailable(format!("{} already in use", self.name)))
    }
}

/// Why a single provider could not be used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderFailure {
    /// Kind of the backend that failed.
    pub kind: DecoderKind,
    /// Backend name.
    pub name: String,
    /// Why it could not be instantiated.
    pub reason: String,
}

impl std::fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}): {}", self.name, self.kind, self.reason)
    }
}

/// Ordered set of decode backends.
#[derive(Default)]
pub struct DecoderResolver {
    providers: Vec<Box<dyn DecoderProvider>>,
}

impl DecoderResolver {
    /// Creates a resolver with no providers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolver with the backends compiled into this crate.
    pub fn bundled() -> Self {
        #[allow(unused_mut)]
        let mut resolver = Self::new();
        #[cfg(feature = "qr")]
        resolver.push(super::QrProvider);
        resolver
    }

    /// Appends a provider with the lowest preference so far.
    pub fn push<P: DecoderProvider + 'static>(&mut self, provider: P) -> &mut Self {
        self.providers.push(Box::new(provider));
        self
    }

    /// Builder form of [`push`](Self::push).
    pub fn with<P: DecoderProvider + 'static>(mut self, provider: P) -> Self {
        self.push(provider);
        self
    }

    /// Inserts a provider ahead of every registered one.
    pub fn prefer<P: DecoderProvider + 'static>(mut self, provider: P) -> Self {
        self.providers.insert(0, Box::new(provider));
        self
    }

    /// Number of registered providers.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Returns true if no provider is registered.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Instantiates the first available backend.
    ///
    /// On failure every provider's reason is returned, in preference order.
    pub fn resolve(&mut self) -> Result<Box<dyn Decoder>, Vec<ProviderFailure>> {
        let mut failures = Vec::new();

        for provider in &mut self.providers {
            match provider.instantiate() {
                Ok(decoder) => {
                    tracing::info!(
                        backend = provider.name(),
                        kind = %provider.kind(),
                        skipped = failures.len(),
                        "Resolved decode capability"
                    );
                    return Ok(decoder);
                }
                Err(e) => {
                    tracing::debug!(
                        backend = provider.name(),
                        error = %e,
                        "Decode backend unavailable, trying next"
                    );
                    failures.push(ProviderFailure {
                        kind: provider.kind(),
                        name: provider.name().to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        Err(failures)
    }
}

impl std::fmt::Debug for DecoderResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.providers.iter().map(|p| p.name()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::ScriptedDecoder;

    struct Missing(DecoderKind);

    impl DecoderProvider for Missing {
        fn kind(&self) -> DecoderKind {
            self.0
        }

        fn name(&self) -> &str {
            "missing"
        }

        fn instantiate(&mut self) -> Result<Box<dyn Decoder>, DecodeError> {
            Err(DecodeError::Unavailable("not supported here".into()))
        }
    }

    #[test]
    fn test_falls_back_to_next_provider() {
        let mut resolver = DecoderResolver::new()
            .with(Missing(DecoderKind::Native))
            .with(Preloaded::new(ScriptedDecoder::new(DecoderKind::Bundled)));

        let decoder = resolver.resolve().unwrap();
        assert_eq!(decoder.kind(), DecoderKind::Bundled);
    }

    #[test]
    fn test_prefer_puts_provider_first() {
        let mut resolver = DecoderResolver::new()
            .with(Preloaded::new(ScriptedDecoder::new(DecoderKind::Bundled)))
            .prefer(Preloaded::new(ScriptedDecoder::new(DecoderKind::Native)));

        assert_eq!(resolver.len(), 2);
        assert_eq!(resolver.resolve().unwrap().kind(), DecoderKind::Native);
    }

    #[test]
    fn test_empty_resolver_fails() {
        let mut resolver = DecoderResolver::new();
        assert!(resolver.is_empty());
        assert!(resolver.resolve().err().unwrap().is_empty());
    }

    #[test]
    fn test_failures_listed_in_order() {
        let mut resolver = DecoderResolver::new()
            .with(Missing(DecoderKind::Native))
            .with(Missing(DecoderKind::Bundled));

        let failures = resolver.resolve().err().unwrap();
        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].kind, DecoderKind::Native);
        assert_eq!(failures[1].kind, DecoderKind::Bundled);
    }

    #[test]
    fn test_preloaded_is_handed_out_once() {
        let mut resolver =
            DecoderResolver::new().with(Preloaded::new(ScriptedDecoder::new(DecoderKind::Native)));

        assert!(resolver.resolve().is_ok());
        let failures = resolver.resolve().err().unwrap();
        assert!(failures[0].reason.contains("already in use"));
    }
}
