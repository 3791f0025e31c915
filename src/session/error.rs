//! Scan session errors.

use super::HandlerError;
use crate::capture::{ConfigError, SourceError};
use crate::decode::ProviderFailure;
use thiserror::Error;

/// Fatal conditions surfaced by a scan session.
///
/// Per-frame decode faults never appear here; the loop absorbs them.
#[derive(Debug, Error)]
pub enum ScanError {
    /// No decode backend could be resolved. The session never opened.
    #[error("no decode capability available{}", describe_failures(.failures))]
    CapabilityUnavailable { failures: Vec<ProviderFailure> },

    /// The camera or image could not be acquired, or was lost mid-session.
    #[error("source unavailable: {0}")]
    SourceUnavailable(#[from] SourceError),

    /// The detection handler failed; the session was closed.
    #[error("detection handler failed: {0}")]
    HandlerFailed(#[source] HandlerError),

    /// The session configuration is invalid.
    #[error("invalid scanner configuration: {0}")]
    Config(#[from] ConfigError),

    /// A cycle was run before `open` succeeded.
    #[error("session has not been opened")]
    NotOpen,

    /// Sessions are single use; open a new one to scan again.
    #[error("session was already opened")]
    AlreadyOpened,
}

impl ScanError {
    /// Returns true for errors the user can work around by entering the
    /// code by hand.
    pub fn suggests_manual_entry(&self) -> bool {
        matches!(
            self,
            ScanError::CapabilityUnavailable { .. } | ScanError::SourceUnavailable(_)
        )
    }
}

fn describe_failures(failures: &[ProviderFailure]) -> String {
    if failures.is_empty() {
        return String::from(" (no backends registered)");
    }
    let reasons: Vec<String> = failures.iter().map(ToString::to_string).collect();
    format!(": {}", reasons.join("; "))
}
