//! Error types shared by the ChainMonitor crates.

use thiserror::Error;

/// Errors raised by a [`KvStore`](crate::store::KvStore) backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The key is absent. Callers treat this as an empty result, not a failure.
    #[error("monitor store: not found")]
    NotFound,

    /// The handle was used after `close()`.
    #[error("monitor store: used after close")]
    Closed,

    #[error("monitor store corrupted: {reason}")]
    Corrupted { reason: String },

    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Returns `true` for the "not found" sentinel.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

/// Errors surfaced by the event store and configuration layers.
///
/// The collector never propagates these to the execution engine; they are
/// logged and turned into empty results.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Config(String),

    #[error("Invalid hex input: {0}")]
    InvalidHex(String),
}

impl MonitorError {
    /// Returns `true` if this wraps the store's "not found" sentinel.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_not_found())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_detected_through_wrapping() {
        let err: MonitorError = StoreError::NotFound.into();
        assert!(err.is_not_found());
        assert!(!MonitorError::from(StoreError::Closed).is_not_found());
    }
}
