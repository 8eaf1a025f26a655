//! Error types for the key-value store.

use thiserror::Error;

/// Store-specific errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying file I/O failed.
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The store document could not be serialized.
    #[error("store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// No writable data directory could be located.
    #[error("no data directory available")]
    NoDataDir,
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
