//! Error types for the licensing module.

use thiserror::Error;

/// Licensing-specific errors.
#[derive(Debug, Error)]
pub enum LicenseError {
    /// Bundle serialization failed while sealing.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Persisting license state failed.
    #[error("storage error: {0}")]
    Storage(#[from] parchi_store::StoreError),
}

/// Result type for license operations.
pub type LicenseResult<T> = Result<T, LicenseError>;
