//! Error types for storage operations.

use thiserror::Error;

/// Errors that can occur while operating on a store or its backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The storage facade was constructed with an unusable configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A slot value could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The persistence backend rejected or failed an operation.
    ///
    /// Custom [`Persistor`](crate::persistor::Persistor) implementations
    /// should surface their failures through this variant.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Database error from the SQLite backend.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

impl StoreError {
    /// Returns true if retrying the operation may succeed.
    ///
    /// Serialization and configuration errors are deterministic; backend
    /// errors may be transient.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StoreError::Persistence(_) | StoreError::Database(_) | StoreError::Io(_)
        )
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}
