use console_types::ConsoleError;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage-layer errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("record not found: {0}")]
    NotFound(String),

    /// Duplicate key, lost compare-and-set, or a uniqueness rule was hit
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("backend error: {0}")]
    Backend(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        Self::Backend(err.to_string())
    }
}

impl From<StorageError> for ConsoleError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(msg) => ConsoleError::NotFound(msg),
            StorageError::Conflict(msg) => ConsoleError::Conflict(msg),
            StorageError::InvalidInput(msg) => ConsoleError::Validation(msg),
            other => ConsoleError::Storage(other.to_string()),
        }
    }
}
