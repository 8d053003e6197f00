//! Error types for the storage backends.

use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors raised by key-value and side-channel stores.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Errors coming from the backing store implementation.
    #[error("storage backend error: {0}")]
    Backend(String),

    /// A store lock was poisoned by a panicking writer.
    #[error("storage lock error: {0}")]
    Lock(String),

    /// An expiration date string could not be parsed.
    #[error("invalid expiration: {0}")]
    InvalidExpiration(String),
}
