use thiserror::Error;

use crate::crypto::CryptoError;
use crate::storage::StorageError;

/// Error outputs from `AuthKit`
#[derive(Debug, Error)]
pub enum AuthKitError {
    /// The requested storage scope or configuration is not supported
    #[error("configuration_error: {0}")]
    ConfigurationError(String),
    /// No proof-of-possession key pair is cached under the given hash
    #[error("key_not_found: {public_key_hash}")]
    KeyNotFound {
        /// The public key hash that was looked up.
        public_key_hash: String,
    },
    /// The presented compact token is malformed
    #[error("invalid_token_format: {0}")]
    InvalidTokenFormat(String),
    /// The crypto provider failed; never retried here
    #[error(transparent)]
    CryptoProvider(#[from] CryptoError),
    /// The backing store failed
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// Unexpected error serializing information
    #[error("serialization_error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for AuthKitError {
    fn from(error: serde_json::Error) -> Self {
        Self::SerializationError(error.to_string())
    }
}

/// Result type for `AuthKit` operations.
pub type AuthKitResult<T, E = AuthKitError> = std::result::Result<T, E>;
