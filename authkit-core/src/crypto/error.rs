use thiserror::Error;

use super::KeyUsage;

/// Failures reported by a [`CryptoProvider`](super::CryptoProvider).
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The key or request names an algorithm the provider does not implement
    #[error("unsupported_algorithm: {0}")]
    UnsupportedAlgorithm(String),
    /// The key was not created for the requested usage
    #[error("unsupported_usage: {0}")]
    UnsupportedUsage(KeyUsage),
    /// The key material could not be built or decoded
    #[error("invalid_key_material: {0}")]
    InvalidKeyMaterial(String),
    /// Export was requested for a non-extractable key
    #[error("key_not_extractable")]
    NotExtractable,
    /// The signing primitive failed
    #[error("signing_error: {0}")]
    Signing(String),
}

/// Result type for crypto provider operations.
pub type CryptoResult<T> = Result<T, CryptoError>;
