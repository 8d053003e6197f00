//! Crypto primitives consumed by the proof-of-possession engine.
//!
//! The engine never touches key material directly. Everything goes through a
//! [`CryptoProvider`], which hands out opaque key handles and exchanges keys
//! with the outside world as JSON Web Keys. [`RsaCryptoProvider`] is the
//! default implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum::Display;

mod error;
mod jwk;
mod rsa_provider;

pub use error::{CryptoError, CryptoResult};
pub use jwk::{CanonicalJwk, Jwk, RSA_KEY_TYPE, RS256};
pub use rsa_provider::{RsaCryptoProvider, RsaKey, DEFAULT_MODULUS_BITS, DEFAULT_PUBLIC_EXPONENT};

/// What a key handle may be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum KeyUsage {
    /// Produce signatures. Only valid on private keys.
    Sign,
    /// Check signatures. Only valid on public keys.
    Verify,
}

/// Interchange format for exported and imported keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyFormat {
    /// JSON Web Key (RFC 7517).
    #[default]
    #[serde(rename = "jwk")]
    Jwk,
}

/// Digest algorithms offered by [`CryptoProvider::digest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum HashAlgorithm {
    /// SHA-256.
    #[strum(serialize = "SHA-256")]
    Sha256,
    /// SHA-384.
    #[strum(serialize = "SHA-384")]
    Sha384,
    /// SHA-512.
    #[strum(serialize = "SHA-512")]
    Sha512,
}

/// A freshly generated key pair.
#[derive(Debug, Clone)]
pub struct CryptoKeyPair<K> {
    /// Public half, usable for [`KeyUsage::Verify`].
    pub public_key: K,
    /// Private half, usable for [`KeyUsage::Sign`].
    pub private_key: K,
}

/// Asynchronous signing-key backend.
///
/// Every method is a suspension point. Implementations report their own
/// failures as [`CryptoError`]; callers never retry.
#[async_trait]
pub trait CryptoProvider: Send + Sync {
    /// Opaque key handle.
    type Key: Clone + Send + Sync + 'static;

    /// Generates a signing key pair. `extractable` applies to the private half;
    /// public keys can always be exported.
    ///
    /// # Errors
    ///
    /// Returns an error if `usages` contains a usage the algorithm does not
    /// support or key generation fails.
    async fn generate_key(
        &self,
        extractable: bool,
        usages: &[KeyUsage],
    ) -> CryptoResult<CryptoKeyPair<Self::Key>>;

    /// Signs `data` with a private key.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is not a signing key or signing fails.
    async fn sign(&self, key: &Self::Key, data: &[u8]) -> CryptoResult<Vec<u8>>;

    /// Checks `signature` over `data` with a public key. A signature that does
    /// not match, including one that is not even well formed, yields `false`.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is not a verification key.
    async fn verify(&self, key: &Self::Key, signature: &[u8], data: &[u8]) -> CryptoResult<bool>;

    /// Hashes `data`.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider does not implement `algorithm`.
    async fn digest(&self, algorithm: HashAlgorithm, data: &[u8]) -> CryptoResult<Vec<u8>>;

    /// Exports a key.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::NotExtractable`] for private keys generated or
    /// imported as non-extractable.
    async fn export_key(&self, key: &Self::Key, format: KeyFormat) -> CryptoResult<Jwk>;

    /// Imports a key, private if the JWK carries private members.
    ///
    /// # Errors
    ///
    /// Returns an error if the JWK is not a key this provider understands or
    /// `usages` do not fit the key type.
    async fn import_key(
        &self,
        jwk: &Jwk,
        format: KeyFormat,
        extractable: bool,
        usages: &[KeyUsage],
    ) -> CryptoResult<Self::Key>;
}
