//! Proof-of-possession key engine.
//!
//! The engine mints RSA key pairs, caches them by the hash of their public
//! key and uses them to sign compact tokens that prove possession of the
//! private half. Key material never leaves the [`CryptoProvider`]: after
//! generation the private key is re-imported as non-extractable and the
//! extractable original is discarded.

use std::collections::HashMap;
use std::sync::Arc;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::crypto::{
    CryptoError, CryptoKeyPair, CryptoProvider, HashAlgorithm, Jwk, KeyFormat, KeyUsage,
};
use crate::error::{AuthKitError, AuthKitResult};

mod token;

pub use token::{encode_segment, CompactToken, PopTokenHeader, SEGMENT_SEPARATOR};

const GENERATED_KEY_USAGES: [KeyUsage; 2] = [KeyUsage::Sign, KeyUsage::Verify];

/// A cached key pair. The private key is never extractable.
#[derive(Debug)]
pub struct PopKeyRecord<K> {
    public_key: K,
    private_key: K,
}

impl<K> PopKeyRecord<K> {
    /// Public half, used for verification and for the token header.
    #[must_use]
    pub const fn public_key(&self) -> &K {
        &self.public_key
    }

    /// Non-extractable private half, used for signing.
    #[must_use]
    pub const fn private_key(&self) -> &K {
        &self.private_key
    }
}

/// Mints proof-of-possession keys and signs and verifies tokens with them.
///
/// Keys live as long as the engine. Lookups are keyed by the public key hash
/// returned from [`PopKeyEngine::get_new_token`].
pub struct PopKeyEngine<P: CryptoProvider> {
    provider: P,
    keys: RwLock<HashMap<String, Arc<PopKeyRecord<P::Key>>>>,
}

impl<P: CryptoProvider> std::fmt::Debug for PopKeyEngine<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PopKeyEngine").finish_non_exhaustive()
    }
}

impl<P: CryptoProvider + Default> Default for PopKeyEngine<P> {
    fn default() -> Self {
        Self::new(P::default())
    }
}

impl<P: CryptoProvider> PopKeyEngine<P> {
    /// Creates an engine with an empty key cache.
    #[must_use]
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            keys: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the crypto provider backing the engine.
    #[must_use]
    pub const fn provider(&self) -> &P {
        &self.provider
    }

    /// Generates and caches a new signing key pair.
    ///
    /// Returns the unpadded base64url SHA-256 of the public key's canonical
    /// JWK, which is the handle for [`Self::sign_token`] and
    /// [`Self::verify_token`]. A hash that is already cached is overwritten.
    ///
    /// # Errors
    ///
    /// Returns an error if any provider operation fails.
    pub async fn get_new_token(&self) -> AuthKitResult<String> {
        let CryptoKeyPair {
            public_key,
            private_key: extractable_private_key,
        } = self
            .provider
            .generate_key(true, &GENERATED_KEY_USAGES)
            .await?;

        let public_jwk = self
            .provider
            .export_key(&public_key, KeyFormat::Jwk)
            .await?;
        let private_key = {
            let private_jwk = self
                .provider
                .export_key(&extractable_private_key, KeyFormat::Jwk)
                .await?;
            self.provider
                .import_key(&private_jwk, KeyFormat::Jwk, false, &[KeyUsage::Sign])
                .await?
        };
        drop(extractable_private_key);

        let public_key_hash = self.public_key_hash(&public_jwk).await?;
        let record = Arc::new(PopKeyRecord {
            public_key,
            private_key,
        });
        self.keys
            .write()
            .await
            .insert(public_key_hash.clone(), record);

        tracing::debug!(%public_key_hash, "cached new proof-of-possession key");
        Ok(public_key_hash)
    }

    /// Signs `payload` with the key cached under `public_key_hash`.
    ///
    /// The result is `header.payload.signature`, each segment unpadded
    /// base64url. The header carries the public key.
    ///
    /// # Errors
    ///
    /// Returns [`AuthKitError::KeyNotFound`] for an unknown hash, or an error
    /// if the payload cannot be serialized or a provider operation fails.
    pub async fn sign_token<T: Serialize + Sync + ?Sized>(
        &self,
        public_key_hash: &str,
        payload: &T,
    ) -> AuthKitResult<String> {
        let record = self.record(public_key_hash).await?;

        let jwk = self
            .provider
            .export_key(record.public_key(), KeyFormat::Jwk)
            .await?;
        let alg = jwk.alg.clone().ok_or_else(|| {
            CryptoError::InvalidKeyMaterial("exported key has no algorithm".to_string())
        })?;
        let header = PopTokenHeader {
            alg,
            kind: KeyFormat::Jwk,
            jwk: jwk.canonical()?,
        };

        let signing_input = format!(
            "{}{SEGMENT_SEPARATOR}{}",
            encode_segment(&header)?,
            encode_segment(payload)?
        );
        let signature = self
            .provider
            .sign(record.private_key(), signing_input.as_bytes())
            .await?;

        Ok(format!(
            "{signing_input}{SEGMENT_SEPARATOR}{}",
            URL_SAFE_NO_PAD.encode(signature)
        ))
    }

    /// Verifies `signed_token` against the public key cached under
    /// `public_key_hash`. The key embedded in the token header is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`AuthKitError::InvalidTokenFormat`] if the token does not have
    /// three segments or its signature is not base64url,
    /// [`AuthKitError::KeyNotFound`] for an unknown hash, or the provider's
    /// error.
    pub async fn verify_token(
        &self,
        public_key_hash: &str,
        signed_token: &str,
    ) -> AuthKitResult<bool> {
        let token = CompactToken::parse(signed_token)?;
        let record = self.record(public_key_hash).await?;
        let signature = token.signature()?;

        let valid = self
            .provider
            .verify(
                record.public_key(),
                &signature,
                token.signing_input().as_bytes(),
            )
            .await?;
        if !valid {
            tracing::debug!(%public_key_hash, "proof-of-possession signature mismatch");
        }
        Ok(valid)
    }

    /// Returns `true` if a key is cached under `public_key_hash`.
    pub async fn has_key(&self, public_key_hash: &str) -> bool {
        self.keys.read().await.contains_key(public_key_hash)
    }

    /// Number of cached keys.
    pub async fn key_count(&self) -> usize {
        self.keys.read().await.len()
    }

    async fn record(&self, public_key_hash: &str) -> AuthKitResult<Arc<PopKeyRecord<P::Key>>> {
        self.keys
            .read()
            .await
            .get(public_key_hash)
            .cloned()
            .ok_or_else(|| AuthKitError::KeyNotFound {
                public_key_hash: public_key_hash.to_string(),
            })
    }

    async fn public_key_hash(&self, jwk: &Jwk) -> AuthKitResult<String> {
        let canonical = jwk.canonical()?.canonical_string()?;
        let digest = self
            .provider
            .digest(HashAlgorithm::Sha256, canonical.as_bytes())
            .await?;
        Ok(URL_SAFE_NO_PAD.encode(digest))
    }
}
