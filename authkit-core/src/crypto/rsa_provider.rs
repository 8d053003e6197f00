//! Default [`CryptoProvider`] over the `rsa` crate: RSASSA-PKCS1-v1_5 with SHA-256.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::rngs::OsRng;
use rsa::pkcs1v15::{Signature, SigningKey, VerifyingKey};
use rsa::signature::{SignatureEncoding, Signer, Verifier};
use rsa::traits::{PrivateKeyParts, PublicKeyParts};
use rsa::{BigUint, RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256, Sha384, Sha512};

use super::{
    CryptoError, CryptoKeyPair, CryptoProvider, CryptoResult, HashAlgorithm, Jwk, KeyFormat,
    KeyUsage, RS256, RSA_KEY_TYPE,
};

/// Modulus length of generated keys.
pub const DEFAULT_MODULUS_BITS: usize = 2048;

/// Public exponent of generated keys (F4).
pub const DEFAULT_PUBLIC_EXPONENT: u64 = 65_537;

/// Opaque RSA key handle issued by [`RsaCryptoProvider`].
#[derive(Clone)]
pub struct RsaKey {
    material: KeyMaterial,
    extractable: bool,
    usages: Vec<KeyUsage>,
}

#[derive(Clone)]
enum KeyMaterial {
    Public(RsaPublicKey),
    Private(Arc<RsaPrivateKey>),
}

impl RsaKey {
    /// Returns `true` for the private half of a pair.
    #[must_use]
    pub const fn is_private(&self) -> bool {
        matches!(self.material, KeyMaterial::Private(_))
    }

    /// Returns whether the key may be exported.
    #[must_use]
    pub const fn extractable(&self) -> bool {
        self.extractable
    }

    /// Returns the operations the key may be used for.
    #[must_use]
    pub fn usages(&self) -> &[KeyUsage] {
        &self.usages
    }

    fn require(&self, usage: KeyUsage) -> CryptoResult<()> {
        if self.usages.contains(&usage) {
            Ok(())
        } else {
            Err(CryptoError::UnsupportedUsage(usage))
        }
    }
}

impl fmt::Debug for RsaKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RsaKey")
            .field("private", &self.is_private())
            .field("extractable", &self.extractable)
            .field("usages", &self.usages)
            .finish_non_exhaustive()
    }
}

/// RSA signing provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RsaCryptoProvider {
    modulus_bits: usize,
    public_exponent: u64,
}

impl Default for RsaCryptoProvider {
    fn default() -> Self {
        Self::new(DEFAULT_MODULUS_BITS)
    }
}

impl RsaCryptoProvider {
    /// Creates a provider generating `modulus_bits`-bit keys with exponent 65537.
    #[must_use]
    pub const fn new(modulus_bits: usize) -> Self {
        Self {
            modulus_bits,
            public_exponent: DEFAULT_PUBLIC_EXPONENT,
        }
    }

    /// Modulus length of generated keys.
    #[must_use]
    pub const fn modulus_bits(&self) -> usize {
        self.modulus_bits
    }
}

fn encode_uint(value: &BigUint) -> String {
    URL_SAFE_NO_PAD.encode(value.to_bytes_be())
}

fn decode_uint(member: &str, value: &str) -> CryptoResult<BigUint> {
    let bytes = URL_SAFE_NO_PAD
        .decode(value)
        .map_err(|err| CryptoError::InvalidKeyMaterial(format!("{member}: {err}")))?;
    if bytes.is_empty() {
        return Err(CryptoError::InvalidKeyMaterial(format!("{member}: empty")));
    }
    Ok(BigUint::from_bytes_be(&bytes))
}

fn required_member<'a>(member: &str, value: Option<&'a String>) -> CryptoResult<&'a str> {
    value
        .map(String::as_str)
        .ok_or_else(|| CryptoError::InvalidKeyMaterial(format!("missing member {member}")))
}

fn check_usages(usages: &[KeyUsage], allowed: KeyUsage) -> CryptoResult<()> {
    match usages.iter().find(|usage| **usage != allowed) {
        Some(usage) => Err(CryptoError::UnsupportedUsage(*usage)),
        None => Ok(()),
    }
}

fn public_jwk(key: &RsaPublicKey, usages: &[KeyUsage], extractable: bool) -> Jwk {
    Jwk {
        kty: RSA_KEY_TYPE.to_string(),
        n: encode_uint(key.n()),
        e: encode_uint(key.e()),
        alg: Some(RS256.to_string()),
        key_ops: Some(usages.to_vec()),
        ext: Some(extractable),
        d: None,
        p: None,
        q: None,
        dp: None,
        dq: None,
        qi: None,
    }
}

fn private_jwk(key: &RsaPrivateKey, usages: &[KeyUsage]) -> CryptoResult<Jwk> {
    let [p, q] = key.primes() else {
        return Err(CryptoError::UnsupportedAlgorithm(
            "multi-prime RSA keys".to_string(),
        ));
    };
    let mut jwk = public_jwk(&key.to_public_key(), usages, true);
    jwk.d = Some(encode_uint(key.d()));
    jwk.p = Some(encode_uint(p));
    jwk.q = Some(encode_uint(q));
    jwk.dp = key.dp().map(encode_uint);
    jwk.dq = key.dq().map(encode_uint);
    jwk.qi = key.crt_coefficient().as_ref().map(encode_uint);
    Ok(jwk)
}

#[async_trait]
impl CryptoProvider for RsaCryptoProvider {
    type Key = RsaKey;

    async fn generate_key(
        &self,
        extractable: bool,
        usages: &[KeyUsage],
    ) -> CryptoResult<CryptoKeyPair<RsaKey>> {
        let exponent = BigUint::from(self.public_exponent);
        let private = RsaPrivateKey::new_with_exp(&mut OsRng, self.modulus_bits, &exponent)
            .map_err(|err| CryptoError::InvalidKeyMaterial(err.to_string()))?;
        tracing::debug!(modulus_bits = self.modulus_bits, "generated RSA key pair");

        let public_key = RsaKey {
            material: KeyMaterial::Public(private.to_public_key()),
            extractable: true,
            usages: usages
                .iter()
                .copied()
                .filter(|usage| *usage == KeyUsage::Verify)
                .collect(),
        };
        let private_key = RsaKey {
            material: KeyMaterial::Private(Arc::new(private)),
            extractable,
            usages: usages
                .iter()
                .copied()
                .filter(|usage| *usage == KeyUsage::Sign)
                .collect(),
        };
        Ok(CryptoKeyPair {
            public_key,
            private_key,
        })
    }

    async fn sign(&self, key: &RsaKey, data: &[u8]) -> CryptoResult<Vec<u8>> {
        key.require(KeyUsage::Sign)?;
        let KeyMaterial::Private(private) = &key.material else {
            return Err(CryptoError::UnsupportedUsage(KeyUsage::Sign));
        };
        let signing_key = SigningKey::<Sha256>::new(private.as_ref().clone());
        let signature = signing_key
            .try_sign(data)
            .map_err(|err| CryptoError::Signing(err.to_string()))?;
        Ok(signature.to_vec())
    }

    async fn verify(&self, key: &RsaKey, signature: &[u8], data: &[u8]) -> CryptoResult<bool> {
        key.require(KeyUsage::Verify)?;
        let KeyMaterial::Public(public) = &key.material else {
            return Err(CryptoError::UnsupportedUsage(KeyUsage::Verify));
        };
        let Ok(signature) = Signature::try_from(signature) else {
            return Ok(false);
        };
        let verifying_key = VerifyingKey::<Sha256>::new(public.clone());
        Ok(verifying_key.verify(data, &signature).is_ok())
    }

    async fn digest(&self, algorithm: HashAlgorithm, data: &[u8]) -> CryptoResult<Vec<u8>> {
        Ok(match algorithm {
            HashAlgorithm::Sha256 => Sha256::digest(data).to_vec(),
            HashAlgorithm::Sha384 => Sha384::digest(data).to_vec(),
            HashAlgorithm::Sha512 => Sha512::digest(data).to_vec(),
        })
    }

    async fn export_key(&self, key: &RsaKey, _format: KeyFormat) -> CryptoResult<Jwk> {
        if !key.extractable {
            return Err(CryptoError::NotExtractable);
        }
        match &key.material {
            KeyMaterial::Public(public) => Ok(public_jwk(public, &key.usages, true)),
            KeyMaterial::Private(private) => private_jwk(private, &key.usages),
        }
    }

    async fn import_key(
        &self,
        jwk: &Jwk,
        _format: KeyFormat,
        extractable: bool,
        usages: &[KeyUsage],
    ) -> CryptoResult<RsaKey> {
        if jwk.kty != RSA_KEY_TYPE {
            return Err(CryptoError::UnsupportedAlgorithm(format!(
                "key type {}",
                jwk.kty
            )));
        }
        if let Some(alg) = jwk.alg.as_deref().filter(|alg| *alg != RS256) {
            return Err(CryptoError::UnsupportedAlgorithm(alg.to_string()));
        }
        let n = decode_uint("n", &jwk.n)?;
        let e = decode_uint("e", &jwk.e)?;

        if !jwk.is_private() {
            check_usages(usages, KeyUsage::Verify)?;
            let public = RsaPublicKey::new(n, e)
                .map_err(|err| CryptoError::InvalidKeyMaterial(err.to_string()))?;
            return Ok(RsaKey {
                material: KeyMaterial::Public(public),
                extractable: true,
                usages: usages.to_vec(),
            });
        }

        check_usages(usages, KeyUsage::Sign)?;
        let d = decode_uint("d", required_member("d", jwk.d.as_ref())?)?;
        let p = decode_uint("p", required_member("p", jwk.p.as_ref())?)?;
        let q = decode_uint("q", required_member("q", jwk.q.as_ref())?)?;
        let private = RsaPrivateKey::from_components(n, e, d, vec![p, q])
            .map_err(|err| CryptoError::InvalidKeyMaterial(err.to_string()))?;
        private
            .validate()
            .map_err(|err| CryptoError::InvalidKeyMaterial(err.to_string()))?;
        Ok(RsaKey {
            material: KeyMaterial::Private(Arc::new(private)),
            extractable,
            usages: usages.to_vec(),
        })
    }
}
