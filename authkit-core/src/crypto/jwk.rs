//! RSA JSON Web Keys.

use std::fmt;

use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use super::{CryptoError, CryptoResult, KeyUsage};

/// `kty` of RSA keys.
pub const RSA_KEY_TYPE: &str = "RSA";

/// `alg` of RSASSA-PKCS1-v1_5 with SHA-256.
pub const RS256: &str = "RS256";

/// An RSA JSON Web Key (RFC 7517 / RFC 7518 §6.3).
///
/// Binary members are unpadded base64url big-endian integers. The private
/// members are wiped when the value is dropped and never printed by `Debug`.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    /// Key type, always `RSA` for keys this crate produces.
    pub kty: String,
    /// Modulus.
    pub n: String,
    /// Public exponent.
    pub e: String,
    /// Intended algorithm.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
    /// Permitted operations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_ops: Option<Vec<KeyUsage>>,
    /// Whether the key may be exported again after import.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ext: Option<bool>,
    /// Private exponent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,
    /// First prime factor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p: Option<String>,
    /// Second prime factor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    /// First factor CRT exponent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dp: Option<String>,
    /// Second factor CRT exponent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dq: Option<String>,
    /// First CRT coefficient.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qi: Option<String>,
}

impl Jwk {
    /// Returns `true` if the key carries the private exponent.
    #[must_use]
    pub const fn is_private(&self) -> bool {
        self.d.is_some()
    }

    /// Returns the RFC 7638 required members of the public key.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is not an RSA key or a member is empty.
    pub fn canonical(&self) -> CryptoResult<CanonicalJwk> {
        if self.kty != RSA_KEY_TYPE {
            return Err(CryptoError::UnsupportedAlgorithm(format!(
                "key type {}",
                self.kty
            )));
        }
        if self.n.is_empty() || self.e.is_empty() {
            return Err(CryptoError::InvalidKeyMaterial(
                "missing modulus or exponent".to_string(),
            ));
        }
        Ok(CanonicalJwk {
            e: self.e.clone(),
            kty: self.kty.clone(),
            n: self.n.clone(),
        })
    }
}

impl Drop for Jwk {
    fn drop(&mut self) {
        self.d.zeroize();
        self.p.zeroize();
        self.q.zeroize();
        self.dp.zeroize();
        self.dq.zeroize();
        self.qi.zeroize();
    }
}

impl fmt::Debug for Jwk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Jwk")
            .field("kty", &self.kty)
            .field("n", &self.n)
            .field("e", &self.e)
            .field("alg", &self.alg)
            .field("key_ops", &self.key_ops)
            .field("ext", &self.ext)
            .field("private", &self.is_private())
            .finish_non_exhaustive()
    }
}

/// The public members of an RSA key that identify it, in lexical order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CanonicalJwk {
    /// Public exponent.
    pub e: String,
    /// Key type.
    pub kty: String,
    /// Modulus.
    pub n: String,
}

impl CanonicalJwk {
    /// Serializes the members without whitespace, `{"e":..,"kty":..,"n":..}`.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn canonical_string(&self) -> CryptoResult<String> {
        serde_json::to_string(self).map_err(|err| CryptoError::InvalidKeyMaterial(err.to_string()))
    }
}
