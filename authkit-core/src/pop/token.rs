//! Compact signed tokens: `base64url(header).base64url(payload).base64url(signature)`.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::crypto::{CanonicalJwk, KeyFormat};
use crate::error::{AuthKitError, AuthKitResult};

/// Segment separator of a compact token.
pub const SEGMENT_SEPARATOR: char = '.';

/// Header of a proof-of-possession token. It names the algorithm and carries
/// the public key the token claims to be bound to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopTokenHeader {
    /// Signature algorithm, taken from the exported key.
    pub alg: String,
    /// Format of the embedded key.
    #[serde(rename = "type")]
    pub kind: KeyFormat,
    /// Identifying members of the signing key's public half.
    pub jwk: CanonicalJwk,
}

/// A token split into its three encoded segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompactToken<'a> {
    header: &'a str,
    payload: &'a str,
    signature: &'a str,
    signing_input: &'a str,
}

impl<'a> CompactToken<'a> {
    /// Splits `token` into its segments.
    ///
    /// # Errors
    ///
    /// Returns [`AuthKitError::InvalidTokenFormat`] unless the token has
    /// exactly three segments.
    pub fn parse(token: &'a str) -> AuthKitResult<Self> {
        let segments = token.split(SEGMENT_SEPARATOR).count();
        if segments != 3 {
            return Err(AuthKitError::InvalidTokenFormat(format!(
                "expected 3 segments, found {segments}"
            )));
        }
        let Some((signing_input, signature)) = token.rsplit_once(SEGMENT_SEPARATOR) else {
            return Err(AuthKitError::InvalidTokenFormat(
                "missing signature".to_string(),
            ));
        };
        let Some((header, payload)) = signing_input.split_once(SEGMENT_SEPARATOR) else {
            return Err(AuthKitError::InvalidTokenFormat(
                "missing payload".to_string(),
            ));
        };
        Ok(Self {
            header,
            payload,
            signature,
            signing_input,
        })
    }

    /// The bytes the signature covers: `header.payload` as encoded.
    #[must_use]
    pub const fn signing_input(&self) -> &'a str {
        self.signing_input
    }

    /// Decodes the signature segment.
    ///
    /// # Errors
    ///
    /// Returns [`AuthKitError::InvalidTokenFormat`] if the segment is not base64url.
    pub fn signature(&self) -> AuthKitResult<Vec<u8>> {
        decode_segment("signature", self.signature)
    }

    /// Decodes the header.
    ///
    /// The header's key is only what the token claims; it is not trusted for
    /// verification.
    ///
    /// # Errors
    ///
    /// Returns [`AuthKitError::InvalidTokenFormat`] if the segment is not a
    /// base64url-encoded header.
    pub fn header(&self) -> AuthKitResult<PopTokenHeader> {
        decode_json("header", self.header)
    }

    /// Decodes the payload as `T`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthKitError::InvalidTokenFormat`] if the segment is not
    /// base64url-encoded JSON of the expected shape.
    pub fn payload<T: DeserializeOwned>(&self) -> AuthKitResult<T> {
        decode_json("payload", self.payload)
    }
}

/// Serializes `value` to JSON and encodes it as an unpadded base64url segment.
pub fn encode_segment<T: Serialize + ?Sized>(value: &T) -> AuthKitResult<String> {
    let json = serde_json::to_vec(value)?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

fn decode_json<T: DeserializeOwned>(segment: &str, value: &str) -> AuthKitResult<T> {
    let bytes = decode_segment(segment, value)?;
    serde_json::from_slice(&bytes)
        .map_err(|err| AuthKitError::InvalidTokenFormat(format!("{segment}: {err}")))
}

fn decode_segment(segment: &str, value: &str) -> AuthKitResult<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(value)
        .map_err(|err| AuthKitError::InvalidTokenFormat(format!("{segment}: {err}")))
}
