//! Normalized account identity derived from decoded ID token claims.

use base64::{engine::general_purpose::URL_SAFE, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Already-decoded ID token claims.
///
/// Decoding and validating the token itself happens elsewhere; this type only
/// offers typed reads over the claims object. Missing or non-string claims
/// read as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdTokenClaims(Map<String, Value>);

impl IdTokenClaims {
    /// Wraps a decoded claims object.
    #[must_use]
    pub const fn new(claims: Map<String, Value>) -> Self {
        Self(claims)
    }

    /// Returns the string value of `name`, or an empty string.
    #[must_use]
    pub fn claim(&self, name: &str) -> &str {
        self.0.get(name).and_then(Value::as_str).unwrap_or_default()
    }

    /// Object identifier (`oid`).
    #[must_use]
    pub fn object_id(&self) -> &str {
        self.claim("oid")
    }

    /// Subject (`sub`).
    #[must_use]
    pub fn subject(&self) -> &str {
        self.claim("sub")
    }

    /// Preferred username (`preferred_username`).
    #[must_use]
    pub fn preferred_name(&self) -> &str {
        self.claim("preferred_username")
    }

    /// Display name (`name`).
    #[must_use]
    pub fn name(&self) -> &str {
        self.claim("name")
    }

    /// Session identifier (`sid`).
    #[must_use]
    pub fn sid(&self) -> &str {
        self.claim("sid")
    }

    /// Issuer (`iss`).
    #[must_use]
    pub fn issuer(&self) -> &str {
        self.claim("iss")
    }

    /// Returns the underlying claims object.
    #[must_use]
    pub const fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for IdTokenClaims {
    fn from(claims: Map<String, Value>) -> Self {
        Self(claims)
    }
}

/// Client metadata returned by the authorization server alongside the tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    /// User object identifier in the home tenant.
    #[serde(default)]
    pub uid: String,
    /// Home tenant identifier.
    #[serde(default)]
    pub utid: String,
}

impl ClientInfo {
    /// Creates client info from its two identifiers.
    #[must_use]
    pub fn new(uid: impl Into<String>, utid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            utid: utid.into(),
        }
    }

    /// Returns `base64url(uid) + "." + base64url(utid)` when both parts are non-empty.
    #[must_use]
    pub fn home_account_identifier(&self) -> Option<String> {
        if self.uid.is_empty() || self.utid.is_empty() {
            return None;
        }
        Some(format!(
            "{}.{}",
            URL_SAFE.encode(self.uid.as_bytes()),
            URL_SAFE.encode(self.utid.as_bytes())
        ))
    }
}

/// A signed-in account, normalized from ID token claims and client info.
///
/// Immutable once built. Resolution is best effort: an account built from
/// empty inputs is valid and simply has empty fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountIdentity {
    account_identifier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    home_account_identifier: Option<String>,
    user_name: String,
    #[serde(rename = "name")]
    display_name: String,
    #[serde(rename = "sid")]
    session_id: String,
    claims: IdTokenClaims,
    environment: String,
}

impl AccountIdentity {
    /// Builds an account from decoded ID token claims and client info.
    ///
    /// The account identifier is the `oid` claim, falling back to `sub`. The
    /// home account identifier is only present when client info carries both a
    /// non-empty `uid` and `utid`.
    #[must_use]
    pub fn create(id_token: Option<&IdTokenClaims>, client_info: Option<&ClientInfo>) -> Self {
        let empty = IdTokenClaims::default();
        let id_token = id_token.unwrap_or(&empty);

        let account_identifier = match id_token.object_id() {
            "" => id_token.subject(),
            oid => oid,
        };

        Self {
            account_identifier: account_identifier.to_string(),
            home_account_identifier: client_info.and_then(ClientInfo::home_account_identifier),
            user_name: id_token.preferred_name().to_string(),
            display_name: id_token.name().to_string(),
            session_id: id_token.sid().to_string(),
            claims: id_token.clone(),
            environment: id_token.issuer().to_string(),
        }
    }

    /// Stable identifier of the account (`oid`, else `sub`).
    #[must_use]
    pub fn account_identifier(&self) -> &str {
        &self.account_identifier
    }

    /// Identifier of the account in its home tenant, when known.
    #[must_use]
    pub fn home_account_identifier(&self) -> Option<&str> {
        self.home_account_identifier.as_deref()
    }

    /// Username, from `preferred_username`.
    #[must_use]
    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    /// Display name, from `name`.
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Session identifier, from `sid`.
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// All ID token claims the account was built from.
    #[must_use]
    pub const fn claims(&self) -> &IdTokenClaims {
        &self.claims
    }

    /// Issuer of the ID token (the authority environment).
    #[must_use]
    pub fn environment(&self) -> &str {
        &self.environment
    }
}
