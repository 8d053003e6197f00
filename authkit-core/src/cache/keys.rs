//! Structured cache keys.
//!
//! Every key the cache writes is one of the [`CacheKey`] variants. The string
//! form stored in the backing store is produced by `Display` and read back by
//! [`CacheKey::parse`]; entries written by anything else fail to parse and are
//! skipped by scans.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};
use thiserror::Error;

/// Separator between the category tag and the components of a correlation key.
pub const RESOURCE_DELIMITER: char = '|';

/// Escape character for delimiters inside correlation key components.
pub const COMPONENT_ESCAPE: char = '\\';

const ACQUIRE_TOKEN_ACCOUNT_TAG: &str = "msal.acquireTokenAccount";
const AUTHORITY_TAG: &str = "msal.authority";
const RENEW_STATUS_TAG: &str = "msal.token.renew.status";

/// Reasons a stored key is not a structured cache key.
///
/// Only used to skip foreign entries during scans; never surfaced to callers.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyParseError {
    /// The key names no known category.
    #[error("unrecognized cache key")]
    Unrecognized,
    /// The key has a known category tag but the wrong number of components.
    #[error("malformed {category} key")]
    Malformed {
        /// Category announced by the key's tag.
        category: KeyCategory,
    },
    /// The key looks like an access token key but is not valid JSON for one.
    #[error("invalid access token key: {0}")]
    AccessToken(String),
}

/// Category tag carried by every structured key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum KeyCategory {
    /// An access token entry.
    #[strum(serialize = "access token")]
    AccessToken,
    /// A fixed, well-known flow key.
    #[strum(serialize = "well-known")]
    WellKnown,
    /// The account a pending token request was started for.
    #[strum(serialize = "acquire token account")]
    AcquireTokenAccount,
    /// The authority a pending request was started against.
    #[strum(serialize = "authority")]
    Authority,
    /// Silent renewal status marker.
    #[strum(serialize = "renew status")]
    RenewStatus,
}

/// Fixed flow-state keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoStaticStr, EnumString, EnumIter)]
pub enum WellKnownKey {
    /// Encoded client info of the signed-in user.
    #[strum(serialize = "msal.client.info")]
    ClientInfo,
    /// Index of cached token keys.
    #[strum(serialize = "msal.token.keys")]
    TokenKeys,
    /// State value of the pending login.
    #[strum(serialize = "msal.state.login")]
    LoginState,
    /// Raw ID token of the signed-in user.
    #[strum(serialize = "msal.idtoken")]
    IdToken,
    /// Nonce sent with the pending ID token request.
    #[strum(serialize = "msal.nonce.idtoken")]
    Nonce,
    /// Request that started the pending login.
    #[strum(serialize = "msal.login.request")]
    LoginRequest,
    /// State value of the pending token request.
    #[strum(serialize = "msal.state.acquireToken")]
    AcquireTokenState,
    /// Last error code returned by the server.
    #[strum(serialize = "msal.error")]
    Error,
    /// Last error description returned by the server.
    #[strum(serialize = "msal.error.description")]
    ErrorDescription,
    /// Last login error.
    #[strum(serialize = "msal.login.error")]
    LoginError,
    /// URL hash captured before a redirect.
    #[strum(serialize = "msal.urlHash")]
    UrlHash,
}

impl WellKnownKey {
    /// Returns the key's stored name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// Joins scopes into their canonical cache form.
///
/// Scopes are trimmed and lowercased, empty entries and repeats are dropped,
/// and the remainder is joined with single spaces in first-seen order. Both
/// key construction and queries go through this function so they agree.
#[must_use]
pub fn canonical_scopes<S: AsRef<str>>(scopes: &[S]) -> String {
    let mut seen: Vec<String> = Vec::with_capacity(scopes.len());
    for scope in scopes.iter().flat_map(|scope| scope.as_ref().split_whitespace()) {
        let scope = scope.to_lowercase();
        if !seen.contains(&scope) {
            seen.push(scope);
        }
    }
    seen.join(" ")
}

/// Composite key of an access token entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AccessTokenKey {
    /// Authority that issued the token.
    pub authority: String,
    /// Client the token was issued to.
    pub client_id: String,
    /// Canonical space-joined scopes, see [`canonical_scopes`].
    pub scopes: String,
    /// Home account the token belongs to.
    pub home_account_identifier: String,
}

impl AccessTokenKey {
    /// Builds a key, canonicalizing `scopes`.
    #[must_use]
    pub fn new<S: AsRef<str>>(
        authority: impl Into<String>,
        client_id: impl Into<String>,
        scopes: &[S],
        home_account_identifier: impl Into<String>,
    ) -> Self {
        Self {
            authority: authority.into(),
            client_id: client_id.into(),
            scopes: canonical_scopes(scopes),
            home_account_identifier: home_account_identifier.into(),
        }
    }

    /// Serializes the key to its stored string form.
    #[must_use]
    pub fn to_key_string(&self) -> String {
        CacheKey::AccessToken(self.clone()).to_string()
    }

    /// Parses a stored key as an access token key.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is not an access token key.
    pub fn parse(raw: &str) -> Result<Self, KeyParseError> {
        match CacheKey::parse(raw)? {
            CacheKey::AccessToken(key) => Ok(key),
            _ => Err(KeyParseError::Unrecognized),
        }
    }
}

/// Every key shape the credential cache reads and writes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Access token entry.
    AccessToken(AccessTokenKey),
    /// Fixed flow-state key.
    WellKnown(WellKnownKey),
    /// Account a pending token request was started for.
    AcquireTokenAccount {
        /// Account identifier.
        account_id: String,
        /// Request state value.
        state: String,
    },
    /// Authority a pending request was started against.
    Authority {
        /// Request state value.
        state: String,
    },
    /// Silent renewal status marker.
    RenewStatus {
        /// Scope or request the renewal is for.
        scope: String,
    },
}

impl CacheKey {
    /// Returns the category tag of this key.
    #[must_use]
    pub const fn category(&self) -> KeyCategory {
        match self {
            Self::AccessToken(_) => KeyCategory::AccessToken,
            Self::WellKnown(_) => KeyCategory::WellKnown,
            Self::AcquireTokenAccount { .. } => KeyCategory::AcquireTokenAccount,
            Self::Authority { .. } => KeyCategory::Authority,
            Self::RenewStatus { .. } => KeyCategory::RenewStatus,
        }
    }

    /// Returns the correlation state carried by the key, if any.
    #[must_use]
    pub fn state(&self) -> Option<&str> {
        match self {
            Self::AcquireTokenAccount { state, .. } | Self::Authority { state } => Some(state),
            _ => None,
        }
    }

    /// Parses a stored key.
    ///
    /// Components of correlation keys are written with the delimiter and
    /// [`COMPONENT_ESCAPE`] escaped, so any component may contain either.
    ///
    /// # Errors
    ///
    /// Returns a [`KeyParseError`] if `raw` is not a structured cache key.
    pub fn parse(raw: &str) -> Result<Self, KeyParseError> {
        if raw.starts_with('{') {
            return serde_json::from_str(raw)
                .map(Self::AccessToken)
                .map_err(|err| KeyParseError::AccessToken(err.to_string()));
        }

        if let Some((tag, rest)) = raw.split_once(RESOURCE_DELIMITER) {
            let category = match tag {
                ACQUIRE_TOKEN_ACCOUNT_TAG => KeyCategory::AcquireTokenAccount,
                AUTHORITY_TAG => KeyCategory::Authority,
                RENEW_STATUS_TAG => KeyCategory::RenewStatus,
                _ => return Err(KeyParseError::Unrecognized),
            };
            let components =
                split_components(rest).ok_or(KeyParseError::Malformed { category })?;

            return match (category, components.as_slice()) {
                (KeyCategory::AcquireTokenAccount, [account_id, state]) => {
                    Ok(Self::AcquireTokenAccount {
                        account_id: account_id.clone(),
                        state: state.clone(),
                    })
                }
                (KeyCategory::Authority, [state]) => Ok(Self::Authority {
                    state: state.clone(),
                }),
                (KeyCategory::RenewStatus, [scope]) => Ok(Self::RenewStatus {
                    scope: scope.clone(),
                }),
                _ => Err(KeyParseError::Malformed { category }),
            };
        }

        WellKnownKey::from_str(raw)
            .map(Self::WellKnown)
            .map_err(|_| KeyParseError::Unrecognized)
    }
}

fn escape_component(component: &str) -> String {
    let mut escaped = String::with_capacity(component.len());
    for c in component.chars() {
        if c == COMPONENT_ESCAPE || c == RESOURCE_DELIMITER {
            escaped.push(COMPONENT_ESCAPE);
        }
        escaped.push(c);
    }
    escaped
}

/// Splits on unescaped delimiters. `None` on a dangling escape.
fn split_components(rest: &str) -> Option<Vec<String>> {
    let mut components = Vec::new();
    let mut current = String::new();
    let mut chars = rest.chars();
    while let Some(c) = chars.next() {
        match c {
            COMPONENT_ESCAPE => current.push(chars.next()?),
            RESOURCE_DELIMITER => components.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    components.push(current);
    Some(components)
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const D: char = RESOURCE_DELIMITER;
        match self {
            Self::AccessToken(key) => {
                let json = serde_json::to_string(key).map_err(|_| fmt::Error)?;
                f.write_str(&json)
            }
            Self::WellKnown(key) => f.write_str(key.as_str()),
            Self::AcquireTokenAccount { account_id, state } => write!(
                f,
                "{ACQUIRE_TOKEN_ACCOUNT_TAG}{D}{}{D}{}",
                escape_component(account_id),
                escape_component(state)
            ),
            Self::Authority { state } => {
                write!(f, "{AUTHORITY_TAG}{D}{}", escape_component(state))
            }
            Self::RenewStatus { scope } => {
                write!(f, "{RENEW_STATUS_TAG}{D}{}", escape_component(scope))
            }
        }
    }
}
