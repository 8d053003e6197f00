//! Typed cache values.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::keys::AccessTokenKey;

/// Cached access token, stored as camelCase JSON under an [`AccessTokenKey`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessTokenValue {
    /// The access token.
    pub access_token: String,
    /// The ID token issued with the access token.
    pub id_token: String,
    /// Expiration as epoch seconds, kept as the decimal string the server returned.
    pub expires_in: String,
    /// Home account the token belongs to.
    pub home_account_identifier: String,
}

/// An access token key and its value. The two are always read and written together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessTokenCacheItem {
    /// The composite key.
    pub key: AccessTokenKey,
    /// The cached token.
    pub value: AccessTokenValue,
}

/// Status of a silent token renewal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum RenewStatus {
    /// The renewal has been started and not yet finished.
    #[strum(serialize = "In Progress")]
    InProgress,
    /// The renewal finished.
    #[strum(serialize = "Completed")]
    Completed,
    /// The renewal was abandoned.
    #[strum(serialize = "Canceled")]
    Canceled,
}
