//! Cache configuration.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::{AuthKitError, AuthKitResult};

/// Named storage scope backing a [`CredentialCache`](crate::CredentialCache).
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
pub enum CacheLocation {
    /// Short-lived storage scoped to a single session.
    #[default]
    #[strum(serialize = "sessionStorage")]
    #[serde(rename = "sessionStorage")]
    Session,
    /// Longer-lived storage shared across sessions.
    #[strum(serialize = "localStorage")]
    #[serde(rename = "localStorage")]
    Local,
}

impl CacheLocation {
    /// Parses a storage scope from its name.
    ///
    /// # Errors
    ///
    /// Returns [`AuthKitError::ConfigurationError`] for unknown names.
    pub fn parse(name: &str) -> AuthKitResult<Self> {
        Self::from_str(name).map_err(|_| {
            AuthKitError::ConfigurationError(format!("unsupported cache location: {name}"))
        })
    }
}

/// Options that control where the cache keeps its state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheConfig {
    /// Storage scope for cache entries.
    #[serde(default)]
    pub cache_location: CacheLocation,
    /// Mirrors flow state into the side-channel store so it survives a full
    /// context reset.
    #[serde(default)]
    pub store_auth_state_in_cookie: bool,
}

impl CacheConfig {
    /// Parses a configuration from camelCase JSON.
    ///
    /// # Errors
    ///
    /// Returns [`AuthKitError::ConfigurationError`] if the JSON is malformed or
    /// names an unsupported cache location.
    pub fn from_json(json: &str) -> AuthKitResult<Self> {
        serde_json::from_str(json)
            .map_err(|err| AuthKitError::ConfigurationError(format!("invalid cache config: {err}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("sessionStorage", CacheLocation::Session ; "session")]
    #[test_case("localStorage", CacheLocation::Local ; "local")]
    fn test_parse_location(name: &str, expected: CacheLocation) {
        let location = CacheLocation::parse(name).expect("parse");
        assert_eq!(location, expected);
        assert_eq!(location.to_string(), name);
    }

    #[test]
    fn test_parse_unsupported_location() {
        match CacheLocation::parse("indexedDB") {
            Err(AuthKitError::ConfigurationError(message)) => {
                assert!(message.contains("indexedDB"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_config_defaults() {
        let config = CacheConfig::from_json("{}").expect("config");
        assert_eq!(config.cache_location, CacheLocation::Session);
        assert!(!config.store_auth_state_in_cookie);
    }

    #[test]
    fn test_config_from_json() {
        let config = CacheConfig::from_json(
            r#"{"cacheLocation":"localStorage","storeAuthStateInCookie":true}"#,
        )
        .expect("config");
        assert_eq!(config.cache_location, CacheLocation::Local);
        assert!(config.store_auth_state_in_cookie);
    }

    #[test]
    fn test_config_unknown_location_is_configuration_error() {
        let result = CacheConfig::from_json(r#"{"cacheLocation":"cookieStorage"}"#);
        assert!(matches!(result, Err(AuthKitError::ConfigurationError(_))));
    }
}
