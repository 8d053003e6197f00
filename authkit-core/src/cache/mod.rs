//! Credential cache over an injected key-value store.
//!
//! The cache stores access tokens, pending accounts and flow-correlation
//! state under structured [`CacheKey`]s. Selective invalidation matches keys
//! by category and field equality, never by substring, so unrelated entries in
//! a shared store are left alone.

use std::sync::Arc;

use crate::account::AccountIdentity;
use crate::config::{CacheConfig, CacheLocation};
use crate::error::AuthKitResult;
use crate::storage::{CookieStore, KeyValueStore, StorageRegistry};

mod cookies;
mod entries;
mod keys;

pub use cookies::{cookie_expiration, cookie_expiration_from, COOKIE_DATE_FORMAT};
pub use entries::{AccessTokenCacheItem, AccessTokenValue, RenewStatus};
pub use keys::{
    canonical_scopes, AccessTokenKey, CacheKey, KeyCategory, KeyParseError, WellKnownKey,
    RESOURCE_DELIMITER,
};

/// Well-known keys emptied by [`CredentialCache::reset_cache_items`].
const RESET_KEYS: [WellKnownKey; 5] = [
    WellKnownKey::ClientInfo,
    WellKnownKey::TokenKeys,
    WellKnownKey::LoginState,
    WellKnownKey::IdToken,
    WellKnownKey::Nonce,
];

/// Flow markers expired by [`CredentialCache::clear_cookie`].
const COOKIE_KEYS: [WellKnownKey; 4] = [
    WellKnownKey::Nonce,
    WellKnownKey::LoginState,
    WellKnownKey::LoginRequest,
    WellKnownKey::AcquireTokenState,
];

/// Handle to the credential cache for one storage location.
///
/// Handles are cheap to clone; every handle opened for the same location of
/// the same [`StorageRegistry`] shares one backing store.
#[derive(Clone)]
pub struct CredentialCache {
    location: CacheLocation,
    store: Arc<dyn KeyValueStore>,
    cookies: Arc<dyn CookieStore>,
    store_auth_state_in_cookie: bool,
}

impl std::fmt::Debug for CredentialCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialCache")
            .field("location", &self.location)
            .field("store_auth_state_in_cookie", &self.store_auth_state_in_cookie)
            .finish_non_exhaustive()
    }
}

impl CredentialCache {
    /// Opens the cache for `location`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the registry does not support `location`.
    pub fn new(registry: &StorageRegistry, location: CacheLocation) -> AuthKitResult<Self> {
        Self::from_config(
            registry,
            &CacheConfig {
                cache_location: location,
                ..CacheConfig::default()
            },
        )
    }

    /// Opens the cache described by `config`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the registry does not support the
    /// configured location.
    pub fn from_config(registry: &StorageRegistry, config: &CacheConfig) -> AuthKitResult<Self> {
        let store = registry.store(config.cache_location)?;
        Ok(Self {
            location: config.cache_location,
            store,
            cookies: registry.cookie_store(),
            store_auth_state_in_cookie: config.store_auth_state_in_cookie,
        })
    }

    /// Returns the storage location this cache was opened for.
    #[must_use]
    pub const fn location(&self) -> CacheLocation {
        self.location
    }

    // -------------------------------------------------------------------------
    // Pass-through
    // -------------------------------------------------------------------------

    /// Writes `value` under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store write fails.
    pub fn set_item(&self, key: &str, value: &str) -> AuthKitResult<()> {
        Ok(self.store.set_item(key, value)?)
    }

    /// Reads the value under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store read fails.
    pub fn get_item(&self, key: &str) -> AuthKitResult<Option<String>> {
        Ok(self.store.get_item(key)?)
    }

    /// Deletes the entry under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store delete fails.
    pub fn remove_item(&self, key: &str) -> AuthKitResult<()> {
        Ok(self.store.remove_item(key)?)
    }

    /// Empties the whole store with a single bulk clear.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be cleared.
    pub fn clear(&self) -> AuthKitResult<()> {
        tracing::debug!(location = %self.location, "clearing credential cache");
        Ok(self.store.clear()?)
    }

    // -------------------------------------------------------------------------
    // Side-channel
    // -------------------------------------------------------------------------

    /// Writes `value` to the side-channel store, expiring after `days_valid`
    /// whole days. Without `days_valid` the entry lives for the host context.
    ///
    /// # Errors
    ///
    /// Returns an error if `days_valid` is out of range or the side-channel
    /// write fails.
    pub fn set_item_cookie(
        &self,
        name: &str,
        value: &str,
        days_valid: Option<i64>,
    ) -> AuthKitResult<()> {
        let expires = days_valid.map(cookie_expiration).transpose()?;
        Ok(self.cookies.set_cookie(name, value, expires.as_deref())?)
    }

    /// Reads an unexpired value from the side-channel store.
    ///
    /// # Errors
    ///
    /// Returns an error if the side-channel read fails.
    pub fn get_item_cookie(&self, name: &str) -> AuthKitResult<Option<String>> {
        Ok(self.cookies.get_cookie(name)?)
    }

    /// Expires the flow markers kept in the side-channel store.
    ///
    /// # Errors
    ///
    /// Returns an error if a side-channel write fails.
    pub fn clear_cookie(&self) -> AuthKitResult<()> {
        for key in COOKIE_KEYS {
            self.set_item_cookie(key.as_str(), "", Some(-1))?;
        }
        Ok(())
    }

    /// Returns the side-channel expiration `days` whole days from now.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidExpiration`](crate::storage::StorageError::InvalidExpiration)
    /// if the date is not representable.
    pub fn cookie_expiration(days: i64) -> AuthKitResult<String> {
        Ok(cookie_expiration(days)?)
    }

    /// Writes flow state, mirroring it into the side-channel store when the
    /// cache is configured to store auth state in cookies.
    ///
    /// # Errors
    ///
    /// Returns an error if either write fails.
    pub fn set_auth_state(&self, key: WellKnownKey, value: &str) -> AuthKitResult<()> {
        self.set_item(key.as_str(), value)?;
        if self.store_auth_state_in_cookie {
            self.set_item_cookie(key.as_str(), value, None)?;
        }
        Ok(())
    }

    /// Reads flow state, preferring the side-channel copy when the cache is
    /// configured to store auth state in cookies.
    ///
    /// # Errors
    ///
    /// Returns an error if a read fails.
    pub fn auth_state(&self, key: WellKnownKey) -> AuthKitResult<Option<String>> {
        if self.store_auth_state_in_cookie {
            if let Some(value) = self.get_item_cookie(key.as_str())? {
                return Ok(Some(value));
            }
        }
        self.get_item(key.as_str())
    }

    // -------------------------------------------------------------------------
    // Access tokens
    // -------------------------------------------------------------------------

    /// Stores an access token under its composite key.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be serialized or the write fails.
    pub fn set_access_token(
        &self,
        key: &AccessTokenKey,
        value: &AccessTokenValue,
    ) -> AuthKitResult<()> {
        let value = serde_json::to_string(value)?;
        self.set_item(&key.to_key_string(), &value)
    }

    /// Reads the access token stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails or the stored value is not an access token.
    pub fn access_token(&self, key: &AccessTokenKey) -> AuthKitResult<Option<AccessTokenValue>> {
        self.get_item(&key.to_key_string())?
            .map(|raw| serde_json::from_str(&raw))
            .transpose()
            .map_err(Into::into)
    }

    /// Deletes the access token stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub fn remove_access_token(&self, key: &AccessTokenKey) -> AuthKitResult<()> {
        self.remove_item(&key.to_key_string())
    }

    /// Returns every cached access token for `client_id` and
    /// `home_account_identifier`, regardless of authority and scopes.
    ///
    /// Entries whose key or value is not a structured access token are
    /// skipped. Results are ordered by their stored key.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn get_all_access_tokens(
        &self,
        client_id: &str,
        home_account_identifier: &str,
    ) -> AuthKitResult<Vec<AccessTokenCacheItem>> {
        let mut raw_keys = self.store.keys()?;
        raw_keys.sort();

        let mut results = Vec::new();
        for raw_key in raw_keys {
            let key = match AccessTokenKey::parse(&raw_key) {
                Ok(key) => key,
                Err(err) => {
                    tracing::trace!(key = %raw_key, %err, "skipping non access token entry");
                    continue;
                }
            };
            if key.client_id != client_id || key.home_account_identifier != home_account_identifier
            {
                continue;
            }
            let Some(raw_value) = self.store.get_item(&raw_key)? else {
                continue;
            };
            match serde_json::from_str::<AccessTokenValue>(&raw_value) {
                Ok(value) => results.push(AccessTokenCacheItem { key, value }),
                Err(err) => {
                    tracing::debug!(%err, "skipping access token entry with malformed value");
                }
            }
        }
        Ok(results)
    }

    // -------------------------------------------------------------------------
    // Flow correlation state
    // -------------------------------------------------------------------------

    /// Builds the key under which the account for a pending token request is stored.
    #[must_use]
    pub fn generate_acquire_token_account_key(account_id: &str, state: &str) -> String {
        CacheKey::AcquireTokenAccount {
            account_id: account_id.to_string(),
            state: state.to_string(),
        }
        .to_string()
    }

    /// Builds the key under which the authority for a pending request is stored.
    #[must_use]
    pub fn generate_authority_key(state: &str) -> String {
        CacheKey::Authority {
            state: state.to_string(),
        }
        .to_string()
    }

    /// Stores the account a pending token request was started for.
    ///
    /// # Errors
    ///
    /// Returns an error if the account cannot be serialized or the write fails.
    pub fn set_acquire_token_account(
        &self,
        account_id: &str,
        state: &str,
        account: &AccountIdentity,
    ) -> AuthKitResult<()> {
        let value = serde_json::to_string(account)?;
        self.set_item(
            &Self::generate_acquire_token_account_key(account_id, state),
            &value,
        )
    }

    /// Reads the account a pending token request was started for.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails or the stored value is not an account.
    pub fn acquire_token_account(
        &self,
        account_id: &str,
        state: &str,
    ) -> AuthKitResult<Option<AccountIdentity>> {
        self.get_item(&Self::generate_acquire_token_account_key(account_id, state))?
            .map(|raw| serde_json::from_str(&raw))
            .transpose()
            .map_err(Into::into)
    }

    /// Stores the authority a pending request was started against.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn set_authority_for_state(&self, state: &str, authority: &str) -> AuthKitResult<()> {
        self.set_item(&Self::generate_authority_key(state), authority)
    }

    /// Reads the authority a pending request was started against.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    pub fn authority_for_state(&self, state: &str) -> AuthKitResult<Option<String>> {
        self.get_item(&Self::generate_authority_key(state))
    }

    /// Records the status of a silent renewal.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn set_renew_status(&self, scope: &str, status: RenewStatus) -> AuthKitResult<()> {
        let key = CacheKey::RenewStatus {
            scope: scope.to_string(),
        };
        self.set_item(&key.to_string(), &status.to_string())
    }

    /// Reads the status of a silent renewal. Unknown status strings read as `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    pub fn renew_status(&self, scope: &str) -> AuthKitResult<Option<RenewStatus>> {
        let key = CacheKey::RenewStatus {
            scope: scope.to_string(),
        };
        Ok(self
            .get_item(&key.to_string())?
            .and_then(|raw| raw.parse().ok()))
    }

    /// Deletes pending-account and authority entries, optionally only those
    /// for `state`. Returns the number of entries removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or an entry cannot be deleted.
    pub fn remove_acquire_token_entries(&self, state: Option<&str>) -> AuthKitResult<usize> {
        let removed = self.remove_where(|key| {
            matches!(
                key.category(),
                KeyCategory::AcquireTokenAccount | KeyCategory::Authority
            ) && state.is_none_or(|state| key.state() == Some(state))
        })?;
        tracing::debug!(removed, state, "removed acquire token entries");
        Ok(removed)
    }

    /// Empties the well-known flow keys (client info, token key index, login
    /// state, ID token, nonce) and removes every renewal-status marker.
    ///
    /// Access tokens and other entries are left untouched. Well-known keys
    /// that are not present stay absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or written.
    pub fn reset_cache_items(&self) -> AuthKitResult<()> {
        for key in RESET_KEYS {
            if self.store.get_item(key.as_str())?.is_some() {
                self.store.set_item(key.as_str(), "")?;
            }
        }
        let removed = self.remove_where(|key| key.category() == KeyCategory::RenewStatus)?;
        tracing::debug!(removed, "reset cache items");
        Ok(())
    }

    fn remove_where<F>(&self, predicate: F) -> AuthKitResult<usize>
    where
        F: Fn(&CacheKey) -> bool,
    {
        let mut removed = 0;
        for raw_key in self.store.keys()? {
            if CacheKey::parse(&raw_key).is_ok_and(|key| predicate(&key)) {
                self.store.remove_item(&raw_key)?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}
