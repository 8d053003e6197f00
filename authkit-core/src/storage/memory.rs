//! In-memory implementations of the storage traits.
//!
//! These back the default [`StorageRegistry`](super::StorageRegistry) and are
//! suitable for native hosts without a platform store, as well as for tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use super::error::{StorageError, StorageResult};
use super::traits::{CookieStore, KeyValueStore};

fn poisoned<T>(_: T) -> StorageError {
    StorageError::Lock("rwlock poisoned".to_string())
}

// =============================================================================
// Memory Key-Value Store
// =============================================================================

/// In-memory key-value store backed by a `BTreeMap`.
///
/// Key enumeration is in lexical order, so scans over a fixed snapshot are stable.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    items: RwLock<BTreeMap<String, String>>,
}

impl MemoryKeyValueStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn len(&self) -> StorageResult<usize> {
        Ok(self.items.read().map_err(poisoned)?.len())
    }

    /// Returns `true` if no entries are stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn is_empty(&self) -> StorageResult<bool> {
        Ok(self.items.read().map_err(poisoned)?.is_empty())
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.items.read().map_err(poisoned)?.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        self.items
            .write()
            .map_err(poisoned)?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        self.items.write().map_err(poisoned)?.remove(key);
        Ok(())
    }

    fn clear(&self) -> StorageResult<()> {
        self.items.write().map_err(poisoned)?.clear();
        Ok(())
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        Ok(self.items.read().map_err(poisoned)?.keys().cloned().collect())
    }
}

// =============================================================================
// Memory Cookie Store
// =============================================================================

#[derive(Debug, Clone)]
struct CookieEntry {
    value: String,
    expires: Option<DateTime<Utc>>,
}

impl CookieEntry {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires.is_none_or(|expires| expires > now)
    }
}

/// In-memory expiring string store.
///
/// Expired entries are treated as absent on read and dropped on the next write.
#[derive(Debug, Default)]
pub struct MemoryCookieStore {
    cookies: RwLock<HashMap<String, CookieEntry>>,
}

impl MemoryCookieStore {
    /// Creates a new empty cookie store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn parse_expiration(expires: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(expires)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|err| StorageError::InvalidExpiration(format!("{expires}: {err}")))
}

impl CookieStore for MemoryCookieStore {
    fn set_cookie(&self, name: &str, value: &str, expires: Option<&str>) -> StorageResult<()> {
        let expires = expires.map(parse_expiration).transpose()?;
        let now = Utc::now();
        let mut cookies = self.cookies.write().map_err(poisoned)?;
        cookies.retain(|_, entry| entry.is_live(now));
        let entry = CookieEntry {
            value: value.to_string(),
            expires,
        };
        if entry.is_live(now) {
            cookies.insert(name.to_string(), entry);
        } else {
            cookies.remove(name);
        }
        Ok(())
    }

    fn get_cookie(&self, name: &str) -> StorageResult<Option<String>> {
        let now = Utc::now();
        Ok(self
            .cookies
            .read()
            .map_err(poisoned)?
            .get(name)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone()))
    }
}
