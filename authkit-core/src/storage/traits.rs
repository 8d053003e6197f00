//! Platform interfaces for credential storage.

use super::error::StorageResult;

/// String key-value store backing the credential cache.
///
/// Implementations are expected to be last-write-wins with no partial writes.
/// The cache performs no coordination beyond what the store guarantees.
pub trait KeyValueStore: Send + Sync {
    /// Reads the value stored under `key`, if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    fn get_item(&self, key: &str) -> StorageResult<Option<String>>;

    /// Writes `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn set_item(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Deletes the entry stored under `key`. Deleting a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    fn remove_item(&self, key: &str) -> StorageResult<()>;

    /// Removes every entry in one operation.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be cleared.
    fn clear(&self) -> StorageResult<()>;

    /// Returns a snapshot of every key currently in the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be enumerated.
    fn keys(&self) -> StorageResult<Vec<String>>;
}

/// Expiring side-channel store for values that must survive a full context reset.
///
/// Expirations are passed in the canonical date-string format produced by
/// [`cookie_expiration`](crate::cache::cookie_expiration), e.g.
/// `Tue, 20 Oct 2026 10:00:00 GMT`. Entries without an expiration live until
/// the host context ends.
pub trait CookieStore: Send + Sync {
    /// Stores `value` under `name`, optionally expiring at `expires`.
    ///
    /// # Errors
    ///
    /// Returns an error if the expiration cannot be parsed or the write fails.
    fn set_cookie(&self, name: &str, value: &str, expires: Option<&str>) -> StorageResult<()>;

    /// Reads the unexpired value stored under `name`, if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    fn get_cookie(&self, name: &str) -> StorageResult<Option<String>>;
}
