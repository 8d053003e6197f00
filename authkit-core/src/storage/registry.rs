//! Registry of backing stores, one per cache location.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use super::error::StorageError;
use super::memory::{MemoryCookieStore, MemoryKeyValueStore};
use super::traits::{CookieStore, KeyValueStore};
use crate::config::CacheLocation;
use crate::error::{AuthKitError, AuthKitResult};

/// Factory that creates the backing store for a cache location.
pub type StoreFactory = Box<dyn Fn() -> Arc<dyn KeyValueStore> + Send + Sync>;

/// Owns the backing store for each supported [`CacheLocation`].
///
/// Stores are created lazily on first request and then handed out by
/// reference, so every cache opened for the same location observes the same
/// writes. A location without a registered factory is unsupported.
pub struct StorageRegistry {
    factories: HashMap<CacheLocation, StoreFactory>,
    stores: Mutex<HashMap<CacheLocation, Arc<dyn KeyValueStore>>>,
    cookies: Arc<dyn CookieStore>,
}

impl StorageRegistry {
    /// Creates a registry with no supported locations, sharing `cookies` as the
    /// side-channel store.
    #[must_use]
    pub fn new(cookies: Arc<dyn CookieStore>) -> Self {
        Self {
            factories: HashMap::new(),
            stores: Mutex::new(HashMap::new()),
            cookies,
        }
    }

    /// Creates a registry where every location is backed by its own
    /// [`MemoryKeyValueStore`] and the side-channel by a [`MemoryCookieStore`].
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryCookieStore::new()))
            .with_factory(CacheLocation::Session, || {
                Arc::new(MemoryKeyValueStore::new())
            })
            .with_factory(CacheLocation::Local, || Arc::new(MemoryKeyValueStore::new()))
    }

    /// Registers the factory used to create the store for `location`.
    #[must_use]
    pub fn with_factory<F>(mut self, location: CacheLocation, factory: F) -> Self
    where
        F: Fn() -> Arc<dyn KeyValueStore> + Send + Sync + 'static,
    {
        self.factories.insert(location, Box::new(factory));
        self
    }

    /// Returns `true` if a factory is registered for `location`.
    #[must_use]
    pub fn supports(&self, location: CacheLocation) -> bool {
        self.factories.contains_key(&location)
    }

    /// Returns the store for `location`, creating it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`AuthKitError::ConfigurationError`] if the location is not
    /// supported, or a storage error if the registry lock is poisoned.
    pub fn store(&self, location: CacheLocation) -> AuthKitResult<Arc<dyn KeyValueStore>> {
        let factory = self.factories.get(&location).ok_or_else(|| {
            AuthKitError::ConfigurationError(format!(
                "cache location {location} is not supported"
            ))
        })?;
        let mut stores = self
            .stores
            .lock()
            .map_err(|_| StorageError::Lock("registry mutex poisoned".to_string()))?;
        let store = stores.entry(location).or_insert_with(|| {
            tracing::debug!(%location, "creating backing store");
            factory()
        });
        Ok(Arc::clone(store))
    }

    /// Returns the shared side-channel store.
    #[must_use]
    pub fn cookie_store(&self) -> Arc<dyn CookieStore> {
        Arc::clone(&self.cookies)
    }
}

impl fmt::Debug for StorageRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut supported: Vec<_> = self.factories.keys().map(ToString::to_string).collect();
        supported.sort();
        f.debug_struct("StorageRegistry")
            .field("supported", &supported)
            .finish_non_exhaustive()
    }
}
