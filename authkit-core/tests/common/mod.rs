//! Common test utilities shared across integration tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Once};

use async_trait::async_trait;
use authkit_core::crypto::{
    CryptoError, CryptoKeyPair, CryptoProvider, CryptoResult, HashAlgorithm, Jwk, KeyFormat,
    KeyUsage, RsaCryptoProvider, RsaKey,
};
use authkit_core::storage::{
    KeyValueStore, MemoryCookieStore, MemoryKeyValueStore, StorageRegistry, StorageResult,
};
use authkit_core::CacheLocation;

/// Key-value store that counts bulk clears and single deletions.
#[allow(dead_code, reason = "used in tests")]
pub struct CountingStore {
    inner: MemoryKeyValueStore,
    clears: AtomicUsize,
    removals: AtomicUsize,
}

#[allow(dead_code, reason = "used in tests")]
impl CountingStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: MemoryKeyValueStore::new(),
            clears: AtomicUsize::new(0),
            removals: AtomicUsize::new(0),
        }
    }

    pub fn clears(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }

    pub fn removals(&self) -> usize {
        self.removals.load(Ordering::SeqCst)
    }
}

impl Default for CountingStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for CountingStore {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        self.inner.get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        self.inner.set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        self.removals.fetch_add(1, Ordering::SeqCst);
        self.inner.remove_item(key)
    }

    fn clear(&self) -> StorageResult<()> {
        self.clears.fetch_add(1, Ordering::SeqCst);
        self.inner.clear()
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        self.inner.keys()
    }
}

/// Registry supporting only session storage, backed by `store`.
#[allow(dead_code, reason = "used in tests")]
pub fn session_registry(store: Arc<CountingStore>) -> StorageRegistry {
    StorageRegistry::new(Arc::new(MemoryCookieStore::new()))
        .with_factory(CacheLocation::Session, move || {
            Arc::clone(&store) as Arc<dyn KeyValueStore>
        })
}

/// Provider wrapping [`RsaCryptoProvider`] with small keys and a switch that
/// makes signing fail.
#[allow(dead_code, reason = "used in tests")]
pub struct FlakyProvider {
    inner: RsaCryptoProvider,
    fail_signing: AtomicBool,
    generated: AtomicUsize,
}

#[allow(dead_code, reason = "used in tests")]
impl FlakyProvider {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: RsaCryptoProvider::new(1024),
            fail_signing: AtomicBool::new(false),
            generated: AtomicUsize::new(0),
        }
    }

    pub fn fail_signing(&self) {
        self.fail_signing.store(true, Ordering::SeqCst);
    }

    pub fn generated(&self) -> usize {
        self.generated.load(Ordering::SeqCst)
    }
}

impl Default for FlakyProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CryptoProvider for FlakyProvider {
    type Key = RsaKey;

    async fn generate_key(
        &self,
        extractable: bool,
        usages: &[KeyUsage],
    ) -> CryptoResult<CryptoKeyPair<RsaKey>> {
        self.generated.fetch_add(1, Ordering::SeqCst);
        self.inner.generate_key(extractable, usages).await
    }

    async fn sign(&self, key: &RsaKey, data: &[u8]) -> CryptoResult<Vec<u8>> {
        if self.fail_signing.load(Ordering::SeqCst) {
            return Err(CryptoError::Signing("device keystore locked".to_string()));
        }
        self.inner.sign(key, data).await
    }

    async fn verify(&self, key: &RsaKey, signature: &[u8], data: &[u8]) -> CryptoResult<bool> {
        self.inner.verify(key, signature, data).await
    }

    async fn digest(&self, algorithm: HashAlgorithm, data: &[u8]) -> CryptoResult<Vec<u8>> {
        self.inner.digest(algorithm, data).await
    }

    async fn export_key(&self, key: &RsaKey, format: KeyFormat) -> CryptoResult<Jwk> {
        self.inner.export_key(key, format).await
    }

    async fn import_key(
        &self,
        jwk: &Jwk,
        format: KeyFormat,
        extractable: bool,
        usages: &[KeyUsage],
    ) -> CryptoResult<RsaKey> {
        self.inner.import_key(jwk, format, extractable, usages).await
    }
}

/// Installs a fmt subscriber once so `RUST_LOG` shows the crate's events.
#[allow(dead_code, reason = "used in tests")]
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}
