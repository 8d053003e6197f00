//! Storage contracts consumed by the credential cache.
//!
//! The cache never talks to a platform store directly. Hosts provide:
//!
//! - [`KeyValueStore`]: string key-value storage, one instance per
//!   [`CacheLocation`](crate::CacheLocation)
//! - [`CookieStore`]: an expiring side-channel for values that must survive a
//!   full context reset, such as a redirect-based flow
//!
//! [`StorageRegistry`] ties the two together and guarantees a single store
//! instance per location.

mod error;
pub mod memory;
mod registry;
mod traits;

pub use error::{StorageError, StorageResult};
pub use memory::{MemoryCookieStore, MemoryKeyValueStore};
pub use registry::{StorageRegistry, StoreFactory};
pub use traits::{CookieStore, KeyValueStore};
