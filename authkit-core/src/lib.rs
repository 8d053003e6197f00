//! `authkit-core` is the token and key state layer of an OAuth2/OIDC client.
//!
//! It provides:
//!
//! - [`AccountIdentity`], a normalized account built from decoded ID token claims
//! - [`CredentialCache`], a typed cache of access tokens and flow state over an
//!   injected key-value store
//! - [`PopKeyEngine`], which mints proof-of-possession keys and signs and
//!   verifies compact tokens with them through a [`CryptoProvider`]
//!
//! Protocol flows (redirects, popups, token endpoint calls) live in the
//! consumers of this crate.
#![deny(clippy::all, clippy::pedantic, clippy::nursery)]

pub mod account;
pub use account::{AccountIdentity, ClientInfo, IdTokenClaims};

pub mod cache;
pub use cache::CredentialCache;

mod config;
pub use config::{CacheConfig, CacheLocation};

pub mod crypto;
pub use crypto::{CryptoProvider, RsaCryptoProvider};

mod error;
pub use error::*;

/// Forwarding of this crate's logs to a host-provided logger.
pub mod logger;

pub mod pop;
pub use pop::PopKeyEngine;

pub mod storage;
