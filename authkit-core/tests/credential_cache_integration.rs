//! End-to-end behavior of the credential cache over shared stores.

mod common;

use std::sync::Arc;

use authkit_core::cache::{AccessTokenKey, AccessTokenValue, RenewStatus, WellKnownKey};
use authkit_core::storage::{MemoryCookieStore, StorageRegistry};
use authkit_core::{
    AccountIdentity, AuthKitError, CacheConfig, CacheLocation, ClientInfo, CredentialCache,
    IdTokenClaims,
};
use common::CountingStore;
use serde_json::json;

const AUTHORITY: &str = "https://login.microsoftonline.com/common";
const ALTERNATE_AUTHORITY: &str = "https://login.microsoftonline.com/contoso.onmicrosoft.com";
const CLIENT_ID: &str = "0813e1d1-ad72-46a9-8665-399bba48c201";
const TEST_STATE: &str = "state5678";

fn token(access_token: &str, home_account_identifier: &str) -> AccessTokenValue {
    AccessTokenValue {
        access_token: access_token.to_string(),
        id_token: "idToken".to_string(),
        expires_in: "150000000000000".to_string(),
        home_account_identifier: home_account_identifier.to_string(),
    }
}

#[test]
fn test_same_location_shares_storage() {
    common::init_tracing();
    let registry = StorageRegistry::in_memory();
    let first = CredentialCache::new(&registry, CacheLocation::Local).expect("cache");
    let second = CredentialCache::new(&registry, CacheLocation::Local).expect("cache");
    let session = CredentialCache::new(&registry, CacheLocation::Session).expect("cache");

    first.set_item("shared", "value").expect("set");

    assert_eq!(
        second.get_item("shared").expect("get"),
        Some("value".to_string())
    );
    assert_eq!(session.get_item("shared").expect("get"), None);
}

#[test]
fn test_unsupported_location_fails_at_construction() {
    let registry = common::session_registry(Arc::new(CountingStore::new()));
    match CredentialCache::new(&registry, CacheLocation::Local) {
        Err(AuthKitError::ConfigurationError(message)) => {
            assert!(message.contains("localStorage"));
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(CacheLocation::parse("indexedDB").is_err());
}

#[test]
fn test_clear_is_a_single_bulk_operation() {
    let store = Arc::new(CountingStore::new());
    let registry = common::session_registry(Arc::clone(&store));
    let cache = CredentialCache::new(&registry, CacheLocation::Session).expect("cache");
    for i in 0..5 {
        cache.set_item(&format!("key{i}"), "value").expect("set");
    }

    cache.clear().expect("clear");

    assert_eq!(store.clears(), 1);
    assert_eq!(store.removals(), 0);
    assert_eq!(cache.get_item("key0").expect("get"), None);
}

#[test]
fn test_get_all_access_tokens_filters_by_client_and_home_account() {
    common::init_tracing();
    let cache =
        CredentialCache::new(&StorageRegistry::in_memory(), CacheLocation::Local).expect("cache");

    let first = AccessTokenKey::new(AUTHORITY, CLIENT_ID, &["S1"], "1234");
    let second = AccessTokenKey::new(ALTERNATE_AUTHORITY, CLIENT_ID, &["S2", "S3"], "1234");
    let other_account = AccessTokenKey::new(AUTHORITY, CLIENT_ID, &["S1"], "5678");
    let other_client = AccessTokenKey::new(AUTHORITY, "another-client", &["S1"], "1234");

    cache
        .set_access_token(&first, &token("at1", "1234"))
        .expect("set");
    cache
        .set_access_token(&second, &token("at2", "1234"))
        .expect("set");
    cache
        .set_access_token(&other_account, &token("at3", "5678"))
        .expect("set");
    cache
        .set_access_token(&other_client, &token("at4", "1234"))
        .expect("set");
    cache.set_item("msal.idtoken", "idToken").expect("set");
    cache.set_item("{not a key", "value").expect("set");

    let results = cache
        .get_all_access_tokens(CLIENT_ID, "1234")
        .expect("scan");

    let mut tokens: Vec<&str> = results
        .iter()
        .map(|item| item.value.access_token.as_str())
        .collect();
    tokens.sort_unstable();
    assert_eq!(tokens, vec!["at1", "at2"]);
    assert!(results.iter().any(|item| item.key == first));
    assert!(results.iter().any(|item| item.key == second));
}

#[test]
fn test_scope_order_and_case_do_not_split_entries() {
    let cache =
        CredentialCache::new(&StorageRegistry::in_memory(), CacheLocation::Session).expect("cache");
    let written = AccessTokenKey::new(AUTHORITY, CLIENT_ID, &["User.Read Mail.Read"], "1234");
    let queried = AccessTokenKey::new(AUTHORITY, CLIENT_ID, &["user.read", "mail.read"], "1234");

    cache
        .set_access_token(&written, &token("at1", "1234"))
        .expect("set");

    assert_eq!(
        cache.access_token(&queried).expect("get"),
        Some(token("at1", "1234"))
    );
}

#[test]
fn test_remove_acquire_token_entries_for_one_state() {
    let cache =
        CredentialCache::new(&StorageRegistry::in_memory(), CacheLocation::Session).expect("cache");
    let claims = IdTokenClaims::new(
        json!({ "oid": "1234", "preferred_username": "user@contoso.com" })
            .as_object()
            .expect("object")
            .clone(),
    );
    let account = AccountIdentity::create(Some(&claims), Some(&ClientInfo::new("uid", "utid")));

    cache
        .set_acquire_token_account("1234", TEST_STATE, &account)
        .expect("set");
    cache
        .set_authority_for_state(TEST_STATE, AUTHORITY)
        .expect("set");
    cache
        .set_acquire_token_account("1234", "other-state", &account)
        .expect("set");
    cache
        .set_authority_for_state("other-state", ALTERNATE_AUTHORITY)
        .expect("set");

    let removed = cache
        .remove_acquire_token_entries(Some(TEST_STATE))
        .expect("remove");

    assert_eq!(removed, 2);
    assert_eq!(
        cache
            .acquire_token_account("1234", TEST_STATE)
            .expect("get"),
        None
    );
    assert_eq!(cache.authority_for_state(TEST_STATE).expect("get"), None);
    assert_eq!(
        cache
            .acquire_token_account("1234", "other-state")
            .expect("get"),
        Some(account)
    );
    assert_eq!(
        cache.authority_for_state("other-state").expect("get"),
        Some(ALTERNATE_AUTHORITY.to_string())
    );
}

#[test]
fn test_remove_acquire_token_entries_for_state_with_user_state() {
    let cache =
        CredentialCache::new(&StorageRegistry::in_memory(), CacheLocation::Session).expect("cache");
    let account = AccountIdentity::create(None, Some(&ClientInfo::new("uid", "utid")));
    let with_user_state = "guid-1|userState";

    cache
        .set_acquire_token_account("1234", with_user_state, &account)
        .expect("set");
    cache
        .set_authority_for_state(with_user_state, AUTHORITY)
        .expect("set");

    assert_eq!(
        cache
            .remove_acquire_token_entries(Some("userState"))
            .expect("remove"),
        0
    );
    assert_eq!(
        cache
            .acquire_token_account("1234", with_user_state)
            .expect("get"),
        Some(account)
    );

    assert_eq!(
        cache
            .remove_acquire_token_entries(Some(with_user_state))
            .expect("remove"),
        2
    );
    assert_eq!(
        cache
            .acquire_token_account("1234", with_user_state)
            .expect("get"),
        None
    );
    assert_eq!(cache.authority_for_state(with_user_state).expect("get"), None);
}

#[test]
fn test_generated_keys_contain_their_components() {
    let account_key = CredentialCache::generate_acquire_token_account_key("1234", TEST_STATE);
    let authority_key = CredentialCache::generate_authority_key(TEST_STATE);

    assert_eq!(account_key, "msal.acquireTokenAccount|1234|state5678");
    assert_eq!(authority_key, "msal.authority|state5678");
    assert_ne!(account_key, authority_key);
}

#[test]
fn test_reset_cache_items_leaves_access_tokens() {
    let cache =
        CredentialCache::new(&StorageRegistry::in_memory(), CacheLocation::Session).expect("cache");
    let key = AccessTokenKey::new(AUTHORITY, CLIENT_ID, &["S1"], "1234");
    cache
        .set_access_token(&key, &token("at1", "1234"))
        .expect("set");
    for well_known in [
        WellKnownKey::ClientInfo,
        WellKnownKey::TokenKeys,
        WellKnownKey::LoginState,
        WellKnownKey::IdToken,
        WellKnownKey::Nonce,
    ] {
        cache.set_item(well_known.as_str(), "value").expect("set");
    }
    cache.set_item("msal.error", "interaction_required").expect("set");
    cache
        .set_renew_status("RANDOM_GUID", RenewStatus::InProgress)
        .expect("set");

    cache.reset_cache_items().expect("reset");

    assert_eq!(cache.get_item("msal.client.info").expect("get"), Some(String::new()));
    assert_eq!(cache.get_item("msal.token.keys").expect("get"), Some(String::new()));
    assert_eq!(cache.get_item("msal.state.login").expect("get"), Some(String::new()));
    assert_eq!(cache.get_item("msal.idtoken").expect("get"), Some(String::new()));
    assert_eq!(cache.get_item("msal.nonce.idtoken").expect("get"), Some(String::new()));
    assert_eq!(cache.renew_status("RANDOM_GUID").expect("get"), None);
    assert_eq!(
        cache.get_item("msal.error").expect("get"),
        Some("interaction_required".to_string())
    );
    assert_eq!(cache.access_token(&key).expect("get"), Some(token("at1", "1234")));
}

#[test]
fn test_cookie_side_channel() {
    let registry = StorageRegistry::new(Arc::new(MemoryCookieStore::new()))
        .with_factory(CacheLocation::Session, || {
            Arc::new(authkit_core::storage::MemoryKeyValueStore::new())
        });
    let cache = CredentialCache::new(&registry, CacheLocation::Session).expect("cache");

    cache
        .set_item_cookie("msal.nonce.idtoken", "nonce-1", Some(1))
        .expect("set");
    cache
        .set_item_cookie("msal.state.login", "state-1", None)
        .expect("set");
    cache
        .set_item_cookie("unrelated", "keep", Some(2))
        .expect("set");
    assert_eq!(
        cache.get_item_cookie("msal.nonce.idtoken").expect("get"),
        Some("nonce-1".to_string())
    );

    cache.clear_cookie().expect("clear");

    assert_eq!(cache.get_item_cookie("msal.nonce.idtoken").expect("get"), None);
    assert_eq!(cache.get_item_cookie("msal.state.login").expect("get"), None);
    assert_eq!(
        cache.get_item_cookie("unrelated").expect("get"),
        Some("keep".to_string())
    );
}

#[test]
fn test_from_json_config_with_cookie_mirroring() {
    let registry = StorageRegistry::in_memory();
    let config = CacheConfig::from_json(
        r#"{"cacheLocation":"localStorage","storeAuthStateInCookie":true}"#,
    )
    .expect("config");
    let cache = CredentialCache::from_config(&registry, &config).expect("cache");
    assert_eq!(cache.location(), CacheLocation::Local);

    cache
        .set_auth_state(WellKnownKey::AcquireTokenState, TEST_STATE)
        .expect("set");

    assert_eq!(
        cache.get_item_cookie("msal.state.acquireToken").expect("get"),
        Some(TEST_STATE.to_string())
    );
    let other = CredentialCache::new(&registry, CacheLocation::Local).expect("cache");
    assert_eq!(
        other.get_item("msal.state.acquireToken").expect("get"),
        Some(TEST_STATE.to_string())
    );
}
