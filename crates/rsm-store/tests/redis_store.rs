//! Integration tests against a live Redis server.
//!
//! Ignored by default. To run them:
//!
//! ```text
//! RSM_TEST_REDIS_HOST=127.0.0.1 cargo test -p rsm-store -- --ignored
//! ```
//!
//! Every test works under its own key prefix so runs don't collide, and
//! cleans up the keys it created.

#![cfg(feature = "redis")]

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rsm_store::{RedisStore, SessionStore, StoreConfig, TtlStatus};

fn store(test: &str) -> RedisStore {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    RedisStore::new(StoreConfig {
        host: std::env::var("RSM_TEST_REDIS_HOST").unwrap_or_else(|_| "127.0.0.1".into()),
        port: std::env::var("RSM_TEST_REDIS_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(6379),
        key_prefix: format!("rsm-test:{test}:{}:{nanos}:", std::process::id()),
        ..StoreConfig::default()
    })
}

#[tokio::test]
#[ignore = "needs a live Redis server"]
async fn test_hset_nx_ex_only_first_claim_wins() {
    let store = store("claim");

    assert!(store.hset_nx_ex("s1", "id", b"s1", 60).await.unwrap());
    assert!(!store.hset_nx_ex("s1", "id", b"other", 60).await.unwrap());

    assert_eq!(store.hget("s1", "id").await.unwrap(), Some(b"s1".to_vec()));
    assert!(matches!(store.ttl("s1").await.unwrap(), TtlStatus::Expires(59..=60)));
    store.delete("s1").await.unwrap();
}

#[tokio::test]
#[ignore = "needs a live Redis server"]
async fn test_lost_claim_leaves_ttl_alone() {
    let store = store("lost-claim");
    store.hset_nx_ex("s1", "id", b"s1", 60).await.unwrap();

    store.hset_nx_ex("s1", "id", b"s1", 5).await.unwrap();

    assert!(matches!(store.ttl("s1").await.unwrap(), TtlStatus::Expires(59..=60)));
    store.delete("s1").await.unwrap();
}

#[tokio::test]
#[ignore = "needs a live Redis server"]
async fn test_hash_field_round_trip_and_delete() {
    let store = store("fields");
    store.hset_nx_ex("s1", "id", b"s1", 60).await.unwrap();

    store.hset("s1", "user", br#""alice""#).await.unwrap();
    assert_eq!(store.hget("s1", "user").await.unwrap(), Some(br#""alice""#.to_vec()));

    assert!(store.hdel("s1", "user").await.unwrap());
    assert!(!store.hdel("s1", "user").await.unwrap());
    assert_eq!(store.hget("s1", "user").await.unwrap(), None);

    assert!(store.delete("s1").await.unwrap());
    assert!(!store.delete("s1").await.unwrap());
    assert!(!store.exists("s1").await.unwrap());
}

#[tokio::test]
#[ignore = "needs a live Redis server"]
async fn test_expire_renews_and_key_lapses() {
    let store = store("expire");
    store.hset_nx_ex("s1", "id", b"s1", 1).await.unwrap();

    assert!(store.expire("s1", 1).await.unwrap());
    tokio::time::sleep(Duration::from_millis(1500)).await;

    assert!(!store.exists("s1").await.unwrap());
    assert_eq!(store.ttl("s1").await.unwrap(), TtlStatus::Missing);
    assert!(!store.expire("s1", 60).await.unwrap());
}

#[tokio::test]
#[ignore = "needs a live Redis server"]
async fn test_string_set_ex_and_get() {
    let store = store("string");

    store.set_ex("blob", b"\x00\x01binary", 60).await.unwrap();

    assert_eq!(store.get("blob").await.unwrap(), Some(b"\x00\x01binary".to_vec()));
    store.delete("blob").await.unwrap();
}

#[tokio::test]
#[ignore = "needs a live Redis server"]
async fn test_wrong_type_is_command_error_not_unavailable() {
    let store = store("wrongtype");
    store.set_ex("plain", b"x", 60).await.unwrap();

    let err = store.hget("plain", "field").await.unwrap_err();

    assert!(!err.is_unavailable(), "got {err:?}");
    store.delete("plain").await.unwrap();
}

#[tokio::test]
#[ignore = "needs a live Redis server"]
async fn test_hset_xx_ex_does_not_recreate_lapsed_key() {
    let store = store("write-if-exists");
    store.hset_nx_ex("s1", "id", b"s1", 1).await.unwrap();

    assert!(store.hset_xx_ex("s1", "user", b"alice", 1).await.unwrap());
    tokio::time::sleep(Duration::from_millis(1500)).await;

    assert!(!store.hset_xx_ex("s1", "user", b"bob", 60).await.unwrap());
    assert!(!store.exists("s1").await.unwrap());
}
