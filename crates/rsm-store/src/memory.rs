//! In-process implementation of [`SessionStore`].
//!
//! Mirrors the Redis semantics the session layer relies on: string vs.
//! hash keys, per-key TTL, `HDEL` of the last field removing the key,
//! and an atomic claim. Time is read from the tokio clock, so tests can
//! pause and advance it instead of sleeping.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::{MappedMutexGuard, Mutex, MutexGuard};
use tokio::time::Instant;

use crate::{SessionStore, StoreError, TtlStatus};

#[derive(Debug)]
enum Value {
    String(Vec<u8>),
    Hash(HashMap<String, Vec<u8>>),
}

#[derive(Debug)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    fn hash_mut(&mut self) -> Result<&mut HashMap<String, Vec<u8>>, StoreError> {
        match &mut self.value {
            Value::Hash(fields) => Ok(fields),
            Value::String(_) => Err(wrong_type()),
        }
    }
}

fn wrong_type() -> StoreError {
    StoreError::Command(
        "WRONGTYPE Operation against a key holding the wrong kind of value"
            .into(),
    )
}

fn deadline(ttl_secs: u64) -> Result<Instant, StoreError> {
    if ttl_secs == 0 {
        return Err(StoreError::Command("invalid expire time".into()));
    }
    Ok(Instant::now() + Duration::from_secs(ttl_secs))
}

/// How often a command also sweeps every lapsed key, not just its own.
const PURGE_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Default)]
struct Keyspace {
    entries: HashMap<String, Entry>,
    last_purge: Option<Instant>,
}

impl Keyspace {
    /// Drops `key` if it has lapsed, and every other lapsed key if the
    /// last full pass was more than [`PURGE_INTERVAL`] ago.
    fn evict_expired(&mut self, key: &str, now: Instant) {
        let due = self
            .last_purge
            .is_none_or(|at| now.saturating_duration_since(at) >= PURGE_INTERVAL);
        if due {
            self.entries.retain(|_, entry| !entry.is_expired(now));
            self.last_purge = Some(now);
        } else if self.entries.get(key).is_some_and(|e| e.is_expired(now)) {
            self.entries.remove(key);
        }
    }
}

/// A [`SessionStore`] kept in this process's memory.
///
/// There is no background sweeper. A command always drops its own key
/// if it has lapsed, and at most once a second a command
/// also walks the whole map and drops every lapsed key. A node whose
/// sessions mostly end by timing out therefore doesn't keep them.
///
/// Sessions stored here are only shared by managers holding the same
/// `Arc<MemoryStore>`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    keyspace: Mutex<Keyspace>,
    offline: AtomicBool,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates losing (or regaining) the connection to the store.
    /// While offline every command fails with
    /// [`StoreError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Locks the map after checking connectivity, evicting lapsed keys
    /// first.
    async fn lock_for(
        &self,
        key: &str,
    ) -> Result<MappedMutexGuard<'_, HashMap<String, Entry>>, StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "memory store is offline".into(),
            ));
        }
        let mut keyspace = self.keyspace.lock().await;
        keyspace.evict_expired(key, Instant::now());
        Ok(MutexGuard::map(keyspace, |k| &mut k.entries))
    }
}

impl SessionStore for MemoryStore {
    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.lock_for(key).await?.contains_key(key))
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.lock_for(key).await?.remove(key).is_some())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let entries = self.lock_for(key).await?;
        match entries.get(key).map(|e| &e.value) {
            None => Ok(None),
            Some(Value::String(bytes)) => Ok(Some(bytes.clone())),
            Some(Value::Hash(_)) => Err(wrong_type()),
        }
    }

    async fn set_ex(
        &self,
        key: &str,
        value: &[u8],
        ttl_secs: u64,
    ) -> Result<(), StoreError> {
        let expires_at = deadline(ttl_secs)?;
        let mut entries = self.lock_for(key).await?;
        entries.insert(
            key.to_string(),
            Entry {
                value: Value::String(value.to_vec()),
                expires_at: Some(expires_at),
            },
        );
        Ok(())
    }

    async fn hset_nx_ex(
        &self,
        key: &str,
        field: &str,
        value: &[u8],
        ttl_secs: u64,
    ) -> Result<bool, StoreError> {
        let expires_at = deadline(ttl_secs)?;
        // Check and insert happen under one lock acquisition, which is
        // what makes the claim atomic.
        let mut entries = self.lock_for(key).await?;
        let entry = entries.entry(key.to_string()).or_insert_with(|| Entry {
            value: Value::Hash(HashMap::new()),
            expires_at: None,
        });
        let fields = entry.hash_mut()?;
        if fields.contains_key(field) {
            return Ok(false);
        }
        fields.insert(field.to_string(), value.to_vec());
        entry.expires_at = Some(expires_at);
        Ok(true)
    }

    async fn hget(
        &self,
        key: &str,
        field: &str,
    ) -> Result<Option<Vec<u8>>, StoreError> {
        let mut entries = self.lock_for(key).await?;
        match entries.get_mut(key) {
            None => Ok(None),
            Some(entry) => Ok(entry.hash_mut()?.get(field).cloned()),
        }
    }

    async fn hset(
        &self,
        key: &str,
        field: &str,
        value: &[u8],
    ) -> Result<(), StoreError> {
        let mut entries = self.lock_for(key).await?;
        let entry = entries.entry(key.to_string()).or_insert_with(|| Entry {
            value: Value::Hash(HashMap::new()),
            expires_at: None,
        });
        entry.hash_mut()?.insert(field.to_string(), value.to_vec());
        Ok(())
    }

    async fn hset_xx_ex(
        &self,
        key: &str,
        field: &str,
        value: &[u8],
        ttl_secs: u64,
    ) -> Result<bool, StoreError> {
        let expires_at = deadline(ttl_secs)?;
        let mut entries = self.lock_for(key).await?;
        let Some(entry) = entries.get_mut(key) else {
            return Ok(false);
        };
        entry.hash_mut()?.insert(field.to_string(), value.to_vec());
        entry.expires_at = Some(expires_at);
        Ok(true)
    }

    async fn hdel(&self, key: &str, field: &str) -> Result<bool, StoreError> {
        let mut entries = self.lock_for(key).await?;
        let Some(entry) = entries.get_mut(key) else {
            return Ok(false);
        };
        let fields = entry.hash_mut()?;
        let removed = fields.remove(field).is_some();
        // Redis deletes a hash once its last field is gone.
        if fields.is_empty() {
            entries.remove(key);
        }
        Ok(removed)
    }

    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<bool, StoreError> {
        let mut entries = self.lock_for(key).await?;
        if ttl_secs == 0 {
            // A non-positive TTL deletes the key, as in Redis.
            return Ok(entries.remove(key).is_some());
        }
        match entries.get_mut(key) {
            None => Ok(false),
            Some(entry) => {
                entry.expires_at =
                    Some(Instant::now() + Duration::from_secs(ttl_secs));
                Ok(true)
            }
        }
    }

    async fn ttl(&self, key: &str) -> Result<TtlStatus, StoreError> {
        let entries = self.lock_for(key).await?;
        let status = match entries.get(key) {
            None => TtlStatus::Missing,
            Some(Entry {
                expires_at: None, ..
            }) => TtlStatus::Persistent,
            Some(Entry {
                expires_at: Some(at),
                ..
            }) => {
                let remaining = at.saturating_duration_since(Instant::now());
                // Round to the nearest second, like `TTL` does.
                TtlStatus::Expires(((remaining.as_millis() + 500) / 1000) as u64)
            }
        };
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =====================================================================
    // Strings and keys
    // =====================================================================

    #[tokio::test]
    async fn test_set_ex_then_get_returns_value() {
        let store = MemoryStore::new();
        store.set_ex("k", b"v", 60).await.unwrap();

        assert_eq!(store.get("k").await.unwrap(), Some(b"v".to_vec()));
        assert!(store.exists("k").await.unwrap());
    }

    #[tokio::test]
    async fn test_set_ex_zero_ttl_returns_command_error() {
        let store = MemoryStore::new();
        let result = store.set_ex("k", b"v", 0).await;
        assert!(matches!(result, Err(StoreError::Command(_))));
    }

    #[tokio::test]
    async fn test_delete_missing_key_returns_false() {
        let store = MemoryStore::new();
        assert!(!store.delete("nope").await.unwrap());
    }

    #[tokio::test]
    async fn test_get_on_hash_key_returns_wrong_type() {
        let store = MemoryStore::new();
        store.hset("h", "f", b"1").await.unwrap();

        let result = store.get("h").await;

        assert!(matches!(result, Err(StoreError::Command(msg)) if msg.starts_with("WRONGTYPE")));
    }

    // =====================================================================
    // Hashes
    // =====================================================================

    #[tokio::test]
    async fn test_hset_nx_ex_second_claim_returns_false() {
        let store = MemoryStore::new();

        assert!(store.hset_nx_ex("s1", "id", b"s1", 30).await.unwrap());
        assert!(!store.hset_nx_ex("s1", "id", b"other", 30).await.unwrap());

        // The loser must not have overwritten the winner's marker.
        assert_eq!(
            store.hget("s1", "id").await.unwrap(),
            Some(b"s1".to_vec())
        );
    }

    #[tokio::test]
    async fn test_hset_nx_ex_applies_ttl() {
        let store = MemoryStore::new();
        store.hset_nx_ex("s1", "id", b"s1", 30).await.unwrap();

        assert_eq!(store.ttl("s1").await.unwrap(), TtlStatus::Expires(30));
    }

    #[tokio::test]
    async fn test_hset_creates_persistent_hash() {
        let store = MemoryStore::new();
        store.hset("h", "a", b"1").await.unwrap();

        assert_eq!(store.ttl("h").await.unwrap(), TtlStatus::Persistent);
        assert_eq!(store.hget("h", "a").await.unwrap(), Some(b"1".to_vec()));
        assert_eq!(store.hget("h", "b").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_hdel_last_field_removes_key() {
        let store = MemoryStore::new();
        store.hset("h", "a", b"1").await.unwrap();

        assert!(store.hdel("h", "a").await.unwrap());
        assert!(!store.exists("h").await.unwrap());
        // Deleting again is fine.
        assert!(!store.hdel("h", "a").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_hset_nx_ex_lost_claim_keeps_winner_ttl() {
        let store = MemoryStore::new();
        store.hset_nx_ex("s1", "id", b"s1", 30).await.unwrap();
        tokio::time::advance(Duration::from_secs(10)).await;

        assert!(!store.hset_nx_ex("s1", "id", b"s1", 30).await.unwrap());

        assert_eq!(store.ttl("s1").await.unwrap(), TtlStatus::Expires(20));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hset_xx_ex_existing_key_writes_and_renews() {
        let store = MemoryStore::new();
        store.hset_nx_ex("s1", "id", b"s1", 30).await.unwrap();
        tokio::time::advance(Duration::from_secs(10)).await;

        assert!(store.hset_xx_ex("s1", "user", b"alice", 30).await.unwrap());

        assert_eq!(store.hget("s1", "user").await.unwrap(), Some(b"alice".to_vec()));
        assert_eq!(store.ttl("s1").await.unwrap(), TtlStatus::Expires(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hset_xx_ex_lapsed_key_writes_nothing() {
        let store = MemoryStore::new();
        store.hset_nx_ex("s1", "id", b"s1", 1).await.unwrap();
        tokio::time::advance(Duration::from_secs(2)).await;

        assert!(!store.hset_xx_ex("s1", "user", b"alice", 30).await.unwrap());

        assert!(!store.exists("s1").await.unwrap());
        // The id is free to claim again, with no leftover fields.
        assert!(store.hset_nx_ex("s1", "id", b"s1", 30).await.unwrap());
        assert_eq!(store.hget("s1", "user").await.unwrap(), None);
    }

    // =====================================================================
    // TTL
    // =====================================================================

    #[tokio::test(start_paused = true)]
    async fn test_key_expires_after_ttl() {
        let store = MemoryStore::new();
        store.hset_nx_ex("s1", "id", b"s1", 1).await.unwrap();

        tokio::time::advance(Duration::from_millis(999)).await;
        assert!(store.exists("s1").await.unwrap());

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(!store.exists("s1").await.unwrap());
        assert_eq!(store.ttl("s1").await.unwrap(), TtlStatus::Missing);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expire_resets_remaining_ttl() {
        let store = MemoryStore::new();
        store.hset_nx_ex("s1", "id", b"s1", 10).await.unwrap();
        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(store.ttl("s1").await.unwrap(), TtlStatus::Expires(4));

        assert!(store.expire("s1", 10).await.unwrap());

        assert_eq!(store.ttl("s1").await.unwrap(), TtlStatus::Expires(10));
    }

    #[tokio::test]
    async fn test_expire_missing_key_returns_false() {
        let store = MemoryStore::new();
        assert!(!store.expire("nope", 10).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_lapsed_keys_purged_by_unrelated_command() {
        let store = MemoryStore::new();
        for i in 0..1000 {
            store.hset_nx_ex(&format!("s{i}"), "id", b"x", 1).await.unwrap();
        }
        tokio::time::advance(Duration::from_secs(5)).await;

        store.exists("unrelated").await.unwrap();

        assert_eq!(store.keyspace.lock().await.entries.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_keeps_live_keys() {
        let store = MemoryStore::new();
        store.hset_nx_ex("short", "id", b"x", 1).await.unwrap();
        store.hset_nx_ex("long", "id", b"x", 60).await.unwrap();
        tokio::time::advance(Duration::from_secs(5)).await;

        store.exists("unrelated").await.unwrap();

        let keyspace = store.keyspace.lock().await;
        assert_eq!(keyspace.entries.len(), 1);
        assert!(keyspace.entries.contains_key("long"));
    }

    // =====================================================================
    // Connectivity
    // =====================================================================

    #[tokio::test]
    async fn test_offline_store_returns_unavailable() {
        let store = MemoryStore::new();
        store.set_offline(true);

        let err = store.exists("k").await.unwrap_err();
        assert!(err.is_unavailable());

        store.set_offline(false);
        assert!(!store.exists("k").await.unwrap());
    }
}
