//! Backing store adapter for the Redis session manager.
//!
//! Provides the [`SessionStore`] trait: the narrow set of single-key,
//! single-round-trip commands the session layer is allowed to use.
//! Nothing here spans more than one key, so no cross-key atomicity is
//! offered or assumed.
//!
//! # Implementations
//!
//! - [`RedisStore`]: pooled Redis connections via `deadpool-redis`
//!   (`redis` feature, on by default)
//! - [`MemoryStore`]: a process-local map with per-key TTL, for
//!   single-node setups and tests
//!
//! # Failure model
//!
//! A connectivity problem surfaces as [`StoreError::Unavailable`] from
//! whichever command hit it. Adapters never retry.

mod config;
mod error;
mod memory;
#[cfg(feature = "redis")]
mod redis_store;

pub use config::StoreConfig;
pub use error::StoreError;
pub use memory::MemoryStore;
#[cfg(feature = "redis")]
pub use redis_store::RedisStore;

use std::future::Future;

/// Remaining lifetime of a key, as reported by [`SessionStore::ttl`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtlStatus {
    /// The key does not exist (or already expired).
    Missing,

    /// The key exists and never expires.
    Persistent,

    /// The key expires in this many seconds (rounded to nearest).
    Expires(u64),
}

/// Single-key commands against the remote key-value store.
///
/// Every method is one round trip: the returned future resolves only
/// after the store has answered. TTLs are whole seconds.
///
/// # Trait bounds
///
/// - `Send + Sync + 'static` → one store is shared by the manager and
///   every session it hands out, across tokio tasks.
/// - Futures are `Send` so manager operations can be spawned.
pub trait SessionStore: Send + Sync + 'static {
    /// Returns `true` if `key` exists.
    fn exists(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Deletes `key`. Returns `true` if it existed. Deleting a missing
    /// key is not an error.
    fn delete(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Reads a plain string value.
    fn get(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<Vec<u8>>, StoreError>> + Send;

    /// Writes a plain string value with a TTL (`SET key value EX ttl`).
    fn set_ex(
        &self,
        key: &str,
        value: &[u8],
        ttl_secs: u64,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Sets a hash field only if it is absent, and when it was set,
    /// applies `ttl_secs` to the whole key, atomically.
    ///
    /// Returns `true` if this call set the field. Of any number of
    /// concurrent callers for the same key and field, exactly one
    /// observes `true`.
    fn hset_nx_ex(
        &self,
        key: &str,
        field: &str,
        value: &[u8],
        ttl_secs: u64,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Reads one hash field.
    fn hget(
        &self,
        key: &str,
        field: &str,
    ) -> impl Future<Output = Result<Option<Vec<u8>>, StoreError>> + Send;

    /// Writes one hash field, creating the hash if needed.
    fn hset(
        &self,
        key: &str,
        field: &str,
        value: &[u8],
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Writes one hash field and applies `ttl_secs` to the whole key,
    /// atomically, but only if the key still exists.
    ///
    /// Returns `false` without writing anything when the key is gone
    /// (deleted, or its TTL lapsed). This is how a session write avoids
    /// recreating a session the store already dropped: a plain
    /// [`hset`](Self::hset) would bring the key back without its claim
    /// marker, and the next claimer of that id would inherit the data.
    fn hset_xx_ex(
        &self,
        key: &str,
        field: &str,
        value: &[u8],
        ttl_secs: u64,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Deletes one hash field. Returns `true` if it existed.
    fn hdel(
        &self,
        key: &str,
        field: &str,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Sets the TTL of an existing key. Returns `false` if the key is
    /// missing.
    fn expire(
        &self,
        key: &str,
        ttl_secs: u64,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Reports how long `key` has left to live.
    fn ttl(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<TtlStatus, StoreError>> + Send;
}
