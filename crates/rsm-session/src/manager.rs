//! The session manager: the host's single entry point.
//!
//! Responsibilities:
//! - Claiming fresh session ids in the store (at most one winner per id)
//! - Looking sessions up by id without loading their attributes
//! - Renewing the remote TTL on access
//! - Removing sessions, idempotently
//!
//! What it does NOT do is sweep for expired sessions. Every session key
//! carries a store-side TTL, and the store drops the key when it lapses.
//!
//! # Concurrency note
//!
//! `SessionManager` is `Send + Sync`; share it behind an `Arc` across
//! request tasks. The only lock it holds guards the process-local id
//! bookkeeping and is never held across a store round trip.

use std::sync::Arc;

use rand::Rng;
use rsm_codec::Serializer;
use rsm_store::SessionStore;

use crate::local::LocalSessions;
use crate::session::CLAIM_FIELD;
use crate::{Session, SessionConfig, SessionError, SessionListener};

/// Descriptive name of this manager implementation, for logs.
pub const NAME: &str = "RedisSessionManager";

/// Descriptive name and version of this manager implementation.
pub const INFO: &str = "RedisSessionManager/1.1";

/// Creates, finds, touches, and removes sessions stored in `S`.
///
/// ## Lifecycle
///
/// ```text
/// create_session() ──→ [claimed key, TTL set]
///        │                    │
///        ▼                    ├── access()          → TTL reset
/// find_session()  ◀───────────┤   set_attribute()   → field + TTL reset
///                             │
///                             ├── remove_session()  → key deleted
///                             └── (idle > TTL)      → key dropped by store
/// ```
pub struct SessionManager<S: SessionStore> {
    store: Arc<S>,
    serializer: Arc<dyn Serializer>,
    config: SessionConfig,
    listeners: Vec<Arc<dyn SessionListener>>,

    /// Ids claimed through this manager, with the deadline their TTL
    /// implies. Shared with every session this manager builds so their
    /// renewals count. Other nodes' sessions never appear here.
    local: Arc<LocalSessions>,
}

impl<S: SessionStore> SessionManager<S> {
    /// Creates a manager over `store`, encoding attributes with
    /// `serializer`.
    pub fn new(
        store: Arc<S>,
        serializer: Arc<dyn Serializer>,
        config: SessionConfig,
    ) -> Self {
        Self {
            store,
            serializer,
            config,
            listeners: Vec::new(),
            local: Arc::new(LocalSessions::default()),
        }
    }

    /// Registers a listener that every session created or found from
    /// now on will notify when invalidated with `expire(true)`.
    ///
    /// Takes `&mut self`: register listeners during startup, before the
    /// manager is shared behind an `Arc`.
    pub fn add_listener(&mut self, listener: Arc<dyn SessionListener>) {
        self.listeners.push(listener);
    }

    /// The configuration this manager was built with.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The backing store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Creates a session, claiming its id in the store.
    ///
    /// The candidate id is `requested_id` if given (and non-empty),
    /// otherwise a random one.
    ///
    /// ## The claim
    ///
    /// Every node in the cluster may be creating sessions at the same
    /// moment, and the store is the only thing they share. So ownership
    /// of an id is decided there, by one atomic command: set the hash
    /// field `id` on the candidate key *only if it is absent*, and apply
    /// the session TTL in the same step. Exactly one caller sees success
    /// for a given id; it owns the id from then until the key goes away.
    ///
    /// A lost claim means someone else owns that id (a live session, or
    /// a concurrent create that got there first). The loser leaves the
    /// winner's key and TTL alone, generates a fresh random id, and
    /// tries again until a claim succeeds. A requested id that's
    /// already taken is therefore never reused or overwritten, and the
    /// returned session never shares data with an earlier owner.
    ///
    /// # Errors
    /// - [`SessionError::InvalidConfig`] if the configuration is unusable.
    /// - [`SessionError::Store`] if a claim attempt fails; nothing is
    ///   retried after a store error.
    pub async fn create_session(
        &self,
        requested_id: Option<&str>,
    ) -> Result<Session<S>, SessionError> {
        self.config.validate()?;
        let ttl = self.config.max_inactive_interval;

        let mut candidate = match requested_id {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => generate_session_id(self.config.session_id_length),
        };

        loop {
            let claimed = self
                .store
                .hset_nx_ex(&candidate, CLAIM_FIELD, candidate.as_bytes(), ttl)
                .await?;
            if claimed {
                break;
            }
            tracing::debug!(session_id = %candidate, "session id already claimed, retrying");
            candidate = generate_session_id(self.config.session_id_length);
        }

        self.local.insert(candidate.clone(), ttl).await;
        tracing::info!(session_id = %candidate, ttl, "session created");

        Ok(self.build_session(candidate, true))
    }

    /// Looks up a session by id.
    ///
    /// Only checks that the key exists; no attributes are transferred.
    /// They load one by one as the request reads them.
    ///
    /// Returns `Ok(None)` if there is no such session (never created,
    /// removed, or expired). That is an ordinary answer, not an error.
    pub async fn find_session(
        &self,
        id: &str,
    ) -> Result<Option<Session<S>>, SessionError> {
        if !self.store.exists(id).await? {
            tracing::debug!(session_id = %id, "session not found in store");
            return Ok(None);
        }

        tracing::debug!(session_id = %id, "session found in store");
        Ok(Some(self.build_session(id.to_string(), false)))
    }

    /// Resets the session's remote TTL. Same as
    /// [`Session::access`]; provided so hosts can drive everything
    /// through the manager.
    pub async fn access(&self, session: &mut Session<S>) -> Result<(), SessionError> {
        session.access().await
    }

    /// Deletes the session's key from the store and forgets the id
    /// locally. Removing an already-removed session is not an error.
    pub async fn remove_session(&self, session: &Session<S>) -> Result<(), SessionError> {
        self.remove_session_by_id(session.id()).await
    }

    /// Like [`remove_session`](Self::remove_session), by id.
    pub async fn remove_session_by_id(&self, id: &str) -> Result<(), SessionError> {
        // Local bookkeeping goes first so it is dropped even when the
        // store is unreachable.
        self.local.remove(id).await;
        let existed = self.store.delete(id).await?;
        tracing::info!(session_id = %id, existed, "session removed");
        Ok(())
    }

    /// Passive expiry hook. Does nothing: the store's per-key TTL is the
    /// only expiry mechanism, and no live sessions are scanned.
    pub fn process_expires(&self) {
        tracing::trace!("expiry delegated to store TTL");
    }

    /// Number of sessions created through this manager that haven't
    /// been removed through it and whose TTL, as last renewed on this
    /// node, hasn't run out.
    ///
    /// Renewals made on other nodes aren't seen here, so a session kept
    /// alive elsewhere can drop out of this count early.
    pub async fn local_session_count(&self) -> usize {
        self.local.count().await
    }

    fn build_session(&self, id: String, is_new: bool) -> Session<S> {
        Session::new(
            id,
            is_new,
            self.config.max_inactive_interval,
            self.store.clone(),
            self.serializer.clone(),
            self.listeners.clone(),
            self.local.clone(),
        )
    }
}

impl<S: SessionStore> std::fmt::Debug for SessionManager<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("name", &NAME)
            .field("config", &self.config)
            .field("serializer", &self.serializer.name())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// Generates a random session id: `len` random bytes as lowercase hex.
///
/// With the default 16 bytes that is 128 bits of entropy, so a
/// collision between live sessions is vanishingly unlikely; the claim
/// loop in `create_session` covers the rest.
fn generate_session_id(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| format!("{:02x}", rng.random::<u8>()))
        .collect()
}
