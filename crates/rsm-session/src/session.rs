//! A single session and its lazily-hydrated attribute cache.
//!
//! A [`Session`] is the in-process view of one remote Redis hash:
//!
//! ```text
//!   key: <session id>            TTL: max_inactive_interval
//!   ├── id    → <session id>     (claim marker, written at creation)
//!   ├── user  → <encoded value>
//!   └── cart  → <encoded value>
//! ```
//!
//! Reads go through a local cache: the first `get_attribute` for a name
//! fetches that one field, later reads are served locally. Writes and
//! removals go straight to the store before the call returns; there is
//! no dirty tracking and no end-of-request flush.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rsm_codec::{CodecError, Serializer, Value};
use rsm_store::SessionStore;
use serde::{Serialize, de::DeserializeOwned};

use crate::local::LocalSessions;
use crate::{SessionError, SessionListener};

/// Hash field holding the session id. Written once by the claim and
/// never exposed as an attribute.
pub const CLAIM_FIELD: &str = "id";

/// One user's session, owned by a single in-flight request.
///
/// Mutating methods take `&mut self`: the host hands each request its
/// own `Session`, so there's no internal locking. Two requests for the
/// same id on different nodes each get their own `Session`, and their
/// writes meet in the store field by field (last write wins).
pub struct Session<S: SessionStore> {
    id: String,
    creation_time: DateTime<Utc>,
    last_accessed_time: DateTime<Utc>,
    max_inactive_interval: u64,
    is_new: bool,
    is_valid: bool,

    /// Attributes read or written by this process. Partial: a missing
    /// entry means "not loaded yet", not "absent remotely".
    attributes: HashMap<String, Value>,

    store: Arc<S>,
    serializer: Arc<dyn Serializer>,
    listeners: Vec<Arc<dyn SessionListener>>,

    /// The owning manager's bookkeeping; renewed on access and write.
    local: Arc<LocalSessions>,
}

impl<S: SessionStore> Session<S> {
    pub(crate) fn new(
        id: String,
        is_new: bool,
        max_inactive_interval: u64,
        store: Arc<S>,
        serializer: Arc<dyn Serializer>,
        listeners: Vec<Arc<dyn SessionListener>>,
        local: Arc<LocalSessions>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            creation_time: now,
            last_accessed_time: now,
            max_inactive_interval,
            is_new,
            is_valid: true,
            attributes: HashMap::new(),
            store,
            serializer,
            listeners,
            local,
        }
    }

    // -- Accessors --------------------------------------------------------

    /// The session id, which is also its key in the store.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// When this `Session` was created or loaded. For loaded sessions
    /// this is the load time; the true creation time is not stored.
    pub fn creation_time(&self) -> DateTime<Utc> {
        self.creation_time
    }

    /// When [`access`](Self::access) last ran.
    pub fn last_accessed_time(&self) -> DateTime<Utc> {
        self.last_accessed_time
    }

    /// TTL in seconds applied to the remote key on every touch.
    pub fn max_inactive_interval(&self) -> u64 {
        self.max_inactive_interval
    }

    /// Changes the TTL used from the next touch or write onward.
    /// A value of 0 is ignored.
    pub fn set_max_inactive_interval(&mut self, secs: u64) {
        if secs > 0 {
            self.max_inactive_interval = secs;
        }
    }

    /// `true` until the session has been through one complete request.
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    /// `false` once [`expire`](Self::expire) has run.
    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    /// Names of the attributes currently held in the local cache.
    pub fn cached_attribute_names(&self) -> Vec<&str> {
        self.attributes.keys().map(String::as_str).collect()
    }

    // -- Attributes -------------------------------------------------------

    /// Returns the attribute named `name`, fetching it from the store on
    /// first use.
    ///
    /// A cache miss costs one `HGET`. The decoded value is cached
    /// without writing anything back. `Ok(None)` means the attribute
    /// doesn't exist remotely either.
    ///
    /// # Errors
    /// - [`SessionError::DeserializationFailed`]: the stored bytes don't
    ///   decode; nothing is cached.
    /// - [`SessionError::Store`]: the fetch failed.
    pub async fn get_attribute(
        &mut self,
        name: &str,
    ) -> Result<Option<Value>, SessionError> {
        self.check_usable(name)?;

        if let Some(value) = self.attributes.get(name) {
            return Ok(Some(value.clone()));
        }

        let Some(bytes) = self.store.hget(&self.id, name).await? else {
            return Ok(None);
        };

        let value = self.serializer.deserialize(&bytes).map_err(|source| {
            tracing::warn!(
                session_id = %self.id,
                attribute = name,
                error = %source,
                "stored attribute could not be decoded"
            );
            SessionError::DeserializationFailed {
                name: name.to_string(),
                source,
            }
        })?;

        tracing::trace!(session_id = %self.id, attribute = name, "attribute hydrated");
        self.attributes.insert(name.to_string(), value.clone());
        Ok(Some(value))
    }

    /// Like [`get_attribute`](Self::get_attribute), converted into `T`.
    ///
    /// # Errors
    /// A value that doesn't fit `T` is reported as
    /// [`SessionError::DeserializationFailed`].
    pub async fn attribute_as<T: DeserializeOwned>(
        &mut self,
        name: &str,
    ) -> Result<Option<T>, SessionError> {
        let Some(value) = self.get_attribute(name).await? else {
            return Ok(None);
        };
        serde_json::from_value(value).map(Some).map_err(|e| {
            SessionError::DeserializationFailed {
                name: name.to_string(),
                source: CodecError::Decode(Box::new(e)),
            }
        })
    }

    /// Binds `value` to `name`, writing it to the store before returning.
    ///
    /// `Value::Null` means "unbind" and is handled exactly like
    /// [`remove_attribute`](Self::remove_attribute); no null marker is
    /// stored. Every write also resets the session's remote TTL.
    ///
    /// ## Order of effects
    ///
    /// ```text
    /// encode ──→ write field + reset TTL (only if key exists) ──→ cache
    ///   │                  │
    ///   └─ fails: nothing  └─ key gone: Expired, nothing written
    /// ```
    ///
    /// 1. **Encode first.** A value the serializer can't handle must
    ///    never reach the store half-written, so encoding happens before
    ///    any I/O.
    /// 2. **Write conditionally.** The field write and the TTL reset are
    ///    one atomic store command that does nothing if the session key
    ///    no longer exists. An unconditional `HSET` would recreate a
    ///    session the store had already expired: the new hash would
    ///    lack the claim marker, so the next caller asking for this id
    ///    would win the claim and inherit whatever this handle wrote.
    /// 3. **Cache last.** The local cache only ever holds values the
    ///    store has accepted, so a failure at any step leaves it as it
    ///    was.
    ///
    /// # Errors
    /// - [`SessionError::SerializationFailed`]: encoding failed; nothing
    ///   was written.
    /// - [`SessionError::Expired`]: the session key is gone from the
    ///   store; nothing was written.
    /// - [`SessionError::Store`]: the write failed.
    pub async fn set_attribute(
        &mut self,
        name: &str,
        value: impl Into<Value>,
    ) -> Result<(), SessionError> {
        let value = value.into();
        if value.is_null() {
            return self.remove_attribute(name).await;
        }
        self.check_usable(name)?;

        let bytes = self.serializer.serialize(&value).map_err(|source| {
            SessionError::SerializationFailed {
                name: name.to_string(),
                source,
            }
        })?;

        let written = self
            .store
            .hset_xx_ex(&self.id, name, &bytes, self.max_inactive_interval)
            .await?;
        if !written {
            return Err(self.lapsed());
        }
        self.local.renew(&self.id, self.max_inactive_interval).await;

        tracing::debug!(
            session_id = %self.id,
            attribute = name,
            bytes = bytes.len(),
            "attribute written"
        );
        self.attributes.insert(name.to_string(), value);
        Ok(())
    }

    /// Like [`set_attribute`](Self::set_attribute) for any `Serialize`
    /// type.
    pub async fn set_attribute_as<T: Serialize>(
        &mut self,
        name: &str,
        value: &T,
    ) -> Result<(), SessionError> {
        let value = serde_json::to_value(value).map_err(|e| {
            SessionError::SerializationFailed {
                name: name.to_string(),
                source: CodecError::Encode(Box::new(e)),
            }
        })?;
        self.set_attribute(name, value).await
    }

    /// Unbinds `name` locally and deletes its remote field.
    ///
    /// The two steps are independent: the cache entry is dropped even
    /// if the remote delete then fails. Removing an attribute that
    /// doesn't exist is not an error.
    pub async fn remove_attribute(&mut self, name: &str) -> Result<(), SessionError> {
        self.check_usable(name)?;

        self.attributes.remove(name);
        let existed = self.store.hdel(&self.id, name).await?;

        tracing::debug!(
            session_id = %self.id,
            attribute = name,
            existed,
            "attribute removed"
        );
        Ok(())
    }

    // -- Lifecycle --------------------------------------------------------

    /// Marks the session as used by the current request and resets its
    /// remote TTL to `max_inactive_interval`.
    ///
    /// Call this on every request that touches the session, even when
    /// no attribute is read or written.
    ///
    /// # Errors
    /// - [`SessionError::Expired`]: the key lapsed or was removed since
    ///   this `Session` was built. `EXPIRE` on a missing key changes
    ///   nothing, so the store stays clean.
    /// - [`SessionError::Store`]: the store could not be reached.
    pub async fn access(&mut self) -> Result<(), SessionError> {
        let present = self
            .store
            .expire(&self.id, self.max_inactive_interval)
            .await?;
        if !present {
            return Err(self.lapsed());
        }
        self.last_accessed_time = Utc::now();
        self.local.renew(&self.id, self.max_inactive_interval).await;
        tracing::trace!(session_id = %self.id, "session accessed");
        Ok(())
    }

    /// Ends the current request's use of the session. After the first
    /// completed request the session is no longer new. Local only.
    pub fn end_access(&mut self) {
        self.is_new = false;
    }

    /// Invalidates this `Session` locally.
    ///
    /// The store is not touched: the remote key goes away through
    /// [`SessionManager::remove_session`](crate::SessionManager::remove_session)
    /// or its TTL. With `notify`, every registered
    /// [`SessionListener`] hears about it once. Expiring an already
    /// invalid session does nothing.
    pub fn expire(&mut self, notify: bool) {
        if !self.is_valid {
            return;
        }
        self.is_valid = false;
        self.attributes.clear();

        tracing::debug!(session_id = %self.id, notify, "session invalidated");
        if notify {
            for listener in &self.listeners {
                listener.session_expired(&self.id);
            }
        }
    }

    fn lapsed(&self) -> SessionError {
        tracing::debug!(session_id = %self.id, "session no longer in store");
        SessionError::Expired(self.id.clone())
    }

    fn check_usable(&self, name: &str) -> Result<(), SessionError> {
        if !self.is_valid {
            return Err(SessionError::Invalidated(self.id.clone()));
        }
        if name == CLAIM_FIELD {
            return Err(SessionError::ReservedAttribute(name.to_string()));
        }
        Ok(())
    }
}

impl<S: SessionStore> std::fmt::Debug for Session<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("creation_time", &self.creation_time)
            .field("last_accessed_time", &self.last_accessed_time)
            .field("max_inactive_interval", &self.max_inactive_interval)
            .field("is_new", &self.is_new)
            .field("is_valid", &self.is_valid)
            .field("cached", &self.attributes.len())
            .field("serializer", &self.serializer.name())
            .finish()
    }
}
