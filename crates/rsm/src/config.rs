//! Combined configuration and the wiring that turns it into a manager.

use std::sync::Arc;

use rsm_codec::{Serializer, SerializerConfig};
use rsm_session::{SessionConfig, SessionManager};
use rsm_store::{RedisStore, SessionStore, StoreConfig};
use serde::{Deserialize, Serialize};

use crate::RsmError;

/// A session manager backed by Redis, the usual production setup.
pub type RedisSessionManager = SessionManager<RedisStore>;

/// Everything the host supplies at startup, in one value.
///
/// Each section deserializes on its own with defaults for missing
/// fields, so a host can embed this in its own config file format:
///
/// ```toml
/// [store]
/// host = "redis.internal"
/// key_prefix = "session:"
///
/// [session]
/// max_inactive_interval = 900
///
/// [serializer]
/// kind = "msgpack"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RsmConfig {
    pub store: StoreConfig,
    pub session: SessionConfig,
    pub serializer: SerializerConfig,
}

impl RsmConfig {
    /// Builds a Redis-backed session manager.
    ///
    /// No connection is opened here. The pool is created on the first
    /// store command, and store or session settings that are out of
    /// range are reported from that first call.
    ///
    /// # Errors
    /// Returns [`RsmError::Codec`] if the selected serializer was not
    /// compiled in.
    pub fn build(self) -> Result<RedisSessionManager, RsmError> {
        let store = Arc::new(RedisStore::new(self.store.clone()));
        self.build_with_store(store)
    }

    /// Builds a session manager over any [`SessionStore`], using only
    /// the session and serializer sections.
    ///
    /// # Errors
    /// Same as [`build`](Self::build).
    pub fn build_with_store<S: SessionStore>(
        self,
        store: Arc<S>,
    ) -> Result<SessionManager<S>, RsmError> {
        let serializer: Arc<dyn Serializer> = Arc::from(self.serializer.build()?);

        tracing::info!(
            manager = rsm_session::INFO,
            serializer = serializer.name(),
            max_inactive_interval = self.session.max_inactive_interval,
            "session manager configured"
        );

        Ok(SessionManager::new(store, serializer, self.session))
    }
}
