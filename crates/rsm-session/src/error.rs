//! Error types for the session layer.

use rsm_codec::CodecError;
use rsm_store::StoreError;

/// Errors that can occur while creating, finding, or using a session.
///
/// "Session not found" is absent: a missing session is a
/// normal lookup result (`Ok(None)`), not a failure.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The backing store failed. Check
    /// [`is_store_unavailable`](Self::is_store_unavailable) to tell a
    /// lost connection from a rejected command.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// An attribute value could not be encoded. Nothing was written,
    /// locally or remotely.
    #[error("failed to serialize attribute `{name}`: {source}")]
    SerializationFailed {
        name: String,
        #[source]
        source: CodecError,
    },

    /// A stored attribute value could not be decoded. The local cache
    /// was left untouched; the caller decides whether to treat the
    /// attribute as absent or fail the request.
    #[error("failed to deserialize attribute `{name}`: {source}")]
    DeserializationFailed {
        name: String,
        #[source]
        source: CodecError,
    },

    /// The session was invalidated with
    /// [`Session::expire`](crate::Session::expire) and can no longer be
    /// read or written.
    #[error("session {0} has been invalidated")]
    Invalidated(String),

    /// The session's key is gone from the store: its TTL lapsed or
    /// another node removed it. Nothing was written; the host should
    /// treat the session as ended.
    #[error("session {0} no longer exists in the store")]
    Expired(String),

    /// The attribute name collides with the claim marker field.
    #[error("attribute name `{0}` is reserved")]
    ReservedAttribute(String),

    /// The session configuration is unusable. Reported on first use.
    #[error("invalid session configuration: {0}")]
    InvalidConfig(String),
}

impl SessionError {
    /// Returns `true` if the store could not be reached.
    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_unavailable())
    }
}
