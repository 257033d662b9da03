//! Unified error type for the session manager.

use rsm_codec::CodecError;
use rsm_session::SessionError;
use rsm_store::StoreError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `rsm` facade you deal with this single error type
/// instead of importing errors from each sub-crate. The `#[from]`
/// attribute on each variant generates the `From` impls, so `?`
/// converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum RsmError {
    /// Building or running a serializer failed.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The backing store failed or is misconfigured.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A session operation failed.
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl RsmError {
    /// Returns `true` if the root cause is a lost or refused store
    /// connection, however deep it is wrapped.
    pub fn is_store_unavailable(&self) -> bool {
        match self {
            Self::Store(e) => e.is_unavailable(),
            Self::Session(e) => e.is_store_unavailable(),
            Self::Codec(_) => false,
        }
    }
}
