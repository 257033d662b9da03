//! Error types for the serializer layer.
//!
//! A `CodecError` always means the problem is in turning an attribute
//! value into bytes or back. Store and session failures live in their
//! own crates.

/// Boxed source error from whichever format backend produced it.
type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while encoding or decoding attribute values.
///
/// The backend error is boxed so callers deal with one type no matter
/// which [`Serializer`](crate::Serializer) is configured.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Serialization failed (turning a value into bytes).
    #[error("encode failed: {0}")]
    Encode(#[source] BoxError),

    /// Deserialization failed (turning bytes into a value).
    ///
    /// Common causes: truncated payloads, bytes written by a different
    /// serializer, or data that isn't a supported value type.
    #[error("decode failed: {0}")]
    Decode(#[source] BoxError),

    /// The encoded payload is larger than the configured limit.
    #[error("payload of {size} bytes exceeds the {limit}-byte limit")]
    PayloadTooLarge { size: usize, limit: usize },

    /// The selected serializer was not compiled into this build.
    #[error("serializer `{0}` is not available (missing cargo feature)")]
    Unsupported(&'static str),
}

impl CodecError {
    pub(crate) fn encode(err: impl Into<BoxError>) -> Self {
        Self::Encode(err.into())
    }

    pub(crate) fn decode(err: impl Into<BoxError>) -> Self {
        Self::Decode(err.into())
    }
}
