//! The serializer strategy and the startup-time registry that picks one.
//!
//! A "serializer" converts one attribute value into the bytes stored in a
//! Redis hash field, and back. The session layer doesn't care HOW values
//! are encoded; it only needs something that implements [`Serializer`].
//! This is the strategy pattern: one interface, swappable encodings.
//!
//! Which strategy runs is decided once, at startup, by a
//! [`SerializerKind`] in the configuration. There is no lookup by type
//! name at runtime.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::CodecError;

/// Converts attribute values to bytes and back.
///
/// ## Trait bounds
///
/// - `Send + Sync` → one serializer is shared by every session the
///   manager hands out, across all tokio worker threads.
/// - `'static` → it owns its configuration and borrows nothing.
///
/// The trait is object safe so the manager can hold an
/// `Arc<dyn Serializer>` chosen from configuration.
pub trait Serializer: Send + Sync + 'static {
    /// Short, stable name used in logs (`"json"`, `"messagepack"`).
    fn name(&self) -> &'static str;

    /// Applies runtime settings before first use.
    fn configure(&mut self, context: &SerializerContext);

    /// Encodes a value into bytes.
    ///
    /// # Errors
    /// Returns [`CodecError::Encode`] if the format can't represent the
    /// value, or [`CodecError::PayloadTooLarge`] if the result exceeds
    /// the configured limit.
    fn serialize(&self, value: &Value) -> Result<Vec<u8>, CodecError>;

    /// Decodes bytes back into a value.
    ///
    /// # Errors
    /// Returns [`CodecError::Decode`] if the bytes are malformed or were
    /// written by an incompatible serializer.
    fn deserialize(&self, data: &[u8]) -> Result<Value, CodecError>;
}

// ---------------------------------------------------------------------------
// SerializerContext
// ---------------------------------------------------------------------------

/// Runtime settings handed to [`Serializer::configure`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SerializerContext {
    /// Largest payload accepted on either side of the codec.
    /// `None` disables the check.
    pub max_payload_bytes: Option<usize>,
}

impl SerializerContext {
    /// Rejects payloads over the configured limit.
    pub fn check_size(&self, size: usize) -> Result<(), CodecError> {
        match self.max_payload_bytes {
            Some(limit) if size > limit => {
                Err(CodecError::PayloadTooLarge { size, limit })
            }
            _ => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// SerializerKind / SerializerConfig
// ---------------------------------------------------------------------------

/// The serializer selected in configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SerializerKind {
    /// Human-readable JSON via `serde_json`. Easy to inspect with
    /// `redis-cli HGET`.
    #[default]
    Json,

    /// Compact binary MessagePack via `rmp-serde`.
    /// Requires the `messagepack` feature.
    #[serde(alias = "msgpack")]
    MessagePack,
}

impl SerializerKind {
    /// Returns the name the built serializer reports.
    pub fn name(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::MessagePack => "messagepack",
        }
    }
}

impl std::fmt::Display for SerializerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Serializer section of the configuration surface.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerializerConfig {
    /// Which encoding to use for attribute values.
    pub kind: SerializerKind,

    /// Optional upper bound on one encoded attribute value.
    pub max_payload_bytes: Option<usize>,
}

impl SerializerConfig {
    /// Instantiates and configures the selected serializer.
    ///
    /// # Errors
    /// Returns [`CodecError::Unsupported`] if the selected serializer's
    /// cargo feature is disabled.
    pub fn build(&self) -> Result<Box<dyn Serializer>, CodecError> {
        let mut serializer: Box<dyn Serializer> = match self.kind {
            SerializerKind::Json => Box::new(crate::JsonSerializer::default()),
            #[cfg(feature = "messagepack")]
            SerializerKind::MessagePack => {
                Box::new(crate::MessagePackSerializer::default())
            }
            #[cfg(not(feature = "messagepack"))]
            SerializerKind::MessagePack => {
                return Err(CodecError::Unsupported("messagepack"));
            }
        };

        serializer.configure(&SerializerContext {
            max_payload_bytes: self.max_payload_bytes,
        });
        Ok(serializer)
    }
}
