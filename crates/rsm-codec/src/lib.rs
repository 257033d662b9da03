//! Attribute serializers for the Redis session manager.
//!
//! Every session attribute is stored as its own Redis hash field. This
//! crate decides what bytes go into that field:
//!
//! - **Strategy** ([`Serializer`] trait): encode/decode one value.
//! - **Implementations**: [`JsonSerializer`] (always available) and
//!   [`MessagePackSerializer`] (`messagepack` feature, on by default).
//! - **Selection** ([`SerializerKind`], [`SerializerConfig`]): which
//!   implementation to build, chosen from configuration at startup.
//! - **Errors** ([`CodecError`]).
//!
//! Attribute values use the JSON data model ([`serde_json::Value`]):
//! null, booleans, numbers, strings, arrays and string-keyed maps.

mod error;
mod json;
#[cfg(feature = "messagepack")]
mod msgpack;
mod serializer;

pub use error::CodecError;
pub use json::JsonSerializer;
#[cfg(feature = "messagepack")]
pub use msgpack::MessagePackSerializer;
pub use serializer::{
    Serializer, SerializerConfig, SerializerContext, SerializerKind,
};

/// Re-exported so callers can build attribute values without naming
/// `serde_json` in their own manifest.
pub use serde_json::{json, Value};
