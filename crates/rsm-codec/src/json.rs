//! JSON serializer (via `serde_json`).

use serde_json::Value;

use crate::{CodecError, Serializer, SerializerContext};

/// A [`Serializer`] that stores attribute values as JSON text.
///
/// JSON is the default: values stay readable in `redis-cli`, and any
/// other service that shares the store can decode them without this
/// crate.
///
/// ## Example
///
/// ```rust
/// use rsm_codec::{JsonSerializer, Serializer};
/// use serde_json::json;
///
/// let serializer = JsonSerializer::default();
/// let value = json!({ "cart": [1, 2, 3] });
///
/// let bytes = serializer.serialize(&value).unwrap();
/// assert_eq!(serializer.deserialize(&bytes).unwrap(), value);
/// ```
#[derive(Debug, Clone, Default)]
pub struct JsonSerializer {
    context: SerializerContext,
}

impl Serializer for JsonSerializer {
    fn name(&self) -> &'static str {
        "json"
    }

    fn configure(&mut self, context: &SerializerContext) {
        self.context = context.clone();
    }

    fn serialize(&self, value: &Value) -> Result<Vec<u8>, CodecError> {
        let bytes = serde_json::to_vec(value).map_err(CodecError::encode)?;
        self.context.check_size(bytes.len())?;
        Ok(bytes)
    }

    fn deserialize(&self, data: &[u8]) -> Result<Value, CodecError> {
        self.context.check_size(data.len())?;
        serde_json::from_slice(data).map_err(CodecError::decode)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_serialize_nested_value_round_trips() {
        let serializer = JsonSerializer::default();
        let value = json!({
            "user": "alice",
            "visits": 42,
            "ratio": 0.5,
            "tags": ["a", "b"],
            "prefs": { "theme": "dark", "beta": true, "extra": null }
        });

        let bytes = serializer.serialize(&value).unwrap();

        assert_eq!(serializer.deserialize(&bytes).unwrap(), value);
    }

    #[test]
    fn test_serialize_string_writes_plain_json() {
        let serializer = JsonSerializer::default();
        let bytes = serializer.serialize(&json!("hello")).unwrap();
        assert_eq!(bytes, b"\"hello\"");
    }

    #[test]
    fn test_deserialize_garbage_returns_decode_error() {
        let serializer = JsonSerializer::default();

        let result = serializer.deserialize(b"\x93\x01\x02");

        assert!(matches!(result, Err(CodecError::Decode(_))));
    }

    #[test]
    fn test_deserialize_over_limit_rejected_before_parsing() {
        let mut serializer = JsonSerializer::default();
        serializer.configure(&SerializerContext {
            max_payload_bytes: Some(2),
        });

        let result = serializer.deserialize(b"\"abc\"");

        assert!(matches!(
            result,
            Err(CodecError::PayloadTooLarge { size: 5, limit: 2 })
        ));
    }
}
