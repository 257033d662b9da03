//! MessagePack serializer (via `rmp-serde`).

use serde_json::Value;

use crate::{CodecError, Serializer, SerializerContext};

/// A [`Serializer`] that stores attribute values as MessagePack.
///
/// Smaller than JSON and cheaper to parse. MessagePack is
/// self-describing, so it decodes back into the same dynamic value
/// without a schema. Maps are written with string keys.
#[derive(Debug, Clone, Default)]
pub struct MessagePackSerializer {
    context: SerializerContext,
}

impl Serializer for MessagePackSerializer {
    fn name(&self) -> &'static str {
        "messagepack"
    }

    fn configure(&mut self, context: &SerializerContext) {
        self.context = context.clone();
    }

    fn serialize(&self, value: &Value) -> Result<Vec<u8>, CodecError> {
        let bytes = rmp_serde::to_vec(value).map_err(CodecError::encode)?;
        self.context.check_size(bytes.len())?;
        Ok(bytes)
    }

    fn deserialize(&self, data: &[u8]) -> Result<Value, CodecError> {
        self.context.check_size(data.len())?;
        rmp_serde::from_slice(data).map_err(CodecError::decode)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_serialize_nested_value_round_trips() {
        let serializer = MessagePackSerializer::default();
        let value = json!({
            "user": "bob",
            "visits": 7,
            "balance": -12,
            "ratio": 1.25,
            "history": [{ "page": "/" }, { "page": "/cart" }]
        });

        let bytes = serializer.serialize(&value).unwrap();

        assert_eq!(serializer.deserialize(&bytes).unwrap(), value);
    }

    #[test]
    fn test_serialize_is_smaller_than_json_for_numbers() {
        let value = json!([1000, 2000, 3000, 4000]);
        let packed = MessagePackSerializer::default().serialize(&value).unwrap();
        let text = crate::JsonSerializer::default().serialize(&value).unwrap();
        assert!(packed.len() < text.len());
    }

    #[test]
    fn test_deserialize_truncated_payload_returns_decode_error() {
        let serializer = MessagePackSerializer::default();
        let mut bytes = serializer.serialize(&json!("a longer string")).unwrap();
        bytes.truncate(3);

        let result = serializer.deserialize(&bytes);

        assert!(matches!(result, Err(CodecError::Decode(_))));
    }
}
