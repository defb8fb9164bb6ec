use crate::envelope::Outcome;
use crate::schema::MessageSchema;
use crate::{CodecError, Message};
use bytes::Bytes;
use std::fmt;

pub const JSON_CONTENT_TYPE: &str = "application/json";

/// 10MB, large enough for any sane message.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 10 * 1024 * 1024;

/// Turns schema-bound messages into wire bytes and back.
///
/// Request bodies are bare encoded messages. Reply bodies are an encoded
/// [`Outcome`] envelope so a server can report application failures through
/// the same channel as successful values.
pub trait MessageCodec: Send + Sync + fmt::Debug {
    /// Value of the `Content-Type` header for bodies produced by this codec.
    fn content_type(&self) -> &'static str;

    fn encode(&self, schema: &MessageSchema, message: &Message) -> Result<Bytes, CodecError>;

    fn decode(&self, schema: &MessageSchema, data: &[u8]) -> Result<Message, CodecError>;

    /// Encode a reply. Only the success branch is checked against `schema`.
    fn encode_outcome(&self, schema: &MessageSchema, outcome: &Outcome)
        -> Result<Bytes, CodecError>;

    fn decode_outcome(&self, schema: &MessageSchema, data: &[u8]) -> Result<Outcome, CodecError>;
}

/// JSON codec with a size limit on both directions.
#[derive(Debug, Clone, Copy)]
pub struct JsonCodec {
    max_message_size: usize,
}

impl JsonCodec {
    pub fn new() -> Self {
        Self {
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }

    pub fn with_max_message_size(max_message_size: usize) -> Self {
        Self { max_message_size }
    }

    pub fn max_message_size(&self) -> usize {
        self.max_message_size
    }

    fn check_size(&self, size: usize) -> Result<(), CodecError> {
        if size > self.max_message_size {
            return Err(CodecError::TooLarge {
                size,
                max: self.max_message_size,
            });
        }
        Ok(())
    }
}

impl Default for JsonCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageCodec for JsonCodec {
    fn content_type(&self) -> &'static str {
        JSON_CONTENT_TYPE
    }

    fn encode(&self, schema: &MessageSchema, message: &Message) -> Result<Bytes, CodecError> {
        schema.check(message)?;
        let json = serde_json::to_vec(message)?;
        self.check_size(json.len())?;
        Ok(Bytes::from(json))
    }

    fn decode(&self, schema: &MessageSchema, data: &[u8]) -> Result<Message, CodecError> {
        self.check_size(data.len())?;
        let message: Message = serde_json::from_slice(data)?;
        schema.check(&message)?;
        Ok(message)
    }

    fn encode_outcome(
        &self,
        schema: &MessageSchema,
        outcome: &Outcome,
    ) -> Result<Bytes, CodecError> {
        if let Outcome::Value(value) = outcome {
            schema.check(value)?;
        }
        let json = serde_json::to_vec(outcome)?;
        self.check_size(json.len())?;
        Ok(Bytes::from(json))
    }

    fn decode_outcome(&self, schema: &MessageSchema, data: &[u8]) -> Result<Outcome, CodecError> {
        self.check_size(data.len())?;
        let outcome: Outcome = serde_json::from_slice(data)?;
        if let Outcome::Value(value) = &outcome {
            schema.check(value)?;
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ApplicationError;
    use serde_json::json;

    fn text_schema() -> MessageSchema {
        MessageSchema::json_schema(
            "Text",
            json!({
                "type": "object",
                "properties": { "text": { "type": "string" } },
                "required": ["text"]
            }),
        )
        .unwrap()
    }

    #[test]
    fn test_encode_decode_message() {
        let codec = JsonCodec::new();
        let schema = text_schema();
        let msg = json!({"text": "hello"});

        let encoded = codec.encode(&schema, &msg).unwrap();
        assert_eq!(&encoded[..], br#"{"text":"hello"}"#);
        let decoded = codec.decode(&schema, &encoded).unwrap();
        assert_eq!(msg, decoded);
    }

    #[test]
    fn test_encode_rejects_schema_mismatch() {
        let codec = JsonCodec::new();
        let result = codec.encode(&text_schema(), &json!({"txt": "typo"}));
        assert!(matches!(result, Err(CodecError::Schema { .. })));
    }

    #[test]
    fn test_decode_rejects_malformed_json() {
        let codec = JsonCodec::new();
        let result = codec.decode(&text_schema(), b"{not json");
        assert!(matches!(result, Err(CodecError::Json(_))));
    }

    #[test]
    fn test_size_limit() {
        let codec = JsonCodec::with_max_message_size(8);
        let schema = MessageSchema::any("Any");

        let result = codec.encode(&schema, &json!({"text": "way too long"}));
        assert!(matches!(result, Err(CodecError::TooLarge { max: 8, .. })));

        let result = codec.decode(&schema, br#"{"text":"way too long"}"#);
        assert!(matches!(result, Err(CodecError::TooLarge { .. })));
    }

    #[test]
    fn test_outcome_round_trip() {
        let codec = JsonCodec::new();
        let schema = text_schema();

        let ok = Outcome::Value(json!({"text": "hi"}));
        let bytes = codec.encode_outcome(&schema, &ok).unwrap();
        assert_eq!(codec.decode_outcome(&schema, &bytes).unwrap(), ok);

        let err = Outcome::Error(ApplicationError::bad_request("nope"));
        let bytes = codec.encode_outcome(&schema, &err).unwrap();
        assert_eq!(codec.decode_outcome(&schema, &bytes).unwrap(), err);
    }

    #[test]
    fn test_decode_outcome_checks_value_schema() {
        let codec = JsonCodec::new();
        let result = codec.decode_outcome(&text_schema(), br#"{"value":{"text":42}}"#);
        assert!(matches!(result, Err(CodecError::Schema { .. })));
    }

    #[test]
    fn test_content_type() {
        assert_eq!(JsonCodec::default().content_type(), "application/json");
        assert_eq!(JsonCodec::default().max_message_size(), DEFAULT_MAX_MESSAGE_SIZE);
    }
}
