use serde::{Deserialize, Serialize};

use crate::error::ApplicationError;
use crate::Message;

/// Reply envelope.
///
/// On the wire this is `{"value": <message>}` for a successful call and
/// `{"error": {"code": ..., "message": ...}}` when the server handled the
/// request but reports a business-logic failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Value(Message),
    Error(ApplicationError),
}

impl Outcome {
    pub fn is_value(&self) -> bool {
        matches!(self, Outcome::Value(_))
    }

    pub fn into_result(self) -> Result<Message, ApplicationError> {
        match self {
            Outcome::Value(value) => Ok(value),
            Outcome::Error(error) => Err(error),
        }
    }
}

impl From<Result<Message, ApplicationError>> for Outcome {
    fn from(result: Result<Message, ApplicationError>) -> Self {
        match result {
            Ok(value) => Outcome::Value(value),
            Err(error) => Outcome::Error(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use serde_json::json;

    #[test]
    fn test_value_wire_shape() {
        let outcome = Outcome::Value(json!({"text": "hi"}));
        let json = serde_json::to_string(&outcome).unwrap();
        insta::assert_snapshot!(json, @r#"{"value":{"text":"hi"}}"#);
    }

    #[test]
    fn test_error_wire_shape() {
        let outcome = Outcome::Error(ApplicationError::not_found("no such user"));
        let json = serde_json::to_string(&outcome).unwrap();
        insta::assert_snapshot!(json, @r#"{"error":{"code":"not_found","message":"no such user"}}"#);
    }

    #[test]
    fn test_null_value_is_success() {
        let outcome: Outcome = serde_json::from_str(r#"{"value":null}"#).unwrap();
        assert_eq!(outcome, Outcome::Value(json!(null)));
        assert!(outcome.is_value());
    }

    #[test]
    fn test_bare_message_is_not_an_envelope() {
        let result: Result<Outcome, _> = serde_json::from_str(r#"{"text":"hi"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_into_result() {
        let err = Outcome::Error(ApplicationError::unavailable("down"))
            .into_result()
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Unavailable);

        let outcome: Outcome = Ok(json!(1)).into();
        assert_eq!(outcome.into_result().unwrap(), json!(1));
    }
}
