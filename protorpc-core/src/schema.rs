//! Message schemas.
//!
//! A [`MessageSchema`] names a message type and decides whether a JSON value
//! is an acceptable instance of it. Descriptors hold schemas by [`SchemaRef`]
//! and the codec consults them on both encode and decode.

use crate::CodecError;
use schemars::{schema_for, JsonSchema};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Shared, read-only handle to a schema.
pub type SchemaRef = Arc<MessageSchema>;

type PredicateFn = dyn Fn(&Value) -> bool + Send + Sync;

/// How a schema checks a candidate value.
#[derive(Clone)]
pub enum SchemaCheck {
    /// Every value is accepted.
    Any,
    /// A compiled JSON Schema.
    JsonSchema(Arc<jsonschema::Validator>),
    /// A plain predicate.
    Predicate(Arc<PredicateFn>),
}

impl fmt::Debug for SchemaCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaCheck::Any => write!(f, "Any"),
            SchemaCheck::JsonSchema(_) => write!(f, "JsonSchema(..)"),
            SchemaCheck::Predicate(_) => write!(f, "Predicate(..)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MessageSchema {
    name: String,
    check: SchemaCheck,
}

impl MessageSchema {
    /// A schema that accepts any JSON value.
    pub fn any(name: impl Into<String>) -> Self {
        MessageSchema {
            name: name.into(),
            check: SchemaCheck::Any,
        }
    }

    /// Compile a raw JSON Schema document.
    pub fn json_schema(name: impl Into<String>, schema: Value) -> Result<Self, CodecError> {
        let name = name.into();
        let compiled = jsonschema::validator_for(&schema).map_err(|e| CodecError::Schema {
            schema: name.clone(),
            reason: format!("invalid schema: {}", e),
        })?;
        Ok(MessageSchema {
            name,
            check: SchemaCheck::JsonSchema(Arc::new(compiled)),
        })
    }

    /// Derive the schema from a Rust type.
    pub fn of<T: JsonSchema>() -> Result<Self, CodecError> {
        let schema = serde_json::to_value(schema_for!(T))?;
        Self::json_schema(T::schema_name(), schema)
    }

    pub fn predicate<F>(name: impl Into<String>, check: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        MessageSchema {
            name: name.into(),
            check: SchemaCheck::Predicate(Arc::new(check)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &SchemaCheck {
        &self.check
    }

    /// Check `value` against this schema.
    pub fn check(&self, value: &Value) -> Result<(), CodecError> {
        match &self.check {
            SchemaCheck::Any => Ok(()),
            SchemaCheck::JsonSchema(validator) => {
                validator.validate(value).map_err(|e| CodecError::Schema {
                    schema: self.name.clone(),
                    reason: e.to_string(),
                })
            }
            SchemaCheck::Predicate(check) => {
                if check(value) {
                    Ok(())
                } else {
                    Err(CodecError::Schema {
                        schema: self.name.clone(),
                        reason: "value rejected by predicate".to_string(),
                    })
                }
            }
        }
    }

    pub fn is_valid(&self, value: &Value) -> bool {
        self.check(value).is_ok()
    }
}
