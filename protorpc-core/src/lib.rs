//! Core types for protorpc.
//!
//! - [`MessageSchema`] and [`MessageCodec`] bind JSON payloads to schemas.
//! - [`MethodDescriptor`] and [`ServiceDescriptor`] form a read-only method
//!   registry, built once per service type.
//! - [`Call`] tracks one in-flight request from `Running` to a terminal state;
//!   its [`CallCompleter`] is the only way to drive that transition.

pub mod call;
pub mod codec;
pub mod descriptor;
pub mod envelope;
pub mod error;
pub mod ids;
pub mod schema;

pub use call::{Call, CallCompleter, CallResult, CallState};
pub use codec::{JsonCodec, MessageCodec, DEFAULT_MAX_MESSAGE_SIZE, JSON_CONTENT_TYPE};
pub use descriptor::{MethodDescriptor, ServiceDescriptor, ServiceDescriptorBuilder};
pub use envelope::Outcome;
pub use error::{
    ApplicationError, CallError, CodecError, ErrorCode, ErrorKind, RegistryError, ServiceError,
    TransitionError,
};
pub use ids::{CallId, CallIdAllocator};
pub use schema::{MessageSchema, SchemaCheck, SchemaRef};

/// Structured payload exchanged by every call.
pub type Message = serde_json::Value;
