//! Client side of protorpc.
//!
//! A [`Service`] resolves method names against a [`ServiceDescriptor`] and
//! sends calls through any [`Transport`]. The [`rpc_service!`] macro
//! generates a typed wrapper around it.

#[cfg(feature = "macros")]
pub mod macros;
pub mod service;

pub use protorpc_core::{
    Call, CallError, CallResult, CallState, ErrorCode, ErrorKind, Message, MethodDescriptor,
    RegistryError, ServiceDescriptor, ServiceError,
};
#[cfg(feature = "http")]
pub use protorpc_transport::{ChannelError, HttpConfig, HttpTransport};
pub use protorpc_transport::Transport;
pub use service::Service;

/// HTTP transport for `config`, ready to share between services.
#[cfg(feature = "http")]
pub fn connect_http(config: HttpConfig) -> Result<std::sync::Arc<HttpTransport>, ChannelError> {
    Ok(std::sync::Arc::new(HttpTransport::http(config)?))
}
