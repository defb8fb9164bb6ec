//! A small echo service, used by the demo binary and by tests.

use crate::ServiceHandler;
use async_trait::async_trait;
use protorpc_core::{ApplicationError, Message, MethodDescriptor, RegistryError, ServiceDescriptor};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const SERVICE_NAME: &str = "Echo";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SayRequest {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SayResponse {
    pub text: String,
}

/// `say` echoes the text back, `shout` upper-cases it and `fail` always
/// returns a `failed_precondition` error.
pub fn descriptor() -> Result<ServiceDescriptor, RegistryError> {
    ServiceDescriptor::builder(SERVICE_NAME)
        .method(MethodDescriptor::typed::<SayRequest, SayResponse>("say")?)
        .method(MethodDescriptor::typed::<SayRequest, SayResponse>("shout")?)
        .method(MethodDescriptor::untyped("fail"))
        .build()
}

#[derive(Debug, Default)]
pub struct EchoHandler;

impl EchoHandler {
    fn say(request: Message, transform: fn(&str) -> String) -> Result<Message, ApplicationError> {
        let request: SayRequest = serde_json::from_value(request)
            .map_err(|e| ApplicationError::bad_request(e.to_string()))?;
        let response = SayResponse {
            text: transform(&request.text),
        };
        serde_json::to_value(response).map_err(|e| ApplicationError::internal(e.to_string()))
    }
}

#[async_trait]
impl ServiceHandler for EchoHandler {
    async fn handle(&self, method: &str, request: Message) -> Result<Message, ApplicationError> {
        match method {
            "say" => Self::say(request, str::to_string),
            "shout" => Self::say(request, str::to_uppercase),
            "fail" => Err(ApplicationError::failed_precondition("echo was asked to fail")),
            other => Err(ApplicationError::not_found(format!("no such method '{}'", other))),
        }
    }
}

/// Registered handle pair for [`crate::Dispatcher::register`].
pub fn service() -> Result<(Arc<ServiceDescriptor>, Arc<dyn ServiceHandler>), RegistryError> {
    Ok((Arc::new(descriptor()?), Arc::new(EchoHandler)))
}
