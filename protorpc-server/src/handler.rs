use async_trait::async_trait;
use protorpc_core::{ApplicationError, Message};

/// Server-side implementation of one service.
///
/// `method` is always a name registered on the service's descriptor and
/// `request` has already been checked against that method's request schema.
#[async_trait]
pub trait ServiceHandler: Send + Sync {
    async fn handle(&self, method: &str, request: Message) -> Result<Message, ApplicationError>;
}

/// Adapts a plain function into a [`ServiceHandler`].
pub struct FnHandler<F> {
    f: F,
}

pub fn handler_fn<F>(f: F) -> FnHandler<F>
where
    F: Fn(&str, Message) -> Result<Message, ApplicationError> + Send + Sync + 'static,
{
    FnHandler { f }
}

#[async_trait]
impl<F> ServiceHandler for FnHandler<F>
where
    F: Fn(&str, Message) -> Result<Message, ApplicationError> + Send + Sync + 'static,
{
    async fn handle(&self, method: &str, request: Message) -> Result<Message, ApplicationError> {
        (self.f)(method, request)
    }
}

impl<F> std::fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FnHandler")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_fn_handler() {
        let handler = handler_fn(|method, request| match method {
            "say" => Ok(request),
            _ => Err(ApplicationError::not_found(method.to_string())),
        });

        assert_eq!(
            handler.handle("say", json!({"text": "hi"})).await,
            Ok(json!({"text": "hi"}))
        );
        assert!(handler.handle("other", json!(null)).await.is_err());
    }
}
