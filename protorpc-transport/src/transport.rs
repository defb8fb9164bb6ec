use async_trait::async_trait;
use bytes::Bytes;
use protorpc_core::{
    Call, CallCompleter, CallError, CallIdAllocator, CallResult, JsonCodec, Message,
    MessageCodec, MessageSchema, MethodDescriptor, Outcome,
};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::runtime::Handle;
use tracing::{debug, trace};

/// Connection-level failures. Every variant resolves a call as a network error.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("connection closed")]
    Closed,
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// One encoded request on its way out.
#[derive(Debug, Clone)]
pub struct Exchange {
    /// Name of the method being called.
    pub method: String,
    pub content_type: &'static str,
    pub body: Bytes,
}

/// The raw reply to an [`Exchange`].
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub body: Bytes,
}

impl Reply {
    pub fn ok(body: impl Into<Bytes>) -> Self {
        Reply {
            status: 200,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A single request/reply network exchange.
#[async_trait]
pub trait Channel: Send + Sync + 'static {
    async fn exchange(&self, exchange: Exchange) -> Result<Reply, ChannelError>;
}

/// Turns a method invocation into I/O and resolves the returned [`Call`].
///
/// `send_rpc` never blocks: the call comes back `Running` (or already failed
/// if the request could not be encoded) and reaches its terminal state later.
pub trait Transport: Send + Sync {
    fn send_rpc(&self, method: &Arc<MethodDescriptor>, request: Message) -> Call;
}

/// A [`Transport`] that encodes with a [`MessageCodec`] and exchanges bytes
/// over a [`Channel`]. Exactly one exchange per call, no retries.
pub struct RpcTransport<C> {
    channel: Arc<C>,
    codec: Arc<dyn MessageCodec>,
    ids: CallIdAllocator,
}

impl<C: Channel> RpcTransport<C> {
    pub fn new(channel: C) -> Self {
        Self::with_codec(channel, Arc::new(JsonCodec::new()))
    }

    pub fn with_codec(channel: C, codec: Arc<dyn MessageCodec>) -> Self {
        RpcTransport {
            channel: Arc::new(channel),
            codec,
            ids: CallIdAllocator::new(),
        }
    }

    pub fn channel(&self) -> &Arc<C> {
        &self.channel
    }

    pub fn codec(&self) -> &Arc<dyn MessageCodec> {
        &self.codec
    }
}

impl<C: Channel> Transport for RpcTransport<C> {
    fn send_rpc(&self, method: &Arc<MethodDescriptor>, request: Message) -> Call {
        let id = self.ids.allocate();
        let encoded = self.codec.encode(method.request_schema(), &request);
        let (call, completer) = Call::new(id, Arc::clone(method), request);

        let body = match encoded {
            Ok(body) => body,
            Err(e) => {
                debug!(call_id = %id, method = method.name(), "request rejected before send: {}", e);
                let _ = completer.fail(CallError::request(format!("failed to encode request: {}", e)));
                return call;
            }
        };

        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                let _ = completer.fail(CallError::request("no tokio runtime to drive the call"));
                return call;
            }
        };

        debug!(call_id = %id, method = method.name(), bytes = body.len(), "sending rpc");
        let exchange = Exchange {
            method: method.name().to_string(),
            content_type: self.codec.content_type(),
            body,
        };
        runtime.spawn(drive(
            Arc::clone(&self.channel),
            Arc::clone(&self.codec),
            completer,
            exchange,
        ));

        call
    }
}

impl<C> fmt::Debug for RpcTransport<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcTransport")
            .field("codec", &self.codec)
            .field("next_call_id", &self.ids.peek_next())
            .finish()
    }
}

async fn drive<C: Channel>(
    channel: Arc<C>,
    codec: Arc<dyn MessageCodec>,
    completer: CallCompleter,
    exchange: Exchange,
) {
    let token = completer.cancellation_token();
    let reply = tokio::select! {
        _ = token.cancelled() => {
            debug!(call_id = %completer.id(), "exchange aborted by cancel");
            return;
        }
        reply = channel.exchange(exchange) => reply,
    };

    let result = match reply {
        Ok(reply) => {
            trace!(call_id = %completer.id(), status = reply.status, bytes = reply.body.len(), "reply received");
            classify_reply(codec.as_ref(), completer.method().response_schema(), &reply)
        }
        Err(e) => Err(CallError::network(e.to_string())),
    };

    let id = completer.id();
    if let Err(e) = completer.complete(result) {
        debug!(call_id = %id, "late reply discarded: {}", e);
    }
}

/// Map a raw reply onto a terminal call result.
pub fn classify_reply(codec: &dyn MessageCodec, schema: &MessageSchema, reply: &Reply) -> CallResult {
    match codec.decode_outcome(schema, &reply.body) {
        Ok(Outcome::Error(error)) => Err(CallError::application(error)),
        Ok(Outcome::Value(value)) if reply.is_success() => Ok(value),
        Ok(Outcome::Value(_)) => Err(CallError::server(format!(
            "unexpected HTTP status {} with a success payload",
            reply.status
        ))),
        Err(e) if reply.is_success() => Err(CallError::server(format!("malformed response: {}", e))),
        Err(e) => Err(CallError::server(format!("HTTP status {}: {}", reply.status, e))),
    }
}
