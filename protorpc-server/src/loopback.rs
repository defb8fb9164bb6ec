use async_trait::async_trait;
use protorpc_transport::{Channel, ChannelError, Exchange, Reply, RpcTransport};
use std::sync::Arc;

use crate::Dispatcher;

/// A [`Channel`] that hands encoded requests straight to a [`Dispatcher`].
///
/// Bytes still go through the codec on both sides, so calls behave exactly
/// as they would over HTTP, minus the sockets.
#[derive(Debug, Clone)]
pub struct LoopbackChannel {
    dispatcher: Arc<Dispatcher>,
    service: String,
}

impl LoopbackChannel {
    pub fn new(dispatcher: Arc<Dispatcher>, service: impl Into<String>) -> Self {
        LoopbackChannel {
            dispatcher,
            service: service.into(),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }
}

#[async_trait]
impl Channel for LoopbackChannel {
    async fn exchange(&self, exchange: Exchange) -> Result<Reply, ChannelError> {
        Ok(self
            .dispatcher
            .dispatch(&self.service, &exchange.method, &exchange.body)
            .await)
    }
}

pub type LoopbackTransport = RpcTransport<LoopbackChannel>;

/// In-process transport for `service`, sharing the dispatcher's codec.
pub fn loopback(dispatcher: Arc<Dispatcher>, service: impl Into<String>) -> LoopbackTransport {
    let codec = Arc::clone(dispatcher.codec());
    RpcTransport::with_codec(LoopbackChannel::new(dispatcher, service), codec)
}
