use protorpc_core::{
    Call, CallError, CallResult, Message, RegistryError, ServiceDescriptor, ServiceError,
};
use protorpc_transport::Transport;
use serde::{de::DeserializeOwned, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Client-side handle to one remote service.
///
/// Pairs a [`ServiceDescriptor`] with a [`Transport`]. Method names are
/// resolved against the descriptor before anything touches the transport, so
/// an unknown name never produces a [`Call`] or any I/O.
#[derive(Clone)]
pub struct Service {
    descriptor: Arc<ServiceDescriptor>,
    transport: Arc<dyn Transport>,
}

impl Service {
    pub fn new(descriptor: Arc<ServiceDescriptor>, transport: Arc<dyn Transport>) -> Self {
        Service {
            descriptor,
            transport,
        }
    }

    pub fn descriptor(&self) -> &Arc<ServiceDescriptor> {
        &self.descriptor
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Start `method` and deliver its terminal outcome to `on_complete`.
    ///
    /// `on_complete` runs exactly once with either the response or the typed
    /// error. It may run before `invoke` returns if the request could not be
    /// encoded.
    pub fn invoke<F>(
        &self,
        method: &str,
        request: Message,
        on_complete: F,
    ) -> Result<Call, RegistryError>
    where
        F: FnOnce(CallResult) + Send + 'static,
    {
        let method = self.descriptor.method_by_name(method)?;
        let call = self.transport.send_rpc(method, request);
        debug!("{}.{} started as call {}", self.descriptor.name(), method.name(), call.id());
        call.subscribe(move |result| on_complete(result.clone()));
        Ok(call)
    }

    /// Start `method` and wait for its response.
    pub async fn call(&self, method: &str, request: Message) -> Result<Message, ServiceError> {
        let method = self.descriptor.method_by_name(method)?;
        Ok(self.transport.send_rpc(method, request).await?)
    }

    /// Like [`Service::call`], with serde conversion on both ends.
    ///
    /// A request that does not serialize fails as a request error. A response
    /// that does not deserialize into `Resp` fails as a server error.
    pub async fn call_typed<Req, Resp>(
        &self,
        method: &str,
        request: &Req,
    ) -> Result<Resp, ServiceError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let method = self.descriptor.method_by_name(method)?;
        let request = serde_json::to_value(request)
            .map_err(|e| CallError::request(format!("cannot serialize request: {}", e)))?;
        let response = self.transport.send_rpc(method, request).await?;
        serde_json::from_value(response)
            .map_err(|e| CallError::server(format!("cannot deserialize response: {}", e)).into())
    }
}

impl fmt::Debug for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Service")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}
