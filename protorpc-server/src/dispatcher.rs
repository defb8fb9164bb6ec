use bytes::Bytes;
use dashmap::DashMap;
use protorpc_core::{
    ApplicationError, JsonCodec, MessageCodec, MessageSchema, Outcome, ServiceDescriptor,
};
use protorpc_transport::Reply;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::ServiceHandler;

struct HostedService {
    descriptor: Arc<ServiceDescriptor>,
    handler: Arc<dyn ServiceHandler>,
}

/// Table of hosted services, keyed by service name.
///
/// Turns an encoded request for `service.method` into an encoded reply
/// envelope. Every failure becomes an error envelope with a matching HTTP
/// status, so callers always receive something the client codec can read.
pub struct Dispatcher {
    services: DashMap<String, HostedService>,
    codec: Arc<dyn MessageCodec>,
    error_schema: MessageSchema,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::with_codec(Arc::new(JsonCodec::new()))
    }

    pub fn with_codec(codec: Arc<dyn MessageCodec>) -> Self {
        Dispatcher {
            services: DashMap::new(),
            codec,
            error_schema: MessageSchema::any("Error"),
        }
    }

    /// Host `handler` under the descriptor's name, replacing any previous
    /// registration. Returns `true` if a service was replaced.
    pub fn register(
        &self,
        descriptor: Arc<ServiceDescriptor>,
        handler: Arc<dyn ServiceHandler>,
    ) -> bool {
        let name = descriptor.name().to_string();
        debug!("hosting service {} with {} methods", name, descriptor.len());
        self.services
            .insert(name, HostedService { descriptor, handler })
            .is_some()
    }

    pub fn remove(&self, service: &str) -> bool {
        self.services.remove(service).is_some()
    }

    pub fn descriptor(&self, service: &str) -> Option<Arc<ServiceDescriptor>> {
        self.services
            .get(service)
            .map(|entry| Arc::clone(&entry.descriptor))
    }

    pub fn service_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.services.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn codec(&self) -> &Arc<dyn MessageCodec> {
        &self.codec
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    pub async fn dispatch(&self, service: &str, method: &str, body: &[u8]) -> Reply {
        let hosted = self
            .services
            .get(service)
            .map(|entry| (Arc::clone(&entry.descriptor), Arc::clone(&entry.handler)));
        let Some((descriptor, handler)) = hosted else {
            let error = ApplicationError::not_found(format!("unknown service '{}'", service));
            return self.error_reply(404, error);
        };

        let method = match descriptor.method_by_name(method) {
            Ok(method) => Arc::clone(method),
            Err(e) => return self.error_reply(404, ApplicationError::not_found(e.to_string())),
        };

        let request = match self.codec.decode(method.request_schema(), body) {
            Ok(request) => request,
            Err(e) => {
                debug!("rejecting {}.{}: {}", service, method.name(), e);
                let error = ApplicationError::bad_request(format!("invalid request: {}", e));
                return self.error_reply(400, error);
            }
        };

        let outcome: Outcome = handler.handle(method.name(), request).await.into();
        if let Outcome::Error(error) = &outcome {
            debug!("{}.{} failed: {}", service, method.name(), error);
        }

        match self.codec.encode_outcome(method.response_schema(), &outcome) {
            Ok(body) => Reply { status: 200, body },
            Err(e) => {
                warn!("{}.{} produced an invalid response: {}", service, method.name(), e);
                let error = ApplicationError::internal(format!("invalid response: {}", e));
                self.error_reply(500, error)
            }
        }
    }

    /// Encode an error envelope with the given HTTP status.
    pub fn error_reply(&self, status: u16, error: ApplicationError) -> Reply {
        let body = self
            .codec
            .encode_outcome(&self.error_schema, &Outcome::Error(error))
            .unwrap_or_else(|e| Bytes::from(e.to_string()));
        Reply { status, body }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("services", &self.service_names())
            .field("codec", &self.codec)
            .finish()
    }
}
