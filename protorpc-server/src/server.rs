use crate::{Dispatcher, ServiceHandler};
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use protorpc_core::{ApplicationError, ServiceDescriptor, DEFAULT_MAX_MESSAGE_SIZE};
use protorpc_transport::Reply;
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Path prefix for method routes, e.g. `/rpc` serves `/rpc/Echo.say`.
    pub base_path: String,
    pub max_message_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            base_path: "/rpc".to_string(),
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }
}

impl ServerConfig {
    /// Read `PROTORPC_HOST`, `PROTORPC_PORT` and `PROTORPC_BASE_PATH`,
    /// keeping defaults for anything unset.
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = ServerConfig::default();
        if let Ok(host) = std::env::var("PROTORPC_HOST") {
            config.host = host;
        }
        if let Ok(port) = std::env::var("PROTORPC_PORT") {
            config.port = port
                .parse()
                .map_err(|e| anyhow::anyhow!("invalid PROTORPC_PORT '{}': {}", port, e))?;
        }
        if let Ok(base_path) = std::env::var("PROTORPC_BASE_PATH") {
            config.base_path = base_path;
        }
        Ok(config)
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn normalized_base_path(&self) -> String {
        let trimmed = self.base_path.trim_matches('/');
        if trimmed.is_empty() {
            String::new()
        } else {
            format!("/{}", trimmed)
        }
    }
}

/// Serves a [`Dispatcher`] over HTTP.
#[derive(Debug, Clone)]
pub struct RpcServer {
    config: ServerConfig,
    dispatcher: Arc<Dispatcher>,
}

impl RpcServer {
    pub fn new(config: ServerConfig) -> Self {
        Self::with_dispatcher(config, Arc::new(Dispatcher::new()))
    }

    pub fn with_dispatcher(config: ServerConfig, dispatcher: Arc<Dispatcher>) -> Self {
        RpcServer { config, dispatcher }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub fn register(&self, descriptor: Arc<ServiceDescriptor>, handler: Arc<dyn ServiceHandler>) {
        self.dispatcher.register(descriptor, handler);
    }

    pub fn router(&self) -> Router {
        let route = format!("{}/{{target}}", self.config.normalized_base_path());
        Router::new()
            .route(&route, post(handle_call))
            .route("/health", get(handle_health))
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(CorsLayer::permissive())
                    .layer(DefaultBodyLimit::max(self.config.max_message_size)),
            )
            .with_state(Arc::clone(&self.dispatcher))
    }

    /// Serve on an already-bound listener until the process stops.
    pub async fn serve(self, listener: TcpListener) -> std::io::Result<()> {
        let addr = listener.local_addr()?;
        info!(
            "serving {} services on http://{}{}",
            self.dispatcher.len(),
            addr,
            self.config.normalized_base_path()
        );
        axum::serve(listener, self.router()).await
    }

    pub async fn run(self) -> std::io::Result<()> {
        let listener = TcpListener::bind(self.config.addr()).await?;
        self.serve(listener).await
    }
}

async fn handle_call(
    State(dispatcher): State<Arc<Dispatcher>>,
    Path(target): Path<String>,
    body: Bytes,
) -> Response {
    let reply = match target.rsplit_once('.') {
        Some((service, method)) if !service.is_empty() && !method.is_empty() => {
            debug!("{}.{} ({} bytes)", service, method, body.len());
            dispatcher.dispatch(service, method, &body).await
        }
        _ => dispatcher.error_reply(
            404,
            ApplicationError::not_found(format!("expected <Service>.<method>, got '{}'", target)),
        ),
    };
    into_response(dispatcher.codec().content_type(), reply)
}

fn into_response(content_type: &'static str, reply: Reply) -> Response {
    let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        [(header::CONTENT_TYPE, HeaderValue::from_static(content_type))],
        reply.body,
    )
        .into_response()
}

async fn handle_health(State(dispatcher): State<Arc<Dispatcher>>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "server": "protorpc",
        "services": dispatcher.service_names(),
    }))
}
