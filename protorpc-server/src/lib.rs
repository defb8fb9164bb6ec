//! Hosting side of protorpc: handlers, the dispatcher that routes encoded
//! requests to them, and an axum server exposing a dispatcher over HTTP.

pub mod dispatcher;
pub mod echo;
pub mod handler;
pub mod logging;
pub mod loopback;
pub mod server;

pub use dispatcher::Dispatcher;
pub use handler::{handler_fn, FnHandler, ServiceHandler};
pub use logging::{init_console_logging, init_logging, init_test_logging};
pub use loopback::{loopback, LoopbackChannel, LoopbackTransport};
pub use server::{RpcServer, ServerConfig};
