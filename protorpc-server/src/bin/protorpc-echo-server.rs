//! Demo server hosting the `Echo` service.
//!
//! Configured through `PROTORPC_HOST`, `PROTORPC_PORT` and
//! `PROTORPC_BASE_PATH`. Set `PROTORPC_LOG_DIR` to also log to a rolling
//! file, or `PROTORPC_LOG_JSON=1` for JSON console output.

use anyhow::Result;
use protorpc_server::{echo, init_console_logging, init_logging, RpcServer, ServerConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let _guard = match std::env::var("PROTORPC_LOG_DIR") {
        Ok(dir) => Some(init_logging(dir, "protorpc-echo-server")?),
        Err(_) => {
            let json = std::env::var("PROTORPC_LOG_JSON").is_ok_and(|v| v == "1");
            init_console_logging(json)?;
            None
        }
    };

    let config = ServerConfig::from_env()?;
    let server = RpcServer::new(config);
    let (descriptor, handler) = echo::service()?;
    server.register(descriptor, handler);

    info!(
        "Echo service at http://{}{}/Echo.<method>",
        server.config().addr(),
        server.config().base_path
    );

    if let Err(e) = server.run().await {
        error!("server error: {}", e);
        return Err(e.into());
    }
    Ok(())
}
