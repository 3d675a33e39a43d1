// RTMP server entry point: configuration and the TCP accept loop

mod config;
mod session_id;
mod tcp;

use std::sync::Arc;

pub use config::*;
pub use session_id::*;
pub use tcp::*;

use crate::connection::InvokeHandler;
use crate::log::Logger;

/// Runs the RTMP server until the listener fails.
pub async fn run_server(logger: Logger, config: Arc<ServerConfig>, handler: Arc<dyn InvokeHandler>) {
    run_tcp_server(Arc::new(logger.make_child_logger("[SERVER:TCP] ")), config, handler).await;
}
