// Entry point: wires a no-op command handler to the TCP server.
//
// Embedders that need to react to `play`/`publish`/custom commands should
// depend on this crate as a library and implement `InvokeHandler`
// themselves instead of running this binary.

use std::sync::Arc;

use rtmp_core::connection::{ConnectionHandle, InvokeHandler};
use rtmp_core::log::{LogConfig, Logger};
use rtmp_core::server::{run_server, ServerConfig};
use rtmp_core::utils::get_env_bool;
use rtmp_core::{amf::AmfValue, log_info};

struct LoggingInvokeHandler {
    logger: Logger,
}

impl InvokeHandler for LoggingInvokeHandler {
    fn on_invoke(&self, command_name: &str, command_args: &[AmfValue], connection: &ConnectionHandle) {
        let logger = &self.logger;
        log_info!(
            logger,
            format!(
                "received '{}' command from {} ({} argument(s))",
                command_name,
                connection.peer_addr(),
                command_args.len()
            )
        );
    }

    fn on_media(&self, type_id: u8, _timestamp: u32, payload: &[u8], connection: &ConnectionHandle) {
        let _ = (type_id, payload, connection);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Load .env
    let _ = dotenvy::dotenv();

    // Initialize logger

    let logger = Logger::new(LogConfig {
        prefix: "".to_string(),
        error_enabled: get_env_bool("LOG_ERROR", true),
        warning_enabled: get_env_bool("LOG_WARNING", true),
        info_enabled: get_env_bool("LOG_INFO", true),
        debug_enabled: get_env_bool("LOG_DEBUG", false),
        trace_enabled: get_env_bool("LOG_TRACE", get_env_bool("LOG_DEBUG", false)),
    });

    // Print version

    const VERSION: &str = env!("CARGO_PKG_VERSION");

    log_info!(logger, format!("RTMP server core ({VERSION})"));

    // Load configuration

    let server_config = match ServerConfig::load_from_env(&logger) {
        Ok(c) => Arc::new(c),
        Err(_) => {
            std::process::exit(1);
        }
    };

    // Run server

    let handler: Arc<dyn InvokeHandler> = Arc::new(LoggingInvokeHandler {
        logger: logger.make_child_logger(""),
    });

    run_server(logger, server_config, handler).await;

    // End of main

    Ok(())
}
