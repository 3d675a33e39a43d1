// TCP accept loop: the thin shell that exercises the connection state
// machine against a real socket. Not load-bearing design; callers
// embedding this crate as a library can drive `ConnectionState` directly.

use std::sync::Arc;

use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;
use tokio::sync::Mutex;

use crate::connection::{ConnectionHandle, ConnectionState, InvokeHandler};
use crate::log::Logger;
use crate::log_error;
use crate::log_info;

use super::session_id::SessionIdGenerator;
use super::ServerConfig;

const READ_BUFFER_SIZE: usize = 4096;

/// Runs the TCP accept loop until the listener itself fails.
pub async fn run_tcp_server(logger: Arc<Logger>, config: Arc<ServerConfig>, handler: Arc<dyn InvokeHandler>) {
    let listen_addr = config.listen_addr();

    let listener = match TcpListener::bind(&listen_addr).await {
        Ok(l) => l,
        Err(e) => {
            log_error!(logger, format!("could not bind TCP listener on {}: {}", listen_addr, e));
            return;
        }
    };

    log_info!(logger, format!("listening on {}", listen_addr));

    let session_ids = Arc::new(SessionIdGenerator::new());

    loop {
        let (stream, peer_addr) = match listener.accept().await {
            Ok(v) => v,
            Err(e) => {
                log_error!(logger, format!("could not accept connection: {}", e));
                continue;
            }
        };

        let session_id = session_ids.generate_id();
        let session_logger = Arc::new(logger.make_child_logger(&format!("[#{}] ", session_id)));
        let config = config.clone();
        let handler = handler.clone();

        if config.log_requests {
            log_info!(session_logger, format!("connection accepted from {}", peer_addr));
        }

        tokio::spawn(async move {
            let (mut read_half, write_half) = stream.into_split();
            let writer = Arc::new(Mutex::new(write_half));
            let handle = ConnectionHandle::new(peer_addr, writer, config.default_chunk_size_out as usize);

            let mut state = ConnectionState::new(
                config.default_chunk_size_out,
                config.handshake_timestamp_endianness,
                session_logger.make_child_logger(""),
            );

            let mut buf = vec![0u8; READ_BUFFER_SIZE];

            loop {
                let n = match read_half.read(&mut buf).await {
                    Ok(0) => break,
                    Ok(n) => n,
                    Err(e) => {
                        log_error!(session_logger, format!("read error: {}", e));
                        break;
                    }
                };

                let out = match state.handle_input(&buf[..n], handler.as_ref(), &handle) {
                    Ok(out) => out,
                    Err(e) => {
                        log_error!(session_logger, format!("closing connection: {}", e));
                        break;
                    }
                };

                if !out.is_empty() {
                    if let Err(e) = handle.send_raw(&out).await {
                        log_error!(session_logger, format!("write error: {}", e));
                        break;
                    }
                }
            }

            if config.log_requests {
                log_info!(session_logger, format!("connection from {} closed", peer_addr));
            }
        });
    }
}
