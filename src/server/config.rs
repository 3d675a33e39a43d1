// Server configuration, loaded from environment variables in the style
// of the rest of this codebase's lineage (see `utils::env`).

use crate::log::Logger;
use crate::rtmp::{HandshakeTimestampEndianness, RTMP_CHUNK_SIZE_DEFAULT, RTMP_MAX_CHUNK_SIZE, RTMP_MIN_CHUNK_SIZE};
use crate::utils::{get_env_string, get_env_u32};
use crate::{log_error, log_info};

const RTMP_PORT_DEFAULT: u32 = 1935;
const MAX_PORT: u32 = 65535;

#[derive(Clone)]
pub struct ServerConfig {
    pub port: u32,
    pub bind_address: String,
    pub default_chunk_size_out: u32,
    pub handshake_timestamp_endianness: HandshakeTimestampEndianness,
    pub log_requests: bool,
}

impl ServerConfig {
    pub fn load_from_env(logger: &Logger) -> Result<ServerConfig, ()> {
        let port = get_env_u32("RTMP_PORT", RTMP_PORT_DEFAULT);
        if port == 0 || port > MAX_PORT {
            log_error!(logger, format!("RTMP_PORT has an invalid value: {}", port));
            return Err(());
        }

        let bind_address = get_env_string("BIND_ADDRESS", "0.0.0.0");

        let default_chunk_size_out = get_env_u32("RTMP_CHUNK_SIZE", RTMP_CHUNK_SIZE_DEFAULT);
        if !(RTMP_MIN_CHUNK_SIZE..=RTMP_MAX_CHUNK_SIZE).contains(&default_chunk_size_out) {
            log_error!(
                logger,
                format!(
                    "RTMP_CHUNK_SIZE has an invalid value: {}. Min: {}. Max: {}",
                    default_chunk_size_out, RTMP_MIN_CHUNK_SIZE, RTMP_MAX_CHUNK_SIZE
                )
            );
            return Err(());
        }

        let handshake_timestamp_endianness = match get_env_string("RTMP_HANDSHAKE_TIMESTAMP_ENDIANNESS", "big")
            .to_lowercase()
            .as_str()
        {
            "little" => HandshakeTimestampEndianness::Little,
            "big" => HandshakeTimestampEndianness::Big,
            other => {
                log_info!(
                    logger,
                    format!("unrecognized RTMP_HANDSHAKE_TIMESTAMP_ENDIANNESS value '{}', defaulting to big", other)
                );
                HandshakeTimestampEndianness::Big
            }
        };

        let log_requests = crate::utils::get_env_bool("LOG_REQUESTS", true);

        Ok(ServerConfig {
            port,
            bind_address,
            default_chunk_size_out,
            handshake_timestamp_endianness,
            log_requests,
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}
