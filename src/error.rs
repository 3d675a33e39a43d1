// Error types shared across the chunk codec, AMF0 codec and connection state machine

use thiserror::Error;

/// Failures that abort the connection or a single message
#[derive(Debug, Error)]
pub enum RtmpError {
    #[error("bad handshake: {0}")]
    BadHandshake(String),

    #[error("malformed chunk: {0}")]
    MalformedChunk(String),

    #[error("malformed amf0 payload: {0}")]
    MalformedAmf(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type RtmpResult<T> = Result<T, RtmpError>;

/// Outcome of trying to decode one unit (a chunk, a handshake step) from a
/// buffer that may not yet hold every byte it needs. `NeedMore` is not an
/// error: the caller is expected to read more bytes and retry without
/// having mutated any state.
#[derive(Debug)]
pub enum DecodeOutcome<T> {
    NeedMore,
    Ready { value: T, consumed: usize },
}
