// RTMP protocol wire format: chunk stream codec, handshake and message builders

mod chunk_decode;
mod constants;
mod handshake;
mod messages;
mod packet;

pub use chunk_decode::*;
pub use constants::*;
pub use handshake::*;
pub use messages::*;
pub use packet::*;
