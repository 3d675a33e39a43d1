// Per-connection state machine: handshake progression, chunk reassembly
// and message dispatch.

use byteorder::{BigEndian, ByteOrder};

use crate::amf::AmfCursor;
use crate::error::{DecodeOutcome, RtmpResult};
use crate::log::Logger;
use crate::rtmp::{
    self, decode_next, verify_c0, ChunkContextMap, HandshakeTimestampEndianness, Message,
    RTMP_HANDSHAKE_SIZE, RTMP_TYPE_ABORT, RTMP_TYPE_ACKNOWLEDGEMENT,
    RTMP_TYPE_AUDIO, RTMP_TYPE_DATA, RTMP_TYPE_EVENT, RTMP_TYPE_INVOKE, RTMP_TYPE_SET_CHUNK_SIZE,
    RTMP_TYPE_SET_PEER_BANDWIDTH, RTMP_TYPE_VIDEO, RTMP_TYPE_WINDOW_ACKNOWLEDGEMENT_SIZE,
    USER_CONTROL_PING_REQUEST,
};

use super::handle::{ConnectionHandle, InvokeHandler};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    AwaitC0C1,
    AwaitC2,
    Established,
}

/// Owns everything needed to turn inbound bytes into dispatched messages
/// and produce the bytes that should be written back to the peer.
///
/// This type has no direct dependency on sockets or async I/O: it is
/// driven by repeatedly appending bytes and draining the returned output,
/// which makes it directly testable without a live TCP connection.
pub struct ConnectionState {
    phase: ConnectionPhase,
    inbound: Vec<u8>,
    chunk_size_in: u32,
    chunk_size_out: u32,
    contexts: ChunkContextMap,
    handshake_endianness: HandshakeTimestampEndianness,
    logger: Logger,
}

impl ConnectionState {
    pub fn new(chunk_size_out: u32, handshake_endianness: HandshakeTimestampEndianness, logger: Logger) -> ConnectionState {
        ConnectionState {
            phase: ConnectionPhase::AwaitC0C1,
            inbound: Vec::new(),
            chunk_size_in: rtmp::RTMP_CHUNK_SIZE_DEFAULT,
            chunk_size_out,
            contexts: ChunkContextMap::new(),
            handshake_endianness,
            logger,
        }
    }

    pub fn phase(&self) -> ConnectionPhase {
        self.phase
    }

    /// Feeds newly-read bytes into the connection and returns the bytes
    /// that should be written back to the peer (possibly several
    /// messages concatenated, possibly empty).
    pub fn handle_input(
        &mut self,
        data: &[u8],
        handler: &dyn InvokeHandler,
        handle: &ConnectionHandle,
    ) -> RtmpResult<Vec<u8>> {
        self.inbound.extend_from_slice(data);
        let mut out = Vec::new();

        loop {
            match self.phase {
                ConnectionPhase::AwaitC0C1 => {
                    if self.inbound.len() < 1 + RTMP_HANDSHAKE_SIZE {
                        break;
                    }
                    verify_c0(self.inbound[0])?;
                    let c1 = self.inbound[1..1 + RTMP_HANDSHAKE_SIZE].to_vec();
                    let epoch = 0u32; // this process does not track its own RTMP-era uptime clock
                    let s0s1s2 = rtmp::generate_s0_s1_s2(&c1, epoch, self.handshake_endianness, &c1)?;
                    out.extend(s0s1s2);
                    self.inbound.drain(0..1 + RTMP_HANDSHAKE_SIZE);
                    self.phase = ConnectionPhase::AwaitC2;
                }
                ConnectionPhase::AwaitC2 => {
                    if self.inbound.len() < RTMP_HANDSHAKE_SIZE {
                        break;
                    }
                    self.inbound.drain(0..RTMP_HANDSHAKE_SIZE);
                    self.phase = ConnectionPhase::Established;
                    log_debug(&self.logger, "handshake complete");
                }
                ConnectionPhase::Established => {
                    match decode_next(&self.inbound, &mut self.contexts, self.chunk_size_in)? {
                        DecodeOutcome::NeedMore => break,
                        DecodeOutcome::Ready { value, consumed } => {
                            self.inbound.drain(0..consumed);
                            self.dispatch(value, handler, handle, &mut out)?;
                        }
                    }
                }
            }
        }

        Ok(out)
    }

    fn dispatch(&mut self, msg: Message, handler: &dyn InvokeHandler, handle: &ConnectionHandle, out: &mut Vec<u8>) -> RtmpResult<()> {
        match msg.type_id {
            RTMP_TYPE_SET_CHUNK_SIZE => {
                if msg.payload.len() >= 4 {
                    let value = BigEndian::read_u32(&msg.payload[0..4]) & 0x7FFF_FFFF;
                    self.chunk_size_in = value.max(1);
                    log_debug(&self.logger, &format!("set chunk size (in) to {}", self.chunk_size_in));
                }
            }
            RTMP_TYPE_ABORT => {
                log_debug(&self.logger, "received Abort message");
            }
            RTMP_TYPE_ACKNOWLEDGEMENT => {
                log_debug(&self.logger, "received Acknowledgement message");
            }
            RTMP_TYPE_WINDOW_ACKNOWLEDGEMENT_SIZE | RTMP_TYPE_SET_PEER_BANDWIDTH => {
                log_debug(&self.logger, "received bandwidth negotiation message");
            }
            RTMP_TYPE_EVENT => {
                self.handle_user_control(&msg, out);
            }
            RTMP_TYPE_AUDIO | RTMP_TYPE_VIDEO | RTMP_TYPE_DATA => {
                handler.on_media(msg.type_id, msg.timestamp, &msg.payload, handle);
            }
            RTMP_TYPE_INVOKE => {
                self.handle_invoke(&msg, handler, handle, out)?;
            }
            other => {
                log_debug(&self.logger, &format!("ignoring unsupported message type {}", other));
            }
        }
        Ok(())
    }

    fn handle_user_control(&self, msg: &Message, out: &mut Vec<u8>) {
        if msg.payload.len() < 2 {
            return;
        }
        let event_type = BigEndian::read_u16(&msg.payload[0..2]);
        if event_type == USER_CONTROL_PING_REQUEST && msg.payload.len() >= 6 {
            let timestamp = BigEndian::read_u32(&msg.payload[2..6]);
            out.extend(rtmp::make_ping_response(timestamp));
        }
    }

    fn handle_invoke(&mut self, msg: &Message, handler: &dyn InvokeHandler, handle: &ConnectionHandle, out: &mut Vec<u8>) -> RtmpResult<()> {
        let command_name = match crate::amf::extract_command(&msg.payload) {
            Ok(name) => name,
            Err(e) => {
                log_debug(&self.logger, &format!("dropping malformed invoke: {}", e));
                return Ok(());
            }
        };

        let mut cursor = AmfCursor::new(&msg.payload);
        let sequence = match cursor.read_sequence() {
            Ok(crate::amf::AmfValue::Array(values)) => values,
            Ok(_) => unreachable!("read_sequence always returns Array"),
            Err(e) => {
                if command_name == "connect" {
                    // No subsequent command on this session is meaningful
                    // without a valid `connect`, so close the connection
                    // rather than just dropping the message.
                    return Err(e);
                }
                log_debug(&self.logger, &format!("dropping malformed invoke payload: {}", e));
                return Ok(());
            }
        };

        if command_name == "connect" {
            let transaction_id = sequence.get(1).and_then(|v| v.as_f64()).unwrap_or(1.0);
            out.extend(rtmp::make_connect_response_sequence(
                transaction_id,
                msg.chunk_stream_id,
                self.chunk_size_out as usize,
            ));
            return Ok(());
        }

        handler.on_invoke(&command_name, &sequence, handle);
        Ok(())
    }
}

fn log_debug(logger: &Logger, msg: &str) {
    crate::log_debug!(logger, msg);
}
