// Builders for outbound RTMP protocol control messages and AMF0 commands

use byteorder::{BigEndian, ByteOrder};

use crate::amf::AmfValue;

use super::{
    RtmpPacket, RTMP_CHANNEL_DATA, RTMP_CHANNEL_PROTOCOL, RTMP_TYPE_ABORT,
    RTMP_TYPE_ACKNOWLEDGEMENT, RTMP_TYPE_DATA, RTMP_TYPE_EVENT, RTMP_TYPE_INVOKE,
    RTMP_TYPE_SET_CHUNK_SIZE, RTMP_TYPE_SET_PEER_BANDWIDTH, RTMP_TYPE_WINDOW_ACKNOWLEDGEMENT_SIZE,
    USER_CONTROL_PING_RESPONSE, USER_CONTROL_STREAM_BEGIN,
};

fn u32_payload(value: u32) -> Vec<u8> {
    let mut buf = vec![0u8; 4];
    BigEndian::write_u32(&mut buf, value);
    buf
}

pub fn make_set_chunk_size(size: u32) -> Vec<u8> {
    RtmpPacket::new(RTMP_CHANNEL_PROTOCOL, RTMP_TYPE_SET_CHUNK_SIZE, 0, 0, u32_payload(size)).create_chunks(128)
}

pub fn make_window_ack_size(size: u32) -> Vec<u8> {
    RtmpPacket::new(RTMP_CHANNEL_PROTOCOL, RTMP_TYPE_WINDOW_ACKNOWLEDGEMENT_SIZE, 0, 0, u32_payload(size))
        .create_chunks(128)
}

pub fn make_set_peer_bandwidth(size: u32, limit_type: u8) -> Vec<u8> {
    let mut payload = u32_payload(size);
    payload.push(limit_type);
    RtmpPacket::new(RTMP_CHANNEL_PROTOCOL, RTMP_TYPE_SET_PEER_BANDWIDTH, 0, 0, payload).create_chunks(128)
}

pub fn make_acknowledgement(sequence_number: u32) -> Vec<u8> {
    RtmpPacket::new(RTMP_CHANNEL_PROTOCOL, RTMP_TYPE_ACKNOWLEDGEMENT, 0, 0, u32_payload(sequence_number))
        .create_chunks(128)
}

pub fn make_abort(chunk_stream_id: u32) -> Vec<u8> {
    RtmpPacket::new(RTMP_CHANNEL_PROTOCOL, RTMP_TYPE_ABORT, 0, 0, u32_payload(chunk_stream_id)).create_chunks(128)
}

pub fn make_user_control(event_type: u16, event_payload: &[u8]) -> Vec<u8> {
    let mut payload = Vec::with_capacity(2 + event_payload.len());
    let mut et = [0u8; 2];
    BigEndian::write_u16(&mut et, event_type);
    payload.extend(et);
    payload.extend(event_payload);

    RtmpPacket::new(RTMP_CHANNEL_PROTOCOL, RTMP_TYPE_EVENT, 0, 0, payload).create_chunks(128)
}

pub fn make_stream_begin(stream_id: u32) -> Vec<u8> {
    make_user_control(USER_CONTROL_STREAM_BEGIN, &u32_payload(stream_id))
}

pub fn make_ping_response(echoed_timestamp: u32) -> Vec<u8> {
    make_user_control(USER_CONTROL_PING_RESPONSE, &u32_payload(echoed_timestamp))
}

/// Encodes and chunks an AMF0 command/data sequence (a flat list of
/// values, no wrapping object) as an Invoke message.
pub fn make_invoke(values: &[AmfValue], stream_id: u32, chunk_stream_id: u32, out_chunk_size: usize) -> Vec<u8> {
    let mut payload = Vec::new();
    for v in values {
        payload.extend(v.encode());
    }

    RtmpPacket::new(chunk_stream_id, RTMP_TYPE_INVOKE, stream_id, 0, payload).create_chunks(out_chunk_size)
}

pub fn make_data(values: &[AmfValue], stream_id: u32, out_chunk_size: usize) -> Vec<u8> {
    let mut payload = Vec::new();
    for v in values {
        payload.extend(v.encode());
    }

    RtmpPacket::new(RTMP_CHANNEL_DATA, RTMP_TYPE_DATA, stream_id, 0, payload).create_chunks(out_chunk_size)
}

/// Builds the full response sequence to a `connect` command (see the
/// dispatcher's connect handling), in the exact order peers expect it.
///
/// The two AMF invokes (`_result` and `onBWDone`) go out on the same chunk
/// stream ID the `connect` request arrived on; the bandwidth/control
/// messages ahead of them stay on the fixed protocol-control channel.
pub fn make_connect_response_sequence(transaction_id: f64, request_chunk_stream_id: u32, out_chunk_size: usize) -> Vec<u8> {
    let mut out = Vec::new();

    out.extend(make_window_ack_size(super::WINDOW_ACK_SIZE_DEFAULT));
    out.extend(make_set_peer_bandwidth(super::WINDOW_ACK_SIZE_DEFAULT, 2));
    out.extend(make_stream_begin(0));

    let result = vec![
        AmfValue::string("_result"),
        AmfValue::Number(transaction_id),
        AmfValue::object(vec![
            ("fmsVer", AmfValue::string("FMS/3,0,1,123")),
            ("capabilities", AmfValue::Number(31.0)),
        ]),
        AmfValue::object(vec![
            ("level", AmfValue::string("status")),
            ("code", AmfValue::string("NetConnection.Connect.Success")),
            ("description", AmfValue::string("Connection succeeded")),
            ("objectEncoding", AmfValue::Number(0.0)),
        ]),
    ];
    out.extend(make_invoke(&result, 0, request_chunk_stream_id, out_chunk_size));

    let on_bw_done = vec![
        AmfValue::string("onBWDone"),
        AmfValue::Number(0.0),
        AmfValue::Null,
        AmfValue::Number(8192.0),
    ];
    out.extend(make_invoke(&on_bw_done, 0, request_chunk_stream_id, out_chunk_size));

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rtmp::RTMP_CHANNEL_INVOKE;

    #[test]
    fn set_chunk_size_encodes_value_big_endian() {
        let bytes = make_set_chunk_size(4096);
        // basic header (1) + fmt0 header (11) + 4-byte payload
        assert_eq!(bytes.len(), 1 + 11 + 4);
        assert_eq!(&bytes[bytes.len() - 4..], &[0, 0, 0x10, 0x00]);
    }

    #[test]
    fn connect_response_sequence_has_expected_message_count() {
        let bytes = make_connect_response_sequence(1.0, RTMP_CHANNEL_INVOKE, 128);
        assert!(!bytes.is_empty());
    }

    #[test]
    fn connect_response_invokes_use_the_request_chunk_stream_id() {
        let on_csid_five = make_connect_response_sequence(1.0, 5, 128);
        let on_invoke_channel = make_connect_response_sequence(1.0, RTMP_CHANNEL_INVOKE, 128);
        assert_ne!(on_csid_five, on_invoke_channel);
    }
}
