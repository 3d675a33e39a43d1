// End-to-end scenarios driven against `ConnectionState::handle_input`,
// the way the unit suites for the chunk decoder and AMF0 codec validate
// their own layer. A loopback TCP pair stands in for the socket a real
// server would hand the connection: nothing here exercises the accept
// loop itself.

use std::sync::{Arc, Mutex as StdMutex};

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;

use rtmp_core::amf::AmfValue;
use rtmp_core::connection::{ConnectionHandle, ConnectionPhase, ConnectionState, InvokeHandler};
use rtmp_core::log::Logger;
use rtmp_core::rtmp::{
    self, HandshakeTimestampEndianness, RtmpPacket, RTMP_CHANNEL_DATA, RTMP_CHANNEL_INVOKE,
    RTMP_HANDSHAKE_SIZE, RTMP_TYPE_DATA, RTMP_TYPE_INVOKE, RTMP_VERSION,
};

#[derive(Default)]
struct RecordedInvoke {
    command_name: String,
    command_args: Vec<AmfValue>,
}

#[derive(Default)]
struct MockHandler {
    invokes: StdMutex<Vec<RecordedInvoke>>,
    media: StdMutex<Vec<(u8, Vec<u8>)>>,
}

impl InvokeHandler for MockHandler {
    fn on_invoke(&self, command_name: &str, command_args: &[AmfValue], _connection: &ConnectionHandle) {
        self.invokes.lock().unwrap().push(RecordedInvoke {
            command_name: command_name.to_string(),
            command_args: command_args.to_vec(),
        });
    }

    fn on_media(&self, type_id: u8, _timestamp: u32, payload: &[u8], _connection: &ConnectionHandle) {
        self.media.lock().unwrap().push((type_id, payload.to_vec()));
    }
}

/// Builds a `ConnectionHandle` backed by a real (loopback) socket half, so
/// tests can drive the same API an embedder would use, without standing up
/// the accept loop in `server::tcp`.
async fn test_handle() -> (ConnectionHandle, TcpStream) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (server_res, client_res) = tokio::join!(listener.accept(), TcpStream::connect(addr));
    let (server_stream, peer_addr) = server_res.unwrap();
    let client_stream = client_res.unwrap();
    let (_read_half, write_half) = server_stream.into_split();
    let handle = ConnectionHandle::new(peer_addr, Arc::new(Mutex::new(write_half)), 128);
    (handle, client_stream)
}

fn new_state(chunk_size_out: u32) -> ConnectionState {
    ConnectionState::new(chunk_size_out, HandshakeTimestampEndianness::Big, Logger::new_disabled())
}

fn c0_c1(filler: u8) -> Vec<u8> {
    let mut buf = Vec::with_capacity(1 + RTMP_HANDSHAKE_SIZE);
    buf.push(RTMP_VERSION);
    buf.extend(std::iter::repeat(filler).take(RTMP_HANDSHAKE_SIZE));
    buf
}

fn connect_command_bytes(transaction_id: f64, out_chunk_size: usize) -> Vec<u8> {
    let values = vec![
        AmfValue::string("connect"),
        AmfValue::Number(transaction_id),
        AmfValue::object(vec![
            ("app", AmfValue::string("live")),
            ("tcUrl", AmfValue::string("rtmp://localhost/live")),
        ]),
    ];
    rtmp::make_invoke(&values, 0, RTMP_CHANNEL_INVOKE, out_chunk_size)
}

// Scenario 1: a handshake with no further traffic completes and produces
// exactly S0+S1+S2, nothing else.
#[tokio::test]
async fn handshake_only_completes_and_emits_s0_s1_s2() {
    let (handle, _client) = test_handle().await;
    let mock = MockHandler::default();
    let mut state = new_state(128);

    let out = state.handle_input(&c0_c1(0xAB), &mock, &handle).unwrap();

    assert_eq!(state.phase(), ConnectionPhase::AwaitC2);
    assert_eq!(out.len(), 1 + RTMP_HANDSHAKE_SIZE * 2);
    assert_eq!(out[0], RTMP_VERSION);
    assert!(mock.invokes.lock().unwrap().is_empty());
}

// Scenario 2: after a full handshake, a `connect` command produces the
// exact response sequence (window ack size, set peer bandwidth, stream
// begin, `_result`, `onBWDone`) and is handled without reaching the
// embedder's `on_invoke`.
#[tokio::test]
async fn connect_command_triggers_full_response_sequence() {
    let (handle, _client) = test_handle().await;
    let mock = MockHandler::default();
    let mut state = new_state(128);

    let _ = state.handle_input(&c0_c1(0x01), &mock, &handle).unwrap();
    let _ = state
        .handle_input(&vec![0u8; RTMP_HANDSHAKE_SIZE], &mock, &handle)
        .unwrap();
    assert_eq!(state.phase(), ConnectionPhase::Established);

    let connect_bytes = connect_command_bytes(1.0, 128);
    let out = state.handle_input(&connect_bytes, &mock, &handle).unwrap();

    let expected = rtmp::make_connect_response_sequence(1.0, RTMP_CHANNEL_INVOKE, 128);
    assert_eq!(out, expected);
    assert!(mock.invokes.lock().unwrap().is_empty(), "connect is handled internally, not forwarded");
}

// Scenario 3: a 300-byte Data (Notify) message fragmented across 128-byte
// chunks reassembles into a single `on_media` callback with the full body.
#[tokio::test]
async fn chunked_data_message_reassembles_across_chunk_boundaries() {
    let (handle, _client) = test_handle().await;
    let mock = MockHandler::default();
    let mut state = new_state(128);

    let _ = state.handle_input(&c0_c1(0x02), &mock, &handle).unwrap();
    let _ = state
        .handle_input(&vec![0u8; RTMP_HANDSHAKE_SIZE], &mock, &handle)
        .unwrap();

    let payload: Vec<u8> = (0..300u32).map(|i| (i % 256) as u8).collect();
    let bytes = RtmpPacket::new(RTMP_CHANNEL_DATA, RTMP_TYPE_DATA, 0, 0, payload.clone()).create_chunks(128);

    let _ = state.handle_input(&bytes, &mock, &handle).unwrap();

    let media = mock.media.lock().unwrap();
    assert_eq!(media.len(), 1);
    assert_eq!(media[0].0, RTMP_TYPE_DATA);
    assert_eq!(media[0].1, payload);
}

// Scenario 4: a mid-stream Set-Chunk-Size raises the inbound chunk size,
// and a subsequent large message that would have needed continuation
// chunks at the old size decodes in one shot at the new size.
#[tokio::test]
async fn set_chunk_size_mid_stream_changes_inbound_chunking() {
    let (handle, _client) = test_handle().await;
    let mock = MockHandler::default();
    let mut state = new_state(128);

    let _ = state.handle_input(&c0_c1(0x03), &mock, &handle).unwrap();
    let _ = state
        .handle_input(&vec![0u8; RTMP_HANDSHAKE_SIZE], &mock, &handle)
        .unwrap();

    let set_chunk_size = rtmp::make_set_chunk_size(4096);
    let _ = state.handle_input(&set_chunk_size, &mock, &handle).unwrap();

    let payload: Vec<u8> = (0..300u32).map(|i| (i % 256) as u8).collect();
    // A single fmt0 chunk: no continuation headers needed at chunk size 4096.
    let bytes = RtmpPacket::new(RTMP_CHANNEL_DATA, RTMP_TYPE_DATA, 0, 0, payload.clone()).create_chunks(4096);

    let _ = state.handle_input(&bytes, &mock, &handle).unwrap();

    let media = mock.media.lock().unwrap();
    assert_eq!(media.len(), 1);
    assert_eq!(media[0].1, payload);
}

// Scenario 5: feeding the same bytes as one bulk write versus one byte at
// a time must produce identical dispatched results.
#[tokio::test]
async fn byte_by_byte_delivery_matches_bulk_delivery() {
    let (handle_a, _client_a) = test_handle().await;
    let (handle_b, _client_b) = test_handle().await;
    let mock_a = MockHandler::default();
    let mock_b = MockHandler::default();
    let mut state_a = new_state(128);
    let mut state_b = new_state(128);

    let mut all_bytes = c0_c1(0x04);
    all_bytes.extend(vec![0u8; RTMP_HANDSHAKE_SIZE]);
    all_bytes.extend(connect_command_bytes(7.0, 128));

    let out_a = state_a.handle_input(&all_bytes, &mock_a, &handle_a).unwrap();

    let mut out_b = Vec::new();
    for byte in &all_bytes {
        out_b.extend(state_b.handle_input(std::slice::from_ref(byte), &mock_b, &handle_b).unwrap());
    }

    assert_eq!(out_a, out_b);
    assert_eq!(state_a.phase(), state_b.phase());
}

// Scenario 6: AMF0 object property order survives decode unchanged, since
// peers rely on it (e.g. reading `code` before `description`).
#[tokio::test]
async fn object_property_order_is_preserved_through_dispatch() {
    let (handle, _client) = test_handle().await;
    let mock = MockHandler::default();
    let mut state = new_state(128);

    let _ = state.handle_input(&c0_c1(0x05), &mock, &handle).unwrap();
    let _ = state
        .handle_input(&vec![0u8; RTMP_HANDSHAKE_SIZE], &mock, &handle)
        .unwrap();

    let values = vec![
        AmfValue::string("publish"),
        AmfValue::Number(3.0),
        AmfValue::Null,
        AmfValue::object(vec![
            ("zeta", AmfValue::Number(1.0)),
            ("alpha", AmfValue::Number(2.0)),
            ("mid", AmfValue::Number(3.0)),
        ]),
    ];
    let bytes = rtmp::make_invoke(&values, 0, RTMP_CHANNEL_INVOKE, 128);
    let _ = state.handle_input(&bytes, &mock, &handle).unwrap();

    let invokes = mock.invokes.lock().unwrap();
    assert_eq!(invokes.len(), 1);
    assert_eq!(invokes[0].command_name, "publish");

    match &invokes[0].command_args[2] {
        AmfValue::Object(props) => {
            let keys: Vec<&str> = props.iter().map(|(k, _)| k.as_str()).collect();
            assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
        }
        other => panic!("expected an object, got {:?}", other),
    }
}

// Scenario 7: an unsupported AMF0 marker in a non-`connect` command is
// dropped (logged, not forwarded) without closing the connection; the
// next well-formed command on the same connection still dispatches.
#[tokio::test]
async fn unsupported_amf_marker_drops_message_without_closing_connection() {
    let (handle, _client) = test_handle().await;
    let mock = MockHandler::default();
    let mut state = new_state(128);

    let _ = state.handle_input(&c0_c1(0x06), &mock, &handle).unwrap();
    let _ = state
        .handle_input(&vec![0u8; RTMP_HANDSHAKE_SIZE], &mock, &handle)
        .unwrap();

    let mut bad_payload = AmfValue::string("oddCommand").encode();
    bad_payload.extend(AmfValue::Number(2.0).encode());
    bad_payload.push(0x04); // MovieClip marker: recognized, unsupported
    let bad_bytes = RtmpPacket::new(RTMP_CHANNEL_INVOKE, RTMP_TYPE_INVOKE, 0, 0, bad_payload).create_chunks(128);

    let result = state.handle_input(&bad_bytes, &mock, &handle);
    assert!(result.is_ok(), "a malformed AMF0 command must not close the connection");
    assert!(mock.invokes.lock().unwrap().is_empty());

    let good_values = vec![AmfValue::string("goodCommand"), AmfValue::Number(4.0), AmfValue::Null];
    let good_bytes = rtmp::make_invoke(&good_values, 0, RTMP_CHANNEL_INVOKE, 128);
    let _ = state.handle_input(&good_bytes, &mock, &handle).unwrap();

    let invokes = mock.invokes.lock().unwrap();
    assert_eq!(invokes.len(), 1);
    assert_eq!(invokes[0].command_name, "goodCommand");
}

// A malformed `connect` payload is different from any other malformed
// invoke: no later command on the session is meaningful without it, so
// `handle_input` must surface an error instead of silently dropping it.
#[tokio::test]
async fn malformed_connect_payload_closes_the_connection() {
    let (handle, _client) = test_handle().await;
    let mock = MockHandler::default();
    let mut state = new_state(128);

    let _ = state.handle_input(&c0_c1(0x08), &mock, &handle).unwrap();
    let _ = state
        .handle_input(&vec![0u8; RTMP_HANDSHAKE_SIZE], &mock, &handle)
        .unwrap();

    let mut bad_payload = AmfValue::string("connect").encode();
    bad_payload.extend(AmfValue::Number(1.0).encode());
    bad_payload.push(0x04); // MovieClip marker: recognized, unsupported
    let bad_bytes = RtmpPacket::new(RTMP_CHANNEL_INVOKE, RTMP_TYPE_INVOKE, 0, 0, bad_payload).create_chunks(128);

    let result = state.handle_input(&bad_bytes, &mock, &handle);
    assert!(result.is_err(), "a malformed connect payload must close the connection");
    assert!(mock.invokes.lock().unwrap().is_empty());
}

// Scenario 8: the chunk stream ID forms requiring the 2-byte and 3-byte
// basic header encode and decode consistently end to end, via a message
// sent on a channel above the single-byte range.
#[tokio::test]
async fn extended_chunk_stream_id_round_trips_end_to_end() {
    let (handle, _client) = test_handle().await;
    let mock = MockHandler::default();
    let mut state = new_state(128);

    let _ = state.handle_input(&c0_c1(0x07), &mock, &handle).unwrap();
    let _ = state
        .handle_input(&vec![0u8; RTMP_HANDSHAKE_SIZE], &mock, &handle)
        .unwrap();

    let payload = vec![9u8; 16];
    let wide_csid_bytes =
        RtmpPacket::new(500, RTMP_TYPE_DATA, 0, 0, payload.clone()).create_chunks(128);

    let _ = state.handle_input(&wide_csid_bytes, &mock, &handle).unwrap();

    let media = mock.media.lock().unwrap();
    assert_eq!(media.len(), 1);
    assert_eq!(media[0].1, payload);
}
