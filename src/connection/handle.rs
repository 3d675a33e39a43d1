// Embedder-facing connection handle and invoke callback trait

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::Mutex;

use crate::amf::AmfValue;
use crate::rtmp::{make_data, make_invoke, RTMP_CHANNEL_INVOKE};

/// Callback surface an embedder implements to receive commands and media
/// that this crate's core does not interpret itself.
pub trait InvokeHandler: Send + Sync {
    /// Called for every Invoke (AMF0 command) message other than the
    /// built-in `connect`, which the connection answers itself.
    fn on_invoke(&self, command_name: &str, command_args: &[AmfValue], connection: &ConnectionHandle);

    /// Called for Audio/Video/Data messages. The default implementation
    /// ignores them, so embedders that only care about commands don't
    /// need to override it.
    fn on_media(&self, _type_id: u8, _timestamp: u32, _payload: &[u8], _connection: &ConnectionHandle) {}
}

/// A lightweight, cloneable reference to a connection that an embedder
/// can use to push messages back to the peer outside of the read loop.
#[derive(Clone)]
pub struct ConnectionHandle {
    peer_addr: SocketAddr,
    writer: Arc<Mutex<OwnedWriteHalf>>,
    out_chunk_size: usize,
}

impl ConnectionHandle {
    pub fn new(peer_addr: SocketAddr, writer: Arc<Mutex<OwnedWriteHalf>>, out_chunk_size: usize) -> ConnectionHandle {
        ConnectionHandle {
            peer_addr,
            writer,
            out_chunk_size,
        }
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Sends an AMF0 command sequence as an Invoke message on the
    /// standard command chunk stream.
    pub async fn send_invoke(&self, stream_id: u32, values: &[AmfValue]) -> std::io::Result<()> {
        let bytes = make_invoke(values, stream_id, RTMP_CHANNEL_INVOKE, self.out_chunk_size);
        self.write_raw(&bytes).await
    }

    /// Sends an AMF0 data (Notify) message, e.g. onMetaData.
    pub async fn send_data(&self, stream_id: u32, values: &[AmfValue]) -> std::io::Result<()> {
        let bytes = make_data(values, stream_id, self.out_chunk_size);
        self.write_raw(&bytes).await
    }

    /// Writes already-encoded chunk bytes directly, e.g. the output of
    /// `ConnectionState::handle_input`.
    pub async fn send_raw(&self, bytes: &[u8]) -> std::io::Result<()> {
        self.write_raw(bytes).await
    }

    async fn write_raw(&self, bytes: &[u8]) -> std::io::Result<()> {
        let mut writer = self.writer.lock().await;
        writer.write_all(bytes).await
    }
}
