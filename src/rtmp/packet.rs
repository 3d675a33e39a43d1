// RTMP packet model: assembles one logical message into wire chunks.
//
// Ported from the project's original chunk serializer, generalized to
// emit the 2-byte and 3-byte basic header forms needed for chunk stream
// IDs at or above 64 (see `constants::basic_header_len`).

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use super::{RTMP_CHUNK_TYPE_0, RTMP_CHUNK_TYPE_1, RTMP_CHUNK_TYPE_2, RTMP_CHUNK_TYPE_3, RTMP_EXTENDED_TIMESTAMP_MARKER};

/// Header of an outbound RTMP packet.
#[derive(Clone)]
pub struct RtmpPacketHeader {
    pub timestamp: u32,
    pub format: u8,
    pub channel_id: u32,
    pub packet_type: u8,
    pub stream_id: u32,
    pub length: usize,
}

/// An RTMP message ready to be fragmented into wire chunks.
#[derive(Clone)]
pub struct RtmpPacket {
    pub header: RtmpPacketHeader,
    pub payload: Vec<u8>,
}

impl RtmpPacket {
    pub fn new(channel_id: u32, packet_type: u8, stream_id: u32, timestamp: u32, payload: Vec<u8>) -> RtmpPacket {
        let length = payload.len();
        RtmpPacket {
            header: RtmpPacketHeader {
                timestamp,
                format: RTMP_CHUNK_TYPE_0,
                channel_id,
                packet_type,
                stream_id,
                length,
            },
            payload,
        }
    }

    /// Serializes a basic header for the given format and channel (chunk
    /// stream) ID, picking the 1/2/3-byte form as required.
    pub fn serialize_basic_header(format: u8, channel_id: u32) -> Vec<u8> {
        if channel_id >= 64 + 255 {
            vec![
                (format << 6) | 1,
                (channel_id - 64) as u8,
                ((channel_id - 64) >> 8) as u8,
            ]
        } else if channel_id >= 64 {
            vec![format << 6, (channel_id - 64) as u8]
        } else {
            vec![(format << 6) | (channel_id as u8)]
        }
    }

    fn serialize_chunk_message_header(&self) -> Vec<u8> {
        let mut out: Vec<u8> = Vec::new();

        if self.header.format <= RTMP_CHUNK_TYPE_2 {
            let mut b = [0u8; 4];
            let ts = self.header.timestamp.min(RTMP_EXTENDED_TIMESTAMP_MARKER);
            BigEndian::write_u32(&mut b, ts);
            out.extend(&b[1..]);
        }

        if self.header.format <= RTMP_CHUNK_TYPE_1 {
            let mut b = [0u8; 4];
            BigEndian::write_u32(&mut b, self.header.length as u32);
            out.extend(&b[1..]);
            out.push(self.header.packet_type);
        }

        if self.header.format == RTMP_CHUNK_TYPE_0 {
            let mut b = [0u8; 4];
            LittleEndian::write_u32(&mut b, self.header.stream_id);
            out.extend(b);
        }

        out
    }

    /// Fragments this packet's payload into wire chunks of at most
    /// `out_chunk_size` bytes each, using a type-3 continuation header
    /// (and, when the timestamp needed an extended field, repeating that
    /// field) between fragments.
    pub fn create_chunks(&self, out_chunk_size: usize) -> Vec<u8> {
        let out_chunk_size = out_chunk_size.max(1);

        let basic_header = Self::serialize_basic_header(self.header.format, self.header.channel_id);
        let continuation_header = Self::serialize_basic_header(RTMP_CHUNK_TYPE_3, self.header.channel_id);
        let message_header = self.serialize_chunk_message_header();
        let use_extended_timestamp = self.header.timestamp >= RTMP_EXTENDED_TIMESTAMP_MARKER;

        let mut out = Vec::with_capacity(
            basic_header.len() + message_header.len() + self.payload.len() + self.payload.len() / out_chunk_size + 8,
        );

        out.extend(&basic_header);
        out.extend(&message_header);

        if use_extended_timestamp {
            let mut b = [0u8; 4];
            BigEndian::write_u32(&mut b, self.header.timestamp);
            out.extend(b);
        }

        let mut remaining = self.header.length.min(self.payload.len());
        let mut offset = 0usize;

        loop {
            let take = remaining.min(out_chunk_size);
            out.extend(&self.payload[offset..offset + take]);
            offset += take;
            remaining -= take;

            if remaining == 0 {
                break;
            }

            out.extend(&continuation_header);
            if use_extended_timestamp {
                let mut b = [0u8; 4];
                BigEndian::write_u32(&mut b, self.header.timestamp);
                out.extend(b);
            }
        }

        out
    }
}
