// RTMP handshake (simple variant only)
//
// The digest-signed "complex" handshake used by modern Flash/FFmpeg
// clients is out of scope; peers that require it will fail to connect.

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::error::{RtmpError, RtmpResult};

use super::{RTMP_HANDSHAKE_SIZE, RTMP_VERSION};

/// Endianness to use when writing the server epoch timestamp into S1.
/// The RTMP spec calls for big-endian; some older deployments of this
/// codebase's lineage wrote it little-endian, so it remains configurable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeTimestampEndianness {
    Big,
    Little,
}

impl HandshakeTimestampEndianness {
    fn write(&self, buf: &mut [u8], value: u32) {
        match self {
            HandshakeTimestampEndianness::Big => BigEndian::write_u32(buf, value),
            HandshakeTimestampEndianness::Little => LittleEndian::write_u32(buf, value),
        }
    }
}

/// Validates the C0 version byte.
pub fn verify_c0(byte: u8) -> RtmpResult<()> {
    if byte != RTMP_VERSION {
        return Err(RtmpError::BadHandshake(format!(
            "unsupported RTMP version byte {:#04x}",
            byte
        )));
    }
    Ok(())
}

/// Builds the S0+S1+S2 response (3073 bytes) for a given C1 (1536 bytes).
///
/// `epoch_secs` is the server's own clock, used only to fill S1's
/// timestamp field; peers are not expected to validate it.
pub fn generate_s0_s1_s2(c1: &[u8], epoch_secs: u32, endianness: HandshakeTimestampEndianness, random_fill: &[u8]) -> RtmpResult<Vec<u8>> {
    if c1.len() != RTMP_HANDSHAKE_SIZE {
        return Err(RtmpError::BadHandshake(format!(
            "C1 must be exactly {} bytes, got {}",
            RTMP_HANDSHAKE_SIZE,
            c1.len()
        )));
    }

    let mut out = Vec::with_capacity(1 + RTMP_HANDSHAKE_SIZE * 2);
    out.push(RTMP_VERSION);

    // S1
    let mut s1 = vec![0u8; RTMP_HANDSHAKE_SIZE];
    endianness.write(&mut s1[0..4], epoch_secs);
    // bytes 4..8 stay zero (no claimed client version)
    fill_random(&mut s1[8..], random_fill);
    out.extend(&s1);

    // S2: echo of C1
    out.extend(c1);

    Ok(out)
}

fn fill_random(dest: &mut [u8], source: &[u8]) {
    if source.is_empty() {
        return;
    }
    for (i, b) in dest.iter_mut().enumerate() {
        *b = source[i % source.len()];
    }
}
