// AMF0 decoder

use byteorder::{BigEndian, ByteOrder};

use crate::error::{RtmpError, RtmpResult};

use super::markers;
use super::value::AmfValue;

/// Cursor over a borrowed AMF0 byte slice.
///
/// Every read is bounds-checked explicitly rather than relying on a panic:
/// a truncated or oversized length field is reported as `MalformedAmf`
/// instead of crashing the connection.
pub struct AmfCursor<'a> {
    buffer: &'a [u8],
    pos: usize,
}

impl<'a> AmfCursor<'a> {
    pub fn new(buffer: &'a [u8]) -> AmfCursor<'a> {
        AmfCursor { buffer, pos: 0 }
    }

    pub fn ended(&self) -> bool {
        self.pos >= self.buffer.len()
    }

    fn take(&mut self, n: usize) -> RtmpResult<&'a [u8]> {
        if self.pos + n > self.buffer.len() {
            return Err(RtmpError::MalformedAmf(format!(
                "expected {} more bytes at offset {}, but only {} remain",
                n,
                self.pos,
                self.buffer.len() - self.pos.min(self.buffer.len())
            )));
        }
        let slice = &self.buffer[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn peek_byte(&self) -> RtmpResult<u8> {
        self.buffer
            .get(self.pos)
            .copied()
            .ok_or_else(|| RtmpError::MalformedAmf("unexpected end of AMF0 buffer".to_string()))
    }

    fn read_u8(&mut self) -> RtmpResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn read_u16(&mut self) -> RtmpResult<u16> {
        Ok(BigEndian::read_u16(self.take(2)?))
    }

    fn read_u32(&mut self) -> RtmpResult<u32> {
        Ok(BigEndian::read_u32(self.take(4)?))
    }

    fn read_f64(&mut self) -> RtmpResult<f64> {
        Ok(BigEndian::read_f64(self.take(8)?))
    }

    fn read_utf8(&mut self, len: usize) -> RtmpResult<String> {
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| RtmpError::MalformedAmf(format!("invalid utf-8 in AMF0 string: {}", e)))
    }

    /// Reads the short (u16-length-prefixed) string form used for object
    /// keys, 0x02 String values and the ECMA-array/Object terminator.
    fn read_short_string(&mut self) -> RtmpResult<String> {
        let len = self.read_u16()? as usize;
        self.read_utf8(len)
    }

    /// Reads object properties until the 0x00 0x00 0x09 terminator.
    fn read_property_list(&mut self) -> RtmpResult<Vec<(String, AmfValue)>> {
        let mut props = Vec::new();
        loop {
            // Peek for the terminator: an empty key followed by marker 0x09.
            if self.buffer.len() >= self.pos + 2 && BigEndian::read_u16(&self.buffer[self.pos..self.pos + 2]) == 0 {
                let marker_pos = self.pos + 2;
                if self.buffer.get(marker_pos).copied() == Some(markers::OBJECT_END) {
                    self.pos = marker_pos + 1;
                    return Ok(props);
                }
            }

            let key = self.read_short_string()?;
            let value = self.read_value()?;
            props.push((key, value));
        }
    }

    /// Reads exactly one typed AMF0 value.
    pub fn read_value(&mut self) -> RtmpResult<AmfValue> {
        let marker = self.read_u8()?;

        match marker {
            markers::NUMBER => Ok(AmfValue::Number(self.read_f64()?)),
            markers::BOOLEAN => Ok(AmfValue::Boolean(self.read_u8()? != 0)),
            markers::STRING => {
                let len = self.read_u16()? as usize;
                Ok(AmfValue::String(self.read_utf8(len)?))
            }
            markers::OBJECT => Ok(AmfValue::Object(self.read_property_list()?)),
            markers::NULL => Ok(AmfValue::Null),
            markers::UNDEFINED => Ok(AmfValue::Undefined),
            markers::REFERENCE => Ok(AmfValue::Reference(self.read_u16()?)),
            markers::ECMA_ARRAY => {
                let _declared_count = self.read_u32()?; // informational only, see design notes
                Ok(AmfValue::EcmaArray(self.read_property_list()?))
            }
            other => Err(RtmpError::MalformedAmf(format!(
                "unsupported AMF0 marker {:#04x}",
                other
            ))),
        }
    }

    /// Reads values until the buffer is exhausted, returning them as a
    /// flat sequence (the shape of a command or data message body).
    pub fn read_sequence(&mut self) -> RtmpResult<AmfValue> {
        let mut values = Vec::new();
        while !self.ended() {
            values.push(self.read_value()?);
        }
        Ok(AmfValue::Array(values))
    }
}

/// Peeks the first AMF0 string in a buffer without otherwise parsing it.
/// Used to pick a dispatch branch (the command name) before committing to
/// a full decode.
pub fn extract_command(buf: &[u8]) -> RtmpResult<String> {
    let mut cursor = AmfCursor::new(buf);
    let marker = cursor.peek_byte()?;
    if marker != markers::STRING {
        return Err(RtmpError::MalformedAmf(format!(
            "expected a command name string, found marker {:#04x}",
            marker
        )));
    }
    match cursor.read_value()? {
        AmfValue::String(s) => Ok(s),
        _ => unreachable!("marker was verified to be STRING"),
    }
}
