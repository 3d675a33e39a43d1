// AMF0 encoder

use byteorder::{BigEndian, ByteOrder};

use super::markers;
use super::value::AmfValue;

impl AmfValue {
    /// Encodes this value, including its leading type marker.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            AmfValue::Number(n) => {
                let mut buf = vec![markers::NUMBER];
                buf.extend(encode_f64(*n));
                buf
            }
            AmfValue::Boolean(b) => vec![markers::BOOLEAN, if *b { 1 } else { 0 }],
            AmfValue::String(s) => {
                let mut buf = vec![markers::STRING];
                buf.extend(encode_short_string(s));
                buf
            }
            AmfValue::Object(props) => {
                let mut buf = vec![markers::OBJECT];
                buf.extend(encode_property_list(props));
                buf
            }
            AmfValue::Null => vec![markers::NULL],
            AmfValue::Undefined => vec![markers::UNDEFINED],
            AmfValue::Reference(addr) => {
                let mut buf = vec![markers::REFERENCE];
                let mut b = [0u8; 2];
                BigEndian::write_u16(&mut b, *addr);
                buf.extend(b);
                buf
            }
            AmfValue::EcmaArray(props) => {
                let mut buf = vec![markers::ECMA_ARRAY];
                let mut count = [0u8; 4];
                BigEndian::write_u32(&mut count, props.len() as u32);
                buf.extend(count);
                buf.extend(encode_property_list(props));
                buf
            }
            AmfValue::Array(items) => {
                // Not a wire type: a flat command/data sequence. Each
                // member is encoded in order with no wrapping marker.
                let mut buf = Vec::new();
                for item in items {
                    buf.extend(item.encode());
                }
                buf
            }
        }
    }

    /// Encodes a property as `key` (short string, no marker) + typed value,
    /// for building an object body by hand (see `rtmp::messages`).
    pub fn encode_property(key: &str, value: &AmfValue) -> Vec<u8> {
        let mut buf = encode_short_string(key);
        buf.extend(value.encode());
        buf
    }
}

fn encode_f64(n: f64) -> [u8; 8] {
    let mut buf = [0u8; 8];
    BigEndian::write_f64(&mut buf, n);
    buf
}

fn encode_short_string(s: &str) -> Vec<u8> {
    let bytes = s.as_bytes();
    let mut buf = Vec::with_capacity(2 + bytes.len());
    let mut len_buf = [0u8; 2];
    BigEndian::write_u16(&mut len_buf, bytes.len() as u16);
    buf.extend(len_buf);
    buf.extend(bytes);
    buf
}

fn encode_property_list(props: &[(String, AmfValue)]) -> Vec<u8> {
    let mut buf = Vec::new();
    for (key, value) in props {
        buf.extend(encode_short_string(key));
        buf.extend(value.encode());
    }
    buf.extend(encode_short_string(""));
    buf.push(markers::OBJECT_END);
    buf
}
