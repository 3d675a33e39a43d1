// AMF0 value codec

mod decode;
mod encode;
mod markers;
mod value;

pub use decode::{extract_command, AmfCursor};
pub use value::AmfValue;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_round_trips() {
        let v = AmfValue::Number(31.0);
        let encoded = v.encode();
        let mut cursor = AmfCursor::new(&encoded);
        assert_eq!(cursor.read_value().unwrap(), v);
    }

    #[test]
    fn object_preserves_property_order() {
        let v = AmfValue::object(vec![
            ("b", AmfValue::Number(2.0)),
            ("a", AmfValue::Number(1.0)),
            ("c", AmfValue::Boolean(true)),
        ]);

        let encoded = v.encode();
        let mut cursor = AmfCursor::new(&encoded);
        let decoded = cursor.read_value().unwrap();

        match decoded {
            AmfValue::Object(props) => {
                let keys: Vec<&str> = props.iter().map(|(k, _)| k.as_str()).collect();
                assert_eq!(keys, vec!["b", "a", "c"]);
            }
            other => panic!("expected object, got {:?}", other),
        }

        assert_eq!(encoded, v.encode());
    }

    #[test]
    fn command_sequence_round_trips() {
        let seq = AmfValue::Array(vec![
            AmfValue::String("connect".to_string()),
            AmfValue::Number(1.0),
            AmfValue::object(vec![("app", AmfValue::string("live"))]),
        ]);

        let encoded = seq.encode();
        let mut cursor = AmfCursor::new(&encoded);
        let decoded = cursor.read_sequence().unwrap();

        assert_eq!(decoded, seq);
    }

    #[test]
    fn extract_command_peeks_without_consuming() {
        let seq = AmfValue::Array(vec![
            AmfValue::String("connect".to_string()),
            AmfValue::Number(1.0),
        ]);
        let encoded = seq.encode();

        assert_eq!(extract_command(&encoded).unwrap(), "connect");

        // A full parse still works afterwards.
        let mut cursor = AmfCursor::new(&encoded);
        assert_eq!(cursor.read_sequence().unwrap(), seq);
    }

    #[test]
    fn unsupported_marker_is_malformed_not_a_silent_loop() {
        let buf = [0x0A, 0x00, 0x00, 0x00, 0x00]; // StrictArray marker
        let mut cursor = AmfCursor::new(&buf);
        let err = cursor.read_value().unwrap_err();
        assert!(matches!(err, crate::error::RtmpError::MalformedAmf(_)));
    }

    #[test]
    fn truncated_string_length_is_malformed() {
        let buf = [0x02, 0x00, 0x10, b'h', b'i']; // claims 16 bytes, has 2
        let mut cursor = AmfCursor::new(&buf);
        assert!(cursor.read_value().is_err());
    }
}
