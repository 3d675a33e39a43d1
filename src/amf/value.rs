// AMF0 value tree

/// An AMF0-compatible value.
///
/// `Object` and `EcmaArray` keep their properties as an ordered list rather
/// than a map: RTMP peers rely on property order (the first child of a
/// `connect` response is always `fmsVer`), so a `HashMap` would silently
/// break wire compatibility.
#[derive(Debug, Clone, PartialEq)]
pub enum AmfValue {
    Number(f64),
    Boolean(bool),
    String(String),
    Object(Vec<(String, AmfValue)>),
    Null,
    Undefined,
    Reference(u16),
    EcmaArray(Vec<(String, AmfValue)>),

    /// Not a wire marker: the flat sequence of values that make up a
    /// command or data message body (command name, transaction id,
    /// command object, arguments...).
    Array(Vec<AmfValue>),
}

impl AmfValue {
    pub fn object(props: Vec<(&str, AmfValue)>) -> AmfValue {
        AmfValue::Object(props.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }

    pub fn string(s: impl Into<String>) -> AmfValue {
        AmfValue::String(s.into())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AmfValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AmfValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn get_property(&self, name: &str) -> Option<&AmfValue> {
        match self {
            AmfValue::Object(props) | AmfValue::EcmaArray(props) => {
                props.iter().find(|(k, _)| k == name).map(|(_, v)| v)
            }
            _ => None,
        }
    }

    /// Human-readable rendering for debug logging, in the style of a
    /// recursive pretty-printer rather than `{:?}`.
    pub fn to_debug_string(&self, tabs: &str) -> String {
        match self {
            AmfValue::Number(n) => format!("{}", n),
            AmfValue::Boolean(b) => if *b { "TRUE".to_string() } else { "FALSE".to_string() },
            AmfValue::String(s) => format!("'{}'", s),
            AmfValue::Object(props) => Self::debug_props("OBJECT", props, tabs),
            AmfValue::Null => "NULL".to_string(),
            AmfValue::Undefined => "UNDEFINED".to_string(),
            AmfValue::Reference(addr) => format!("REF#{}", addr),
            AmfValue::EcmaArray(props) => Self::debug_props("ARRAY", props, tabs),
            AmfValue::Array(items) => {
                let mut res = "SEQUENCE [\n".to_string();
                for item in items {
                    res.push_str(tabs);
                    res.push_str("    ");
                    res.push_str(&item.to_debug_string(&format!("{}    ", tabs)));
                    res.push('\n');
                }
                res.push_str(tabs);
                res.push(']');
                res
            }
        }
    }

    fn debug_props(label: &str, props: &[(String, AmfValue)], tabs: &str) -> String {
        let mut res = format!("{} {}\n", label, "{");
        for (key, value) in props {
            res.push_str(tabs);
            res.push_str("    '");
            res.push_str(key);
            res.push_str("' = ");
            res.push_str(&value.to_debug_string(&format!("{}    ", tabs)));
            res.push('\n');
        }
        res.push_str(tabs);
        res.push('}');
        res
    }
}
