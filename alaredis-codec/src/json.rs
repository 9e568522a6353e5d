//! JSON body codec: the default wire format. Grounded on
//! `body-parser-json.go`, which marshals/unmarshals each shape with the
//! standard library's `encoding/json`; here that's `serde_json`.

use std::collections::HashMap;

use alaredis_common::Value;

use crate::{BodyCodec, CodecError};

/// The JSON wire format. For scalar ops the body is a JSON string; for list
/// ops, a JSON array of strings; for dict ops, a JSON object of string to
/// string.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCodec;

impl BodyCodec for JsonCodec {
    fn encode(&self, value: &Value) -> Vec<u8> {
        // A `Value`'s `Serialize` impl is untagged, so this already produces
        // the bare string/array/object the specification calls for.
        serde_json::to_vec(value).unwrap_or_default()
    }

    fn decode_str(&self, body: &[u8]) -> Result<Value, CodecError> {
        let s: String = serde_json::from_slice(body)
            .map_err(|e| CodecError::Malformed(format!("expected a JSON string: {e}")))?;
        Ok(Value::Str(s))
    }

    fn decode_list(&self, body: &[u8]) -> Result<Value, CodecError> {
        let list: Vec<String> = serde_json::from_slice(body)
            .map_err(|e| CodecError::Malformed(format!("expected a JSON array of strings: {e}")))?;
        Ok(Value::List(list))
    }

    fn decode_dict(&self, body: &[u8]) -> Result<Value, CodecError> {
        let dict: HashMap<String, String> = serde_json::from_slice(body).map_err(|e| {
            CodecError::Malformed(format!("expected a JSON object of string to string: {e}"))
        })?;
        Ok(Value::Dict(dict))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_string() {
        let codec = JsonCodec;
        let encoded = codec.encode(&Value::Str("test value".into()));
        assert_eq!(encoded, br#""test value""#);
        assert_eq!(codec.decode_str(&encoded).unwrap(), Value::Str("test value".into()));
    }

    #[test]
    fn round_trips_a_list() {
        let codec = JsonCodec;
        let value = Value::List(vec!["v1".into(), "v2".into()]);
        let encoded = codec.encode(&value);
        assert_eq!(codec.decode_list(&encoded).unwrap(), value);
    }

    #[test]
    fn round_trips_a_dict() {
        let codec = JsonCodec;
        let mut map = HashMap::new();
        map.insert("k1".to_string(), "v1".to_string());
        let value = Value::Dict(map);
        let encoded = codec.encode(&value);
        assert_eq!(codec.decode_dict(&encoded).unwrap(), value);
    }

    #[test]
    fn rejects_malformed_json() {
        let codec = JsonCodec;
        assert!(codec.decode_str(b"{not json").is_err());
    }

    #[test]
    fn rejects_wrong_shape() {
        let codec = JsonCodec;
        let body = codec.encode(&Value::Str("s".into()));
        assert!(codec.decode_list(&body).is_err());
    }
}
