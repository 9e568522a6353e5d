//! Length-prefixed binary body codec. A value is a sequence of frames, each
//! a 32-bit little-endian length followed by that many UTF-8 bytes. A string
//! is one frame; a list is N frames in order; a dict is 2N frames
//! alternating key, value — an odd frame count is malformed.
//!
//! Grounded on `body-parser-binary.go` and `alaredis_server/util.go`'s
//! `writeSizedData`/`readSizedData` framing, reused here verbatim (the same
//! framing also underlies the snapshot persister's on-disk format).

use std::collections::HashMap;

use alaredis_common::Value;
use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::{BodyCodec, CodecError};

/// The length-prefixed binary wire format.
#[derive(Debug, Default, Clone, Copy)]
pub struct BinaryCodec;

/// Appends one frame (length prefix + bytes) to `out`.
pub fn write_frame(out: &mut BytesMut, s: &str) {
    out.put_u32_le(s.len() as u32);
    out.put_slice(s.as_bytes());
}

/// Splits `body` into its frames, erroring if a length prefix runs past the
/// end of the buffer or a frame's bytes are not valid UTF-8.
pub fn read_frames(body: &[u8]) -> Result<Vec<String>, CodecError> {
    let mut buf = Bytes::copy_from_slice(body);
    let mut frames = Vec::new();
    while buf.has_remaining() {
        if buf.remaining() < 4 {
            return Err(CodecError::Malformed("truncated frame length".into()));
        }
        let len = buf.get_u32_le() as usize;
        if buf.remaining() < len {
            return Err(CodecError::Malformed("truncated frame body".into()));
        }
        let chunk = buf.copy_to_bytes(len);
        let s = String::from_utf8(chunk.to_vec())
            .map_err(|e| CodecError::Malformed(format!("frame is not valid UTF-8: {e}")))?;
        frames.push(s);
    }
    Ok(frames)
}

impl BodyCodec for BinaryCodec {
    fn encode(&self, value: &Value) -> Vec<u8> {
        let mut out = BytesMut::new();
        match value {
            Value::Str(s) => write_frame(&mut out, s),
            Value::List(items) => {
                for item in items {
                    write_frame(&mut out, item);
                }
            }
            Value::Dict(map) => {
                for (k, v) in map {
                    write_frame(&mut out, k);
                    write_frame(&mut out, v);
                }
            }
        }
        out.to_vec()
    }

    fn decode_str(&self, body: &[u8]) -> Result<Value, CodecError> {
        let mut frames = read_frames(body)?;
        if frames.len() != 1 {
            return Err(CodecError::Malformed(format!(
                "expected exactly one frame for a string, got {}",
                frames.len()
            )));
        }
        Ok(Value::Str(frames.remove(0)))
    }

    fn decode_list(&self, body: &[u8]) -> Result<Value, CodecError> {
        Ok(Value::List(read_frames(body)?))
    }

    fn decode_dict(&self, body: &[u8]) -> Result<Value, CodecError> {
        let frames = read_frames(body)?;
        if frames.len() % 2 != 0 {
            return Err(CodecError::Malformed(
                "Key count is not equal to values count".into(),
            ));
        }
        let mut map = HashMap::with_capacity(frames.len() / 2);
        let mut iter = frames.into_iter();
        while let (Some(k), Some(v)) = (iter.next(), iter.next()) {
            map.insert(k, v);
        }
        Ok(Value::Dict(map))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_string() {
        let codec = BinaryCodec;
        let encoded = codec.encode(&Value::Str("test value".into()));
        assert_eq!(codec.decode_str(&encoded).unwrap(), Value::Str("test value".into()));
    }

    #[test]
    fn round_trips_a_list() {
        let codec = BinaryCodec;
        let value = Value::List(vec!["v1".into(), "v2".into(), "v3".into()]);
        let encoded = codec.encode(&value);
        assert_eq!(codec.decode_list(&encoded).unwrap(), value);
    }

    #[test]
    fn round_trips_a_dict() {
        let codec = BinaryCodec;
        let mut map = HashMap::new();
        map.insert("k1".to_string(), "v1".to_string());
        map.insert("k2".to_string(), "v2".to_string());
        let value = Value::Dict(map);
        let encoded = codec.encode(&value);
        assert_eq!(codec.decode_dict(&encoded).unwrap(), value);
    }

    #[test]
    fn odd_frame_count_is_malformed_for_dict() {
        let codec = BinaryCodec;
        let mut out = BytesMut::new();
        write_frame(&mut out, "k1");
        write_frame(&mut out, "v1");
        write_frame(&mut out, "k2");
        let err = codec.decode_dict(&out).unwrap_err();
        assert_eq!(err.to_string(), "malformed body: Key count is not equal to values count");
    }

    #[test]
    fn wrong_frame_count_is_malformed_for_string() {
        let codec = BinaryCodec;
        let value = Value::List(vec!["a".into(), "b".into()]);
        let encoded = codec.encode(&value);
        assert!(codec.decode_str(&encoded).is_err());
    }

    #[test]
    fn truncated_length_prefix_is_malformed() {
        let codec = BinaryCodec;
        assert!(codec.decode_str(&[1, 2, 3]).is_err());
    }
}
