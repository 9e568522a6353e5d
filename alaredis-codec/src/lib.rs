//! # alaredis-codec
//!
//! Wire-level marshalling of [`alaredis_common::Value`], independent of
//! transport. Two codecs are provided: JSON (the default, human-legible) and
//! a length-prefixed binary format used when a client opts into it.
//!
//! Grounded on `alaredis_lib/body-parser.go`'s `BodyParser` interface with
//! its two implementations (`body-parser-json.go`, `body-parser-binary.go`);
//! re-expressed as a Rust trait so `alaredis-server` can pick the codec per
//! request without a type switch at every call site.

pub mod binary;
mod json;

use alaredis_common::Value;
use thiserror::Error;

/// Failure marshalling or unmarshalling a value's wire representation.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("malformed body: {0}")]
    Malformed(String),
}

/// A wire format for request/response bodies. Implementations never see an
/// HTTP status or op code — only the opaque byte body and the shape
/// ([`alaredis_common::Tag`]) the caller expects to decode.
pub trait BodyCodec {
    /// Encodes a value for the wire.
    fn encode(&self, value: &Value) -> Vec<u8>;

    /// Decodes a scalar string body.
    fn decode_str(&self, body: &[u8]) -> Result<Value, CodecError>;

    /// Decodes a list-of-strings body.
    fn decode_list(&self, body: &[u8]) -> Result<Value, CodecError>;

    /// Decodes a string-to-string dict body.
    fn decode_dict(&self, body: &[u8]) -> Result<Value, CodecError>;
}

pub use binary::BinaryCodec;
pub use json::JsonCodec;
