//! # Synchronous Client API
//!
//! Purpose: Expose a compact, blocking API for issuing commands to an
//! alaredis server over its HTTP/JSON front door.
//!
//! ## Design Principles
//! 1. **Facade Pattern**: `KVClient` hides URL building and JSON encoding.
//! 2. **Fail Fast**: Non-2xx responses surface immediately as errors.
//! 3. **Performance First**: `reqwest::blocking::Client` keeps its own
//!    per-host connection pool, so no pooling is reimplemented here.

use std::collections::HashMap;
use std::fmt;

use alaredis_common::{Op, Value};

/// Result type for the sync client.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors surfaced by the sync client.
#[derive(Debug)]
pub enum ClientError {
    /// Transport-level failure (connection refused, timeout, TLS, ...).
    Transport(reqwest::Error),
    /// The server replied with a non-2xx status and this message body.
    Server { status: u16, message: String },
    /// The response body could not be decoded as JSON.
    Decode(serde_json::Error),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Transport(err) => write!(f, "transport error: {err}"),
            ClientError::Server { status, message } => write!(f, "server error ({status}): {message}"),
            ClientError::Decode(err) => write!(f, "decode error: {err}"),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Transport(err)
    }
}

/// Configuration for the synchronous client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the server, e.g. "http://127.0.0.1:8080".
    pub base_url: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            base_url: "http://127.0.0.1:8080".to_string(),
        }
    }
}

/// Synchronous JSON client for the HTTP front door.
pub struct KVClient {
    http: reqwest::blocking::Client,
    base_url: String,
}

impl KVClient {
    /// Creates a client pointed at `base_url` with default settings.
    pub fn connect(base_url: impl Into<String>) -> ClientResult<Self> {
        Self::with_config(ClientConfig {
            base_url: base_url.into(),
        })
    }

    /// Creates a client with a custom configuration.
    pub fn with_config(config: ClientConfig) -> ClientResult<Self> {
        Ok(KVClient {
            http: reqwest::blocking::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetches a string value by key. Returns `Ok(None)` if the key is missing.
    pub fn get(&self, key: &str) -> ClientResult<Option<String>> {
        Ok(self.getter(Op::Get, key, None)?.map(into_str))
    }

    /// Sets a string value for a key without expiration.
    pub fn set(&self, key: &str, value: &str) -> ClientResult<()> {
        self.setter(Op::Set, key, None, Some(&Value::Str(value.to_string())), 0)
    }

    /// Sets a string value and attaches an expiration, in seconds.
    pub fn set_with_ttl(&self, key: &str, value: &str, ttl_secs: u64) -> ClientResult<()> {
        self.setter(Op::Set, key, None, Some(&Value::Str(value.to_string())), ttl_secs)
    }

    /// Deletes a key. A missing key is a no-op on the server.
    pub fn delete(&self, key: &str) -> ClientResult<()> {
        self.setter(Op::Delete, key, None, None, 0)
    }

    /// Replaces an entire list.
    pub fn lset(&self, key: &str, items: Vec<String>) -> ClientResult<()> {
        self.setter(Op::LSet, key, None, Some(&Value::List(items)), 0)
    }

    /// Writes a single list element by index.
    pub fn lseti(&self, key: &str, idx: usize, value: &str) -> ClientResult<()> {
        self.setter(
            Op::LSetI,
            key,
            Some(idx.to_string()),
            Some(&Value::Str(value.to_string())),
            0,
        )
    }

    /// Fetches the full list for a key.
    pub fn lget(&self, key: &str) -> ClientResult<Option<Vec<String>>> {
        Ok(self.getter(Op::LGet, key, None)?.map(into_list))
    }

    /// Fetches a single list element by index.
    pub fn lgeti(&self, key: &str, idx: usize) -> ClientResult<Option<String>> {
        Ok(self.getter(Op::LGetI, key, Some(idx.to_string()))?.map(into_str))
    }

    /// Replaces an entire dict.
    pub fn dset(&self, key: &str, items: HashMap<String, String>) -> ClientResult<()> {
        self.setter(Op::DSet, key, None, Some(&Value::Dict(items)), 0)
    }

    /// Writes a single dict entry by field name.
    pub fn dseti(&self, key: &str, field: &str, value: &str) -> ClientResult<()> {
        self.setter(
            Op::DSetI,
            key,
            Some(field.to_string()),
            Some(&Value::Str(value.to_string())),
            0,
        )
    }

    /// Fetches the full dict for a key.
    pub fn dget(&self, key: &str) -> ClientResult<Option<HashMap<String, String>>> {
        Ok(self.getter(Op::DGet, key, None)?.map(into_dict))
    }

    /// Fetches a single dict entry by field name.
    pub fn dgeti(&self, key: &str, field: &str) -> ClientResult<Option<String>> {
        Ok(self.getter(Op::DGetI, key, Some(field.to_string()))?.map(into_str))
    }

    /// Lists the field names of a dict, in no particular order.
    pub fn dkeys(&self, key: &str) -> ClientResult<Option<Vec<String>>> {
        Ok(self.getter(Op::DKeys, key, None)?.map(into_list))
    }

    fn getter(&self, op: Op, key: &str, idx: Option<String>) -> ClientResult<Option<Value>> {
        let url = self.url(op, key, idx, 0);
        let resp = self.http.get(url).send()?;
        self.decode_optional(resp)
    }

    fn setter(
        &self,
        op: Op,
        key: &str,
        idx: Option<String>,
        value: Option<&Value>,
        ttl_secs: u64,
    ) -> ClientResult<()> {
        let url = self.url(op, key, idx, ttl_secs);
        let mut request = self.http.post(url).header("content-type", "application/json");
        if let Some(value) = value {
            let body = serde_json::to_vec(value).map_err(ClientError::Decode)?;
            request = request.body(body);
        }
        let resp = request.send()?;
        self.decode_optional(resp)?;
        Ok(())
    }

    fn url(&self, op: Op, key: &str, idx: Option<String>, ttl_secs: u64) -> String {
        let mut url = format!("{}/{}/{}", self.base_url, op.as_str(), urlencoding_encode(key));
        if let Some(idx) = idx {
            url.push('/');
            url.push_str(&urlencoding_encode(&idx));
        }
        if ttl_secs > 0 {
            url.push_str("?ttl=");
            url.push_str(&ttl_secs.to_string());
        }
        url
    }

    fn decode_optional(&self, resp: reqwest::blocking::Response) -> ClientResult<Option<Value>> {
        let status = resp.status();
        if status.as_u16() == 204 {
            return Ok(None);
        }
        if status.is_success() {
            let bytes = resp.bytes()?;
            let value: Value = serde_json::from_slice(&bytes).map_err(ClientError::Decode)?;
            return Ok(Some(value));
        }
        let status_code = status.as_u16();
        let message = resp.text().unwrap_or_default();
        Err(ClientError::Server { status: status_code, message })
    }
}

fn into_str(v: Value) -> String {
    v.as_str().map(str::to_string).unwrap_or_default()
}

fn into_list(v: Value) -> Vec<String> {
    v.as_list().map(<[String]>::to_vec).unwrap_or_default()
}

fn into_dict(v: Value) -> HashMap<String, String> {
    v.as_dict().cloned().unwrap_or_default()
}

fn urlencoding_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char);
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_builds_with_index_and_ttl() {
        let client = KVClient::connect("http://localhost:8080").unwrap();
        let url = client.url(Op::LSetI, "my key", Some("2".to_string()), 30);
        assert_eq!(url, "http://localhost:8080/lseti/my%20key/2?ttl=30");
    }

    #[test]
    fn url_omits_ttl_when_zero() {
        let client = KVClient::connect("http://localhost:8080").unwrap();
        let url = client.url(Op::Get, "k", None, 0);
        assert_eq!(url, "http://localhost:8080/get/k");
    }
}
