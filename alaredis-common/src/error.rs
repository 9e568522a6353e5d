//! # Engine Error Taxonomy
//!
//! ## Design Principles
//!
//! 1. **Closed Set**: Exactly three kinds, matching the three ways a handler can
//!    fail (§7 of the specification this crate implements).
//! 2. **Stable Shape**: Each variant carries only the data needed to render a
//!    human-readable diagnostic; no internal request state leaks into it.
//! 3. **Never Retried**: The engine does not retry handler errors itself; callers
//!    (the HTTP front door) decide what to do with them.

use thiserror::Error;

/// Result type used across the engine and its callers.
pub type EngineResult<T> = Result<T, EngineError>;

/// The closed set of failures a shard worker can hand back on a request's error
/// channel.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Raised by a getter when the key's tag is `NONE` (the key is unknown).
    #[error("Object not found for key '{key}'")]
    NotFound {
        /// The key that was not found.
        key: String,
    },

    /// Raised for wrong value shape, wrong stored shape, non-integer index,
    /// out-of-range list index, missing dict index, or a malformed request.
    #[error("{message}")]
    BadRequest {
        /// Short diagnostic describing what was wrong with the request.
        message: String,
    },

    /// Any unexpected condition, e.g. a codec failure composing a response.
    #[error("{message}")]
    Internal {
        /// Short diagnostic describing the unexpected condition.
        message: String,
    },
}

impl EngineError {
    /// Builds a `NotFound` error for the given key.
    pub fn not_found(key: impl Into<String>) -> Self {
        EngineError::NotFound { key: key.into() }
    }

    /// Builds a `BadRequest` error with the given diagnostic message.
    pub fn bad_request(message: impl Into<String>) -> Self {
        EngineError::BadRequest {
            message: message.into(),
        }
    }

    /// Builds an `Internal` error with the given diagnostic message.
    pub fn internal(message: impl Into<String>) -> Self {
        EngineError::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this error should be surfaced as HTTP 404.
    pub fn is_not_found(&self) -> bool {
        matches!(self, EngineError::NotFound { .. })
    }

    /// Returns true if this error should be surfaced as HTTP 400.
    pub fn is_bad_request(&self) -> bool {
        matches!(self, EngineError::BadRequest { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_matches_go_source_wording() {
        let err = EngineError::not_found("test key");
        assert_eq!(err.to_string(), "Object not found for key 'test key'");
    }

    #[test]
    fn classification_helpers() {
        assert!(EngineError::not_found("k").is_not_found());
        assert!(EngineError::bad_request("nope").is_bad_request());
        assert!(!EngineError::internal("boom").is_not_found());
    }
}
