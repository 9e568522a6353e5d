//! # Stored Value Shapes
//!
//! A value is one of three shapes: a string, an ordered list of strings, or a
//! string-to-string dict. The engine never coerces between them — the tag
//! recorded in the key registry must always agree with the variant actually
//! stored in the owning shard's bucket (invariant 2 of the specification).
//!
//! Grounded on the three-shape split already present in the pack's
//! `kv-core::storage_struct::Value` enum, narrowed to the shapes this system
//! supports (no `Set`/`ZSet` — those belong to a different system).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A stored value, tagged by its shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// A scalar string value.
    Str(String),
    /// An ordered sequence of strings, indexed 0..len-1.
    List(Vec<String>),
    /// A mapping from string key to string value.
    Dict(HashMap<String, String>),
}

impl Value {
    /// Returns the shape tag that corresponds to this value's variant.
    pub fn tag(&self) -> Tag {
        match self {
            Value::Str(_) => Tag::String,
            Value::List(_) => Tag::List,
            Value::Dict(_) => Tag::Dict,
        }
    }

    /// Returns the inner string, or `None` if this value is not a `Str`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the inner list, or `None` if this value is not a `List`.
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    /// Returns a mutable reference to the inner list, or `None` otherwise.
    pub fn as_list_mut(&mut self) -> Option<&mut Vec<String>> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    /// Returns the inner dict, or `None` if this value is not a `Dict`.
    pub fn as_dict(&self) -> Option<&HashMap<String, String>> {
        match self {
            Value::Dict(d) => Some(d),
            _ => None,
        }
    }

    /// Returns a mutable reference to the inner dict, or `None` otherwise.
    pub fn as_dict_mut(&mut self) -> Option<&mut HashMap<String, String>> {
        match self {
            Value::Dict(d) => Some(d),
            _ => None,
        }
    }
}

/// The type tag recorded in key metadata, agreeing with the concrete value
/// shape stored in the owning bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Tag {
    /// No value has been committed for this key yet.
    None = 0,
    /// A scalar string.
    String = 1,
    /// An ordered list of strings.
    List = 2,
    /// A string-to-string dict.
    Dict = 3,
}

impl Tag {
    /// Returns a short, human-readable name for the tag (used in diagnostics).
    pub const fn label(self) -> &'static str {
        match self {
            Tag::None => "none",
            Tag::String => "string",
            Tag::List => "list",
            Tag::Dict => "dict",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_agrees_with_variant() {
        assert_eq!(Value::Str("x".into()).tag(), Tag::String);
        assert_eq!(Value::List(vec![]).tag(), Tag::List);
        assert_eq!(Value::Dict(HashMap::new()).tag(), Tag::Dict);
    }

    #[test]
    fn accessors_reject_wrong_shape() {
        let v = Value::Str("x".into());
        assert!(v.as_list().is_none());
        assert!(v.as_dict().is_none());
        assert_eq!(v.as_str(), Some("x"));
    }
}
