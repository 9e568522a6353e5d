//! # Operation Code Set
//!
//! The closed, stably-ordered set of operations a client can issue against a
//! single key. Mirrors the Go source's `OP_*` `iota` block one-to-one so the
//! wire-level op names stay legible against the original.

use std::fmt;

/// One of the twelve supported key operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Delete,
    Set,
    Get,
    LSet,
    LSetI,
    LGet,
    LGetI,
    DSet,
    DSetI,
    DGet,
    DGetI,
    DKeys,
}

impl Op {
    /// All operations, in the stable order used for dispatch tables.
    pub const ALL: [Op; 12] = [
        Op::Delete,
        Op::Set,
        Op::Get,
        Op::LSet,
        Op::LSetI,
        Op::LGet,
        Op::LGetI,
        Op::DSet,
        Op::DSetI,
        Op::DGet,
        Op::DGetI,
        Op::DKeys,
    ];

    /// Returns the lowercase URL segment for the operation (`/<op>/<key>`).
    pub const fn as_str(self) -> &'static str {
        match self {
            Op::Delete => "delete",
            Op::Set => "set",
            Op::Get => "get",
            Op::LSet => "lset",
            Op::LSetI => "lseti",
            Op::LGet => "lget",
            Op::LGetI => "lgeti",
            Op::DSet => "dset",
            Op::DSetI => "dseti",
            Op::DGet => "dget",
            Op::DGetI => "dgeti",
            Op::DKeys => "dkeys",
        }
    }

    /// Parses a URL segment into an operation, case-insensitively.
    pub fn parse(segment: &str) -> Option<Op> {
        Op::ALL
            .into_iter()
            .find(|op| op.as_str().eq_ignore_ascii_case(segment))
    }

    /// Returns true if the operation requires an `<idx>` path segment.
    pub const fn requires_index(self) -> bool {
        matches!(self, Op::LSetI | Op::LGetI | Op::DSetI | Op::DGetI)
    }

    /// Returns true if the operation is a read-only getter (served over HTTP GET).
    pub const fn is_getter(self) -> bool {
        matches!(
            self,
            Op::Get | Op::LGet | Op::LGetI | Op::DGet | Op::DGetI | Op::DKeys
        )
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_url_segment() {
        for op in Op::ALL {
            assert_eq!(Op::parse(op.as_str()), Some(op));
        }
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(Op::parse("GET"), Some(Op::Get));
        assert_eq!(Op::parse("DSetI"), Some(Op::DSetI));
    }

    #[test]
    fn unknown_segment_is_none() {
        assert_eq!(Op::parse("frobnicate"), None);
    }

    #[test]
    fn index_requirement_matches_spec_table() {
        assert!(Op::LSetI.requires_index());
        assert!(Op::LGetI.requires_index());
        assert!(Op::DSetI.requires_index());
        assert!(Op::DGetI.requires_index());
        assert!(!Op::Set.requires_index());
        assert!(!Op::DKeys.requires_index());
    }

    #[test]
    fn getter_classification_matches_spec_table() {
        assert!(Op::Get.is_getter());
        assert!(Op::DKeys.is_getter());
        assert!(!Op::Set.is_getter());
        assert!(!Op::Delete.is_getter());
    }
}
