//! # Key Metadata
//!
//! Every key known to the store has exactly one [`KeyMeta`], shared between
//! the key registry and every in-flight shard request that touches the key.
//! Sharing the same `Arc` means a shard worker always sees the tag as it
//! stood at registry-commit time, not a snapshot taken when the request was
//! built — closing the type-confusion race the Go source is exposed to
//! (a request built against a stale tag would otherwise race a concurrent
//! `SET` to the same key).
//!
//! Grounded on `keyMeta` in `storage.go` (key, hash, type) and on the
//! `Arc`-shared-handle pattern the teacher uses for cache entries in
//! `hkv-engine/src/memory.rs`.

use std::sync::atomic::{AtomicU8, Ordering};

use alaredis_common::Tag;

/// Per-key metadata: a stable hash used for sharding, and the tag recording
/// which value shape (if any) has been committed for the key.
#[derive(Debug)]
pub struct KeyMeta {
    key: String,
    hash: u32,
    tag: AtomicU8,
}

impl KeyMeta {
    /// Builds a fresh, uncommitted `KeyMeta` for `key` (tag `NONE`).
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        let hash = fnv1a32(key.as_bytes());
        KeyMeta {
            key,
            hash,
            tag: AtomicU8::new(Tag::None as u8),
        }
    }

    /// The key this metadata describes.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The stable hash used to pick this key's shard.
    pub fn hash(&self) -> u32 {
        self.hash
    }

    /// The shape tag committed for this key, as of this instant.
    pub fn tag(&self) -> Tag {
        match self.tag.load(Ordering::Acquire) {
            1 => Tag::String,
            2 => Tag::List,
            3 => Tag::Dict,
            _ => Tag::None,
        }
    }

    /// Commits a new shape tag for this key.
    pub fn set_tag(&self, tag: Tag) {
        self.tag.store(tag as u8, Ordering::Release);
    }
}

/// A 32-bit FNV-1a hash, stable across process runs (unlike `HashMap`'s
/// default `SipHash`, which is randomly seeded per process). Sharding must
/// be stable for a key's whole lifetime, so we don't reuse the stdlib hasher.
fn fnv1a32(bytes: &[u8]) -> u32 {
    const OFFSET_BASIS: u32 = 0x811c_9dc5;
    const PRIME: u32 = 0x0100_0193;
    let mut hash = OFFSET_BASIS;
    for &b in bytes {
        hash ^= b as u32;
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_stable_for_same_key() {
        let a = KeyMeta::new("alpha");
        let b = KeyMeta::new("alpha");
        assert_eq!(a.hash(), b.hash());
    }

    #[test]
    fn fresh_meta_has_no_tag() {
        let m = KeyMeta::new("k");
        assert_eq!(m.tag(), Tag::None);
    }

    #[test]
    fn set_tag_is_visible_immediately() {
        let m = KeyMeta::new("k");
        m.set_tag(Tag::List);
        assert_eq!(m.tag(), Tag::List);
    }
}
