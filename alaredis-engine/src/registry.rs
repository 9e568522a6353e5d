//! # Key Registry
//!
//! The process-wide map from key to [`KeyMeta`]. Many readers build requests
//! concurrently (`get`); exactly one shard worker ever commits a change for a
//! given key, but different keys route to different shards, so commits to
//! distinct keys happen concurrently too — hence a reader/writer lock rather
//! than the bucket's own single-writer discipline.
//!
//! Grounded on `metaLock sync.RWMutex` / `getKeyMeta` / `setKeyMeta` in
//! `storage.go`.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::key_meta::KeyMeta;

/// Shared key -> metadata map.
#[derive(Debug, Default)]
pub struct KeyRegistry {
    entries: RwLock<HashMap<String, Arc<KeyMeta>>>,
}

impl KeyRegistry {
    /// Builds an empty registry.
    pub fn new() -> Self {
        KeyRegistry {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Looks up the metadata committed for `key`, if any.
    pub async fn get(&self, key: &str) -> Option<Arc<KeyMeta>> {
        self.entries.read().await.get(key).cloned()
    }

    /// Commits `meta` under its own key, overwriting any prior entry.
    ///
    /// Call this only after the owning shard worker has written the matching
    /// value into its bucket and updated `meta`'s tag — a reader that wins a
    /// race against `get` must never observe a tag without the value behind
    /// it.
    pub async fn insert(&self, meta: Arc<KeyMeta>) {
        let key = meta.key().to_string();
        self.entries.write().await.insert(key, meta);
    }

    /// Removes the committed metadata for `key`, if any.
    pub async fn remove(&self, key: &str) -> Option<Arc<KeyMeta>> {
        self.entries.write().await.remove(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alaredis_common::Tag;

    #[tokio::test]
    async fn insert_then_get_round_trips() {
        let registry = KeyRegistry::new();
        let meta = Arc::new(KeyMeta::new("k"));
        meta.set_tag(Tag::String);
        registry.insert(meta.clone()).await;

        let found = registry.get("k").await.expect("present");
        assert_eq!(found.tag(), Tag::String);
    }

    #[tokio::test]
    async fn remove_drops_the_entry() {
        let registry = KeyRegistry::new();
        registry.insert(Arc::new(KeyMeta::new("k"))).await;
        assert!(registry.remove("k").await.is_some());
        assert!(registry.get("k").await.is_none());
    }

    #[tokio::test]
    async fn unknown_key_is_none() {
        let registry = KeyRegistry::new();
        assert!(registry.get("ghost").await.is_none());
    }
}
