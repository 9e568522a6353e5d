//! # Snapshot Persister
//!
//! Dumps the engine's contents to disk and restores them at startup.
//! Grounded on `persister.go`'s `storedItem{K,V,E}` / `restore` / `persist`,
//! reusing `alaredis-codec`'s length-prefixed binary framing for each
//! record instead of `encoding/gob` (no Rust equivalent in the pack's
//! dependency stack, and the framing is already shared with the binary body
//! codec).
//!
//! **Deviation from the Go source.** `persister.go` forks the process
//! (`syscall.SYS_FORK`) so the dump runs against a point-in-time copy of the
//! address space without blocking the live server. Forking a multithreaded
//! `tokio` process is unsound (only the forking thread survives in the
//! child; the runtime's other worker threads simply vanish). Instead, each
//! shard is asked for its bucket contents through its own request queue
//! (`Dispatcher::snapshot_shard`), so reading it never races that shard's
//! writer, and the read runs on a `spawn_blocking` thread so file I/O never
//! stalls the async runtime.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use alaredis_codec::binary::{read_frames, write_frame};
use alaredis_common::{Op, Value};
use alaredis_engine::Storage;
use anyhow::{Context, Result};
use bytes::BytesMut;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// One persisted record: key, value, and absolute expire-at (0 = none).
/// The Rust name for the Go source's `storedItem`.
#[derive(Debug, Serialize, Deserialize)]
struct StoredItem {
    key: String,
    value: Value,
    expire_at: i64,
}

/// Writes every live key in `storage` to a timestamped file under `dir`.
pub async fn persist(storage: &Arc<Storage>, dir: impl AsRef<Path>) -> Result<PathBuf> {
    let dir = dir.as_ref().to_path_buf();
    let ttl_snapshot = storage.ttl().snapshot().await;

    let mut items = Vec::new();
    for shard in 0..storage.bucket_count() {
        for (key, value) in storage.dispatcher().snapshot_shard(shard).await {
            let expire_at = ttl_snapshot.get(&key).copied().unwrap_or(0);
            items.push(StoredItem { key, value, expire_at });
        }
    }

    let file_name = format!("cached-data-{}.bin", now_unix());
    let path = dir.join(file_name);
    let count = items.len();

    tokio::task::spawn_blocking({
        let path = path.clone();
        move || write_items(&path, &items)
    })
    .await
    .context("persist task panicked")??;

    info!(path = %path.display(), count, "persisted snapshot to disk");
    Ok(path)
}

/// Restores every item in `path` into `storage`, dropping items whose TTL
/// has already lapsed (Go source: `item.E == 0 || ttl > 0`).
pub async fn restore(storage: &Arc<Storage>, path: impl AsRef<Path>) -> Result<usize> {
    let path = path.as_ref().to_path_buf();
    let items = tokio::task::spawn_blocking({
        let path = path.clone();
        move || read_items(&path)
    })
    .await
    .context("restore task panicked")??;

    let now = now_unix();
    let mut restored = 0;
    for item in items {
        let remaining_ttl = if item.expire_at == 0 {
            0
        } else {
            let remaining = item.expire_at - now;
            if remaining <= 0 {
                continue;
            }
            remaining as u64
        };

        let op = match &item.value {
            Value::Str(_) => Op::Set,
            Value::List(_) => Op::LSet,
            Value::Dict(_) => Op::DSet,
        };
        storage
            .dispatcher()
            .call(op, item.key, None, Some(item.value), remaining_ttl)
            .await
            .ok();
        restored += 1;
    }

    info!(path = %path.display(), restored, "restored snapshot from disk");
    Ok(restored)
}

fn write_items(path: &Path, items: &[StoredItem]) -> Result<()> {
    let mut out = BytesMut::new();
    for item in items {
        let encoded = serde_json::to_string(item).context("encoding stored item")?;
        write_frame(&mut out, &encoded);
    }
    std::fs::write(path, &out).with_context(|| format!("writing snapshot to {}", path.display()))
}

fn read_items(path: &Path) -> Result<Vec<StoredItem>> {
    let bytes = std::fs::read(path).with_context(|| format!("reading snapshot {}", path.display()))?;
    let frames = read_frames(&bytes).context("parsing snapshot framing")?;
    frames
        .iter()
        .map(|frame| serde_json::from_str(frame).context("decoding stored item"))
        .collect()
}

fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_secs() as i64
}
