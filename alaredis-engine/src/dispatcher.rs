//! # Operation Dispatcher
//!
//! The engine-facing entry point: [`Dispatcher::build`] resolves or creates
//! a key's metadata and assembles a [`ShardRequest`]; [`Dispatcher::dispatch`]
//! enqueues it on the owning shard. Cloning a `Dispatcher` is cheap — every
//! clone shares the same registry and shard queues, which is what lets the
//! TTL monitor's expiration callback enqueue synthesized deletes without a
//! circular ownership edge back into [`Storage`](crate::storage::Storage).
//!
//! Grounded on `storage.go`'s `newInnerRequest` / `processInnerRequest` pair.

use std::sync::Arc;

use alaredis_common::{EngineError, Op, Value};
use tokio::sync::{mpsc, oneshot};

use crate::key_meta::KeyMeta;
use crate::registry::KeyRegistry;
use crate::shard::{ShardMessage, ShardRequest};
use crate::ttl::ExpireCallback;

/// A fully-built request paired with the receiving halves of its response
/// channels, ready for a caller to await.
pub struct BuiltRequest {
    pub message: ShardMessage,
    pub result_rx: oneshot::Receiver<Option<Value>>,
    pub error_rx: oneshot::Receiver<EngineError>,
    pub shard: usize,
}

#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<KeyRegistry>,
    shard_txs: Arc<Vec<mpsc::Sender<ShardMessage>>>,
}

impl Dispatcher {
    pub(crate) fn new(registry: Arc<KeyRegistry>, shard_txs: Vec<mpsc::Sender<ShardMessage>>) -> Self {
        Dispatcher {
            registry,
            shard_txs: Arc::new(shard_txs),
        }
    }

    pub fn shard_count(&self) -> usize {
        self.shard_txs.len()
    }

    /// Resolves or speculatively creates metadata for `key`, computes its
    /// shard, and builds a request with a fresh response channel pair.
    ///
    /// The returned metadata is advisory for the caller: the owning shard
    /// worker re-checks the tag itself before acting, so a lookup racing a
    /// concurrent setter never produces a wrong answer, only a request that
    /// gets re-evaluated against current state.
    pub async fn build(
        &self,
        op: Op,
        key: impl Into<String>,
        idx: Option<String>,
        val: Option<Value>,
        ttl: u64,
    ) -> BuiltRequest {
        let key = key.into();
        let meta = match self.registry.get(&key).await {
            Some(meta) => meta,
            None => Arc::new(KeyMeta::new(key.clone())),
        };
        let shard = (meta.hash() as usize) % self.shard_txs.len();

        let (result_tx, result_rx) = oneshot::channel();
        let (error_tx, error_rx) = oneshot::channel();
        let request = ShardRequest {
            op,
            key,
            meta,
            idx,
            val,
            ttl,
            result_tx,
            error_tx,
        };

        BuiltRequest {
            message: ShardMessage::Request(request),
            result_rx,
            error_rx,
            shard,
        }
    }

    /// Enqueues a built request on its owning shard. Blocks if that shard's
    /// queue is full — the engine's only form of admission control.
    pub async fn dispatch(&self, built: BuiltRequest) -> Result<(), ()> {
        self.shard_txs[built.shard]
            .send(built.message)
            .await
            .map_err(|_| ())
    }

    /// Convenience wrapper combining build, dispatch, and awaiting the
    /// response, for callers that don't need to interleave the steps (the
    /// HTTP front door and the client-facing engine API both want this).
    pub async fn call(
        &self,
        op: Op,
        key: impl Into<String>,
        idx: Option<String>,
        val: Option<Value>,
        ttl: u64,
    ) -> Result<Option<Value>, EngineError> {
        let built = self.build(op, key, idx, val, ttl).await;
        let BuiltRequest {
            message,
            mut result_rx,
            mut error_rx,
            shard,
        } = built;
        if self.shard_txs[shard].send(message).await.is_err() {
            return Err(EngineError::internal("Shard worker is no longer running"));
        }
        tokio::select! {
            result = &mut result_rx => match result {
                Ok(val) => Ok(val),
                Err(_) => match error_rx.await {
                    Ok(err) => Err(err),
                    Err(_) => Err(EngineError::internal("Shard worker dropped the request without responding")),
                },
            },
            err = &mut error_rx => match err {
                Ok(err) => Err(err),
                Err(_) => match result_rx.await {
                    Ok(val) => Ok(val),
                    Err(_) => Err(EngineError::internal("Shard worker dropped the request without responding")),
                },
            },
        }
    }

    /// Reads a shard's bucket contents through its normal queue. Used only
    /// by the snapshot persister; never exposed to client-facing code.
    pub async fn snapshot_shard(&self, shard: usize) -> Vec<(String, Value)> {
        let (tx, rx) = oneshot::channel();
        if self.shard_txs[shard]
            .send(ShardMessage::Snapshot(tx))
            .await
            .is_err()
        {
            return Vec::new();
        }
        rx.await.unwrap_or_default()
    }
}

impl ExpireCallback for Dispatcher {
    fn on_expire(&self, meta: Arc<KeyMeta>) {
        let dispatcher = self.clone();
        tokio::spawn(async move {
            // Fire-and-forget: the TTL monitor's synthesized DELETE swallows
            // any error silently, matching the specification's note that
            // deleting an already-absent key is a no-op.
            let _ = dispatcher.call(Op::Delete, meta.key().to_string(), None, None, 0).await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Storage;

    #[tokio::test]
    async fn shard_assignment_is_stable_across_calls() {
        let storage = Storage::new(8);
        storage.run();
        let d = storage.dispatcher();

        let first = d.build(Op::Get, "repeatable-key", None, None, 0).await.shard;
        let second = d.build(Op::Get, "repeatable-key", None, None, 0).await.shard;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn distinct_keys_can_land_on_distinct_shards() {
        let storage = Storage::new(4);
        storage.run();
        let d = storage.dispatcher();

        let mut shards = std::collections::HashSet::new();
        for i in 0..64 {
            let built = d.build(Op::Get, format!("key-{i}"), None, None, 0).await;
            shards.insert(built.shard);
        }
        assert!(shards.len() > 1, "expected keys to spread across more than one shard");
    }
}
