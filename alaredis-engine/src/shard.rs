//! # Shard Requests and Workers
//!
//! A [`ShardRequest`] is the Rust rendering of the Go source's
//! `innerRequest`: an operation, a key, optional index/value/ttl, the
//! request's already-resolved [`KeyMeta`] handle, and a single-slot response
//! channel pair. A [`ShardWorker`] owns exactly one bucket and the receiving
//! half of exactly one such queue; nothing else ever touches that bucket.
//!
//! Grounded on `storage.go`'s `innerRequest` / `storage-bucket.go`'s
//! channel-actor bucket variant.

use std::collections::HashMap;
use std::sync::Arc;

use alaredis_common::{EngineError, Op, Value};
use tokio::sync::{mpsc, oneshot};
use tracing::trace;

use crate::key_meta::KeyMeta;
use crate::ops;
use crate::registry::KeyRegistry;
use crate::ttl::TtlMonitor;

/// A request destined for exactly one shard, carrying the response channel
/// pair described in the specification: at most one of `result_tx`,
/// `error_tx` is ever used.
pub struct ShardRequest {
    pub op: Op,
    pub key: String,
    pub meta: Arc<KeyMeta>,
    pub idx: Option<String>,
    pub val: Option<Value>,
    pub ttl: u64,
    pub result_tx: oneshot::Sender<Option<Value>>,
    pub error_tx: oneshot::Sender<EngineError>,
}

impl ShardRequest {
    pub(crate) fn respond_ok(self, value: Option<Value>) {
        let _ = self.result_tx.send(value);
    }

    pub(crate) fn respond_err(self, err: EngineError) {
        let _ = self.error_tx.send(err);
    }
}

/// An administrative message a shard worker accepts alongside ordinary
/// requests. `Snapshot` lets the persister read a consistent copy of the
/// bucket without a second locking discipline: since the worker is the only
/// mutator, servicing the request from inside its own loop is automatically
/// torn-read-free.
pub enum ShardMessage {
    Request(ShardRequest),
    Snapshot(oneshot::Sender<Vec<(String, Value)>>),
}

/// Runs one shard worker to completion. Exits when the channel is closed
/// (all senders dropped), finishing any request already dequeued first.
pub async fn run_shard_worker(
    index: usize,
    mut inbound: mpsc::Receiver<ShardMessage>,
    registry: Arc<KeyRegistry>,
    ttl: TtlMonitor,
) {
    let mut bucket: HashMap<String, Value> = HashMap::new();

    while let Some(message) = inbound.recv().await {
        match message {
            ShardMessage::Request(req) => {
                trace!(shard = index, op = %req.op, key = %req.key, "dispatching");
                ops::handle(req, &mut bucket, &registry, &ttl).await;
            }
            ShardMessage::Snapshot(tx) => {
                let items = bucket
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                let _ = tx.send(items);
            }
        }
    }
}
