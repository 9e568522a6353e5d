//! # Storage
//!
//! The engine's top-level handle: owns the shard channels before they are
//! handed to their workers, the key registry, and the TTL monitor. Mirrors
//! the external interface named in the specification (`NewStorage`, `run`),
//! adapted to Rust ownership: `run` consumes the receivers built in `new`
//! and spawns one task per shard plus the TTL monitor's two tasks.
//!
//! Grounded on `storage.go`'s `NewStorage` / `(*Storage).run`.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use crate::dispatcher::Dispatcher;
use crate::registry::KeyRegistry;
use crate::shard::{run_shard_worker, ShardMessage};
use crate::ttl::TtlMonitor;

/// Bounded capacity of each shard's inbound queue (specification §3: "e.g.
/// 100").
const SHARD_QUEUE_CAPACITY: usize = 100;

pub struct Storage {
    bucket_count: usize,
    registry: Arc<KeyRegistry>,
    shard_rxs: Mutex<Option<Vec<mpsc::Receiver<ShardMessage>>>>,
    dispatcher: Dispatcher,
    ttl: Mutex<Option<TtlMonitor>>,
}

impl Storage {
    /// Builds an engine with `bucket_count` shards. Does not start any
    /// worker tasks yet — call [`Storage::run`] for that.
    pub fn new(bucket_count: usize) -> Arc<Storage> {
        assert!(bucket_count > 0, "bucket_count must be at least 1");

        let mut shard_txs = Vec::with_capacity(bucket_count);
        let mut shard_rxs = Vec::with_capacity(bucket_count);
        for _ in 0..bucket_count {
            let (tx, rx) = mpsc::channel(SHARD_QUEUE_CAPACITY);
            shard_txs.push(tx);
            shard_rxs.push(rx);
        }

        let registry = Arc::new(KeyRegistry::new());
        let dispatcher = Dispatcher::new(registry.clone(), shard_txs);

        Arc::new(Storage {
            bucket_count,
            registry,
            shard_rxs: Mutex::new(Some(shard_rxs)),
            dispatcher,
            ttl: Mutex::new(None),
        })
    }

    /// Starts every shard worker and the TTL monitor's two tasks. Panics if
    /// called more than once on the same `Storage`.
    pub fn run(self: &Arc<Storage>) {
        let mut guard = self.shard_rxs.lock().expect("shard_rxs lock poisoned");
        let receivers = guard.take().expect("Storage::run called more than once");
        drop(guard);

        let ttl = TtlMonitor::spawn(self.bucket_count * 2, Arc::new(self.dispatcher.clone()));

        for (index, rx) in receivers.into_iter().enumerate() {
            tokio::spawn(run_shard_worker(index, rx, self.registry.clone(), ttl.clone()));
        }

        *self.ttl.lock().expect("ttl lock poisoned") = Some(ttl);
    }

    /// The dispatcher used to build and route requests.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Handle to the TTL monitor. Used by the snapshot persister to read the
    /// current expire-at schedule; not part of the client-visible engine
    /// API. Panics if called before [`Storage::run`].
    pub fn ttl(&self) -> TtlMonitor {
        self.ttl
            .lock()
            .expect("ttl lock poisoned")
            .clone()
            .expect("Storage::run must be called before Storage::ttl")
    }

    /// Number of shards this engine was built with.
    pub fn bucket_count(&self) -> usize {
        self.bucket_count
    }
}
