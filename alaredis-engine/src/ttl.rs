//! # TTL Monitor
//!
//! Tracks, for every monitored key, the instant its value stops being valid,
//! and invokes a callback when that instant arrives. The callback the engine
//! wires up is "enqueue a DELETE for this key through the dispatcher" (see
//! [`crate::dispatcher::Dispatcher`]), so expirations land on the same queue,
//! and therefore the same serialization point, as ordinary requests.
//!
//! Grounded on `key-expiration-monitor.go` / `ttl-monitor.go`'s two
//! cooperating goroutines (`keyExpireAt` / `expireAtKeys` / `expireAtList` /
//! `applicationChan` / `updateChan`). The two goroutines there share their
//! maps through Go's implicit single-owner-via-channel discipline; the
//! direct Rust rendering of "two activities touching the same maps" is a
//! short-held `std::sync::Mutex` around the combined schedule rather than two
//! independently-synchronized structures, since no `.await` ever happens
//! while the lock is held.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::{mpsc, oneshot, Notify};
use tracing::debug;

use crate::key_meta::KeyMeta;

/// Invoked by the expiration waiter when a monitored key's time is up, and by
/// the application processor when an explicit unmonitor fires an equivalent
/// cleanup (see the note on [`apply`]). Modeled as a small trait object
/// injected at construction rather than a circular ownership edge between
/// the monitor and the dispatcher.
pub trait ExpireCallback: Send + Sync {
    fn on_expire(&self, meta: Arc<KeyMeta>);
}

impl<F> ExpireCallback for F
where
    F: Fn(Arc<KeyMeta>) + Send + Sync,
{
    fn on_expire(&self, meta: Arc<KeyMeta>) {
        (self)(meta)
    }
}

/// A pending change to a key's expire-at, consumed by the application
/// processor. `new_expire_at == 0` means "unmonitor".
struct Application {
    meta: Arc<KeyMeta>,
    new_expire_at: i64,
}

enum Command {
    Apply(Application),
    /// Used only by the snapshot persister to read the current schedule
    /// without reaching into the monitor's private state directly.
    Snapshot(oneshot::Sender<HashMap<String, i64>>),
    /// Returns the sorted list of distinct expire-at instants currently
    /// scheduled, for diagnostics and tests of invariant 4/9.
    Instants(oneshot::Sender<Vec<i64>>),
}

/// The three structures described in the specification, combined into one
/// lock since they are always mutated together.
#[derive(Default)]
struct Schedule {
    key_expire_at: HashMap<String, i64>,
    expire_at_keys: HashMap<i64, HashMap<String, Arc<KeyMeta>>>,
}

impl Schedule {
    fn remove_key_from_instant(&mut self, key: &str, at: i64) {
        if let Some(set) = self.expire_at_keys.get_mut(&at) {
            set.remove(key);
            if set.is_empty() {
                self.expire_at_keys.remove(&at);
            }
        }
    }

    fn add_key_at_instant(&mut self, key: &str, at: i64, meta: Arc<KeyMeta>) {
        self.expire_at_keys
            .entry(at)
            .or_default()
            .insert(key.to_string(), meta);
    }

    fn earliest(&self) -> Option<i64> {
        self.expire_at_keys.keys().copied().min()
    }

    fn sorted_instants(&self) -> Vec<i64> {
        let mut v: Vec<i64> = self.expire_at_keys.keys().copied().collect();
        v.sort_unstable();
        v
    }
}

/// Handle to a running TTL monitor. Cloning is cheap; every clone shares the
/// same application queue and therefore the same underlying schedule.
#[derive(Clone)]
pub struct TtlMonitor {
    applications: mpsc::Sender<Command>,
}

impl TtlMonitor {
    /// Spawns the application processor and expiration waiter tasks and
    /// returns a handle to submit changes to them.
    ///
    /// `capacity` bounds the applications queue (sized, per the
    /// specification, so callers rarely block under normal load).
    pub fn spawn(capacity: usize, callback: Arc<dyn ExpireCallback>) -> TtlMonitor {
        let (tx, rx) = mpsc::channel(capacity);
        let schedule = Arc::new(Mutex::new(Schedule::default()));
        let update = Arc::new(Notify::new());
        let clock = Clock::anchor_now();

        tokio::spawn(run_application_processor(
            rx,
            schedule.clone(),
            update.clone(),
            callback.clone(),
        ));
        tokio::spawn(run_expiration_waiter(schedule, update, callback, clock));

        TtlMonitor { applications: tx }
    }

    /// Arms or re-arms this key's TTL. `ttl_secs == 0` clears any existing
    /// TTL (the value becomes permanent), matching "(re)arm TTL" for setter
    /// operations in the operation semantics table.
    pub async fn monitor(&self, meta: Arc<KeyMeta>, ttl_secs: u64) {
        let new_expire_at = if ttl_secs == 0 {
            0
        } else {
            now_unix() + ttl_secs as i64
        };
        self.apply(meta, new_expire_at).await;
    }

    /// Clears any TTL tracked for this key. Called by DELETE so a key that
    /// is deleted out-of-band never lingers in the expiration schedule.
    pub async fn unmonitor(&self, meta: Arc<KeyMeta>) {
        self.apply(meta, 0).await;
    }

    /// Returns a snapshot of every currently-monitored key's expire-at,
    /// keyed by key string. Used by the snapshot persister; not part of the
    /// client-visible operation set.
    pub async fn snapshot(&self) -> HashMap<String, i64> {
        let (tx, rx) = oneshot::channel();
        if self.applications.send(Command::Snapshot(tx)).await.is_err() {
            return HashMap::new();
        }
        rx.await.unwrap_or_default()
    }

    /// Returns the sorted list of distinct expire-at instants currently
    /// scheduled (the Rust rendering of `expireAtList`).
    pub async fn sorted_instants(&self) -> Vec<i64> {
        let (tx, rx) = oneshot::channel();
        if self.applications.send(Command::Instants(tx)).await.is_err() {
            return Vec::new();
        }
        rx.await.unwrap_or_default()
    }

    async fn apply(&self, meta: Arc<KeyMeta>, new_expire_at: i64) {
        let _ = self
            .applications
            .send(Command::Apply(Application {
                meta,
                new_expire_at,
            }))
            .await;
    }
}

async fn run_application_processor(
    mut rx: mpsc::Receiver<Command>,
    schedule: Arc<Mutex<Schedule>>,
    update: Arc<Notify>,
    callback: Arc<dyn ExpireCallback>,
) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            Command::Apply(app) => {
                let key = app.meta.key().to_string();
                let fired = {
                    let mut sched = schedule.lock().expect("ttl schedule lock poisoned");
                    let cur = sched.key_expire_at.get(&key).copied().unwrap_or(0);
                    let new = app.new_expire_at;
                    if new > 0 && new != cur {
                        if cur > 0 {
                            sched.remove_key_from_instant(&key, cur);
                        }
                        sched.add_key_at_instant(&key, new, app.meta.clone());
                        sched.key_expire_at.insert(key, new);
                        update.notify_one();
                        None
                    } else if cur > 0 && new == 0 {
                        sched.remove_key_from_instant(&key, cur);
                        sched.key_expire_at.remove(&key);
                        update.notify_one();
                        Some(app.meta.clone())
                    } else {
                        None
                    }
                };
                if let Some(meta) = fired {
                    debug!(key = meta.key(), "ttl: unmonitor fired expiration callback");
                    callback.on_expire(meta);
                }
            }
            Command::Snapshot(tx) => {
                let sched = schedule.lock().expect("ttl schedule lock poisoned");
                let _ = tx.send(sched.key_expire_at.clone());
            }
            Command::Instants(tx) => {
                let sched = schedule.lock().expect("ttl schedule lock poisoned");
                let _ = tx.send(sched.sorted_instants());
            }
        }
    }
}

async fn run_expiration_waiter(
    schedule: Arc<Mutex<Schedule>>,
    update: Arc<Notify>,
    callback: Arc<dyn ExpireCallback>,
    clock: Clock,
) {
    loop {
        let earliest = schedule.lock().expect("ttl schedule lock poisoned").earliest();

        match earliest {
            None => {
                update.notified().await;
            }
            Some(at) => {
                let deadline = clock.instant_for(at);
                tokio::select! {
                    _ = tokio::time::sleep_until(deadline) => {
                        let expired: Vec<Arc<KeyMeta>> = {
                            let mut sched = schedule.lock().expect("ttl schedule lock poisoned");
                            let keys = sched.expire_at_keys.remove(&at).unwrap_or_default();
                            for key in keys.keys() {
                                sched.key_expire_at.remove(key);
                            }
                            keys.into_values().collect()
                        };
                        for meta in expired {
                            debug!(key = meta.key(), "ttl: expiration fired");
                            callback.on_expire(meta);
                        }
                    }
                    _ = update.notified() => {
                        // Schedule changed under us; loop around and re-read it.
                    }
                }
            }
        }
    }
}

/// Anchors a unix-epoch timestamp to a `tokio` `Instant` taken at the same
/// moment, so later conversions stay correct under a paused/virtual clock
/// (as used by the `start_paused = true` tests below) instead of silently
/// re-deriving "time remaining" from the real wall clock on every
/// reschedule, which would desync from a virtual clock that jumps forward in
/// bulk.
#[derive(Clone, Copy)]
struct Clock {
    anchor_unix: i64,
    anchor_instant: tokio::time::Instant,
}

impl Clock {
    fn anchor_now() -> Self {
        Clock {
            anchor_unix: now_unix(),
            anchor_instant: tokio::time::Instant::now(),
        }
    }

    fn instant_for(&self, at_unix: i64) -> tokio::time::Instant {
        if at_unix <= self.anchor_unix {
            self.anchor_instant
        } else {
            self.anchor_instant + std::time::Duration::from_secs((at_unix - self.anchor_unix) as u64)
        }
    }
}

fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_secs() as i64
}

/// Test-only counter used to detect how many times a callback fired, without
/// pulling in a mocking crate the teacher's stack doesn't use.
#[cfg(test)]
use std::sync::atomic::{AtomicI64, Ordering};

#[cfg(test)]
pub(crate) struct CountingCallback {
    pub count: AtomicI64,
    pub last: Mutex<Option<String>>,
}

#[cfg(test)]
impl CountingCallback {
    pub fn new() -> Arc<Self> {
        Arc::new(CountingCallback {
            count: AtomicI64::new(0),
            last: Mutex::new(None),
        })
    }

    pub fn fired(&self) -> i64 {
        self.count.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
impl ExpireCallback for CountingCallback {
    fn on_expire(&self, meta: Arc<KeyMeta>) {
        self.count.fetch_add(1, Ordering::SeqCst);
        *self.last.lock().unwrap() = Some(meta.key().to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn monitor_two_keys_builds_sorted_schedule() {
        let cb = CountingCallback::new();
        let monitor = TtlMonitor::spawn(8, cb.clone());
        let k1 = Arc::new(KeyMeta::new("k1"));
        let k2 = Arc::new(KeyMeta::new("k2"));

        monitor.monitor(k1.clone(), 20).await;
        monitor.monitor(k2.clone(), 10).await;
        tokio::time::sleep(Duration::from_millis(20)).await;

        let snap = monitor.snapshot().await;
        assert_eq!(snap.len(), 2);
        assert!(snap["k2"] < snap["k1"]);
    }

    #[tokio::test]
    async fn unmonitor_collapses_the_entry() {
        let cb = CountingCallback::new();
        let monitor = TtlMonitor::spawn(8, cb.clone());
        let k1 = Arc::new(KeyMeta::new("k1"));
        let k2 = Arc::new(KeyMeta::new("k2"));

        monitor.monitor(k1.clone(), 20).await;
        monitor.monitor(k2.clone(), 10).await;
        tokio::time::sleep(Duration::from_millis(20)).await;

        monitor.unmonitor(k2.clone()).await;
        tokio::time::sleep(Duration::from_millis(20)).await;

        let snap = monitor.snapshot().await;
        assert_eq!(snap.len(), 1);
        assert!(snap.contains_key("k1"));
        assert_eq!(cb.fired(), 1);
    }

    #[tokio::test]
    async fn scenario_e_pure_state_transitions() {
        let cb = CountingCallback::new();
        let monitor = TtlMonitor::spawn(8, cb.clone());
        let k1 = Arc::new(KeyMeta::new("k1"));
        let k2 = Arc::new(KeyMeta::new("k2"));

        monitor.apply(k1.clone(), 2_000_000_020).await;
        monitor.apply(k2.clone(), 2_000_000_010).await;

        assert_eq!(monitor.sorted_instants().await, vec![2_000_000_010, 2_000_000_020]);
        assert_eq!(monitor.snapshot().await.len(), 2);

        monitor.apply(k2.clone(), 0).await;

        assert_eq!(monitor.sorted_instants().await, vec![2_000_000_020]);
        assert_eq!(monitor.snapshot().await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn expiration_fires_callback_once_per_key() {
        let cb = CountingCallback::new();
        let monitor = TtlMonitor::spawn(8, cb.clone());
        let k1 = Arc::new(KeyMeta::new("k1"));
        let k2 = Arc::new(KeyMeta::new("k2"));

        monitor.monitor(k1.clone(), 4).await;
        monitor.monitor(k2.clone(), 2).await;

        tokio::time::advance(Duration::from_secs(5)).await;
        tokio::task::yield_now().await;
        tokio::time::advance(Duration::from_millis(1)).await;
        tokio::task::yield_now().await;

        assert_eq!(cb.fired(), 2);
        assert!(monitor.snapshot().await.is_empty());
    }
}
