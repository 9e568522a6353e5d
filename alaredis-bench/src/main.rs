//! # Engine Benchmark Harness
//!
//! Purpose: Provide a dependency-free, repeatable benchmark driver for the
//! sharded engine so baseline throughput and latency can be compared over
//! time, in-process (no HTTP hop).
//!
//! ## Design Principles
//! 1. **Deterministic Workload**: Use a fixed PRNG seed for stable comparisons.
//! 2. **Allocation Control**: Pre-build keys/values to keep setup costs off the hot path.
//! 3. **Direct Dispatch**: Drive `Dispatcher::call` directly, the same entry
//!    point the HTTP front door uses, so the benchmark measures the actual
//!    actor-model dispatch path rather than a bypass of it.
//!
//! Grounded on `hkv-engine/src/bin/bench_engine.rs`'s `XorShift64` PRNG and
//! buffer-prebuild structure, adapted from `MemoryEngine`'s synchronous
//! `get`/`set` calls to the sharded engine's async `Dispatcher::call`.

use std::env;
use std::hint::black_box;
use std::time::Instant;

use alaredis_common::{Op, Value};
use alaredis_engine::Storage;

const DEFAULT_KEY_COUNT: usize = 1 << 14;
const DEFAULT_OP_COUNT: usize = 200_000;
const DEFAULT_VALUE_SIZE: usize = 128;
const DEFAULT_BUCKET_COUNT: usize = 8;

struct BenchConfig {
    requested_keys: usize,
    key_count: usize,
    key_mask: usize,
    op_count: usize,
    value_size: usize,
    bucket_count: usize,
}

impl BenchConfig {
    fn from_args() -> Self {
        let mut args = env::args().skip(1);
        let requested_keys = parse_usize(args.next(), DEFAULT_KEY_COUNT);
        let op_count = parse_usize(args.next(), DEFAULT_OP_COUNT);
        let value_size = parse_usize(args.next(), DEFAULT_VALUE_SIZE);
        let bucket_count = parse_usize(args.next(), DEFAULT_BUCKET_COUNT);

        let key_count = normalize_power_of_two(requested_keys);
        let key_mask = key_count - 1;

        BenchConfig {
            requested_keys,
            key_count,
            key_mask,
            op_count,
            value_size,
            bucket_count,
        }
    }
}

fn parse_usize(value: Option<String>, fallback: usize) -> usize {
    value.and_then(|raw| raw.parse().ok()).unwrap_or(fallback)
}

fn normalize_power_of_two(value: usize) -> usize {
    let value = value.max(1);
    if value.is_power_of_two() {
        value
    } else {
        value.next_power_of_two()
    }
}

/// Tiny deterministic PRNG used to avoid external dependencies.
struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    #[inline]
    fn next_index(&mut self, mask: usize) -> usize {
        (self.next_u64() as usize) & mask
    }
}

fn build_keys(count: usize, seed: u64) -> Vec<String> {
    (0..count).map(|i| format!("bench-key-{:016x}", seed ^ i as u64)).collect()
}

fn build_value(size: usize, seed: u64) -> String {
    let mut s = format!("{seed:016x}");
    while s.len() < size {
        s.push('x');
    }
    s.truncate(size);
    s
}

fn report(label: &str, ops: usize, elapsed: std::time::Duration) {
    let secs = elapsed.as_secs_f64();
    let ops_per_sec = (ops as f64) / secs;
    let nanos_per_op = (secs * 1e9) / (ops as f64);
    println!("{label}: {ops} ops in {secs:.3}s ({ops_per_sec:.0} ops/s, {nanos_per_op:.1} ns/op)");
}

fn main() {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("build runtime")
        .block_on(run());
}

async fn run() {
    let config = BenchConfig::from_args();
    let storage = Storage::new(config.bucket_count);
    storage.run();
    let dispatcher = storage.dispatcher();

    let keys = build_keys(config.key_count, 0xA5A5_A5A5_A5A5_A5A5);
    let value = build_value(config.value_size, 0x5A5A_5A5A_5A5A_5A5A);

    for key in &keys {
        dispatcher
            .call(Op::Set, key.clone(), None, Some(Value::Str(value.clone())), 0)
            .await
            .expect("warm-up set");
    }

    println!(
        "keys: requested={}, actual={}, ops={}, value_size={}, buckets={}",
        config.requested_keys, config.key_count, config.op_count, config.value_size, config.bucket_count
    );

    let mut rng = XorShift64::new(0x1234_5678_9ABC_DEF0);
    let start = Instant::now();
    for _ in 0..config.op_count {
        let idx = rng.next_index(config.key_mask);
        let result = dispatcher.call(Op::Get, keys[idx].clone(), None, None, 0).await.expect("get");
        black_box(result);
    }
    report("GET", config.op_count, start.elapsed());

    let mut rng = XorShift64::new(0x0FED_CBA9_8765_4321);
    let start = Instant::now();
    for _ in 0..config.op_count {
        let idx = rng.next_index(config.key_mask);
        let flipped = format!("{}-flipped", &value[..value.len().saturating_sub(8)]);
        dispatcher
            .call(Op::Set, keys[idx].clone(), None, Some(Value::Str(flipped)), 0)
            .await
            .expect("set");
    }
    report("SET", config.op_count, start.elapsed());
}
