//! Single-threaded latency
//!
//! Adaptive loop: each round rebuilds and prefills the cache, then times `n`
//! operations. `n` grows until one round fills the benchtime, and the last
//! round is the reported measurement.

use cachemark_engine::{CacheFactory, StrKey};
use indicatif::ProgressBar;
use std::hint::black_box;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::alloc_counter::thread_allocations;
use crate::config::LatencyConfig;
use crate::metrics::{GetOrSetLatencyResult, LatencyResult};
use crate::workload::KeyGenerator;

/// Upper bound on iterations per round.
pub const MAX_ITERATIONS: u64 = 1_000_000_000;

/// Timer and allocation baseline for one round
///
/// Rounds call [`Stopwatch::reset`] once setup is done and
/// [`Stopwatch::stop`] before teardown. An unstopped stopwatch stops when
/// the round returns.
#[derive(Debug)]
pub struct Stopwatch {
    start: Instant,
    allocs_at_start: u64,
    stopped: Option<(Duration, u64)>,
}

impl Stopwatch {
    fn start() -> Self {
        Self {
            start: Instant::now(),
            allocs_at_start: thread_allocations(),
            stopped: None,
        }
    }

    pub fn reset(&mut self) {
        self.allocs_at_start = thread_allocations();
        self.stopped = None;
        self.start = Instant::now();
    }

    pub fn stop(&mut self) {
        if self.stopped.is_none() {
            let elapsed = self.start.elapsed();
            let allocs = thread_allocations().saturating_sub(self.allocs_at_start);
            self.stopped = Some((elapsed, allocs));
        }
    }

    fn finish(mut self, iterations: u64) -> Measurement {
        self.stop();
        let (elapsed, allocs) = self.stopped.unwrap_or_default();
        Measurement {
            iterations,
            elapsed,
            allocs,
        }
    }
}

/// Outcome of one timed round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Measurement {
    pub iterations: u64,
    pub elapsed: Duration,
    pub allocs: u64,
}

impl Measurement {
    /// Whole nanoseconds per operation.
    pub fn ns_per_op(&self) -> f64 {
        if self.iterations == 0 {
            return 0.0;
        }
        (self.elapsed.as_nanos() / self.iterations as u128) as f64
    }

    pub fn allocs_per_op(&self) -> u64 {
        if self.iterations == 0 {
            return 0;
        }
        self.allocs / self.iterations
    }
}

/// Next iteration count: aim 20% past the benchtime, grow at most 100x,
/// always at least one more than last time.
pub fn predict_iterations(goal: Duration, last: u64, elapsed: Duration) -> u64 {
    let prev_ns = elapsed.as_nanos().max(1);
    let mut next = (goal.as_nanos() * last as u128 / prev_ns) as u64;
    next = next.saturating_add(next / 5);
    next = next.min(last.saturating_mul(100));
    next = next.max(last + 1);
    next.min(MAX_ITERATIONS)
}

/// Run `round` with growing `n` until a round takes at least `benchtime`.
pub fn bench<F>(benchtime: Duration, mut round: F) -> Measurement
where
    F: FnMut(u64, &mut Stopwatch),
{
    let mut run = |n: u64| {
        let mut sw = Stopwatch::start();
        round(n, &mut sw);
        sw.finish(n)
    };

    let mut m = run(1);
    while m.elapsed < benchtime && m.iterations < MAX_ITERATIONS {
        let n = predict_iterations(benchtime, m.iterations, m.elapsed);
        m = run(n);
    }
    m
}

fn bench_get<K: Clone + 'static>(
    factory: &CacheFactory<K>,
    cache_size: usize,
    keys: &[K],
    benchtime: Duration,
) -> Measurement {
    bench(benchtime, |n, sw| {
        let cache = factory.build(cache_size);
        for k in keys {
            cache.set(k.clone(), k.clone());
        }
        sw.reset();
        for i in 0..n as usize {
            black_box(cache.get(&keys[i % keys.len()]));
        }
        sw.stop();
        cache.close();
    })
}

fn bench_set<K: Clone + 'static>(
    factory: &CacheFactory<K>,
    cache_size: usize,
    keys: &[K],
    benchtime: Duration,
) -> Measurement {
    bench(benchtime, |n, sw| {
        let cache = factory.build(cache_size);
        for k in keys {
            cache.set(k.clone(), k.clone());
        }
        sw.reset();
        for i in 0..n as usize {
            let k = &keys[i % keys.len()];
            cache.set(k.clone(), k.clone());
        }
        sw.stop();
        cache.close();
    })
}

/// Prefill with the first `cache_size` keys, then insert the rest in a cycle.
fn bench_set_evict<K: Clone + 'static>(
    factory: &CacheFactory<K>,
    cache_size: usize,
    keys: &[K],
    benchtime: Duration,
) -> Measurement {
    let (warm, cold) = keys.split_at(cache_size.min(keys.len()));
    let cold = if cold.is_empty() { warm } else { cold };
    bench(benchtime, |n, sw| {
        let cache = factory.build(cache_size);
        for k in warm {
            cache.set(k.clone(), k.clone());
        }
        sw.reset();
        for i in 0..n as usize {
            let k = &cold[i % cold.len()];
            cache.set(k.clone(), k.clone());
        }
        sw.stop();
        cache.close();
    })
}

/// Half the keys are resident, so roughly half the calls insert.
fn bench_get_or_set(
    factory: &CacheFactory<StrKey>,
    cache_size: usize,
    keys: &[StrKey],
    benchtime: Duration,
) -> Measurement {
    bench(benchtime, |n, sw| {
        let cache = factory.build(cache_size);
        for k in &keys[..keys.len() / 2] {
            cache.set(k.clone(), k.clone());
        }
        if let Some(gos) = cache.as_get_or_set() {
            sw.reset();
            for i in 0..n as usize {
                let k = &keys[i % keys.len()];
                black_box(gos.get_or_set(k.clone(), k.clone()));
            }
            sw.stop();
        }
        cache.close();
    })
}

fn latency_row<K: Clone + 'static>(
    factory: &CacheFactory<K>,
    keys: &[K],
    evict_keys: &[K],
    cfg: &LatencyConfig,
) -> LatencyResult {
    let benchtime = cfg.benchtime();
    let get = bench_get(factory, cfg.cache_size, keys, benchtime);
    let set = bench_set(factory, cfg.cache_size, keys, benchtime);
    let evict = bench_set_evict(factory, cfg.cache_size, evict_keys, benchtime);
    debug!(
        cache = factory.name(),
        get_ns = get.ns_per_op(),
        set_ns = set.ns_per_op(),
        set_evict_ns = evict.ns_per_op(),
        "latency measured"
    );
    LatencyResult {
        name: factory.name().to_string(),
        get_ns: get.ns_per_op(),
        get_allocs: get.allocs_per_op(),
        set_ns: set.ns_per_op(),
        set_allocs: set.allocs_per_op(),
        set_evict_ns: evict.ns_per_op(),
        set_evict_allocs: evict.allocs_per_op(),
    }
}

/// Get, Set and SetEvict with decimal string keys.
pub fn run_string_latency(
    factories: &[CacheFactory<StrKey>],
    cfg: &LatencyConfig,
    progress: &ProgressBar,
) -> Vec<LatencyResult> {
    let keys = KeyGenerator::decimal(cfg.cache_size);
    let evict_keys = KeyGenerator::decimal(cfg.cache_size * cfg.evict_multiplier);
    progress.set_length(factories.len() as u64);
    factories
        .iter()
        .map(|factory| {
            let row = latency_row(factory, &keys, &evict_keys, cfg);
            progress.inc(1);
            row
        })
        .collect()
}

/// Get, Set and SetEvict with raw integer keys.
pub fn run_int_latency(
    factories: &[CacheFactory<u64>],
    cfg: &LatencyConfig,
    progress: &ProgressBar,
) -> Vec<LatencyResult> {
    let keys: Vec<u64> = (0..cfg.cache_size as u64).collect();
    let evict_keys: Vec<u64> = (0..(cfg.cache_size * cfg.evict_multiplier) as u64).collect();
    progress.set_length(factories.len() as u64);
    factories
        .iter()
        .map(|factory| {
            let row = latency_row(factory, &keys, &evict_keys, cfg);
            progress.inc(1);
            row
        })
        .collect()
}

/// GetOrSet over URL keys; caches without the capability are skipped.
pub fn run_get_or_set_latency(
    factories: &[CacheFactory<StrKey>],
    cfg: &LatencyConfig,
    progress: &ProgressBar,
) -> Vec<GetOrSetLatencyResult> {
    let keys = KeyGenerator::urls(cfg.cache_size);
    let capable: Vec<&CacheFactory<StrKey>> = factories
        .iter()
        .filter(|f| f.supports_get_or_set(cfg.cache_size))
        .collect();
    progress.set_length(capable.len() as u64);
    capable
        .into_iter()
        .map(|factory| {
            let m = bench_get_or_set(factory, cfg.cache_size, &keys, cfg.benchtime());
            debug!(cache = factory.name(), ns = m.ns_per_op(), "getorset measured");
            progress.inc(1);
            GetOrSetLatencyResult {
                name: factory.name().to_string(),
                ns: m.ns_per_op(),
                allocs: m.allocs_per_op(),
            }
        })
        .collect()
}
