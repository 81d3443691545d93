//! Multi-threaded throughput
//!
//! Workers hammer one shared cache with a precomputed Zipf sequence until a
//! stop flag is raised, flushing their op counts to a shared counter in
//! batches. A trial whose workers do not exit within the hang timeout scores
//! zero and its cache is released on a detached thread.

use cachemark_engine::{Cache, CacheFactory, StrKey};
use indicatif::ProgressBar;
use std::collections::BTreeMap;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::config::ThroughputConfig;
use crate::metrics::ThroughputResult;
use crate::suite::{Mix, ThroughputTest};
use crate::workload::{generate_zipf, KeyGenerator, ValueGenerator};

/// One trial's knobs
#[derive(Debug, Clone, Copy)]
pub struct Trial {
    pub threads: usize,
    pub duration: Duration,
    pub batch_size: usize,
    pub hang_timeout: Duration,
}

/// Per-worker operation, called with a monotonically increasing local index.
pub type Op<K> = dyn Fn(&dyn Cache<K>, usize) + Send + Sync;

/// Starts worker `id` running `body`.
type Spawner<'a> = dyn Fn(usize, Box<dyn FnOnce() + Send>) -> io::Result<()> + 'a;

fn spawn_worker(id: usize, body: Box<dyn FnOnce() + Send>) -> io::Result<()> {
    thread::Builder::new()
        .name(format!("cachemark-worker-{}", id))
        .spawn(body)
        .map(drop)
}

/// Run `op` from `trial.threads` workers against `cache` and return ops/sec.
///
/// The cache is closed when the trial ends, also on the hang path. A trial
/// that cannot start every worker scores zero instead of reporting a
/// smaller thread count under the requested one.
pub fn measure_qps<K: 'static>(cache: Arc<dyn Cache<K>>, op: Arc<Op<K>>, trial: Trial) -> f64 {
    run_trial(cache, op, trial, &spawn_worker)
}

fn run_trial<K: 'static>(
    cache: Arc<dyn Cache<K>>,
    op: Arc<Op<K>>,
    trial: Trial,
    spawn: &Spawner<'_>,
) -> f64 {
    let stop = Arc::new(AtomicBool::new(false));
    let ops = Arc::new(AtomicU64::new(0));
    let (done_tx, done_rx) = mpsc::channel::<()>();
    let batch = trial.batch_size.max(1);
    let threads = trial.threads.max(1);

    let mut spawned = 0;
    let mut short_handed = false;
    for id in 0..threads {
        let worker_cache = Arc::clone(&cache);
        let op = Arc::clone(&op);
        let stop = Arc::clone(&stop);
        let ops = Arc::clone(&ops);
        let done = done_tx.clone();
        let body: Box<dyn FnOnce() + Send> = Box::new(move || {
            let mut i = 0usize;
            while !stop.load(Ordering::Relaxed) {
                for _ in 0..batch {
                    op(&*worker_cache, i);
                    i = i.wrapping_add(1);
                }
                ops.fetch_add(batch as u64, Ordering::Relaxed);
            }
            let _ = done.send(());
        });
        if let Err(e) = spawn(id, body) {
            warn!(
                cache = cache.name(),
                requested = threads,
                spawned,
                error = %e,
                "failed to spawn worker, abandoning trial"
            );
            short_handed = true;
            break;
        }
        spawned += 1;
    }
    drop(done_tx);

    let start = Instant::now();
    if !short_handed {
        thread::sleep(trial.duration);
    }
    stop.store(true, Ordering::Relaxed);
    let elapsed = start.elapsed();
    let total = ops.load(Ordering::Relaxed);

    let finished = wait_for_workers(&done_rx, spawned, trial.hang_timeout);
    if finished < spawned {
        warn!(
            cache = cache.name(),
            threads,
            stuck = spawned - finished,
            "workers did not stop, scoring zero"
        );
        let leaked = Arc::clone(&cache);
        let _ = thread::Builder::new()
            .name("cachemark-close".into())
            .spawn(move || leaked.close());
        return 0.0;
    }

    cache.close();
    let secs = elapsed.as_secs_f64();
    if short_handed || secs <= 0.0 {
        return 0.0;
    }
    total as f64 / secs
}

/// Collect exit signals until `spawned` arrive or `timeout` passes.
fn wait_for_workers(done_rx: &mpsc::Receiver<()>, spawned: usize, timeout: Duration) -> usize {
    let deadline = Instant::now() + timeout;
    let mut finished = 0;
    while finished < spawned {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match done_rx.recv_timeout(remaining) {
            Ok(()) => finished += 1,
            Err(_) => break,
        }
    }
    finished
}

/// Shared inputs for every throughput test of one run
pub struct ThroughputWorkload {
    seq: Arc<Vec<u64>>,
    key_strs: Arc<Vec<StrKey>>,
    value: StrKey,
    cfg: ThroughputConfig,
}

impl ThroughputWorkload {
    /// Zipf sequence over `cache_size` keys plus decimal key strings.
    pub fn new(cfg: &ThroughputConfig) -> Self {
        let seq = generate_zipf(cfg.workload_size, cfg.cache_size as u64, cfg.theta, cfg.seed);
        Self {
            seq: Arc::new(seq),
            key_strs: Arc::new(KeyGenerator::decimal(cfg.cache_size)),
            value: ValueGenerator::pattern(cfg.value_size),
            cfg: cfg.clone(),
        }
    }

    pub fn trial(&self, threads: usize) -> Trial {
        Trial {
            threads,
            duration: self.cfg.duration(),
            batch_size: self.cfg.batch_size,
            hang_timeout: self.cfg.hang_timeout(),
        }
    }

    /// QPS for `test` at each thread count.
    pub fn run(
        &self,
        test: ThroughputTest,
        factories: &[CacheFactory<StrKey>],
        int_factories: &[CacheFactory<u64>],
        threads: &[usize],
        progress: &ProgressBar,
    ) -> Vec<ThroughputResult> {
        match test.mix() {
            Mix::GetOrSet => {
                let capable: Vec<CacheFactory<StrKey>> = factories
                    .iter()
                    .filter(|f| f.supports_get_or_set(self.cfg.cache_size))
                    .cloned()
                    .collect();
                self.run_get_or_set(&capable, threads, progress)
            }
            mix if test.int_keys() => self.run_int(mix, int_factories, threads, progress),
            mix => self.run_string(mix, factories, threads, progress),
        }
    }

    fn sweep<K: 'static>(
        &self,
        test: &str,
        factories: &[CacheFactory<K>],
        threads: &[usize],
        progress: &ProgressBar,
        prefill: impl Fn(&dyn Cache<K>),
        op: Arc<Op<K>>,
    ) -> Vec<ThroughputResult> {
        progress.set_length((factories.len() * threads.len()) as u64);
        factories
            .iter()
            .map(|factory| {
                let qps: BTreeMap<usize, f64> = threads
                    .iter()
                    .map(|&t| {
                        let cache = factory.build(self.cfg.cache_size);
                        prefill(&*cache);
                        let q = measure_qps(cache, Arc::clone(&op), self.trial(t));
                        debug!(test, cache = factory.name(), threads = t, qps = q, "trial done");
                        progress.inc(1);
                        (t, q)
                    })
                    .collect();
                ThroughputResult {
                    name: factory.name().to_string(),
                    qps,
                }
            })
            .collect()
    }

    fn run_string(
        &self,
        mix: Mix,
        factories: &[CacheFactory<StrKey>],
        threads: &[usize],
        progress: &ProgressBar,
    ) -> Vec<ThroughputResult> {
        let seq = Arc::clone(&self.seq);
        let keys = Arc::clone(&self.key_strs);
        let value = self.value.clone();
        let key_at = move |i: usize| keys[seq[i % seq.len()] as usize].clone();

        let op: Arc<Op<StrKey>> = match mix {
            Mix::Get => Arc::new(move |c: &dyn Cache<StrKey>, i: usize| {
                let _ = c.get(&key_at(i));
            }),
            Mix::Set => Arc::new(move |c: &dyn Cache<StrKey>, i: usize| {
                c.set(key_at(i), value.clone());
            }),
            _ => Arc::new(move |c: &dyn Cache<StrKey>, i: usize| {
                if i % 4 == 3 {
                    c.set(key_at(i), value.clone());
                } else {
                    let _ = c.get(&key_at(i));
                }
            }),
        };

        let prefill_keys = Arc::clone(&self.key_strs);
        let prefill_value = self.value.clone();
        self.sweep(
            mix_label(mix),
            factories,
            threads,
            progress,
            move |c| {
                for k in prefill_keys.iter() {
                    c.set(k.clone(), prefill_value.clone());
                }
            },
            op,
        )
    }

    fn run_int(
        &self,
        mix: Mix,
        factories: &[CacheFactory<u64>],
        threads: &[usize],
        progress: &ProgressBar,
    ) -> Vec<ThroughputResult> {
        let seq = Arc::clone(&self.seq);
        let key_at = move |i: usize| seq[i % seq.len()];

        let op: Arc<Op<u64>> = match mix {
            Mix::Get => Arc::new(move |c: &dyn Cache<u64>, i: usize| {
                let _ = c.get(&key_at(i));
            }),
            Mix::Set => Arc::new(move |c: &dyn Cache<u64>, i: usize| {
                let k = key_at(i);
                c.set(k, k);
            }),
            _ => Arc::new(move |c: &dyn Cache<u64>, i: usize| {
                let k = key_at(i);
                if i % 4 == 3 {
                    c.set(k, k);
                } else {
                    let _ = c.get(&k);
                }
            }),
        };

        let cache_size = self.cfg.cache_size as u64;
        self.sweep(
            mix_label(mix),
            factories,
            threads,
            progress,
            move |c| {
                for k in 0..cache_size {
                    c.set(k, k);
                }
            },
            op,
        )
    }

    fn run_get_or_set(
        &self,
        factories: &[CacheFactory<StrKey>],
        threads: &[usize],
        progress: &ProgressBar,
    ) -> Vec<ThroughputResult> {
        let keys = Arc::new(KeyGenerator::zipf_urls(&self.seq));
        let value = ValueGenerator::pattern(self.cfg.get_or_set_value_size);

        let op_keys = Arc::clone(&keys);
        let op_value = value.clone();
        let op: Arc<Op<StrKey>> = Arc::new(move |c: &dyn Cache<StrKey>, i: usize| {
            if let Some(gos) = c.as_get_or_set() {
                let _ = gos.get_or_set(op_keys[i % op_keys.len()].clone(), op_value.clone());
            }
        });

        let warm = (keys.len() / 2).min(self.cfg.cache_size);
        self.sweep(
            "getorset",
            factories,
            threads,
            progress,
            move |c| {
                for k in &keys[..warm] {
                    c.set(k.clone(), value.clone());
                }
            },
            op,
        )
    }
}

fn mix_label(mix: Mix) -> &'static str {
    match mix {
        Mix::Get => "get",
        Mix::Set => "set",
        Mix::Mixed => "mixed",
        Mix::GetOrSet => "getorset",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cachemark_engine::{int_factories, string_factories, CacheFilter};
    use parking_lot::Mutex;

    fn quick() -> ThroughputConfig {
        ThroughputConfig {
            cache_size: 512,
            workload_size: 4_096,
            threads: vec![1, 2],
            duration_ms: 30,
            batch_size: 64,
            hang_timeout_ms: 1_000,
            value_size: 16,
            get_or_set_value_size: 32,
            ..ThroughputConfig::default()
        }
    }

    /// Blocks every call until released
    struct Stuck {
        gate: Arc<Mutex<()>>,
    }

    impl Cache<u64> for Stuck {
        fn get(&self, _key: &u64) -> Option<u64> {
            let _held = self.gate.lock();
            None
        }
        fn set(&self, _key: u64, _value: u64) {}
        fn name(&self) -> &str {
            "stuck"
        }
        fn len(&self) -> usize {
            0
        }
    }

    #[test]
    fn hung_workers_score_zero() {
        let gate = Arc::new(Mutex::new(()));
        let guard = gate.lock();
        let cache: Arc<dyn Cache<u64>> = Arc::new(Stuck {
            gate: Arc::clone(&gate),
        });
        let op: Arc<Op<u64>> = Arc::new(|c: &dyn Cache<u64>, i: usize| {
            let _ = c.get(&(i as u64));
        });
        let trial = Trial {
            threads: 2,
            duration: Duration::from_millis(10),
            batch_size: 1,
            hang_timeout: Duration::from_millis(50),
        };
        let start = Instant::now();
        assert_eq!(measure_qps(cache, op, trial), 0.0);
        assert!(start.elapsed() < Duration::from_secs(2));
        drop(guard);
    }

    /// Records `close`, counts calls
    #[derive(Default)]
    struct Tally {
        calls: AtomicU64,
        closed: AtomicBool,
    }

    impl Cache<u64> for Tally {
        fn get(&self, _key: &u64) -> Option<u64> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            None
        }
        fn set(&self, _key: u64, _value: u64) {}
        fn name(&self) -> &str {
            "tally"
        }
        fn len(&self) -> usize {
            0
        }
        fn close(&self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    #[test]
    fn failed_spawn_abandons_the_trial() {
        let tally = Arc::new(Tally::default());
        let cache: Arc<dyn Cache<u64>> = tally.clone();
        let op: Arc<Op<u64>> = Arc::new(|c: &dyn Cache<u64>, i: usize| {
            let _ = c.get(&(i as u64));
        });
        let trial = Trial {
            threads: 4,
            duration: Duration::from_secs(30),
            batch_size: 8,
            hang_timeout: Duration::from_secs(1),
        };
        let attempts = AtomicU64::new(0);
        let refuse_third = |id: usize, body: Box<dyn FnOnce() + Send>| -> io::Result<()> {
            attempts.fetch_add(1, Ordering::SeqCst);
            if id == 2 {
                return Err(io::Error::new(io::ErrorKind::WouldBlock, "no threads left"));
            }
            thread::spawn(body);
            Ok(())
        };

        let start = Instant::now();
        assert_eq!(run_trial(cache, op, trial, &refuse_third), 0.0);
        // No sleep for the full duration once a spawn fails
        assert!(start.elapsed() < Duration::from_secs(5), "{:?}", start.elapsed());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert!(tally.closed.load(Ordering::SeqCst));

        // Started workers have exited
        let calls = tally.calls.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(20));
        assert_eq!(tally.calls.load(Ordering::SeqCst), calls);
    }

    #[test]
    fn full_crew_reports_qps_through_the_spawner() {
        let tally = Arc::new(Tally::default());
        let cache: Arc<dyn Cache<u64>> = tally.clone();
        let op: Arc<Op<u64>> = Arc::new(|c: &dyn Cache<u64>, i: usize| {
            let _ = c.get(&(i as u64));
        });
        let trial = Trial {
            threads: 3,
            duration: Duration::from_millis(20),
            batch_size: 8,
            hang_timeout: Duration::from_secs(1),
        };
        assert!(run_trial(cache, op, trial, &spawn_worker) > 0.0);
        assert!(tally.closed.load(Ordering::SeqCst));
    }

    #[test]
    fn counts_batched_operations() {
        let cache: Arc<dyn Cache<u64>> = cachemark_engine::CacheKind::Lru
            .build_int(128)
            .expect("lru has an int variant");
        let op: Arc<Op<u64>> = Arc::new(|c: &dyn Cache<u64>, i: usize| {
            c.set(i as u64 % 128, 1);
        });
        let trial = Trial {
            threads: 2,
            duration: Duration::from_millis(20),
            batch_size: 10,
            hang_timeout: Duration::from_secs(1),
        };
        assert!(measure_qps(cache, op, trial) > 0.0);
    }

    #[test]
    fn every_mix_produces_a_row_per_cache() {
        let cfg = quick();
        let workload = ThroughputWorkload::new(&cfg);
        let filter = CacheFilter::only(["lru", "moka"]);
        let strings = string_factories(&filter);
        let ints = int_factories(&filter);
        let pb = ProgressBar::hidden();

        for test in [ThroughputTest::StringMixed, ThroughputTest::IntGet] {
            let rows = workload.run(test, &strings, &ints, &cfg.threads, &pb);
            assert_eq!(rows.len(), 2, "{:?}", test);
            for row in rows {
                assert_eq!(row.qps.keys().copied().collect::<Vec<_>>(), vec![1, 2]);
                assert!(row.qps.values().all(|&q| q > 0.0), "{}", row.name);
            }
        }
    }

    #[test]
    fn get_or_set_only_runs_capable_caches() {
        let cfg = ThroughputConfig {
            threads: vec![1],
            ..quick()
        };
        let workload = ThroughputWorkload::new(&cfg);
        let strings = string_factories(&CacheFilter::all());
        let capable: Vec<String> = strings
            .iter()
            .filter(|f| f.supports_get_or_set(cfg.cache_size))
            .map(|f| f.name().to_string())
            .collect();
        let rows = workload.run(
            ThroughputTest::GetOrSet,
            &strings,
            &[],
            &cfg.threads,
            &ProgressBar::hidden(),
        );
        let names: Vec<String> = rows.into_iter().map(|r| r.name).collect();
        assert_eq!(names, capable);
    }
}
