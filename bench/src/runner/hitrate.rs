//! Hit-rate replay
//!
//! Each `(implementation, size)` pair replays the whole sequence against a
//! fresh cache. A miss is filled read-through with the key as its own value.

use anyhow::{Context, Result};
use cachemark_engine::{sized_factories, CacheFactory, CacheFilter, StrKey, StringCache};
use indicatif::ProgressBar;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use crate::config::HitRateConfig;
use crate::metrics::HitRateResult;
use crate::suite::HitRateTest;
use crate::workload::{generate_zipf, Action, KeyGenerator, KeyTrace, OpTrace, TraceOp, TraceStore};

/// Sequence replayed by one hit-rate test
#[derive(Debug, Clone)]
pub enum Replay {
    Keys(KeyTrace),
    Ops(OpTrace),
}

impl Replay {
    pub fn len(&self) -> usize {
        match self {
            Replay::Keys(keys) => keys.len(),
            Replay::Ops(ops) => ops.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Hit rate of one pass over `cache`.
    pub fn run(&self, cache: &StringCache) -> f64 {
        match self {
            Replay::Keys(keys) => replay_keys(cache, keys),
            Replay::Ops(ops) => replay_ops(cache, ops),
        }
    }
}

/// Read-through over a key-only sequence.
pub fn replay_keys(cache: &StringCache, keys: &[StrKey]) -> f64 {
    let (mut hits, mut misses) = (0u64, 0u64);
    for key in keys {
        if cache.get(key).is_some() {
            hits += 1;
        } else {
            misses += 1;
            cache.set(key.clone(), key.clone());
        }
    }
    percent(hits, misses)
}

/// GET is read-through, SET is an uncounted write, anything else is skipped.
pub fn replay_ops(cache: &StringCache, ops: &[TraceOp]) -> f64 {
    let (mut hits, mut misses) = (0u64, 0u64);
    for op in ops {
        match op.action {
            Action::Get => {
                if cache.get(&op.key).is_some() {
                    hits += 1;
                } else {
                    misses += 1;
                    cache.set(op.key.clone(), op.key.clone());
                }
            }
            Action::Set => cache.set(op.key.clone(), op.key.clone()),
            Action::Other => {}
        }
    }
    percent(hits, misses)
}

fn percent(hits: u64, misses: u64) -> f64 {
    let total = hits + misses;
    if total == 0 {
        return 0.0;
    }
    hits as f64 / total as f64 * 100.0
}

/// Sequence for `test`: a trace from `store`, or the synthetic Zipf keys.
pub fn load_replay(test: HitRateTest, store: &TraceStore, cfg: &HitRateConfig) -> Result<Replay> {
    let replay = match test {
        HitRateTest::Zipf => {
            let keys = generate_zipf(cfg.zipf_ops, cfg.zipf_keyspace, cfg.zipf_theta, cfg.seed);
            Replay::Keys(Arc::new(KeyGenerator::decimal_from(&keys)))
        }
        HitRateTest::Cdn => Replay::Keys(store.cdn()?),
        HitRateTest::Meta => Replay::Ops(store.meta()?),
        HitRateTest::Twitter => Replay::Keys(store.twitter()?),
        HitRateTest::Wikipedia => Replay::Keys(store.wikipedia()?),
        HitRateTest::ThesiosBlock => Replay::Keys(store.thesios()?.block),
        HitRateTest::ThesiosFile => Replay::Keys(store.thesios()?.file),
        HitRateTest::IbmDocker => Replay::Keys(store.ibm_docker()?),
        HitRateTest::TencentPhoto => Replay::Keys(store.tencent_photo()?),
    };
    Ok(replay)
}

/// Replay against every factory at every size, one fresh cache per trial.
pub fn hit_rate_table(
    factories: &[CacheFactory<StrKey>],
    sizes: &[usize],
    replay: &Replay,
    progress: &ProgressBar,
) -> Vec<HitRateResult> {
    factories
        .iter()
        .map(|factory| {
            let rates: BTreeMap<usize, f64> = sizes
                .iter()
                .map(|&size| {
                    let cache = factory.build(size);
                    let rate = replay.run(&*cache);
                    cache.close();
                    debug!(cache = factory.name(), size, rate, "hit rate trial");
                    progress.inc(1);
                    (size, rate)
                })
                .collect();
            HitRateResult {
                name: factory.name().to_string(),
                rates,
            }
        })
        .collect()
}

/// Load the sequence for `test` and replay it over every selected cache.
pub fn run_hit_rate_test(
    test: HitRateTest,
    store: &TraceStore,
    filter: &CacheFilter,
    sizes: &[usize],
    cfg: &HitRateConfig,
    progress: &ProgressBar,
) -> Result<Vec<HitRateResult>> {
    let replay =
        load_replay(test, store, cfg).with_context(|| format!("load {} trace", test.title()))?;
    debug!(test = test.id(), ops = replay.len(), "replay loaded");

    let factories = sized_factories(filter, test.entry_size());
    progress.set_length((factories.len() * sizes.len()) as u64);
    Ok(hit_rate_table(&factories, sizes, &replay, progress))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cachemark_engine::CacheKind;

    fn keys(list: &[&str]) -> Vec<StrKey> {
        list.iter().map(|k| Arc::from(*k)).collect()
    }

    #[test]
    fn read_through_counts_first_touch_as_miss() {
        let cache = CacheKind::Lru.build(10);
        let rate = replay_keys(&*cache, &keys(&["a", "b", "a", "b"]));
        assert_eq!(rate, 50.0);
        assert_eq!(cache.get(&Arc::from("a")).as_deref(), Some("a"));
    }

    #[test]
    fn empty_sequence_scores_zero() {
        let cache = CacheKind::Lru.build(10);
        assert_eq!(replay_keys(&*cache, &[]), 0.0);
    }

    #[test]
    fn meta_sets_are_not_counted() {
        let cache = CacheKind::Lru.build(10);
        let op = |key: &str, action| TraceOp {
            key: Arc::from(key),
            action,
        };
        let ops = vec![
            op("a", Action::Set),
            op("a", Action::Get),
            op("b", Action::Other),
            op("b", Action::Get),
        ];
        // One hit (a), one miss (b); the SET and the unknown action are skipped
        assert_eq!(replay_ops(&*cache, &ops), 50.0);
    }

    #[test]
    fn table_covers_every_factory_and_size() {
        let factories = cachemark_engine::string_factories(&CacheFilter::only(["lru", "sieve"]));
        let replay = Replay::Keys(Arc::new(KeyGenerator::decimal_from(&generate_zipf(
            20_000, 2_000, 0.8, 42,
        ))));
        let table = hit_rate_table(&factories, &[100, 1_000], &replay, &ProgressBar::hidden());
        assert_eq!(table.len(), 2);
        for row in &table {
            assert_eq!(row.rates.len(), 2);
            assert!(row.rates.values().all(|r| (0.0..=100.0).contains(r)));
            assert!(row.rates[&1_000] >= row.rates[&100], "{:?}", row);
        }
    }

    #[test]
    fn missing_trace_is_reported_with_test_name() {
        let dir = tempfile::tempdir().unwrap();
        let store = TraceStore::new(dir.path());
        let err = run_hit_rate_test(
            HitRateTest::Cdn,
            &store,
            &CacheFilter::all(),
            &[100],
            &HitRateConfig::default(),
            &ProgressBar::hidden(),
        )
        .unwrap_err();
        assert!(format!("{:#}", err).starts_with("load CDN trace"));
    }
}
