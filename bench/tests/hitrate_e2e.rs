// Hit-rate replay against a cache that never evicts, plus size monotonicity
// for the registered adapters.

use cachemark_bench::runner::{hitrate::hit_rate_table, replay_keys, Replay};
use cachemark_bench::workload::{generate_zipf, KeyGenerator};
use cachemark_engine::{string_factories, Cache, CacheFactory, CacheFilter, StrKey};
use indicatif::ProgressBar;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Map-backed cache with no capacity limit
#[derive(Default)]
struct MapCache {
    map: RwLock<HashMap<StrKey, StrKey>>,
}

impl Cache<StrKey> for MapCache {
    fn get(&self, key: &StrKey) -> Option<StrKey> {
        self.map.read().get(key).cloned()
    }

    fn set(&self, key: StrKey, value: StrKey) {
        self.map.write().insert(key, value);
    }

    fn name(&self) -> &str {
        "map"
    }

    fn len(&self) -> usize {
        self.map.read().len()
    }
}

#[test]
fn unbounded_map_misses_once_per_distinct_key() {
    let n = 2_000_000;
    let raw = generate_zipf(n, 100_000, 0.8, 42);
    let distinct = raw.iter().collect::<HashSet<_>>().len();
    let keys = KeyGenerator::decimal_from(&raw);

    let cache = MapCache::default();
    let rate = replay_keys(&cache, &keys);

    let expected = (n - distinct) as f64 / n as f64 * 100.0;
    assert!((rate - expected).abs() < 1e-9, "rate={} expected={}", rate, expected);
    assert_eq!(cache.len(), distinct);
    // Nearly the whole keyspace is touched at this skew
    assert!(distinct > 80_000, "distinct={}", distinct);
    assert!(rate > 90.0 && rate < 99.0, "rate={}", rate);
}

#[test]
fn second_pass_over_a_resident_trace_always_hits() {
    let keys = KeyGenerator::decimal_from(&generate_zipf(50_000, 5_000, 0.8, 7));
    let cache = MapCache::default();
    replay_keys(&cache, &keys);
    assert_eq!(replay_keys(&cache, &keys), 100.0);
}

fn zipf_replay() -> Replay {
    Replay::Keys(Arc::new(KeyGenerator::decimal_from(&generate_zipf(
        200_000, 20_000, 0.8, 42,
    ))))
}

const SIZES: [usize; 4] = [500, 1_000, 2_000, 4_000];

#[test]
fn lru_hit_rate_is_monotonic_in_size() {
    let factories = string_factories(&CacheFilter::only(["lru"]));
    let table = hit_rate_table(&factories, &SIZES, &zipf_replay(), &ProgressBar::hidden());
    let rates: Vec<f64> = table[0].rates.values().copied().collect();
    assert!(rates.windows(2).all(|w| w[0] <= w[1]), "{:?}", rates);
}

#[test]
fn every_adapter_stays_in_bounds_and_grows_with_size() {
    let factories: Vec<CacheFactory<StrKey>> = string_factories(&CacheFilter::all());
    let table = hit_rate_table(&factories, &SIZES, &zipf_replay(), &ProgressBar::hidden());
    assert_eq!(table.len(), factories.len());

    for row in &table {
        let rates: Vec<f64> = SIZES.iter().map(|s| row.rates[s]).collect();
        assert!(
            rates.iter().all(|r| (0.0..=100.0).contains(r)),
            "{}: {:?}",
            row.name,
            rates
        );
        // Admission-filtered and approximate policies get a little slack
        assert!(
            rates.windows(2).all(|w| w[1] + 1.0 >= w[0]),
            "{}: {:?}",
            row.name,
            rates
        );
        assert!(rates[3] > rates[0], "{}: {:?}", row.name, rates);
    }
}
