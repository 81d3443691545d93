use cachemark_engine::{int_factories, string_factories, CacheFilter, CacheKind, StrKey};
use std::sync::Arc;
use std::thread;

fn key(s: &str) -> StrKey {
    Arc::from(s)
}

#[test]
fn set_then_get_returns_value() {
    for factory in string_factories(&CacheFilter::all()) {
        let cache = factory.build(128);
        cache.set(key("alpha"), key("one"));
        assert_eq!(
            cache.get(&key("alpha")).as_deref(),
            Some("one"),
            "{}",
            factory.name()
        );
        assert_eq!(cache.get(&key("beta")), None, "{}", factory.name());
        cache.close();
    }
}

#[test]
fn overwrite_replaces_value() {
    for factory in int_factories(&CacheFilter::all()) {
        let cache = factory.build(128);
        cache.set(5, 50);
        cache.set(5, 500);
        assert_eq!(cache.get(&5), Some(500), "{}", factory.name());
        assert_eq!(cache.len(), 1, "{}", factory.name());
        cache.close();
    }
}

#[test]
fn instance_name_matches_registry_name() {
    for kind in CacheKind::ALL {
        let cache = kind.build(16);
        assert_eq!(cache.name(), kind.name());
        cache.close();
    }
}

#[test]
fn count_bounded_caches_respect_capacity() {
    // moka-weighted is bounded by bytes, not entries
    let filter = CacheFilter::only(["quick_cache", "moka", "lru", "schnellru", "sieve", "clock"]);
    for factory in int_factories(&filter) {
        let cache = factory.build(256);
        for i in 0..10_000u64 {
            cache.set(i, i);
        }
        // quick_cache rounds capacity up to its shard granularity
        assert!(
            cache.len() <= 256 * 2,
            "{} holds {} entries",
            factory.name(),
            cache.len()
        );
        assert!(!cache.is_empty(), "{}", factory.name());
        cache.close();
    }
}

#[test]
fn get_or_set_returns_existing_then_stores_new() {
    for factory in string_factories(&CacheFilter::all()) {
        let cache = factory.build(128);
        let Some(gos) = cache.as_get_or_set() else {
            cache.close();
            continue;
        };

        assert_eq!(&*gos.get_or_set(key("k"), key("first")), "first", "{}", factory.name());
        assert_eq!(&*gos.get_or_set(key("k"), key("second")), "first", "{}", factory.name());
        assert_eq!(cache.get(&key("k")).as_deref(), Some("first"), "{}", factory.name());
        cache.close();
    }
}

#[test]
fn concurrent_mixed_operations() {
    for factory in int_factories(&CacheFilter::all()) {
        let cache = factory.build(1024);
        let mut handles = vec![];

        for t in 0..8u64 {
            let cache = Arc::clone(&cache);
            handles.push(thread::spawn(move || {
                for i in 0..5_000u64 {
                    let k = (i * 7 + t) % 4096;
                    if i % 4 == 3 {
                        cache.set(k, k);
                    } else if let Some(v) = cache.get(&k) {
                        assert_eq!(v, k);
                    }
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }
        assert!(cache.len() <= 1024 * 2, "{}", factory.name());
        cache.close();
    }
}

#[cfg(test)]
mod properties {
    use cachemark_engine::CacheKind;
    use proptest::prelude::*;
    use std::collections::HashMap;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// Whatever a cache returns must be the last value written for that key.
        #[test]
        fn hits_are_never_stale(ops in prop::collection::vec((0u64..64, 0u64..1_000), 1..400)) {
            for kind in [CacheKind::Lru, CacheKind::Sieve, CacheKind::Clock, CacheKind::Schnellru] {
                let cache = kind.build_int(16).unwrap();
                let mut latest = HashMap::new();
                for &(k, v) in &ops {
                    cache.set(k, v);
                    latest.insert(k, v);
                    prop_assert!(cache.len() <= 16);
                }
                for (k, v) in &latest {
                    if let Some(got) = cache.get(k) {
                        prop_assert_eq!(got, *v);
                    }
                }
            }
        }
    }
}
