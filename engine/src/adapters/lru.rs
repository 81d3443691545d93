//! `lru` crate behind a parking_lot mutex.
//!
//! `LruCache::get` reorders the recency list, so even reads need `&mut`;
//! a single mutex serializes every operation.

use parking_lot::Mutex;

use super::{non_zero, CacheKey};
use crate::cache::{Cache, GetOrSetCache};

pub struct LruAdapter<K: CacheKey> {
    inner: Mutex<::lru::LruCache<K, K>>,
}

impl<K: CacheKey> LruAdapter<K> {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(::lru::LruCache::new(non_zero(capacity))),
        }
    }
}

impl<K: CacheKey> Cache<K> for LruAdapter<K> {
    fn get(&self, key: &K) -> Option<K> {
        self.inner.lock().get(key).cloned()
    }

    fn set(&self, key: K, value: K) {
        self.inner.lock().put(key, value);
    }

    fn name(&self) -> &str {
        "lru"
    }

    fn len(&self) -> usize {
        self.inner.lock().len()
    }

    fn as_get_or_set(&self) -> Option<&dyn GetOrSetCache<K>> {
        Some(self)
    }
}

impl<K: CacheKey> GetOrSetCache<K> for LruAdapter<K> {
    fn get_or_set(&self, key: K, value: K) -> K {
        self.inner.lock().get_or_insert(key, || value).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_least_recently_used() {
        let cache = LruAdapter::<u64>::new(2);
        cache.set(1, 1);
        cache.set(2, 2);
        assert_eq!(cache.get(&1), Some(1)); // 2 is now oldest
        cache.set(3, 3);

        assert_eq!(cache.get(&2), None);
        assert_eq!(cache.get(&1), Some(1));
        assert_eq!(cache.get(&3), Some(3));
    }

    #[test]
    fn get_or_set_keeps_existing_value() {
        let cache = LruAdapter::<u64>::new(8);
        cache.set(7, 70);
        assert_eq!(cache.get_or_set(7, 700), 70);
        assert_eq!(cache.get_or_set(8, 80), 80);
        assert_eq!(cache.len(), 2);
    }
}
