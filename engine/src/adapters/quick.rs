//! quick_cache sync cache (CLOCK-Pro, sharded).

use std::convert::Infallible;

use super::CacheKey;
use crate::cache::{Cache, GetOrSetCache};

pub struct QuickCacheAdapter<K: CacheKey> {
    inner: quick_cache::sync::Cache<K, K>,
}

impl<K: CacheKey> QuickCacheAdapter<K> {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: quick_cache::sync::Cache::new(capacity.max(1)),
        }
    }
}

impl<K: CacheKey> Cache<K> for QuickCacheAdapter<K> {
    fn get(&self, key: &K) -> Option<K> {
        self.inner.get(key)
    }

    fn set(&self, key: K, value: K) {
        self.inner.insert(key, value);
    }

    fn name(&self) -> &str {
        "quick_cache"
    }

    fn len(&self) -> usize {
        self.inner.len()
    }

    fn as_get_or_set(&self) -> Option<&dyn GetOrSetCache<K>> {
        Some(self)
    }
}

impl<K: CacheKey> GetOrSetCache<K> for QuickCacheAdapter<K> {
    fn get_or_set(&self, key: K, value: K) -> K {
        match self
            .inner
            .get_or_insert_with(&key, || Ok::<K, Infallible>(value))
        {
            Ok(v) => v,
            Err(never) => match never {},
        }
    }
}
