//! schnellru LRU map behind a parking_lot mutex.

use parking_lot::Mutex;
use ::schnellru::{ByLength, LruMap};

use super::CacheKey;
use crate::cache::{Cache, GetOrSetCache};

pub struct SchnellruAdapter<K: CacheKey> {
    inner: Mutex<LruMap<K, K, ByLength>>,
}

impl<K: CacheKey> SchnellruAdapter<K> {
    pub fn new(capacity: usize) -> Self {
        let limit = u32::try_from(capacity.max(1)).unwrap_or(u32::MAX);
        Self {
            inner: Mutex::new(LruMap::new(ByLength::new(limit))),
        }
    }
}

impl<K: CacheKey> Cache<K> for SchnellruAdapter<K> {
    fn get(&self, key: &K) -> Option<K> {
        self.inner.lock().get(key).map(|v| v.clone())
    }

    fn set(&self, key: K, value: K) {
        self.inner.lock().insert(key, value);
    }

    fn name(&self) -> &str {
        "schnellru"
    }

    fn len(&self) -> usize {
        self.inner.lock().len()
    }

    fn as_get_or_set(&self) -> Option<&dyn GetOrSetCache<K>> {
        Some(self)
    }
}

impl<K: CacheKey> GetOrSetCache<K> for SchnellruAdapter<K> {
    fn get_or_set(&self, key: K, value: K) -> K {
        // The limiter may refuse the insert; the caller still gets its value back.
        let fallback = value.clone();
        self.inner
            .lock()
            .get_or_insert(key, || value)
            .map(|v| v.clone())
            .unwrap_or(fallback)
    }
}
