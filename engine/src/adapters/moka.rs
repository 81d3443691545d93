//! moka sync cache (W-TinyLFU admission, concurrent hash table).

use ::moka::sync::Cache as Moka;

use super::CacheKey;
use crate::cache::{Cache, GetOrSetCache, StrKey};

/// Per-entry bookkeeping charged by the weighted variant on top of key and value bytes.
const ENTRY_OVERHEAD_BYTES: usize = 32;

/// Entry size assumed when the weighted variant is built without a trace hint.
pub const DEFAULT_ENTRY_SIZE: usize = 64;

pub struct MokaAdapter<K: CacheKey> {
    inner: Moka<K, K>,
    name: &'static str,
    get_or_set: bool,
}

impl<K: CacheKey> MokaAdapter<K> {
    /// Entry-count bounded cache.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Moka::new(capacity.max(1) as u64),
            name: "moka",
            get_or_set: true,
        }
    }
}

impl MokaAdapter<StrKey> {
    /// Byte-budgeted cache: `capacity * entry_size` bytes, each entry weighed
    /// by its key and value lengths plus fixed overhead.
    pub fn weighted(capacity: usize, entry_size: usize) -> Self {
        let budget = capacity.max(1).saturating_mul(entry_size.max(1)) as u64;
        let inner = Moka::builder()
            .max_capacity(budget)
            .weigher(|key: &StrKey, value: &StrKey| -> u32 {
                u32::try_from(key.len() + value.len() + ENTRY_OVERHEAD_BYTES).unwrap_or(u32::MAX)
            })
            .build();
        Self {
            inner,
            name: "moka-weighted",
            get_or_set: false,
        }
    }
}

impl<K: CacheKey> Cache<K> for MokaAdapter<K> {
    fn get(&self, key: &K) -> Option<K> {
        self.inner.get(key)
    }

    fn set(&self, key: K, value: K) {
        self.inner.insert(key, value);
    }

    fn name(&self) -> &str {
        self.name
    }

    fn len(&self) -> usize {
        // entry_count lags until pending maintenance has been applied
        self.inner.run_pending_tasks();
        self.inner.entry_count() as usize
    }

    fn close(&self) {
        self.inner.invalidate_all();
        self.inner.run_pending_tasks();
    }

    fn as_get_or_set(&self) -> Option<&dyn GetOrSetCache<K>> {
        if self.get_or_set {
            Some(self)
        } else {
            None
        }
    }
}

impl<K: CacheKey> GetOrSetCache<K> for MokaAdapter<K> {
    fn get_or_set(&self, key: K, value: K) -> K {
        self.inner.get_with(key, || value)
    }
}
