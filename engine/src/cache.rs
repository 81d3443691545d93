//! Cache Contract
//!
//! Every implementation under test is driven through [`Cache`]. The harness
//! never looks behind this trait: eviction policy, sharding and locking are
//! all internal to the adapter.
//!
//! Keys double as values. String-keyed caches store `Arc<str>` so the harness
//! can hand the same key to `set` millions of times without copying bytes;
//! integer-keyed caches store `u64`.

use std::fmt;
use std::sync::Arc;

/// String key (and value) type shared by every string-keyed adapter.
pub type StrKey = Arc<str>;

/// String-keyed cache handle.
pub type StringCache = dyn Cache<StrKey>;

/// Integer-keyed cache handle.
pub type IntCache = dyn Cache<u64>;

/// Minimal cache interface for benchmarking
///
/// Implementations must be safe to share across threads: the throughput
/// harness drives one instance from many workers at once.
pub trait Cache<K>: Send + Sync {
    /// Look up `key`, returning the stored value on a hit.
    fn get(&self, key: &K) -> Option<K>;

    /// Insert or overwrite `key`.
    fn set(&self, key: K, value: K);

    /// Registry name (e.g. "moka").
    fn name(&self) -> &str;

    /// Number of resident entries.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Release background resources. Called exactly once per instance.
    fn close(&self) {}

    /// Optional atomic get-or-set capability.
    fn as_get_or_set(&self) -> Option<&dyn GetOrSetCache<K>> {
        None
    }
}

/// Atomic "return existing, else store and return supplied" capability
pub trait GetOrSetCache<K>: Send + Sync {
    fn get_or_set(&self, key: K, value: K) -> K;
}

/// Errors raised while building caches or talking to the memory probe
#[derive(Debug)]
pub enum CacheError {
    UnknownCache(String),
    InvalidCapacity(usize),
    Probe(String),
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::UnknownCache(name) => write!(f, "unknown cache: {}", name),
            CacheError::InvalidCapacity(cap) => write!(f, "invalid cache capacity: {}", cap),
            CacheError::Probe(msg) => write!(f, "memory probe failed: {}", msg),
        }
    }
}

impl std::error::Error for CacheError {}
