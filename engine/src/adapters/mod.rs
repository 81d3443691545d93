//! Cache Adapters
//!
//! Thin wrappers that put third-party and in-tree caches behind [`Cache`].
//! Each adapter is generic over the key type so one implementation serves
//! both the string-keyed and integer-keyed suites.
//!
//! [`Cache`]: crate::cache::Cache

use std::hash::Hash;
use std::num::NonZeroUsize;

pub mod clock;
pub mod lru;
pub mod moka;
pub mod quick;
pub mod schnellru;
pub mod sieve;

pub use self::clock::ClockCache;
pub use self::lru::LruAdapter;
pub use self::moka::MokaAdapter;
pub use self::quick::QuickCacheAdapter;
pub use self::schnellru::SchnellruAdapter;
pub use self::sieve::SieveCache;

/// Bounds every adapter needs from its key type.
pub trait CacheKey: Hash + Eq + Clone + Send + Sync + 'static {}

impl<T> CacheKey for T where T: Hash + Eq + Clone + Send + Sync + 'static {}

/// Zero-capacity caches are meaningless for benchmarking; clamp to one slot.
pub(crate) fn non_zero(capacity: usize) -> NonZeroUsize {
    NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN)
}
