//! Cache Registry
//!
//! Catalogue of every cache the benchmark knows how to build, in display
//! order, plus the filter that narrows a run to a subset of them.
//!
//! Suites never construct adapters directly. They ask for a list of
//! [`CacheFactory`] values (string-keyed, sized or integer-keyed) and build a
//! fresh instance per trial.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::adapters::{
    moka::DEFAULT_ENTRY_SIZE, ClockCache, LruAdapter, MokaAdapter, QuickCacheAdapter,
    SchnellruAdapter, SieveCache,
};
use crate::cache::{Cache, CacheError, IntCache, StrKey, StringCache};

/// Known cache implementations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKind {
    QuickCache,
    Moka,
    MokaWeighted,
    Lru,
    Schnellru,
    Sieve,
    Clock,
}

impl CacheKind {
    /// Display order for tables and reports.
    pub const ALL: [CacheKind; 7] = [
        CacheKind::QuickCache,
        CacheKind::Moka,
        CacheKind::MokaWeighted,
        CacheKind::Lru,
        CacheKind::Schnellru,
        CacheKind::Sieve,
        CacheKind::Clock,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CacheKind::QuickCache => "quick_cache",
            CacheKind::Moka => "moka",
            CacheKind::MokaWeighted => "moka-weighted",
            CacheKind::Lru => "lru",
            CacheKind::Schnellru => "schnellru",
            CacheKind::Sieve => "sieve",
            CacheKind::Clock => "clock",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, CacheError> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == name)
            .ok_or_else(|| CacheError::UnknownCache(name.to_string()))
    }

    /// Byte-budgeted caches size their store from `capacity * entry_size`.
    pub fn is_sized(self) -> bool {
        matches!(self, CacheKind::MokaWeighted)
    }

    /// String-keyed instance with `capacity` entries.
    pub fn build(self, capacity: usize) -> Arc<StringCache> {
        self.build_sized(capacity, DEFAULT_ENTRY_SIZE)
    }

    /// String-keyed instance; `entry_size` is ignored by count-bounded caches.
    pub fn build_sized(self, capacity: usize, entry_size: usize) -> Arc<StringCache> {
        match self {
            CacheKind::QuickCache => Arc::new(QuickCacheAdapter::<StrKey>::new(capacity)),
            CacheKind::Moka => Arc::new(MokaAdapter::<StrKey>::new(capacity)),
            CacheKind::MokaWeighted => Arc::new(MokaAdapter::weighted(capacity, entry_size)),
            CacheKind::Lru => Arc::new(LruAdapter::<StrKey>::new(capacity)),
            CacheKind::Schnellru => Arc::new(SchnellruAdapter::<StrKey>::new(capacity)),
            CacheKind::Sieve => Arc::new(SieveCache::<StrKey>::new(capacity)),
            CacheKind::Clock => Arc::new(ClockCache::<StrKey>::new(capacity)),
        }
    }

    /// Constructor for the `u64`-keyed variant; `None` for string-only caches.
    pub fn int_builder(self) -> Option<fn(usize) -> Arc<IntCache>> {
        let build: fn(usize) -> Arc<IntCache> = match self {
            CacheKind::QuickCache => |capacity| int_cache(QuickCacheAdapter::<u64>::new(capacity)),
            CacheKind::Moka => |capacity| int_cache(MokaAdapter::<u64>::new(capacity)),
            CacheKind::Lru => |capacity| int_cache(LruAdapter::<u64>::new(capacity)),
            CacheKind::Schnellru => |capacity| int_cache(SchnellruAdapter::<u64>::new(capacity)),
            CacheKind::Sieve => |capacity| int_cache(SieveCache::<u64>::new(capacity)),
            CacheKind::Clock => |capacity| int_cache(ClockCache::<u64>::new(capacity)),
            CacheKind::MokaWeighted => return None,
        };
        Some(build)
    }

    /// Integer-keyed instance, for caches that take `u64` keys natively.
    pub fn build_int(self, capacity: usize) -> Option<Arc<IntCache>> {
        self.int_builder().map(|build| build(capacity))
    }

    pub fn has_int_variant(self) -> bool {
        self.int_builder().is_some()
    }
}

fn int_cache<C: Cache<u64> + 'static>(cache: C) -> Arc<IntCache> {
    Arc::new(cache)
}

impl fmt::Display for CacheKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Names of every registered cache, ignoring any filter.
pub fn available_names() -> Vec<&'static str> {
    CacheKind::ALL.iter().map(|kind| kind.name()).collect()
}

/// Which caches participate in a run
///
/// An empty filter selects everything. Passed explicitly to every suite.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheFilter {
    names: Option<BTreeSet<String>>,
}

impl CacheFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn only<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names: BTreeSet<String> = names
            .into_iter()
            .map(|n| n.as_ref().trim().to_string())
            .filter(|n| !n.is_empty())
            .collect();
        if names.is_empty() {
            Self::all()
        } else {
            Self { names: Some(names) }
        }
    }

    pub fn allows(&self, name: &str) -> bool {
        match &self.names {
            Some(names) => names.contains(name),
            None => true,
        }
    }

    /// Reject names that match no registered cache.
    pub fn validate(&self) -> Result<(), CacheError> {
        if let Some(names) = &self.names {
            for name in names {
                CacheKind::from_name(name)?;
            }
        }
        Ok(())
    }

    /// Selected caches in display order.
    pub fn kinds(&self) -> Vec<CacheKind> {
        CacheKind::ALL
            .into_iter()
            .filter(|kind| self.allows(kind.name()))
            .collect()
    }
}

/// Builder closure shared by every trial of one implementation.
pub type BuildFn<K> = dyn Fn(usize) -> Arc<dyn Cache<K>> + Send + Sync;

/// Named, capacity-parameterized constructor for one implementation
pub struct CacheFactory<K> {
    name: String,
    build: Arc<BuildFn<K>>,
}

impl<K> Clone for CacheFactory<K> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            build: Arc::clone(&self.build),
        }
    }
}

impl<K> fmt::Debug for CacheFactory<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheFactory").field("name", &self.name).finish()
    }
}

impl<K: 'static> CacheFactory<K> {
    pub fn new<F>(name: impl Into<String>, build: F) -> Self
    where
        F: Fn(usize) -> Arc<dyn Cache<K>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            build: Arc::new(build),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fresh, empty instance.
    pub fn build(&self, capacity: usize) -> Arc<dyn Cache<K>> {
        (self.build)(capacity)
    }

    /// Probe a throwaway instance for the GetOrSet capability.
    pub fn supports_get_or_set(&self, capacity: usize) -> bool {
        let cache = self.build(capacity);
        let supported = cache.as_get_or_set().is_some();
        cache.close();
        debug!(cache = %self.name, supported, "get_or_set capability probed");
        supported
    }
}

/// String-keyed factories for the selected caches.
pub fn string_factories(filter: &CacheFilter) -> Vec<CacheFactory<StrKey>> {
    filter
        .kinds()
        .into_iter()
        .map(|kind| CacheFactory::new(kind.name(), move |capacity| kind.build(capacity)))
        .collect()
}

/// String-keyed factories where byte-budgeted caches are sized for `entry_size`.
pub fn sized_factories(filter: &CacheFilter, entry_size: usize) -> Vec<CacheFactory<StrKey>> {
    filter
        .kinds()
        .into_iter()
        .map(|kind| {
            CacheFactory::new(kind.name(), move |capacity| {
                kind.build_sized(capacity, entry_size)
            })
        })
        .collect()
}

/// Integer-keyed factories for the selected caches that have an int variant.
pub fn int_factories(filter: &CacheFilter) -> Vec<CacheFactory<u64>> {
    filter
        .kinds()
        .into_iter()
        .filter_map(|kind| Some(CacheFactory::new(kind.name(), kind.int_builder()?)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for kind in CacheKind::ALL {
            assert_eq!(CacheKind::from_name(kind.name()).unwrap(), kind);
        }
        assert!(CacheKind::from_name("otter").is_err());
    }

    #[test]
    fn empty_filter_selects_everything() {
        let filter = CacheFilter::only(Vec::<String>::new());
        assert_eq!(filter, CacheFilter::all());
        assert_eq!(filter.kinds().len(), CacheKind::ALL.len());
    }

    #[test]
    fn filter_keeps_display_order() {
        let filter = CacheFilter::only(["clock", " lru ", "quick_cache"]);
        let names: Vec<_> = filter.kinds().into_iter().map(CacheKind::name).collect();
        assert_eq!(names, vec!["quick_cache", "lru", "clock"]);
    }

    #[test]
    fn unknown_filter_name_is_rejected() {
        let filter = CacheFilter::only(["lru", "nope"]);
        let err = filter.validate().unwrap_err();
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn int_factories_skip_string_only_caches() {
        let names: Vec<_> = int_factories(&CacheFilter::all())
            .iter()
            .map(|f| f.name().to_string())
            .collect();
        assert!(!names.contains(&"moka-weighted".to_string()));
        assert!(names.contains(&"sieve".to_string()));
    }

    #[test]
    fn int_factories_build_the_cache_they_name() {
        let factories = int_factories(&CacheFilter::all());
        assert_eq!(factories.len(), CacheKind::ALL.len() - 1);
        for factory in &factories {
            let cache = factory.build(32);
            assert_eq!(cache.name(), factory.name());
            cache.close();
        }

        // A string-only cache selected alone yields no int factory at all
        assert!(int_factories(&CacheFilter::only(["moka-weighted"])).is_empty());
        assert!(CacheKind::MokaWeighted.build_int(32).is_none());
    }

    #[test]
    fn capability_probe_matches_adapters() {
        let factories = string_factories(&CacheFilter::all());
        let supported: Vec<_> = factories
            .iter()
            .filter(|f| f.supports_get_or_set(64))
            .map(|f| f.name().to_string())
            .collect();
        assert_eq!(supported, vec!["quick_cache", "moka", "lru", "schnellru"]);
    }
}
