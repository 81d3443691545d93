//! cachemark engine
//!
//! The pieces of the cache benchmark that know about caches: the [`Cache`]
//! contract, one adapter per implementation, the registry that names and
//! builds them, and the in-process half of the memory probe.
//!
//! # Architecture
//!
//! ```text
//! cache.rs          Cache / GetOrSetCache traits, CacheError
//! adapters/         quick_cache, moka, lru, schnellru, sieve, clock
//! registry.rs       CacheKind catalogue, CacheFilter, CacheFactory
//! memory_probe.rs   fill-and-report routine behind the cachemark-mem binary
//! ```
//!
//! Workload generation, timing and reporting live in `cachemark-bench`.

pub mod adapters;
pub mod cache;
pub mod memory_probe;
pub mod registry;

pub use cache::{Cache, CacheError, GetOrSetCache, IntCache, StrKey, StringCache};
pub use memory_probe::{ProbeReport, BASELINE_NAME};
pub use registry::{
    available_names, int_factories, sized_factories, string_factories, CacheFactory, CacheFilter,
    CacheKind,
};
