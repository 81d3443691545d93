//! Memory Probe
//!
//! Fills one cache (or the baseline map) with `capacity` entries of
//! `value_size` bytes so the `cachemark-mem` binary can read its allocator
//! counter while the data is still resident. Each measurement runs in a
//! fresh process so caches cannot pollute each other's heap.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::cache::{CacheError, StrKey, StringCache};
use crate::registry::CacheKind;

/// Name the parent passes to measure a plain `HashMap<String, Vec<u8>>`.
pub const BASELINE_NAME: &str = "baseline";

/// One line of probe output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeReport {
    pub name: String,
    #[serde(default)]
    pub items: usize,
    #[serde(default)]
    pub bytes: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProbeReport {
    pub fn failed(name: impl Into<String>, error: impl ToString) -> Self {
        Self {
            name: name.into(),
            items: 0,
            bytes: 0,
            error: Some(error.to_string()),
        }
    }
}

/// Data kept alive while the allocator is sampled
pub enum Resident {
    Baseline(HashMap<String, Vec<u8>>),
    Cache(Arc<StringCache>),
}

impl Resident {
    /// Reported name: the cache's own name, or "map" for the baseline.
    pub fn name(&self) -> &str {
        match self {
            Resident::Baseline(_) => "map",
            Resident::Cache(cache) => cache.name(),
        }
    }

    pub fn items(&self) -> usize {
        match self {
            Resident::Baseline(map) => map.len(),
            Resident::Cache(cache) => cache.len(),
        }
    }

    /// Release anything the cache holds outside its own allocation.
    pub fn close(self) {
        if let Resident::Cache(cache) = self {
            cache.close();
        }
    }
}

/// Insert `capacity` keys `key-{i}` with fresh `value_size`-byte values.
pub fn fill(name: &str, capacity: usize, value_size: usize) -> Result<Resident, CacheError> {
    if capacity == 0 {
        return Err(CacheError::InvalidCapacity(capacity));
    }

    if name == BASELINE_NAME {
        let mut map = HashMap::with_capacity(capacity);
        for i in 0..capacity {
            map.insert(format!("key-{}", i), vec![b'x'; value_size]);
        }
        return Ok(Resident::Baseline(map));
    }

    let cache = CacheKind::from_name(name)?.build(capacity);
    for i in 0..capacity {
        let key: StrKey = Arc::from(format!("key-{}", i));
        let value: StrKey = Arc::from("x".repeat(value_size));
        cache.set(key, value);
    }
    Ok(Resident::Cache(cache))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_holds_every_item() {
        let resident = fill(BASELINE_NAME, 100, 16).unwrap();
        assert_eq!(resident.name(), "map");
        assert_eq!(resident.items(), 100);
    }

    #[test]
    fn cache_fill_reports_cache_name() {
        let resident = fill("lru", 50, 8).unwrap();
        assert_eq!(resident.name(), "lru");
        assert_eq!(resident.items(), 50);
        resident.close();
    }

    #[test]
    fn unknown_cache_is_an_error() {
        assert!(matches!(
            fill("nope", 10, 8),
            Err(CacheError::UnknownCache(_))
        ));
        assert!(matches!(
            fill("lru", 0, 8),
            Err(CacheError::InvalidCapacity(0))
        ));
    }

    #[test]
    fn report_error_field_is_optional() {
        let ok: ProbeReport =
            serde_json::from_str(r#"{"name":"lru","items":3,"bytes":900}"#).unwrap();
        assert_eq!(ok.error, None);
        assert_eq!(ok.bytes, 900);

        let line = serde_json::to_string(&ProbeReport::failed("x", "boom")).unwrap();
        assert!(line.contains(r#""error":"boom""#));
    }
}
