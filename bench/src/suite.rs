//! Suite and test catalogue
//!
//! Every benchmark has a stable id (used by `--tests`), a display title (used
//! in tables and the medal table) and a JSON key.

use anyhow::Result;
use std::fmt;

/// Top-level benchmark suites, in run order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Suite {
    HitRate,
    Latency,
    Throughput,
    Memory,
}

impl Suite {
    pub const ALL: [Suite; 4] = [Suite::HitRate, Suite::Latency, Suite::Throughput, Suite::Memory];

    pub fn name(self) -> &'static str {
        match self {
            Suite::HitRate => "hitrate",
            Suite::Latency => "latency",
            Suite::Throughput => "throughput",
            Suite::Memory => "memory",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Suite::HitRate => "cache efficiency",
            Suite::Latency => "single-threaded (ns/op)",
            Suite::Throughput => "multi-threaded (QPS)",
            Suite::Memory => "overhead per item (isolated processes)",
        }
    }

    pub fn from_str(s: &str) -> Result<Self> {
        let s = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|suite| suite.name() == s)
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Unknown suite: {}. Use one of: {}",
                    s,
                    Self::ALL.map(Suite::name).join(", ")
                )
            })
    }

    /// Test ids belonging to this suite.
    pub fn tests(self) -> Vec<&'static str> {
        match self {
            Suite::HitRate => HitRateTest::ALL.iter().map(|t| t.id()).collect(),
            Suite::Latency => LatencyTest::ALL.iter().map(|t| t.id()).collect(),
            Suite::Throughput => ThroughputTest::ALL.iter().map(|t| t.id()).collect(),
            Suite::Memory => vec![MEMORY_TEST],
        }
    }
}

impl fmt::Display for Suite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Sole test of the memory suite.
pub const MEMORY_TEST: &str = "memory";

/// Every test id across all suites, in suite order.
pub fn all_test_ids() -> Vec<&'static str> {
    Suite::ALL.iter().flat_map(|s| s.tests()).collect()
}

/// Reject a test id no suite knows, listing the valid ones.
pub fn validate_test_id(id: &str) -> Result<()> {
    let valid = all_test_ids();
    if !valid.contains(&id) {
        anyhow::bail!(
            "Unknown test: {:?}\n\nAvailable tests:\n  {}",
            id,
            valid.join("\n  ")
        );
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HitRateTest {
    Cdn,
    Meta,
    Zipf,
    Twitter,
    Wikipedia,
    ThesiosBlock,
    ThesiosFile,
    IbmDocker,
    TencentPhoto,
}

impl HitRateTest {
    pub const ALL: [HitRateTest; 9] = [
        HitRateTest::Cdn,
        HitRateTest::Meta,
        HitRateTest::Zipf,
        HitRateTest::Twitter,
        HitRateTest::Wikipedia,
        HitRateTest::ThesiosBlock,
        HitRateTest::ThesiosFile,
        HitRateTest::IbmDocker,
        HitRateTest::TencentPhoto,
    ];

    pub fn id(self) -> &'static str {
        match self {
            HitRateTest::Cdn => "cdn",
            HitRateTest::Meta => "meta",
            HitRateTest::Zipf => "zipf",
            HitRateTest::Twitter => "twitter",
            HitRateTest::Wikipedia => "wikipedia",
            HitRateTest::ThesiosBlock => "thesios-block",
            HitRateTest::ThesiosFile => "thesios-file",
            HitRateTest::IbmDocker => "ibm-docker",
            HitRateTest::TencentPhoto => "tencent-photo",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            HitRateTest::Cdn => "CDN",
            HitRateTest::Meta => "Meta",
            HitRateTest::Zipf => "Zipf",
            HitRateTest::Twitter => "Twitter",
            HitRateTest::Wikipedia => "Wikipedia",
            HitRateTest::ThesiosBlock => "Thesios Block",
            HitRateTest::ThesiosFile => "Thesios File",
            HitRateTest::IbmDocker => "IBM Docker",
            HitRateTest::TencentPhoto => "Tencent Photo",
        }
    }

    pub fn json_key(self) -> &'static str {
        match self {
            HitRateTest::Cdn => "cdn",
            HitRateTest::Meta => "meta",
            HitRateTest::Zipf => "zipf",
            HitRateTest::Twitter => "twitter",
            HitRateTest::Wikipedia => "wikipedia",
            HitRateTest::ThesiosBlock => "thesiosBlock",
            HitRateTest::ThesiosFile => "thesiosFile",
            HitRateTest::IbmDocker => "ibmDocker",
            HitRateTest::TencentPhoto => "tencentPhoto",
        }
    }

    /// Average bytes per entry (key + value + ~32 bytes bookkeeping), for
    /// byte-budgeted caches.
    pub fn entry_size(self) -> usize {
        match self {
            HitRateTest::Cdn => 190,
            HitRateTest::Meta => 55,
            HitRateTest::Zipf => 45,
            HitRateTest::Twitter => 110,
            HitRateTest::Wikipedia => 55,
            HitRateTest::ThesiosBlock => 180,
            HitRateTest::ThesiosFile => 160,
            HitRateTest::IbmDocker => 115,
            HitRateTest::TencentPhoto => 115,
        }
    }

    /// Trace description printed above each table.
    pub fn info(self) -> &'static str {
        match self {
            HitRateTest::Cdn => "CDN production trace (2M ops, ~768K unique keys)",
            HitRateTest::Meta => "Meta KVCache production trace (3M ops)",
            HitRateTest::Zipf => "Zipf synthetic (alpha=0.8, 2M ops, 100K keyspace)",
            HitRateTest::Twitter => "Twitter production cache trace (2M ops, cluster001+cluster052)",
            HitRateTest::Wikipedia => "Wikipedia CDN upload trace (2M ops, upload.wikimedia.org)",
            HitRateTest::ThesiosBlock => {
                "Google Thesios I/O block trace (400K reads, ~322K unique blocks)"
            }
            HitRateTest::ThesiosFile => {
                "Google Thesios I/O file trace (400K reads, ~46K unique files)"
            }
            HitRateTest::IbmDocker => "IBM Docker Registry trace (725K GETs, ~121K unique URIs)",
            HitRateTest::TencentPhoto => {
                "Tencent Photo trace (2M requests, ~1.34M unique photos)"
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LatencyTest {
    String,
    Int,
    GetOrSet,
}

impl LatencyTest {
    pub const ALL: [LatencyTest; 3] = [LatencyTest::String, LatencyTest::Int, LatencyTest::GetOrSet];

    pub fn id(self) -> &'static str {
        match self {
            LatencyTest::String => "string",
            LatencyTest::Int => "int",
            LatencyTest::GetOrSet => "getorset",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            LatencyTest::String => "String Keys",
            LatencyTest::Int => "Int Keys",
            LatencyTest::GetOrSet => "GetOrSet",
        }
    }

    pub fn info(self) -> &'static str {
        match self {
            LatencyTest::String => "string key Get/Set operations",
            LatencyTest::Int => "int key Get/Set operations",
            LatencyTest::GetOrSet => "GetOrSet operations (URL keys)",
        }
    }
}

/// Operation mix of a throughput trial
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mix {
    Get,
    Set,
    /// `i % 4 == 3` writes, the rest read
    Mixed,
    GetOrSet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThroughputTest {
    StringGet,
    StringSet,
    StringMixed,
    IntGet,
    IntSet,
    IntMixed,
    GetOrSet,
}

impl ThroughputTest {
    pub const ALL: [ThroughputTest; 7] = [
        ThroughputTest::StringGet,
        ThroughputTest::StringSet,
        ThroughputTest::StringMixed,
        ThroughputTest::IntGet,
        ThroughputTest::IntSet,
        ThroughputTest::IntMixed,
        ThroughputTest::GetOrSet,
    ];

    pub fn id(self) -> &'static str {
        match self {
            ThroughputTest::StringGet => "string-get-throughput",
            ThroughputTest::StringSet => "string-set-throughput",
            ThroughputTest::StringMixed => "string-mixed-throughput",
            ThroughputTest::IntGet => "int-get-throughput",
            ThroughputTest::IntSet => "int-set-throughput",
            ThroughputTest::IntMixed => "int-mixed-throughput",
            ThroughputTest::GetOrSet => "getorset-throughput",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            ThroughputTest::StringGet => "String Get",
            ThroughputTest::StringSet => "String Set",
            ThroughputTest::StringMixed => "String Mixed",
            ThroughputTest::IntGet => "Int Get",
            ThroughputTest::IntSet => "Int Set",
            ThroughputTest::IntMixed => "Int Mixed",
            ThroughputTest::GetOrSet => "GetOrSet",
        }
    }

    pub fn json_key(self) -> &'static str {
        match self {
            ThroughputTest::StringGet => "stringGet",
            ThroughputTest::StringSet => "stringSet",
            ThroughputTest::StringMixed => "stringMixed",
            ThroughputTest::IntGet => "intGet",
            ThroughputTest::IntSet => "intSet",
            ThroughputTest::IntMixed => "intMixed",
            ThroughputTest::GetOrSet => "getOrSet",
        }
    }

    pub fn mix(self) -> Mix {
        match self {
            ThroughputTest::StringGet | ThroughputTest::IntGet => Mix::Get,
            ThroughputTest::StringSet | ThroughputTest::IntSet => Mix::Set,
            ThroughputTest::StringMixed | ThroughputTest::IntMixed => Mix::Mixed,
            ThroughputTest::GetOrSet => Mix::GetOrSet,
        }
    }

    pub fn int_keys(self) -> bool {
        matches!(
            self,
            ThroughputTest::IntGet | ThroughputTest::IntSet | ThroughputTest::IntMixed
        )
    }

    pub fn info(self, cache_size: usize) -> String {
        let k = cache_size / 1024;
        match self {
            ThroughputTest::StringGet => format!("string keys, Get only, Zipf, {}K cache", k),
            ThroughputTest::StringSet => format!("string keys, Set only, Zipf, {}K cache", k),
            ThroughputTest::StringMixed => {
                format!("string keys, 75% Get / 25% Set, Zipf, {}K cache", k)
            }
            ThroughputTest::IntGet => format!("int keys, Get only, Zipf, {}K cache", k),
            ThroughputTest::IntSet => format!("int keys, Set only, Zipf, {}K cache", k),
            ThroughputTest::IntMixed => format!("int keys, 75% Get / 25% Set, Zipf, {}K cache", k),
            ThroughputTest::GetOrSet => format!("GetOrSet operations (URL keys), {}K cache", k),
        }
    }
}
