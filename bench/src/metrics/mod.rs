//! Benchmark result tables, ranking and report writers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::suite::{HitRateTest, ThroughputTest};

pub mod export;
pub mod ranking;
pub mod reporter;

pub use export::{write_csv, write_json, write_markdown, JsonResults};
pub use ranking::{
    compute_rankings, format_winners, round3, BenchmarkMedal, CategoryMedals, MedalTable, Ranking,
    WinnerEntry,
};
pub use reporter::ResultsReporter;

/// Hit rate (percent) per cache size for one implementation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HitRateResult {
    pub name: String,
    pub rates: BTreeMap<usize, f64>,
}

impl HitRateResult {
    /// Mean over `sizes`; a size with no recorded rate counts as 0.
    pub fn average(&self, sizes: &[usize]) -> f64 {
        if sizes.is_empty() {
            return 0.0;
        }
        let sum: f64 = sizes
            .iter()
            .map(|size| self.rates.get(size).copied().unwrap_or(0.0))
            .sum();
        sum / sizes.len() as f64
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HitRateTable {
    pub test: HitRateTest,
    pub results: Vec<HitRateResult>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HitRateData {
    pub sizes: Vec<usize>,
    pub tables: Vec<HitRateTable>,
}

impl HitRateData {
    pub fn table(&self, test: HitRateTest) -> &[HitRateResult] {
        self.tables
            .iter()
            .find(|t| t.test == test)
            .map(|t| t.results.as_slice())
            .unwrap_or(&[])
    }
}

/// Single-threaded Get/Set/SetEvict cost for one implementation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatencyResult {
    pub name: String,
    pub get_ns: f64,
    pub get_allocs: u64,
    pub set_ns: f64,
    pub set_allocs: u64,
    pub set_evict_ns: f64,
    pub set_evict_allocs: u64,
}

impl LatencyResult {
    /// Ranking score: mean of Get and Set.
    pub fn avg_ns(&self) -> f64 {
        (self.get_ns + self.set_ns) / 2.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetOrSetLatencyResult {
    pub name: String,
    pub ns: f64,
    pub allocs: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LatencyData {
    pub string: Vec<LatencyResult>,
    pub int: Vec<LatencyResult>,
    pub get_or_set: Vec<GetOrSetLatencyResult>,
}

/// Ops/sec per thread count for one implementation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThroughputResult {
    pub name: String,
    pub qps: BTreeMap<usize, f64>,
}

impl ThroughputResult {
    /// Mean over every recorded thread count.
    pub fn avg_qps(&self) -> f64 {
        if self.qps.is_empty() {
            return 0.0;
        }
        self.qps.values().sum::<f64>() / self.qps.len() as f64
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThroughputTable {
    pub test: ThroughputTest,
    pub results: Vec<ThroughputResult>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThroughputData {
    pub threads: Vec<usize>,
    pub tables: Vec<ThroughputTable>,
}

impl ThroughputData {
    pub fn table(&self, test: ThroughputTest) -> &[ThroughputResult] {
        self.tables
            .iter()
            .find(|t| t.test == test)
            .map(|t| t.results.as_slice())
            .unwrap_or(&[])
    }
}

/// Resident heap of one implementation filled to capacity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryResult {
    pub name: String,
    pub items: usize,
    pub bytes: u64,
    /// Bytes per item above the baseline map; negative when leaner
    pub bytes_per_item: i64,
    pub baseline_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryData {
    pub results: Vec<MemoryResult>,
    pub capacity: usize,
    pub val_size: usize,
}

/// Environment the run was recorded on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineInfo {
    pub os: String,
    pub arch: String,
    pub num_cpu: usize,
    pub version: String,
    pub git_commit: String,
    pub command_line: String,
}

impl MachineInfo {
    pub fn collect(command_line: impl Into<String>) -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            num_cpu: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            version: env!("CARGO_PKG_VERSION").to_string(),
            git_commit: option_env!("CACHEMARK_GIT_COMMIT")
                .unwrap_or("unknown")
                .to_string(),
            command_line: command_line.into(),
        }
    }
}

/// Everything one `cachemark` invocation produced
#[derive(Debug, Clone, PartialEq)]
pub struct Results {
    pub hit_rate: Option<HitRateData>,
    pub latency: Option<LatencyData>,
    pub throughput: Option<ThroughputData>,
    pub memory: Option<MemoryData>,
    pub rankings: Vec<Ranking>,
    pub medal_table: Option<MedalTable>,
    pub machine_info: MachineInfo,
}

impl Results {
    pub fn new(machine_info: MachineInfo) -> Self {
        Self {
            hit_rate: None,
            latency: None,
            throughput: None,
            memory: None,
            rankings: Vec::new(),
            medal_table: None,
            machine_info,
        }
    }

    /// Fill `rankings` and `medal_table` from the suite data.
    pub fn rank(&mut self) {
        match compute_rankings(self) {
            Some((rankings, medal_table)) => {
                self.rankings = rankings;
                self.medal_table = Some(medal_table);
            }
            None => {
                self.rankings.clear();
                self.medal_table = None;
            }
        }
    }
}
