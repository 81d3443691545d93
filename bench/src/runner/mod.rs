//! Benchmark orchestration
//!
//! [`RunPlan`] is resolved from config and CLI flags before anything runs.
//! [`BenchmarkRunner`] then executes the selected suites in order, printing
//! each table as soon as its test finishes.

use anyhow::Result;
use cachemark_engine::{int_factories, string_factories, CacheFilter};
use std::collections::BTreeSet;
use std::io::Write;
use std::time::Instant;
use tracing::{error, info, instrument};

use crate::config::BenchConfig;
use crate::metrics::{
    HitRateData, HitRateTable, LatencyData, MachineInfo, MemoryData, Results, ResultsReporter,
    ThroughputData, ThroughputTable,
};
use crate::suite::{validate_test_id, HitRateTest, LatencyTest, Suite, ThroughputTest, MEMORY_TEST};
use crate::workload::TraceStore;

pub mod hitrate;
pub mod latency;
pub mod memory;
pub mod progress;
pub mod throughput;

pub use hitrate::{load_replay, replay_keys, replay_ops, run_hit_rate_test, Replay};
pub use latency::{bench, run_get_or_set_latency, run_int_latency, run_string_latency, Measurement, Stopwatch};
pub use memory::run_memory;
pub use throughput::{measure_qps, ThroughputWorkload, Trial};

/// What one invocation runs
#[derive(Debug, Clone, PartialEq)]
pub struct RunPlan {
    pub suites: Vec<Suite>,
    /// `None` runs every test of each selected suite
    pub tests: Option<BTreeSet<String>>,
    pub filter: CacheFilter,
    /// Hit-rate cache sizes (entries)
    pub sizes: Vec<usize>,
    /// Throughput thread counts
    pub threads: Vec<usize>,
}

impl RunPlan {
    /// Every suite and cache at the configured sizes and thread counts.
    pub fn from_config(config: &BenchConfig) -> Self {
        Self {
            suites: Suite::ALL.to_vec(),
            tests: None,
            filter: CacheFilter::all(),
            sizes: config.hitrate.sizes.clone(),
            threads: config.throughput.threads.clone(),
        }
    }

    pub fn runs(&self, suite: Suite) -> bool {
        self.suites.contains(&suite)
    }

    pub fn should_run(&self, test_id: &str) -> bool {
        match &self.tests {
            Some(tests) => tests.contains(test_id),
            None => true,
        }
    }

    /// Reject unknown tests and caches, and empty selections.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(!self.suites.is_empty(), "no suites selected");
        anyhow::ensure!(!self.sizes.is_empty(), "no cache sizes selected");
        anyhow::ensure!(!self.threads.is_empty(), "no thread counts selected");
        anyhow::ensure!(
            self.threads.iter().all(|&t| t > 0),
            "thread counts must be > 0, got {:?}",
            self.threads
        );
        if let Some(tests) = &self.tests {
            for id in tests {
                validate_test_id(id)?;
            }
        }
        self.filter.validate()?;
        Ok(())
    }
}

/// Comma-separated counts scaled by `multiplier`; unparseable items are dropped.
pub fn parse_counts(list: &str, multiplier: usize) -> Vec<usize> {
    list.split(',')
        .filter_map(|s| s.trim().parse::<usize>().ok())
        .map(|n| n * multiplier)
        .collect()
}

/// `all` (or nothing) selects every suite.
pub fn parse_suites(list: &str) -> Result<Vec<Suite>> {
    let list = list.trim();
    if list.is_empty() || list.eq_ignore_ascii_case("all") {
        return Ok(Suite::ALL.to_vec());
    }
    let mut selected = BTreeSet::new();
    for name in list.split(',').filter(|s| !s.trim().is_empty()) {
        selected.insert(Suite::from_str(name)?);
    }
    // Run order is fixed regardless of flag order
    Ok(selected.into_iter().collect())
}

/// Lowercased, de-duplicated test ids; empty input means every test.
pub fn parse_tests(list: &str) -> Option<BTreeSet<String>> {
    let tests: BTreeSet<String> = list
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect();
    if tests.is_empty() {
        None
    } else {
        Some(tests)
    }
}

/// Runs the planned suites and prints their tables to `out`
pub struct BenchmarkRunner<W: Write> {
    config: BenchConfig,
    plan: RunPlan,
    traces: TraceStore,
    out: W,
    show_progress: bool,
}

impl<W: Write> BenchmarkRunner<W> {
    pub fn new(config: BenchConfig, plan: RunPlan, out: W) -> Self {
        let traces = TraceStore::new(config.hitrate.trace_dir.clone());
        Self {
            config,
            plan,
            traces,
            out,
            show_progress: true,
        }
    }

    /// Hide progress bars (tests, non-interactive runs).
    pub fn quiet(mut self) -> Self {
        self.show_progress = false;
        self
    }

    pub fn plan(&self) -> &RunPlan {
        &self.plan
    }

    /// Run every planned suite, rank, and print the overall standings.
    pub fn run(&mut self, machine_info: MachineInfo) -> Result<Results> {
        let caches = self.plan.filter.kinds().len();
        ResultsReporter::header(&mut self.out, &self.plan.suites, caches, &self.plan.sizes)?;

        let mut results = Results::new(machine_info);
        for suite in self.plan.suites.clone() {
            let start = Instant::now();
            info!(suite = suite.name(), "suite started");
            ResultsReporter::suite(&mut self.out, suite.name(), suite.description())?;
            match suite {
                Suite::HitRate => results.hit_rate = Some(self.run_hit_rate()?),
                Suite::Latency => results.latency = Some(self.run_latency()?),
                Suite::Throughput => results.throughput = Some(self.run_throughput()?),
                Suite::Memory => results.memory = self.run_memory()?,
            }
            info!(
                suite = suite.name(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "suite finished"
            );
        }

        results.rank();
        ResultsReporter::overall(&mut self.out, &results.rankings)?;
        self.out.flush()?;
        Ok(results)
    }

    #[instrument(skip(self))]
    fn run_hit_rate(&mut self) -> Result<HitRateData> {
        let mut data = HitRateData {
            sizes: self.plan.sizes.clone(),
            tables: Vec::new(),
        };
        for test in HitRateTest::ALL {
            if !self.plan.should_run(test.id()) {
                continue;
            }
            let info = self.hit_rate_info(test);
            ResultsReporter::test(&mut self.out, test.id(), &info)?;
            let pb = progress::test_progress(test.id(), self.show_progress);
            let outcome = run_hit_rate_test(
                test,
                &self.traces,
                &self.plan.filter,
                &self.plan.sizes,
                &self.config.hitrate,
                &pb,
            );
            pb.finish_and_clear();
            match outcome {
                Ok(results) => {
                    ResultsReporter::hit_rate_table(&mut self.out, &results, &self.plan.sizes)?;
                    data.tables.push(HitRateTable { test, results });
                }
                Err(e) => {
                    error!(test = test.id(), error = %format!("{:#}", e), "hit rate test skipped");
                    ResultsReporter::error(&mut self.out, &e)?;
                }
            }
        }
        Ok(data)
    }

    fn hit_rate_info(&self, test: HitRateTest) -> String {
        let cfg = &self.config.hitrate;
        match test {
            HitRateTest::Zipf => format!(
                "Zipf synthetic (alpha={}, {}M ops, {}K keyspace)",
                cfg.zipf_theta,
                cfg.zipf_ops / 1_000_000,
                cfg.zipf_keyspace / 1_000
            ),
            _ => test.info().to_string(),
        }
    }

    #[instrument(skip(self))]
    fn run_latency(&mut self) -> Result<LatencyData> {
        let cfg = self.config.latency.clone();
        let strings = string_factories(&self.plan.filter);
        let mut data = LatencyData::default();

        for test in LatencyTest::ALL {
            if !self.plan.should_run(test.id()) {
                continue;
            }
            ResultsReporter::test(&mut self.out, test.id(), test.info())?;
            let pb = progress::test_progress(test.id(), self.show_progress);
            match test {
                LatencyTest::String => {
                    data.string = run_string_latency(&strings, &cfg, &pb);
                    pb.finish_and_clear();
                    ResultsReporter::latency_table(&mut self.out, &data.string)?;
                }
                LatencyTest::Int => {
                    data.int = run_int_latency(&int_factories(&self.plan.filter), &cfg, &pb);
                    pb.finish_and_clear();
                    ResultsReporter::latency_table(&mut self.out, &data.int)?;
                }
                LatencyTest::GetOrSet => {
                    data.get_or_set = run_get_or_set_latency(&strings, &cfg, &pb);
                    pb.finish_and_clear();
                    ResultsReporter::get_or_set_table(&mut self.out, &data.get_or_set)?;
                }
            }
        }
        Ok(data)
    }

    #[instrument(skip(self))]
    fn run_throughput(&mut self) -> Result<ThroughputData> {
        let cfg = self.config.throughput.clone();
        let mut data = ThroughputData {
            threads: self.plan.threads.clone(),
            tables: Vec::new(),
        };
        let selected: Vec<ThroughputTest> = ThroughputTest::ALL
            .into_iter()
            .filter(|t| self.plan.should_run(t.id()))
            .collect();
        if selected.is_empty() {
            return Ok(data);
        }

        let workload = ThroughputWorkload::new(&cfg);
        let strings = string_factories(&self.plan.filter);
        let ints = int_factories(&self.plan.filter);
        for test in selected {
            ResultsReporter::test(&mut self.out, test.id(), &test.info(cfg.cache_size))?;
            let pb = progress::test_progress(test.id(), self.show_progress);
            let results = workload.run(test, &strings, &ints, &self.plan.threads, &pb);
            pb.finish_and_clear();
            if test == ThroughputTest::GetOrSet && results.is_empty() {
                ResultsReporter::no_get_or_set(&mut self.out)?;
            } else {
                ResultsReporter::throughput_table(&mut self.out, &results, &self.plan.threads)?;
            }
            data.tables.push(ThroughputTable { test, results });
        }
        Ok(data)
    }

    #[instrument(skip(self))]
    fn run_memory(&mut self) -> Result<Option<MemoryData>> {
        if !self.plan.should_run(MEMORY_TEST) {
            return Ok(None);
        }
        let cfg = self.config.memory.clone();
        let info = format!("{} items, {} byte values", cfg.capacity, cfg.value_size);
        ResultsReporter::test(&mut self.out, MEMORY_TEST, &info)?;

        let pb = progress::test_progress(MEMORY_TEST, self.show_progress);
        let outcome = run_memory(&self.plan.filter, &cfg, &pb);
        pb.finish_and_clear();
        match outcome {
            Ok(data) => {
                ResultsReporter::memory_table(&mut self.out, &data.results)?;
                Ok(Some(data))
            }
            Err(e) => {
                error!(error = %format!("{:#}", e), "memory suite failed");
                ResultsReporter::error(&mut self.out, &e)?;
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HitRateConfig, LatencyConfig};

    fn small_config(trace_dir: &std::path::Path) -> BenchConfig {
        BenchConfig {
            hitrate: HitRateConfig {
                sizes: vec![1_024],
                trace_dir: trace_dir.to_path_buf(),
                zipf_keyspace: 2_000,
                zipf_ops: 20_000,
                ..HitRateConfig::default()
            },
            latency: LatencyConfig {
                cache_size: 128,
                evict_multiplier: 2,
                benchtime_ms: 2,
            },
            ..BenchConfig::default()
        }
    }

    #[test]
    fn plan_defaults_cover_everything() {
        let config = BenchConfig::default();
        let plan = RunPlan::from_config(&config);
        assert_eq!(plan.suites, Suite::ALL.to_vec());
        assert!(plan.runs(Suite::Memory));
        assert!(plan.should_run("zipf"));
        assert!(plan.should_run(MEMORY_TEST));
        assert_eq!(plan.sizes, config.hitrate.sizes);
        plan.validate().unwrap();
    }

    #[test]
    fn plan_rejects_unknown_names() {
        let mut plan = RunPlan::from_config(&BenchConfig::default());
        plan.tests = Some(["no-such-test".to_string()].into_iter().collect());
        assert!(plan.validate().is_err());

        let mut plan = RunPlan::from_config(&BenchConfig::default());
        plan.filter = CacheFilter::only(["no-such-cache"]);
        assert!(plan.validate().is_err());

        let mut plan = RunPlan::from_config(&BenchConfig::default());
        plan.threads = vec![0];
        assert!(plan.validate().is_err());
    }

    #[test]
    fn flag_lists_parse_leniently() {
        assert_eq!(parse_counts("16, 32,x,,64", 1024), vec![16_384, 32_768, 65_536]);
        assert_eq!(parse_counts("8,16", 1), vec![8, 16]);
        assert!(parse_counts("", 1).is_empty());

        assert_eq!(parse_suites("all").unwrap(), Suite::ALL.to_vec());
        assert_eq!(
            parse_suites("memory, HitRate").unwrap(),
            vec![Suite::HitRate, Suite::Memory]
        );
        assert!(parse_suites("hitrate,bogus").is_err());

        assert_eq!(parse_tests(" , "), None);
        let tests = parse_tests("Zipf,cdn,zipf").unwrap();
        assert_eq!(tests.len(), 2);
        assert!(tests.contains("zipf"));
    }

    #[test]
    fn missing_trace_skips_only_that_test() {
        let dir = tempfile::tempdir().unwrap();
        let config = small_config(dir.path());
        let plan = RunPlan {
            suites: vec![Suite::HitRate],
            tests: Some(["zipf", "cdn"].iter().map(|s| s.to_string()).collect()),
            filter: CacheFilter::only(["lru", "sieve"]),
            ..RunPlan::from_config(&config)
        };

        let mut out = Vec::new();
        let results = BenchmarkRunner::new(config, plan, &mut out)
            .quiet()
            .run(MachineInfo::collect("cachemark"))
            .unwrap();

        let hit_rate = results.hit_rate.unwrap();
        assert_eq!(hit_rate.tables.len(), 1);
        assert_eq!(hit_rate.tables[0].test, HitRateTest::Zipf);
        assert_eq!(hit_rate.table(HitRateTest::Zipf).len(), 2);

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("hitrate: cache efficiency"));
        assert!(text.contains("[cdn]"));
        assert!(text.contains("error: load CDN trace"));
        assert!(text.contains("[zipf] Zipf synthetic (alpha="));
        assert!(text.contains("2K keyspace)"));
        assert!(!results.rankings.is_empty());
    }

    #[test]
    fn latency_suite_fills_selected_tests_only() {
        let dir = tempfile::tempdir().unwrap();
        let config = small_config(dir.path());
        let plan = RunPlan {
            suites: vec![Suite::Latency],
            tests: Some(["int".to_string()].into_iter().collect()),
            filter: CacheFilter::only(["lru"]),
            ..RunPlan::from_config(&config)
        };

        let mut out = Vec::new();
        let results = BenchmarkRunner::new(config, plan, &mut out)
            .quiet()
            .run(MachineInfo::collect("cachemark"))
            .unwrap();
        let latency = results.latency.unwrap();
        assert!(latency.string.is_empty());
        assert_eq!(latency.int.len(), 1);
        assert!(latency.get_or_set.is_empty());
        assert!(results.hit_rate.is_none());
    }
}
