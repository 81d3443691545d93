//! cachemark benchmark library
//!
//! Compares in-memory cache implementations on:
//! - hit rate over production traces and a synthetic Zipf trace
//! - single-threaded latency and allocations per operation
//! - multi-threaded throughput under a Zipf workload
//! - resident memory per item, measured in isolated processes
//!
//! Results are ranked by placement points and medals, then written to the
//! terminal, Markdown, JSON and CSV.
//!
//! # Architecture
//!
//! ```text
//! bench
//! ├── workload/     # Zipf generator, key/value generators, trace loading
//! ├── runner/       # Hit-rate, latency, throughput and memory runners
//! ├── metrics/      # Result tables, ranking, terminal and file reports
//! ├── suite.rs      # Suite and test catalogue
//! └── config.rs     # Layered configuration
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use cachemark_bench::{BenchConfig, BenchmarkRunner, MachineInfo, RunPlan};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = BenchConfig::load(None)?;
//!     let plan = RunPlan::from_config(&config);
//!     let results = BenchmarkRunner::new(config, plan, std::io::stdout())
//!         .run(MachineInfo::collect("cachemark"))?;
//!     println!("{} caches ranked", results.rankings.len());
//!     Ok(())
//! }
//! ```

pub mod alloc_counter;
pub mod config;
pub mod metrics;
pub mod runner;
pub mod suite;
pub mod workload;

pub use alloc_counter::{thread_allocations, CountingAllocator};
pub use config::BenchConfig;
pub use metrics::{MachineInfo, Results, ResultsReporter};
pub use runner::{BenchmarkRunner, RunPlan};
pub use suite::Suite;
