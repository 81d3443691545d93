// bench/src/config.rs
//
// Benchmark Configuration
//
// Priority order (highest to lowest):
// 1. Command-line flags (applied by the cachemark binary after load())
// 2. Environment variables (CACHEMARK__* prefix)
// 3. Config file (TOML/YAML/JSON)
// 4. Built-in defaults

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

// ============================================================================
// Main Configuration Structure
// ============================================================================

/// Every tunable knob of a cachemark run
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct BenchConfig {
    /// Hit-rate suite (trace replay)
    pub hitrate: HitRateConfig,

    /// Single-threaded latency suite
    pub latency: LatencyConfig,

    /// Multi-threaded throughput suite
    pub throughput: ThroughputConfig,

    /// Isolated-process memory suite
    pub memory: MemoryConfig,

    /// Report files
    pub output: OutputConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

// ============================================================================
// Hit Rate
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct HitRateConfig {
    /// Cache capacities (entries) to replay every trace at
    pub sizes: Vec<usize>,

    /// Directory holding the zstd-compressed trace files
    pub trace_dir: PathBuf,

    /// Synthetic Zipf trace: distinct keys
    pub zipf_keyspace: u64,

    /// Synthetic Zipf trace: operations
    pub zipf_ops: usize,

    /// Synthetic Zipf trace: skew
    pub zipf_theta: f64,

    pub seed: u64,
}

impl Default for HitRateConfig {
    fn default() -> Self {
        Self {
            sizes: vec![16_384, 32_768, 65_536, 131_072, 262_144],
            trace_dir: PathBuf::from("traces"),
            zipf_keyspace: 100_000,
            zipf_ops: 2_000_000,
            zipf_theta: 0.8,
            seed: 42,
        }
    }
}

// ============================================================================
// Latency
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct LatencyConfig {
    /// Cache capacity for every latency benchmark
    pub cache_size: usize,

    /// SetEvict key range as a multiple of cache_size
    pub evict_multiplier: usize,

    /// Minimum wall time per adaptive measurement (milliseconds)
    pub benchtime_ms: u64,
}

impl Default for LatencyConfig {
    fn default() -> Self {
        Self {
            cache_size: 16_384,
            evict_multiplier: 20,
            benchtime_ms: 1_000,
        }
    }
}

// ============================================================================
// Throughput
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ThroughputConfig {
    /// Capacity of the shared cache
    pub cache_size: usize,

    /// Length of the precomputed Zipf key sequence
    pub workload_size: usize,

    pub theta: f64,

    pub seed: u64,

    /// Worker thread counts, one trial each
    pub threads: Vec<usize>,

    /// Measurement window per trial (milliseconds)
    pub duration_ms: u64,

    /// Operations between flushes of the shared counter
    pub batch_size: usize,

    /// How long to wait for workers after the stop flag (milliseconds)
    pub hang_timeout_ms: u64,

    /// Value size for Get/Set/Mixed (bytes)
    pub value_size: usize,

    /// Value size for GetOrSet (bytes)
    pub get_or_set_value_size: usize,
}

impl Default for ThroughputConfig {
    fn default() -> Self {
        Self {
            cache_size: 65_536,
            workload_size: 1_000_000,
            theta: 0.8,
            seed: 42,
            threads: vec![1, 8, 16, 32],
            duration_ms: 900,
            batch_size: 1_000,
            hang_timeout_ms: 5_000,
            value_size: 4_096,
            get_or_set_value_size: 8_192,
        }
    }
}

// ============================================================================
// Memory
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct MemoryConfig {
    /// Entries inserted by each probe
    pub capacity: usize,

    /// Value size per entry (bytes)
    pub value_size: usize,

    /// Path to the cachemark-mem binary (defaults to a sibling of the running executable)
    pub probe_path: Option<PathBuf>,

    /// A probe still running after this long is killed (seconds)
    pub timeout_secs: u64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            capacity: 32_768,
            value_size: 1_024,
            probe_path: None,
            timeout_secs: 300,
        }
    }
}

// ============================================================================
// Output
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Report directory; nothing is written when unset
    pub dir: Option<PathBuf>,

    pub markdown: bool,

    pub json: bool,

    /// One CSV file per suite
    pub csv: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: None,
            markdown: true,
            json: true,
            csv: false,
        }
    }
}

// ============================================================================
// Logging Configuration
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: LogLevel,

    /// Log format (json or text)
    pub format: LogFormat,

    /// Log to file (path, or None for stderr)
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Text,
            file: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text format
    Text,
    /// JSON format (for log aggregation)
    Json,
}

// ============================================================================
// Configuration Loading
// ============================================================================

impl BenchConfig {
    /// Load configuration with priority chain:
    /// 1. Environment variables (CACHEMARK__*)
    /// 2. Config file (if provided)
    /// 3. Built-in defaults
    pub fn load(config_file: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();

        let defaults = Self::default();
        let defaults_json =
            serde_json::to_string(&defaults).context("Failed to serialize defaults")?;
        builder = builder.add_source(config::File::from_str(
            &defaults_json,
            config::FileFormat::Json,
        ));

        if let Some(path) = config_file {
            builder = builder.add_source(config::File::with_name(path));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("CACHEMARK")
                .prefix_separator("__")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("hitrate.sizes")
                .with_list_parse_key("throughput.threads")
                .try_parsing(true),
        );

        let settings = builder.build().context("Failed to build config")?;

        let config: Self = settings
            .try_deserialize()
            .context("Failed to deserialize config")?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        // Hit rate
        anyhow::ensure!(
            !self.hitrate.sizes.is_empty(),
            "hitrate.sizes must list at least one cache size"
        );
        anyhow::ensure!(
            self.hitrate.sizes.iter().all(|&s| s > 0),
            "hitrate.sizes must all be > 0, got {:?}",
            self.hitrate.sizes
        );
        anyhow::ensure!(
            self.hitrate.zipf_keyspace > 0,
            "hitrate.zipf_keyspace must be > 0"
        );
        anyhow::ensure!(
            self.hitrate.zipf_theta > 0.0 && self.hitrate.zipf_theta < 1.0,
            "hitrate.zipf_theta must be in (0, 1), got {}",
            self.hitrate.zipf_theta
        );

        // Latency
        anyhow::ensure!(
            self.latency.cache_size > 0,
            "latency.cache_size must be > 0"
        );
        anyhow::ensure!(
            self.latency.evict_multiplier > 1,
            "latency.evict_multiplier must be > 1, got {}",
            self.latency.evict_multiplier
        );
        anyhow::ensure!(
            self.latency.benchtime_ms > 0,
            "latency.benchtime_ms must be > 0"
        );

        // Throughput
        let tp = &self.throughput;
        anyhow::ensure!(tp.cache_size > 0, "throughput.cache_size must be > 0");
        anyhow::ensure!(
            tp.workload_size > 0,
            "throughput.workload_size must be > 0"
        );
        anyhow::ensure!(
            tp.theta > 0.0 && tp.theta < 1.0,
            "throughput.theta must be in (0, 1), got {}",
            tp.theta
        );
        anyhow::ensure!(
            !tp.threads.is_empty() && tp.threads.iter().all(|&t| t > 0),
            "throughput.threads must list positive thread counts, got {:?}",
            tp.threads
        );
        anyhow::ensure!(tp.duration_ms > 0, "throughput.duration_ms must be > 0");
        anyhow::ensure!(tp.batch_size > 0, "throughput.batch_size must be > 0");
        anyhow::ensure!(
            tp.hang_timeout_ms > tp.duration_ms,
            "throughput.hang_timeout_ms ({}) must exceed duration_ms ({})",
            tp.hang_timeout_ms,
            tp.duration_ms
        );
        anyhow::ensure!(
            tp.value_size > 0 && tp.get_or_set_value_size > 0,
            "throughput value sizes must be > 0"
        );

        // Memory
        anyhow::ensure!(self.memory.capacity > 0, "memory.capacity must be > 0");
        anyhow::ensure!(self.memory.timeout_secs > 0, "memory.timeout_secs must be > 0");
        if let Some(path) = &self.memory.probe_path {
            anyhow::ensure!(
                !path.as_os_str().is_empty(),
                "memory.probe_path cannot be empty when set"
            );
        }

        Ok(())
    }
}

impl LatencyConfig {
    /// Minimum timed duration of each adaptive latency run
    pub fn benchtime(&self) -> Duration {
        Duration::from_millis(self.benchtime_ms)
    }
}

impl ThroughputConfig {
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    pub fn hang_timeout(&self) -> Duration {
        Duration::from_millis(self.hang_timeout_ms)
    }
}

impl MemoryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Generate YAML config with default values.
///
/// # Example
/// ```bash
/// cachemark --generate-config yaml > cachemark.yaml
/// ```
pub fn generate_example_yaml() -> String {
    let config = BenchConfig::default();
    match serde_yaml::to_string(&config) {
        Ok(serialized) => serialized,
        Err(error) => format!("# failed to serialize default config to YAML: {error}\n"),
    }
}

/// Generate TOML config with default values.
pub fn generate_example_toml() -> String {
    let config = BenchConfig::default();
    match toml::to_string_pretty(&config) {
        Ok(serialized) => serialized,
        Err(error) => format!("# failed to serialize default config to TOML: {error}\n"),
    }
}
