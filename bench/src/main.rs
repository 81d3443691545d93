//! cachemark - compare in-memory cache implementations

use anyhow::{Context, Result};
use cachemark_bench::config::{self, BenchConfig, LogFormat, LoggingConfig};
use cachemark_bench::metrics::export::{JSON_FILE, MARKDOWN_FILE};
use cachemark_bench::metrics::{write_csv, write_json, write_markdown};
use cachemark_bench::runner::{parse_counts, parse_suites, parse_tests};
use cachemark_bench::{BenchmarkRunner, CountingAllocator, MachineInfo, RunPlan, Suite};
use cachemark_engine::{available_names, CacheFilter};
use clap::Parser;
use std::process::ExitCode;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: CountingAllocator = CountingAllocator::new();

#[derive(Parser, Debug)]
#[command(name = "cachemark")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Compare in-memory cache implementations", long_about = None)]
struct CliArgs {
    /// Comma-separated suites: hitrate,latency,throughput,memory
    #[arg(long, default_value = "all")]
    suites: String,

    /// Comma-separated tests to run across suites (default: all)
    #[arg(long, default_value = "")]
    tests: String,

    /// Comma-separated caches to benchmark (default: all)
    #[arg(long, default_value = "")]
    caches: String,

    /// Comma-separated hit-rate cache sizes in K (e.g. 16,32,64)
    #[arg(long)]
    sizes: Option<String>,

    /// Comma-separated throughput thread counts (e.g. 8,16)
    #[arg(long)]
    threads: Option<String>,

    /// Write report files into this directory
    #[arg(long)]
    outdir: Option<String>,

    /// Path to configuration file (YAML, TOML or JSON)
    #[arg(short, long, env = "CACHEMARK_CONFIG")]
    config: Option<String>,

    /// Print default config (yaml or toml) and exit
    #[arg(long, value_name = "FORMAT")]
    generate_config: Option<String>,

    /// List suites, tests and caches and exit
    #[arg(long)]
    list: bool,
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let args = CliArgs::parse();

    if let Some(format) = &args.generate_config {
        match format.to_lowercase().as_str() {
            "yaml" | "yml" => print!("{}", config::generate_example_yaml()),
            "toml" => print!("{}", config::generate_example_toml()),
            other => anyhow::bail!("Invalid format '{}'. Use 'yaml' or 'toml'.", other),
        }
        return Ok(());
    }

    if args.list {
        print_catalogue();
        return Ok(());
    }

    let mut config = BenchConfig::load(args.config.as_deref())?;
    if let Some(outdir) = &args.outdir {
        config.output.dir = Some(outdir.into());
    }
    if let Some(sizes) = &args.sizes {
        config.hitrate.sizes = parse_counts(sizes, 1024);
    }
    if let Some(threads) = &args.threads {
        config.throughput.threads = parse_counts(threads, 1);
    }
    config.validate()?;

    let _log_guard = init_logging(&config.logging);

    let plan = RunPlan {
        suites: parse_suites(&args.suites)?,
        tests: parse_tests(&args.tests),
        filter: CacheFilter::only(args.caches.split(',')),
        ..RunPlan::from_config(&config)
    };
    plan.validate()?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        suites = ?plan.suites,
        caches = plan.filter.kinds().len(),
        sizes = ?plan.sizes,
        threads = ?plan.threads,
        "Configuration loaded"
    );

    let command_line = std::iter::once("cachemark".to_string())
        .chain(std::env::args().skip(1))
        .collect::<Vec<_>>()
        .join(" ");
    let output = config.output.clone();
    let results = BenchmarkRunner::new(config, plan, std::io::stdout())
        .run(MachineInfo::collect(command_line))?;

    let Some(dir) = &output.dir else {
        return Ok(());
    };
    std::fs::create_dir_all(dir)
        .with_context(|| format!("create output directory {}", dir.display()))?;

    let mut written = Vec::new();
    if output.markdown {
        let path = dir.join(MARKDOWN_FILE);
        write_markdown(&path, &results)?;
        written.push(path);
    }
    if output.json {
        let path = dir.join(JSON_FILE);
        write_json(&path, &results)?;
        written.push(path);
    }
    if output.csv {
        written.extend(write_csv(dir, &results)?);
    }
    for (i, path) in written.iter().enumerate() {
        let label = if i == 0 { "Results:" } else { "        " };
        println!("{} {}", label, path.display());
    }
    Ok(())
}

fn print_catalogue() {
    println!("Suites and tests:");
    for suite in Suite::ALL {
        println!("  {:<11} {}", suite.name(), suite.description());
        for test in suite.tests() {
            println!("    {}", test);
        }
    }
    println!();
    println!("Caches:");
    for name in available_names() {
        println!("  {}", name);
    }
}

/// stderr (or the configured file) so stdout carries only result tables.
fn init_logging(logging: &LoggingConfig) -> WorkerGuard {
    let (writer, guard) = match &logging.file {
        Some(path) => match std::fs::File::create(path) {
            Ok(file) => tracing_appender::non_blocking(file),
            Err(e) => {
                eprintln!(
                    "Warning: Failed to create log file {:?}: {}. Falling back to stderr.",
                    path, e
                );
                tracing_appender::non_blocking(std::io::stderr())
            }
        },
        None => tracing_appender::non_blocking(std::io::stderr()),
    };

    let level = logging.level.as_str();
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("cachemark_bench={},cachemark_engine={},cachemark={}", level, level, level).into()
    });

    match logging.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(writer)
                        .json()
                        .with_target(true)
                        .with_thread_ids(true),
                )
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(writer)
                        .with_target(true)
                        .with_thread_ids(true),
                )
                .init();
        }
    }
    guard
}
