//! Isolated memory probe.
//!
//! Fills a single cache, samples the tracking allocator and prints one JSON
//! line. `cachemark` spawns this once per cache so each measurement starts
//! from a clean heap.

use std::alloc::System;
use std::process::ExitCode;

use cap::Cap;
use clap::Parser;
use cachemark_engine::memory_probe::{self, ProbeReport};

#[global_allocator]
static ALLOCATOR: Cap<System> = Cap::new(System, usize::MAX);

#[derive(Parser, Debug)]
#[command(name = "cachemark-mem")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Measure resident heap of one cache filled to capacity", long_about = None)]
struct Args {
    #[arg(long, help = "Cache name, or \"baseline\" for a plain HashMap")]
    cache: String,

    #[arg(long, default_value_t = 32768, help = "Number of entries to insert")]
    capacity: usize,

    #[arg(long, default_value_t = 1024, help = "Value size in bytes")]
    value_size: usize,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let before = ALLOCATOR.allocated();
    let resident = match memory_probe::fill(&args.cache, args.capacity, args.value_size) {
        Ok(resident) => resident,
        Err(e) => {
            emit(&ProbeReport::failed(args.cache, e));
            return ExitCode::FAILURE;
        }
    };
    // len() may flush deferred maintenance, so count items before sampling
    let items = resident.items();
    let bytes = ALLOCATOR.allocated().saturating_sub(before) as u64;

    emit(&ProbeReport {
        name: resident.name().to_string(),
        items,
        bytes,
        error: None,
    });
    resident.close();
    ExitCode::SUCCESS
}

fn emit(report: &ProbeReport) {
    match serde_json::to_string(report) {
        Ok(line) => println!("{}", line),
        Err(e) => eprintln!("cachemark-mem: failed to encode report: {}", e),
    }
}
