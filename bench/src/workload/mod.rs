//! Workloads: synthetic Zipf keys, URL/decimal key sets, and production
//! trace loading.

pub mod generator;
pub mod trace;
pub mod zipf;

pub use generator::{KeyGenerator, ValueGenerator, WIKI_SEGMENTS};
pub use trace::{Action, KeyTrace, OpTrace, ThesiosTrace, TraceFile, TraceOp, TraceStore};
pub use zipf::{generate_zipf, ZipfGenerator};
