//! Report files: JSON (camelCase), Markdown and per-suite CSV.

use anyhow::{Context, Result};
use chrono::{Local, SecondsFormat};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use super::ranking::{format_winners, BenchmarkMedal, MedalTable, Ranking, WinnerEntry};
use super::reporter::{mib, pct_above, qps_cell, sort_best_first, winner_entries, Named};
use super::{
    GetOrSetLatencyResult, HitRateData, HitRateResult, LatencyData, LatencyResult, MachineInfo,
    MemoryData, Results, ThroughputData, ThroughputResult,
};
use crate::suite::{HitRateTest, ThroughputTest};

pub const MARKDOWN_FILE: &str = "cachemark_results.md";
pub const JSON_FILE: &str = "cachemark_results.json";

// ---------------------------------------------------------------------------
// JSON
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonResults {
    pub timestamp: String,
    pub machine_info: MachineInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hit_rate: Option<JsonHitRate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency: Option<JsonLatency>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub throughput: Option<JsonThroughput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<MemoryData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medal_table: Option<JsonMedalTable>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rankings: Vec<Ranking>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonHitRateResult {
    pub rates: BTreeMap<usize, f64>,
    pub name: String,
    pub avg_rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonHitRate {
    pub sizes: Vec<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cdn: Vec<JsonHitRateResult>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub meta: Vec<JsonHitRateResult>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub zipf: Vec<JsonHitRateResult>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub twitter: Vec<JsonHitRateResult>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub wikipedia: Vec<JsonHitRateResult>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub thesios_block: Vec<JsonHitRateResult>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub thesios_file: Vec<JsonHitRateResult>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ibm_docker: Vec<JsonHitRateResult>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tencent_photo: Vec<JsonHitRateResult>,
}

impl JsonHitRate {
    fn from_data(data: &HitRateData) -> Self {
        let rows = |test: HitRateTest| -> Vec<JsonHitRateResult> {
            data.table(test)
                .iter()
                .map(|r| JsonHitRateResult {
                    rates: r.rates.clone(),
                    name: r.name.clone(),
                    avg_rate: r.average(&data.sizes),
                })
                .collect()
        };
        Self {
            sizes: data.sizes.clone(),
            cdn: rows(HitRateTest::Cdn),
            meta: rows(HitRateTest::Meta),
            zipf: rows(HitRateTest::Zipf),
            twitter: rows(HitRateTest::Twitter),
            wikipedia: rows(HitRateTest::Wikipedia),
            thesios_block: rows(HitRateTest::ThesiosBlock),
            thesios_file: rows(HitRateTest::ThesiosFile),
            ibm_docker: rows(HitRateTest::IbmDocker),
            tencent_photo: rows(HitRateTest::TencentPhoto),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonLatencyResult {
    pub name: String,
    pub get_ns_op: f64,
    pub get_allocs: u64,
    pub set_ns_op: f64,
    pub set_allocs: u64,
    pub set_evict_ns_op: f64,
    pub set_evict_allocs: u64,
    pub avg_ns_op: f64,
}

impl From<&LatencyResult> for JsonLatencyResult {
    fn from(r: &LatencyResult) -> Self {
        Self {
            name: r.name.clone(),
            get_ns_op: r.get_ns,
            get_allocs: r.get_allocs,
            set_ns_op: r.set_ns,
            set_allocs: r.set_allocs,
            set_evict_ns_op: r.set_evict_ns,
            set_evict_allocs: r.set_evict_allocs,
            avg_ns_op: r.avg_ns(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonGetOrSetResult {
    pub name: String,
    pub ns_op: f64,
    pub allocs: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonLatency {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub string_keys: Vec<JsonLatencyResult>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub int_keys: Vec<JsonLatencyResult>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub get_or_set: Vec<JsonGetOrSetResult>,
}

impl JsonLatency {
    fn from_data(data: &LatencyData) -> Self {
        Self {
            string_keys: data.string.iter().map(JsonLatencyResult::from).collect(),
            int_keys: data.int.iter().map(JsonLatencyResult::from).collect(),
            get_or_set: data
                .get_or_set
                .iter()
                .map(|r| JsonGetOrSetResult {
                    name: r.name.clone(),
                    ns_op: r.ns,
                    allocs: r.allocs,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonThroughputResult {
    pub qps: BTreeMap<usize, f64>,
    pub name: String,
    pub avg_qps: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonThroughput {
    pub threads: Vec<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub string_get: Vec<JsonThroughputResult>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub string_set: Vec<JsonThroughputResult>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub string_mixed: Vec<JsonThroughputResult>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub int_get: Vec<JsonThroughputResult>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub int_set: Vec<JsonThroughputResult>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub int_mixed: Vec<JsonThroughputResult>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub get_or_set: Vec<JsonThroughputResult>,
}

impl JsonThroughput {
    fn from_data(data: &ThroughputData) -> Self {
        let rows = |test: ThroughputTest| -> Vec<JsonThroughputResult> {
            data.table(test)
                .iter()
                .map(|r| JsonThroughputResult {
                    qps: r.qps.clone(),
                    name: r.name.clone(),
                    avg_qps: r.avg_qps(),
                })
                .collect()
        };
        Self {
            threads: data.threads.clone(),
            string_get: rows(ThroughputTest::StringGet),
            string_set: rows(ThroughputTest::StringSet),
            string_mixed: rows(ThroughputTest::StringMixed),
            int_get: rows(ThroughputTest::IntGet),
            int_set: rows(ThroughputTest::IntSet),
            int_mixed: rows(ThroughputTest::IntMixed),
            get_or_set: rows(ThroughputTest::GetOrSet),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonCategoryRank {
    pub name: String,
    pub score: f64,
    pub rank: usize,
    pub gold: usize,
    pub silver: usize,
    pub bronze: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonCategoryMedals {
    pub name: String,
    pub benchmarks: Vec<BenchmarkMedal>,
    pub rankings: Vec<JsonCategoryRank>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonMedalTable {
    pub categories: Vec<JsonCategoryMedals>,
}

impl JsonMedalTable {
    fn from_table(table: &MedalTable) -> Self {
        let categories = table
            .categories
            .iter()
            .map(|cat| JsonCategoryMedals {
                name: cat.name.clone(),
                benchmarks: cat.benchmarks.clone(),
                rankings: cat
                    .rankings
                    .iter()
                    .map(|r| JsonCategoryRank {
                        name: r.name.clone(),
                        score: (r.gold * 10 + r.silver * 7 + r.bronze * 5) as f64,
                        rank: r.rank,
                        gold: r.gold,
                        silver: r.silver,
                        bronze: r.bronze,
                    })
                    .collect(),
            })
            .collect();
        Self { categories }
    }
}

impl JsonResults {
    pub fn from_results(results: &Results) -> Self {
        Self {
            timestamp: Local::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            machine_info: results.machine_info.clone(),
            hit_rate: results.hit_rate.as_ref().map(JsonHitRate::from_data),
            latency: results.latency.as_ref().map(JsonLatency::from_data),
            throughput: results.throughput.as_ref().map(JsonThroughput::from_data),
            memory: results.memory.clone(),
            medal_table: results.medal_table.as_ref().map(JsonMedalTable::from_table),
            rankings: results.rankings.clone(),
        }
    }
}

/// Pretty-printed JSON report.
pub fn write_json(path: &Path, results: &Results) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &JsonResults::from_results(results))
        .context("Failed to encode JSON results")?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Markdown
// ---------------------------------------------------------------------------

pub fn write_markdown(path: &Path, results: &Results) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    render_markdown(&mut writer, results)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    writer.flush()?;
    Ok(())
}

pub fn render_markdown<W: Write>(w: &mut W, results: &Results) -> io::Result<()> {
    let mi = &results.machine_info;
    writeln!(w, "# cachemark Results\n")?;
    writeln!(w, "```")?;
    writeln!(w, "Command: {}", mi.command_line)?;
    writeln!(
        w,
        "Environment: {}/{}, {} CPUs, cachemark {} ({})",
        mi.os, mi.arch, mi.num_cpu, mi.version, mi.git_commit
    )?;
    writeln!(w, "```\n")?;

    if let Some(hr) = &results.hit_rate {
        writeln!(w, "## Hit Rate Benchmarks\n")?;
        for test in HitRateTest::ALL {
            md_hit_rate(w, test.title(), hr.table(test), &hr.sizes)?;
        }
    }

    if let Some(lat) = &results.latency {
        writeln!(w, "## Latency Benchmarks\n")?;
        md_latency(w, "String Keys", &lat.string)?;
        md_latency(w, "Int Keys", &lat.int)?;
        md_get_or_set(w, &lat.get_or_set)?;
    }

    if let Some(tp) = &results.throughput {
        writeln!(w, "## Throughput Benchmarks\n")?;
        for test in ThroughputTest::ALL {
            md_throughput(w, test.title(), tp.table(test), &tp.threads)?;
        }
    }

    if let Some(mem) = results.memory.as_ref().filter(|m| !m.results.is_empty()) {
        writeln!(w, "## Memory Benchmarks\n")?;
        md_memory(w, mem)?;
    }

    if !results.rankings.is_empty() {
        writeln!(w, "## Overall Rankings\n")?;
        writeln!(w, "| Rank | Cache         | Score | Gold | Silver | Bronze |")?;
        writeln!(w, "|------|---------------|-------|------|--------|--------|")?;
        for r in &results.rankings {
            writeln!(
                w,
                "| {:>4} | {:<13} | {:>5.0} | {:>4} | {:>6} | {:>6} |",
                r.rank, r.name, r.score, r.gold, r.silver, r.bronze
            )?;
        }
        writeln!(w)?;
    }

    if let Some(table) = results.medal_table.as_ref().filter(|t| !t.categories.is_empty()) {
        writeln!(w, "## Medal Table\n")?;
        md_medal_table(w, table)?;
    }

    Ok(())
}

/// Winner line; `higher_is_better` picks which side the percentage is taken from.
fn md_winner<W: Write>(w: &mut W, entries: &[WinnerEntry], higher_is_better: bool) -> io::Result<()> {
    let (winners, runner_up) = format_winners(entries);
    if winners.len() > 1 {
        write!(w, "\n  winners (tie): {}", winners.join(", "))?;
    } else if let Some(first) = winners.first() {
        write!(w, "\n  winner: {}", first)?;
    }
    if let Some(second) = runner_up {
        let best = entries[0].score;
        let pct = if higher_is_better {
            pct_above(best, second.score)
        } else {
            pct_above(second.score, best)
        };
        write!(w, " (+{:.3}% vs {})", pct, second.name)?;
    }
    writeln!(w)
}

fn md_hit_rate<W: Write>(
    w: &mut W,
    title: &str,
    data: &[HitRateResult],
    sizes: &[usize],
) -> io::Result<()> {
    if data.is_empty() {
        return Ok(());
    }
    writeln!(w, "### {}\n", title)?;

    write!(w, "| Cache         |")?;
    for size in sizes {
        write!(w, " {:>5}K |", size / 1024)?;
    }
    writeln!(w, "     Avg |")?;
    write!(w, "|---------------|")?;
    for _ in sizes {
        write!(w, "--------|")?;
    }
    writeln!(w, "---------|")?;

    let sorted = sort_best_first(data, |r| r.average(sizes), true);
    for r in &sorted {
        write!(w, "| {:<13} |", r.name)?;
        for size in sizes {
            write!(w, " {:>5.2}% |", r.rates.get(size).copied().unwrap_or(0.0))?;
        }
        writeln!(w, " {:>6.3}% |", r.average(sizes))?;
    }

    md_winner(w, &winner_entries(&sorted, |r| r.average(sizes)), true)?;
    writeln!(w)
}

fn md_latency<W: Write>(w: &mut W, title: &str, data: &[LatencyResult]) -> io::Result<()> {
    if data.is_empty() {
        return Ok(());
    }
    writeln!(w, "### {}\n", title)?;
    writeln!(
        w,
        "| Cache         | Get ns | Get alloc | Set ns | Set alloc | SetEvict ns | SetEvict alloc | Avg ns |"
    )?;
    writeln!(
        w,
        "|---------------|--------|-----------|--------|-----------|-------------|----------------|--------|"
    )?;

    let sorted = sort_best_first(data, LatencyResult::avg_ns, false);
    for r in &sorted {
        writeln!(
            w,
            "| {:<13} | {:>6.0} | {:>9} | {:>6.0} | {:>9} | {:>11.0} | {:>14} | {:>6.0} |",
            r.name,
            r.get_ns,
            r.get_allocs,
            r.set_ns,
            r.set_allocs,
            r.set_evict_ns,
            r.set_evict_allocs,
            r.avg_ns()
        )?;
    }

    md_winner(w, &winner_entries(&sorted, LatencyResult::avg_ns), false)?;
    writeln!(w)
}

fn md_get_or_set<W: Write>(w: &mut W, data: &[GetOrSetLatencyResult]) -> io::Result<()> {
    if data.is_empty() {
        return Ok(());
    }
    writeln!(w, "### GetOrSet\n")?;
    writeln!(w, "| Cache         | GetOrSet ns | GetOrSet alloc |")?;
    writeln!(w, "|---------------|-------------|----------------|")?;

    let sorted = sort_best_first(data, |r| r.ns, false);
    for r in &sorted {
        writeln!(w, "| {:<13} | {:>11.0} | {:>14} |", r.name, r.ns, r.allocs)?;
    }

    md_winner(w, &winner_entries(&sorted, |r| r.ns), false)?;
    writeln!(w)
}

fn md_throughput<W: Write>(
    w: &mut W,
    title: &str,
    data: &[ThroughputResult],
    threads: &[usize],
) -> io::Result<()> {
    if data.is_empty() {
        return Ok(());
    }
    writeln!(w, "### {}\n", title)?;

    write!(w, "| Cache         |")?;
    for t in threads {
        write!(w, " {:>2}T       |", t)?;
    }
    writeln!(w, "       Avg |")?;
    write!(w, "|---------------|")?;
    for _ in threads {
        write!(w, "-----------|")?;
    }
    writeln!(w, "-----------|")?;

    let sorted = sort_best_first(data, ThroughputResult::avg_qps, true);
    for r in &sorted {
        write!(w, "| {:<13} |", r.name)?;
        for t in threads {
            write!(w, " {}   |", qps_cell(r.qps.get(t).copied().unwrap_or(0.0)))?;
        }
        writeln!(w, " {}   |", qps_cell(r.avg_qps()))?;
    }

    md_winner(w, &winner_entries(&sorted, ThroughputResult::avg_qps), true)?;
    writeln!(w)
}

fn md_memory<W: Write>(w: &mut W, data: &MemoryData) -> io::Result<()> {
    if let Some(first) = data.results.first().filter(|r| r.baseline_bytes > 0) {
        writeln!(
            w,
            "Baseline (HashMap<String, Vec<u8>>): {:.2} MB\n",
            mib(first.baseline_bytes)
        )?;
    }

    writeln!(w, "| Cache         | Items Stored | Memory (MB) | Overhead vs map (bytes/item) |")?;
    writeln!(w, "|---------------|--------------|-------------|------------------------------|")?;
    for r in &data.results {
        writeln!(
            w,
            "| {:<13} | {:>12} | {:>11.2} | {:>28} |",
            r.name,
            r.items,
            mib(r.bytes),
            r.bytes_per_item
        )?;
    }

    let entries: Vec<WinnerEntry> = data
        .results
        .iter()
        .map(|r| WinnerEntry::new(r.name(), r.bytes as f64))
        .collect();
    md_winner(w, &entries, false)?;
    writeln!(w)
}

fn md_medal_table<W: Write>(w: &mut W, table: &MedalTable) -> io::Result<()> {
    for cat in &table.categories {
        writeln!(w, "### {}\n", cat.name)?;
        writeln!(w, "| Benchmark     | Gold | Silver | Bronze |")?;
        writeln!(w, "|---------------|------|--------|--------|")?;
        for b in &cat.benchmarks {
            writeln!(
                w,
                "| {:<13} | {} | {} | {} |",
                b.name,
                names_or_dash(&b.gold),
                names_or_dash(&b.silver),
                names_or_dash(&b.bronze)
            )?;
        }
        writeln!(w)?;

        writeln!(w, "| Rank | Cache         | Gold | Silver | Bronze |")?;
        writeln!(w, "|------|---------------|------|--------|--------|")?;
        for r in &cat.rankings {
            writeln!(
                w,
                "| {:>4} | {:<13} | {:>4} | {:>6} | {:>6} |",
                r.rank, r.name, r.gold, r.silver, r.bronze
            )?;
        }
        writeln!(w)?;
    }
    Ok(())
}

fn names_or_dash(names: &[String]) -> String {
    if names.is_empty() {
        "-".to_string()
    } else {
        names.join(", ")
    }
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

/// One flat CSV per suite that ran, plus the overall ranking. Returns the
/// files written.
pub fn write_csv(dir: &Path, results: &Results) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();

    if let Some(hr) = &results.hit_rate {
        let path = dir.join("cachemark_hitrate.csv");
        let mut wtr = csv_writer(&path)?;
        wtr.write_record(["test", "cache", "size", "hit_rate"])?;
        for table in &hr.tables {
            for r in &table.results {
                for size in &hr.sizes {
                    let rate = r.rates.get(size).copied().unwrap_or(0.0);
                    wtr.write_record([
                        table.test.id(),
                        r.name.as_str(),
                        size.to_string().as_str(),
                        format!("{:.4}", rate).as_str(),
                    ])?;
                }
            }
        }
        wtr.flush()?;
        written.push(path);
    }

    if let Some(lat) = &results.latency {
        let path = dir.join("cachemark_latency.csv");
        let mut wtr = csv_writer(&path)?;
        wtr.write_record(["test", "cache", "op", "ns_per_op", "allocs_per_op"])?;
        for (test, rows) in [("string", &lat.string), ("int", &lat.int)] {
            for r in rows {
                let ops = [
                    ("get", r.get_ns, r.get_allocs),
                    ("set", r.set_ns, r.set_allocs),
                    ("set_evict", r.set_evict_ns, r.set_evict_allocs),
                ];
                for (op, ns, allocs) in ops {
                    wtr.write_record([
                        test,
                        r.name.as_str(),
                        op,
                        format!("{:.1}", ns).as_str(),
                        allocs.to_string().as_str(),
                    ])?;
                }
            }
        }
        for r in &lat.get_or_set {
            wtr.write_record([
                "getorset",
                r.name.as_str(),
                "get_or_set",
                format!("{:.1}", r.ns).as_str(),
                r.allocs.to_string().as_str(),
            ])?;
        }
        wtr.flush()?;
        written.push(path);
    }

    if let Some(tp) = &results.throughput {
        let path = dir.join("cachemark_throughput.csv");
        let mut wtr = csv_writer(&path)?;
        wtr.write_record(["test", "cache", "threads", "qps"])?;
        for table in &tp.tables {
            for r in &table.results {
                for (threads, qps) in &r.qps {
                    wtr.write_record([
                        table.test.id(),
                        r.name.as_str(),
                        threads.to_string().as_str(),
                        format!("{:.0}", qps).as_str(),
                    ])?;
                }
            }
        }
        wtr.flush()?;
        written.push(path);
    }

    if let Some(mem) = &results.memory {
        let path = dir.join("cachemark_memory.csv");
        let mut wtr = csv_writer(&path)?;
        wtr.write_record(["cache", "items", "bytes", "bytes_per_item", "baseline_bytes"])?;
        for r in &mem.results {
            wtr.write_record([
                r.name.clone(),
                r.items.to_string(),
                r.bytes.to_string(),
                r.bytes_per_item.to_string(),
                r.baseline_bytes.to_string(),
            ])?;
        }
        wtr.flush()?;
        written.push(path);
    }

    if !results.rankings.is_empty() {
        let path = dir.join("cachemark_rankings.csv");
        let mut wtr = csv_writer(&path)?;
        wtr.write_record(["rank", "cache", "score", "gold", "silver", "bronze"])?;
        for r in &results.rankings {
            wtr.write_record([
                r.rank.to_string(),
                r.name.clone(),
                format!("{:.0}", r.score),
                r.gold.to_string(),
                r.silver.to_string(),
                r.bronze.to_string(),
            ])?;
        }
        wtr.flush()?;
        written.push(path);
    }

    Ok(written)
}

fn csv_writer(path: &Path) -> Result<csv::Writer<File>> {
    csv::Writer::from_path(path).with_context(|| format!("Failed to create {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{HitRateTable, MemoryResult};

    fn sample() -> Results {
        let mut results = Results::new(MachineInfo {
            os: "linux".into(),
            arch: "x86_64".into(),
            num_cpu: 8,
            version: "0.1.0".into(),
            git_commit: "abc1234".into(),
            command_line: "cachemark --suites hitrate,memory".into(),
        });
        results.hit_rate = Some(HitRateData {
            sizes: vec![16384],
            tables: vec![HitRateTable {
                test: HitRateTest::Zipf,
                results: vec![
                    HitRateResult {
                        name: "lru".into(),
                        rates: BTreeMap::from([(16384, 60.0)]),
                    },
                    HitRateResult {
                        name: "sieve".into(),
                        rates: BTreeMap::from([(16384, 66.0)]),
                    },
                ],
            }],
        });
        results.memory = Some(MemoryData {
            results: vec![MemoryResult {
                name: "lru".into(),
                items: 10,
                bytes: 2 * 1024 * 1024,
                bytes_per_item: 100,
                baseline_bytes: 1024 * 1024,
            }],
            capacity: 10,
            val_size: 1024,
        });
        results.rank();
        results
    }

    #[test]
    fn json_uses_camel_case_and_omits_empty_sections() {
        let value = serde_json::to_value(JsonResults::from_results(&sample())).unwrap();
        assert_eq!(value["machineInfo"]["numCpu"], 8);
        assert_eq!(value["hitRate"]["zipf"][1]["avgRate"], 66.0);
        assert_eq!(value["hitRate"]["zipf"][1]["rates"]["16384"], 66.0);
        assert!(value["hitRate"].get("cdn").is_none());
        assert!(value.get("latency").is_none());
        assert_eq!(value["memory"]["results"][0]["bytesPerItem"], 100);
        assert_eq!(value["memory"]["valSize"], 1024);
        // lru wins memory outright, so 10 + 7 beats sieve's 10
        assert_eq!(value["rankings"][0]["name"], "lru");
        assert_eq!(value["rankings"][0]["score"], 17.0);
    }

    #[test]
    fn json_category_score_weights_medals() {
        let value = serde_json::to_value(JsonResults::from_results(&sample())).unwrap();
        let cats = value["medalTable"]["categories"].as_array().unwrap();
        assert_eq!(cats[0]["name"], "Hit Rate");
        assert_eq!(cats[0]["rankings"][0]["score"], 10.0);
        assert_eq!(cats[0]["rankings"][1]["score"], 7.0);
        assert_eq!(cats[0]["benchmarks"][0]["gold"][0], "sieve");
        // No bronze in a two-cache run, so the key is omitted
        assert!(cats[0]["benchmarks"][0].get("bronze").is_none());
    }

    #[test]
    fn markdown_has_tables_and_rankings() {
        let mut buf = Vec::new();
        render_markdown(&mut buf, &sample()).unwrap();
        let md = String::from_utf8(buf).unwrap();
        assert!(md.starts_with("# cachemark Results\n\n```\nCommand: cachemark --suites hitrate,memory\n"));
        assert!(md.contains("## Hit Rate Benchmarks\n\n### Zipf\n"));
        assert!(md.contains("| sieve         | 66.00% | 66.000% |"));
        assert!(md.contains("  winner: sieve (+10.000% vs lru)"));
        assert!(md.contains("Baseline (HashMap<String, Vec<u8>>): 1.00 MB"));
        assert!(md.contains("| Rank | Cache         | Score | Gold | Silver | Bronze |"));
        assert!(md.contains("## Medal Table"));
        assert!(!md.contains("## Latency Benchmarks"));
    }

    #[test]
    fn csv_files_per_suite() {
        let dir = tempfile::tempdir().unwrap();
        let written = write_csv(dir.path(), &sample()).unwrap();
        let names: Vec<String> = written
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec!["cachemark_hitrate.csv", "cachemark_memory.csv", "cachemark_rankings.csv"]
        );
        let hitrate = std::fs::read_to_string(&written[0]).unwrap();
        assert!(hitrate.starts_with("test,cache,size,hit_rate\n"));
        assert!(hitrate.contains("zipf,sieve,16384,66.0000"));
    }
}
