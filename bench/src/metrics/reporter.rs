use std::io::{self, Write};

use super::ranking::{format_winners, WinnerEntry};
use super::{GetOrSetLatencyResult, HitRateResult, LatencyResult, MemoryResult, Ranking, ThroughputResult};
use crate::suite::Suite;

/// Width of suite banners
const LINE_WIDTH: usize = 80;

/// Terminal tables, one per test, best-first with a winner line
pub struct ResultsReporter;

impl ResultsReporter {
    pub fn header<W: Write>(
        w: &mut W,
        suites: &[Suite],
        caches: usize,
        sizes: &[usize],
    ) -> io::Result<()> {
        writeln!(w, "cachemark")?;
        writeln!(w)?;
        let suites: Vec<&str> = suites.iter().map(|s| s.name()).collect();
        writeln!(w, "  caches: {}", caches)?;
        writeln!(w, "  suites: {}", suites.join(", "))?;
        let sizes: Vec<String> = sizes.iter().map(|s| format!("{}K", s / 1024)).collect();
        writeln!(w, "  sizes:  {}", sizes.join(", "))?;
        writeln!(w)
    }

    /// `name: description ─────` padded to the banner width.
    pub fn suite<W: Write>(w: &mut W, name: &str, description: &str) -> io::Result<()> {
        let header = format!("{}: {} ", name, description);
        let padding = LINE_WIDTH.saturating_sub(header.chars().count()).max(4);
        writeln!(w, "{}{}", header, "─".repeat(padding))?;
        writeln!(w)
    }

    pub fn test<W: Write>(w: &mut W, name: &str, description: &str) -> io::Result<()> {
        writeln!(w, "  [{}] {}", name, description)?;
        writeln!(w)
    }

    pub fn error<W: Write>(w: &mut W, err: &anyhow::Error) -> io::Result<()> {
        writeln!(w, "  error: {:#}", err)?;
        writeln!(w)
    }

    pub fn hit_rate_table<W: Write>(
        w: &mut W,
        results: &[HitRateResult],
        sizes: &[usize],
    ) -> io::Result<()> {
        let sorted = sort_best_first(results, |r| r.average(sizes), true);

        write!(w, "  | Cache         |")?;
        for size in sizes {
            write!(w, " {:>5}K |", size / 1024)?;
        }
        writeln!(w, "    Avg |")?;
        write!(w, "  |---------------|")?;
        for _ in sizes {
            write!(w, "--------|")?;
        }
        writeln!(w, "--------|")?;

        for r in &sorted {
            write!(w, "  | {:<13} |", r.name)?;
            for size in sizes {
                let rate = r.rates.get(size).copied().unwrap_or(0.0);
                write!(w, " {:>5.2}% |", rate)?;
            }
            writeln!(w, " {:>5.2}% |", r.average(sizes))?;
        }

        if sorted.len() >= 2 {
            let entries = winner_entries(&sorted, |r| r.average(sizes));
            let (winners, runner_up) = format_winners(&entries);
            let best = entries[0].score;
            write!(w, "\n  {} ({:.2}% avg", winner_label(&winners), best)?;
            if let Some(second) = runner_up {
                write!(w, ", +{:.2}% vs {}", pct_above(best, second.score), second.name)?;
            }
            writeln!(w, ")")?;
        }
        writeln!(w)
    }

    pub fn latency_table<W: Write>(w: &mut W, results: &[LatencyResult]) -> io::Result<()> {
        let sorted = sort_best_first(results, LatencyResult::avg_ns, false);

        writeln!(
            w,
            "  | Cache         | Get ns | Get alloc | Set ns | Set alloc | SetEvict ns | SetEvict alloc | Avg ns |"
        )?;
        writeln!(
            w,
            "  |---------------|--------|-----------|--------|-----------|-------------|----------------|--------|"
        )?;
        for r in &sorted {
            writeln!(
                w,
                "  | {:<13} | {:>6.0} | {:>9} | {:>6.0} | {:>9} | {:>11.0} | {:>14} | {:>6.0} |",
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

        if sorted.len() >= 2 {
            let entries = winner_entries(&sorted, LatencyResult::avg_ns);
            let (winners, runner_up) = format_winners(&entries);
            let best = entries[0].score;
            write!(w, "\n  {} ({:.0} ns avg", winner_label(&winners), best)?;
            if let Some(second) = runner_up {
                write!(
                    w,
                    ", {} is {:.1}% slower",
                    second.name,
                    pct_above(second.score, best)
                )?;
            }
            writeln!(w, ")")?;
        }
        writeln!(w)
    }

    pub fn get_or_set_table<W: Write>(
        w: &mut W,
        results: &[GetOrSetLatencyResult],
    ) -> io::Result<()> {
        if results.is_empty() {
            return no_get_or_set(w);
        }
        let sorted = sort_best_first(results, |r| r.ns, false);

        writeln!(w, "  | Cache         | GetOrSet ns | GetOrSet alloc |")?;
        writeln!(w, "  |---------------|-------------|----------------|")?;
        for r in &sorted {
            writeln!(w, "  | {:<13} | {:>11.0} | {:>14} |", r.name, r.ns, r.allocs)?;
        }

        if sorted.len() >= 2 {
            let entries = winner_entries(&sorted, |r| r.ns);
            let (winners, runner_up) = format_winners(&entries);
            let best = entries[0].score;
            write!(w, "\n  {} ({:.0} ns", winner_label(&winners), best)?;
            if let Some(second) = runner_up {
                write!(
                    w,
                    ", {} is {:.1}% slower",
                    second.name,
                    pct_above(second.score, best)
                )?;
            }
            writeln!(w, ")")?;
        }
        writeln!(w)
    }

    /// Placeholder printed when no selected cache supports GetOrSet.
    pub fn no_get_or_set<W: Write>(w: &mut W) -> io::Result<()> {
        no_get_or_set(w)
    }

    pub fn throughput_table<W: Write>(
        w: &mut W,
        results: &[ThroughputResult],
        threads: &[usize],
    ) -> io::Result<()> {
        let sorted = sort_best_first(results, ThroughputResult::avg_qps, true);

        write!(w, "  | Cache         |")?;
        for t in threads {
            write!(w, " {:>2}T       |", t)?;
        }
        writeln!(w, "       Avg |")?;
        write!(w, "  |---------------|")?;
        for _ in threads {
            write!(w, "-----------|")?;
        }
        writeln!(w, "-----------|")?;

        for r in &sorted {
            write!(w, "  | {:<13} |", r.name)?;
            for t in threads {
                write!(w, " {}   |", qps_cell(r.qps.get(t).copied().unwrap_or(0.0)))?;
            }
            writeln!(w, " {}   |", qps_cell(r.avg_qps()))?;
        }

        if sorted.len() >= 2 {
            let entries = winner_entries(&sorted, ThroughputResult::avg_qps);
            let (winners, runner_up) = format_winners(&entries);
            write!(w, "\n  {}", winner_label(&winners))?;
            if let Some(second) = runner_up {
                write!(
                    w,
                    " (+{:.1}% vs {})",
                    pct_above(entries[0].score, second.score),
                    second.name
                )?;
            }
            writeln!(w)?;
        }
        writeln!(w)
    }

    /// `results` must already be sorted by bytes ascending.
    pub fn memory_table<W: Write>(w: &mut W, results: &[MemoryResult]) -> io::Result<()> {
        writeln!(w, "  | Cache         | Items Stored | Memory (MB) | Overhead (bytes/item) |")?;
        writeln!(w, "  |---------------|--------------|-------------|-----------------------|")?;
        for r in results {
            writeln!(
                w,
                "  | {:<13} | {:>12} | {:>11.2} | {:>21} |",
                r.name,
                r.items,
                mib(r.bytes),
                r.bytes_per_item
            )?;
        }

        if results.len() >= 2 {
            let entries: Vec<WinnerEntry> = results
                .iter()
                .map(|r| WinnerEntry::new(r.name.clone(), r.bytes as f64))
                .collect();
            let (winners, runner_up) = format_winners(&entries);
            write!(w, "\n  {}", winner_label(&winners))?;
            if let Some(second) = runner_up {
                let savings = if second.score > 0.0 {
                    (second.score - entries[0].score) / second.score * 100.0
                } else {
                    0.0
                };
                write!(w, " ({:.1}% less memory vs {})", savings, second.name)?;
            }
            writeln!(w)?;
        }
        writeln!(w)
    }

    /// Top three of the overall ranking.
    pub fn overall<W: Write>(w: &mut W, rankings: &[Ranking]) -> io::Result<()> {
        if rankings.is_empty() {
            return Ok(());
        }
        Self::suite(w, "summary", "ranked voting across all tests")?;
        for r in rankings.iter().take(3) {
            writeln!(w, "  #{}  {} ({:.0} points)", r.rank, r.name, r.score)?;
        }
        writeln!(w)
    }
}

fn no_get_or_set<W: Write>(w: &mut W) -> io::Result<()> {
    writeln!(w, "  (no caches with GetOrSet support)")?;
    writeln!(w)
}

/// Stable best-first ordering by `score`.
pub(crate) fn sort_best_first<T>(
    items: &[T],
    score: impl Fn(&T) -> f64,
    higher_is_better: bool,
) -> Vec<&T> {
    let mut sorted: Vec<&T> = items.iter().collect();
    sorted.sort_by(|a, b| {
        let (a, b) = (score(*a), score(*b));
        if higher_is_better {
            b.total_cmp(&a)
        } else {
            a.total_cmp(&b)
        }
    });
    sorted
}

pub(crate) fn winner_entries<T>(sorted: &[&T], score: impl Fn(&T) -> f64) -> Vec<WinnerEntry>
where
    T: Named,
{
    sorted
        .iter()
        .map(|r| WinnerEntry::new(r.name(), score(*r)))
        .collect()
}

pub(crate) fn winner_label(winners: &[String]) -> String {
    if winners.len() > 1 {
        format!("winners (tie): {}", winners.join(", "))
    } else {
        format!("winner: {}", winners.first().map(String::as_str).unwrap_or("-"))
    }
}

/// How far `value` sits above `base`, in percent of `base`.
pub(crate) fn pct_above(value: f64, base: f64) -> f64 {
    if base == 0.0 {
        return 0.0;
    }
    (value - base) / base * 100.0
}

/// `  1.23M` at a million and above, `   950K` below.
pub(crate) fn qps_cell(qps: f64) -> String {
    if qps >= 1_000_000.0 {
        format!("{:>6.2}M", qps / 1_000_000.0)
    } else {
        format!("{:>6.0}K", qps / 1_000.0)
    }
}

pub(crate) fn mib(bytes: u64) -> f64 {
    bytes as f64 / 1024.0 / 1024.0
}

/// Result rows that carry an implementation name
pub(crate) trait Named {
    fn name(&self) -> &str;
}

macro_rules! impl_named {
    ($($ty:ty),*) => {
        $(impl Named for $ty {
            fn name(&self) -> &str {
                &self.name
            }
        })*
    };
}

impl_named!(HitRateResult, LatencyResult, GetOrSetLatencyResult, ThroughputResult, MemoryResult);
