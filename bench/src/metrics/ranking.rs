//! Ranked voting across every benchmark that ran.
//!
//! Each benchmark awards placement points (10, 7, 5, 4, 3, 2, 1) to its
//! implementations, best first. Scores that agree to three decimals form a
//! tie group: every member gets the group's placement, and the next group
//! skips ahead by the group size. The top three placements also earn gold,
//! silver and bronze, tracked both overall and per category.
//!
//! Standings are kept in first-seen order and every sort is stable, so equal
//! totals always come out in the same order.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::Results;
use crate::suite::{HitRateTest, LatencyTest, ThroughputTest};

/// Points awarded by placement: 1st=10, 2nd=7, 3rd=5, 4th=4, 5th=3, 6th=2, 7th=1.
pub const PLACEMENT_POINTS: [f64; 7] = [10.0, 7.0, 5.0, 4.0, 3.0, 2.0, 1.0];

/// Round to 3 decimal places for tie detection.
pub fn round3(f: f64) -> f64 {
    (f * 1000.0).round() / 1000.0
}

/// Overall (or per-category) standing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ranking {
    pub rank: usize,
    pub name: String,
    pub score: f64,
    pub gold: usize,
    pub silver: usize,
    pub bronze: usize,
}

/// Winner sets of one benchmark
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchmarkMedal {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub gold: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub silver: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bronze: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryMedals {
    pub name: String,
    pub benchmarks: Vec<BenchmarkMedal>,
    /// Ordered by gold, then silver, then bronze; `score` is left at 0
    pub rankings: Vec<Ranking>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MedalTable {
    pub categories: Vec<CategoryMedals>,
}

/// Benchmark categories in medal-table order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    HitRate,
    Latency,
    Throughput,
    Memory,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::HitRate,
        Category::Latency,
        Category::Throughput,
        Category::Memory,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Category::HitRate => "Hit Rate",
            Category::Latency => "Latency",
            Category::Throughput => "Throughput",
            Category::Memory => "Memory",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Name and score for winner display
#[derive(Debug, Clone, PartialEq)]
pub struct WinnerEntry {
    pub name: String,
    pub score: f64,
}

impl WinnerEntry {
    pub fn new(name: impl Into<String>, score: f64) -> Self {
        Self {
            name: name.into(),
            score,
        }
    }
}

/// Names tied for first (to 3 decimals) and the first entry that differs.
///
/// `entries` must already be sorted best-first. The runner-up is `None` when
/// everyone ties or there is a single entry.
pub fn format_winners(entries: &[WinnerEntry]) -> (Vec<String>, Option<WinnerEntry>) {
    let Some(first) = entries.first() else {
        return (Vec::new(), None);
    };
    let best = round3(first.score);
    let mut winners = Vec::new();
    for e in entries {
        if round3(e.score) != best {
            return (winners, Some(e.clone()));
        }
        winners.push(e.name.clone());
    }
    (winners, None)
}

/// Rank every implementation across all benchmarks in `results`.
///
/// Returns `None` when no benchmark produced a scored entry.
pub fn compute_rankings(results: &Results) -> Option<(Vec<Ranking>, MedalTable)> {
    let mut tally = Tally::default();

    if let Some(hr) = &results.hit_rate {
        for test in HitRateTest::ALL {
            let data = hr.table(test);
            if data.is_empty() {
                continue;
            }
            let entries = best_first(
                data.iter().map(|r| (r.name.as_str(), r.average(&hr.sizes))),
                Direction::HigherIsBetter,
            );
            tally.assign(Category::HitRate, test.title(), &entries);
        }
    }

    if let Some(lat) = &results.latency {
        let keyed = [(LatencyTest::String, &lat.string), (LatencyTest::Int, &lat.int)];
        for (test, data) in keyed {
            if data.is_empty() {
                continue;
            }
            let entries = best_first(
                data.iter().map(|r| (r.name.as_str(), r.avg_ns())),
                Direction::LowerIsBetter,
            );
            tally.assign(Category::Latency, test.title(), &entries);
        }
        if !lat.get_or_set.is_empty() {
            let entries = best_first(
                lat.get_or_set.iter().map(|r| (r.name.as_str(), r.ns)),
                Direction::LowerIsBetter,
            );
            tally.assign(Category::Latency, LatencyTest::GetOrSet.title(), &entries);
        }
    }

    if let Some(tp) = &results.throughput {
        for test in ThroughputTest::ALL {
            let data = tp.table(test);
            if data.is_empty() {
                continue;
            }
            let entries = best_first(
                data.iter().map(|r| (r.name.as_str(), r.avg_qps())),
                Direction::HigherIsBetter,
            );
            tally.assign(Category::Throughput, test.title(), &entries);
        }
    }

    if let Some(mem) = &results.memory {
        if !mem.results.is_empty() {
            let entries = best_first(
                mem.results.iter().map(|r| (r.name.as_str(), r.bytes as f64)),
                Direction::LowerIsBetter,
            );
            tally.assign(Category::Memory, "Overhead", &entries);
        }
    }

    tally.finish()
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    HigherIsBetter,
    LowerIsBetter,
}

#[derive(Debug)]
struct RankedEntry<'a> {
    name: &'a str,
    score: f64,
}

fn best_first<'a>(
    scores: impl Iterator<Item = (&'a str, f64)>,
    direction: Direction,
) -> Vec<RankedEntry<'a>> {
    let mut entries: Vec<RankedEntry<'a>> = scores
        .map(|(name, score)| RankedEntry { name, score })
        .collect();
    entries.sort_by(|a, b| match direction {
        Direction::HigherIsBetter => b.score.total_cmp(&a.score),
        Direction::LowerIsBetter => a.score.total_cmp(&b.score),
    });
    entries
}

/// Gold, silver, bronze counts
type Medals = [usize; 3];

#[derive(Debug)]
struct Standing {
    name: String,
    score: f64,
    medals: Medals,
}

#[derive(Debug, Default)]
struct CategoryTally {
    benchmarks: Vec<BenchmarkMedal>,
    medals: Vec<(String, Medals)>,
}

#[derive(Debug, Default)]
struct Tally {
    standings: Vec<Standing>,
    categories: [CategoryTally; 4],
}

impl Tally {
    fn standing(&mut self, name: &str) -> &mut Standing {
        let idx = match self.standings.iter().position(|s| s.name == name) {
            Some(idx) => idx,
            None => {
                self.standings.push(Standing {
                    name: name.to_string(),
                    score: 0.0,
                    medals: [0; 3],
                });
                self.standings.len() - 1
            }
        };
        &mut self.standings[idx]
    }

    /// Award points and medals for one benchmark; `entries` are best-first.
    fn assign(&mut self, category: Category, bench_name: &str, entries: &[RankedEntry<'_>]) {
        let mut medal = BenchmarkMedal {
            name: bench_name.to_string(),
            ..Default::default()
        };
        let mut pos = 0;
        let mut i = 0;

        while i < entries.len() {
            let base = round3(entries[i].score);
            let mut tied = Vec::new();
            while i < entries.len() && round3(entries[i].score) == base {
                tied.push(entries[i].name.to_string());
                i += 1;
            }

            for name in &tied {
                if let Some(&points) = PLACEMENT_POINTS.get(pos) {
                    self.standing(name).score += points;
                }
                if pos < 3 {
                    self.standing(name).medals[pos] += 1;
                    let cat = &mut self.categories[category.index()];
                    match cat.medals.iter_mut().find(|(n, _)| n == name) {
                        Some((_, m)) => m[pos] += 1,
                        None => {
                            let mut m = [0; 3];
                            m[pos] = 1;
                            cat.medals.push((name.clone(), m));
                        }
                    }
                }
            }

            match pos {
                0 => medal.gold = tied.clone(),
                1 => medal.silver = tied.clone(),
                2 => medal.bronze = tied.clone(),
                _ => {}
            }

            pos += tied.len();
        }

        self.categories[category.index()].benchmarks.push(medal);
    }

    fn finish(mut self) -> Option<(Vec<Ranking>, MedalTable)> {
        if self.standings.is_empty() {
            return None;
        }

        self.standings.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| by_medals(&a.medals, &b.medals))
        });
        let rankings = self
            .standings
            .iter()
            .enumerate()
            .map(|(i, s)| Ranking {
                rank: i + 1,
                name: s.name.clone(),
                score: s.score,
                gold: s.medals[0],
                silver: s.medals[1],
                bronze: s.medals[2],
            })
            .collect();

        let mut categories = Vec::new();
        for (category, tally) in Category::ALL.into_iter().zip(self.categories) {
            if tally.benchmarks.is_empty() {
                continue;
            }
            let mut medals = tally.medals;
            medals.sort_by(|a, b| by_medals(&a.1, &b.1));
            let rankings = medals
                .into_iter()
                .enumerate()
                .map(|(i, (name, m))| Ranking {
                    rank: i + 1,
                    name,
                    score: 0.0,
                    gold: m[0],
                    silver: m[1],
                    bronze: m[2],
                })
                .collect();
            categories.push(CategoryMedals {
                name: category.name().to_string(),
                benchmarks: tally.benchmarks,
                rankings,
            });
        }

        Some((rankings, MedalTable { categories }))
    }
}

/// More gold first, then silver, then bronze.
fn by_medals(a: &Medals, b: &Medals) -> Ordering {
    b[0].cmp(&a[0])
        .then_with(|| b[1].cmp(&a[1]))
        .then_with(|| b[2].cmp(&a[2]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round3_half_rounds_away_from_zero() {
        let cases = [
            (85.2344, 85.234),
            (85.2345, 85.235),
            (85.2346, 85.235),
            (0.0001, 0.0),
            (0.0005, 0.001),
            (100.0, 100.0),
            (99.9999, 100.0),
        ];
        for (input, want) in cases {
            assert_eq!(round3(input), want, "round3({})", input);
        }
    }

    #[test]
    fn winners_collect_the_tie() {
        let entries = vec![
            WinnerEntry::new("a", 90.0001),
            WinnerEntry::new("b", 90.0002),
            WinnerEntry::new("c", 80.0),
        ];
        let (winners, runner_up) = format_winners(&entries);
        assert_eq!(winners, vec!["a", "b"]);
        assert_eq!(runner_up.map(|r| r.name), Some("c".to_string()));
    }

    #[test]
    fn winners_without_runner_up() {
        let (winners, runner_up) = format_winners(&[WinnerEntry::new("solo", 1.0)]);
        assert_eq!(winners, vec!["solo"]);
        assert!(runner_up.is_none());

        let (winners, runner_up) = format_winners(&[]);
        assert!(winners.is_empty());
        assert!(runner_up.is_none());
    }

    #[test]
    fn big_first_place_tie_leaves_no_silver_or_bronze() {
        let mut tally = Tally::default();
        let entries: Vec<RankedEntry<'_>> = ["a", "b", "c", "d", "e"]
            .into_iter()
            .zip([5.0, 5.0, 5.0, 5.0, 1.0])
            .map(|(name, score)| RankedEntry { name, score })
            .collect();
        tally.assign(Category::Memory, "Overhead", &entries);
        let (rankings, table) = tally.finish().unwrap();

        let bench = &table.categories[0].benchmarks[0];
        assert_eq!(bench.gold.len(), 4);
        assert!(bench.silver.is_empty());
        assert!(bench.bronze.is_empty());

        // Fifth place earns 3 points
        let e = rankings.iter().find(|r| r.name == "e").unwrap();
        assert_eq!(e.score, 3.0);
        assert_eq!((e.gold, e.silver, e.bronze), (0, 0, 0));
    }

    #[test]
    fn entries_past_seventh_place_score_nothing() {
        let mut tally = Tally::default();
        let names = ["a", "b", "c", "d", "e", "f", "g", "h"];
        let entries: Vec<RankedEntry<'_>> = names
            .iter()
            .copied()
            .enumerate()
            .map(|(i, name)| RankedEntry {
                name,
                score: 100.0 - i as f64,
            })
            .collect();
        tally.assign(Category::HitRate, "Zipf", &entries);
        let (rankings, _) = tally.finish().unwrap();
        assert_eq!(rankings.len(), 7);
        assert!(rankings.iter().all(|r| r.name != "h"));
    }
}
