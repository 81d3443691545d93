use cachemark_engine::StrKey;
use std::sync::Arc;

/// Popular Wikipedia article titles used to shape URL keys.
pub const WIKI_SEGMENTS: [&str; 55] = [
    "Main_Page",
    "United_States",
    "World_War_II",
    "India",
    "United_Kingdom",
    "Canada",
    "Australia",
    "Germany",
    "France",
    "Japan",
    "China",
    "Russia",
    "Brazil",
    "Italy",
    "Spain",
    "Mexico",
    "South_Korea",
    "Indonesia",
    "New_York_City",
    "London",
    "Paris",
    "Tokyo",
    "Los_Angeles",
    "Chicago",
    "Houston",
    "Phoenix",
    "Philadelphia",
    "San_Antonio",
    "San_Diego",
    "Albert_Einstein",
    "Isaac_Newton",
    "Charles_Darwin",
    "Marie_Curie",
    "Leonardo_da_Vinci",
    "William_Shakespeare",
    "Abraham_Lincoln",
    "George_Washington",
    "Napoleon",
    "Julius_Caesar",
    "Cleopatra",
    "The_Beatles",
    "Elvis_Presley",
    "Michael_Jackson",
    "Madonna",
    "Python_(programming_language)",
    "JavaScript",
    "Java_(programming_language)",
    "C_(programming_language)",
    "Go_(programming_language)",
    "Rust_(programming_language)",
    "Linux",
    "Microsoft_Windows",
    "MacOS",
    "Android_(operating_system)",
    "IOS",
];

/// Segments cycled by the throughput GetOrSet workload.
pub const THROUGHPUT_SEGMENTS: usize = 24;

const WIKI_PREFIX: &str = "https://en.wikipedia.org/wiki/";

/// Key generator for benchmarks
pub struct KeyGenerator;

impl KeyGenerator {
    /// `"0"`, `"1"`, ... `"n-1"`.
    pub fn decimal(n: usize) -> Vec<StrKey> {
        (0..n).map(|i| Arc::from(i.to_string())).collect()
    }

    /// Decimal string for each integer key.
    pub fn decimal_from(keys: &[u64]) -> Vec<StrKey> {
        keys.iter().map(|k| Arc::from(k.to_string())).collect()
    }

    /// Sequential URL keys, cycling through every segment.
    pub fn urls(n: usize) -> Vec<StrKey> {
        (0..n)
            .map(|i| url(WIKI_SEGMENTS[i % WIKI_SEGMENTS.len()], i as u64))
            .collect()
    }

    /// URL key per Zipf index, drawn from the first [`THROUGHPUT_SEGMENTS`] segments.
    pub fn zipf_urls(indices: &[u64]) -> Vec<StrKey> {
        indices
            .iter()
            .map(|&idx| url(WIKI_SEGMENTS[(idx % THROUGHPUT_SEGMENTS as u64) as usize], idx))
            .collect()
    }
}

fn url(segment: &str, idx: u64) -> StrKey {
    Arc::from(format!("{}{}_{}", WIKI_PREFIX, segment, idx))
}

/// Value generator for benchmarks
pub struct ValueGenerator;

impl ValueGenerator {
    /// `size` bytes of the repeating pattern `A..Z`.
    pub fn pattern(size: usize) -> StrKey {
        let text: String = (0..size).map(|i| (b'A' + (i % 26) as u8) as char).collect();
        Arc::from(text)
    }
}
