//! Production Trace Loading
//!
//! Traces are zstd-compressed text files read from a trace directory. Each
//! file is decoded at most once per [`TraceStore`]; a failed load is not
//! cached, so a later call retries.

use anyhow::{Context, Result};
use cachemark_engine::StrKey;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tracing::{debug, instrument};

/// Key-only trace
pub type KeyTrace = Arc<Vec<StrKey>>;

/// Action-typed trace
pub type OpTrace = Arc<Vec<TraceOp>>;

/// Trace file shipped alongside the benchmark
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceFile {
    Cdn,
    Meta,
    Twitter,
    Wikipedia,
    Thesios,
    IbmDocker,
    TencentPhoto,
}

impl TraceFile {
    pub fn file_name(self) -> &'static str {
        match self {
            TraceFile::Cdn => "reag0c01_keys_only.csv.zst",
            TraceFile::Meta => "meta_trace_3m.csv.zst",
            TraceFile::Twitter => "twitter_trace_2m.csv.zst",
            TraceFile::Wikipedia => "wiki_trace_2m.csv.zst",
            TraceFile::Thesios => "thesios_trace_400k.csv.zst",
            TraceFile::IbmDocker => "ibm_docker_trace_725k.csv.zst",
            TraceFile::TencentPhoto => "tencent_photo_2m.txt.zst",
        }
    }

    /// Expected operation count, used to pre-size the key vector.
    fn expected_ops(self) -> usize {
        match self {
            TraceFile::Cdn | TraceFile::Twitter | TraceFile::Wikipedia => 2_000_000,
            TraceFile::TencentPhoto => 2_000_000,
            TraceFile::Meta => 3_000_000,
            TraceFile::Thesios => 400_000,
            TraceFile::IbmDocker => 725_000,
        }
    }
}

impl fmt::Display for TraceFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/// Meta trace action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Get,
    Set,
    /// Anything else; replay skips it
    Other,
}

impl Action {
    fn parse(s: &str) -> Self {
        match s.trim() {
            "GET" => Action::Get,
            "SET" => Action::Set,
            _ => Action::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceOp {
    pub key: StrKey,
    pub action: Action,
}

/// Thesios block and file views, decoded together
#[derive(Debug, Clone)]
pub struct ThesiosTrace {
    /// `hash:offset` keys
    pub block: KeyTrace,
    /// Keys truncated at the last `:`
    pub file: KeyTrace,
}

/// Memoized trace loader rooted at one directory
#[derive(Debug, Default)]
pub struct TraceStore {
    dir: PathBuf,
    cdn: OnceLock<KeyTrace>,
    meta: OnceLock<OpTrace>,
    twitter: OnceLock<KeyTrace>,
    wikipedia: OnceLock<KeyTrace>,
    thesios: OnceLock<ThesiosTrace>,
    ibm_docker: OnceLock<KeyTrace>,
    tencent_photo: OnceLock<KeyTrace>,
}

impl TraceStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ..Default::default()
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_of(&self, file: TraceFile) -> PathBuf {
        self.dir.join(file.file_name())
    }

    pub fn cdn(&self) -> Result<KeyTrace> {
        self.keys(&self.cdn, TraceFile::Cdn)
    }

    pub fn twitter(&self) -> Result<KeyTrace> {
        self.keys(&self.twitter, TraceFile::Twitter)
    }

    pub fn wikipedia(&self) -> Result<KeyTrace> {
        self.keys(&self.wikipedia, TraceFile::Wikipedia)
    }

    pub fn ibm_docker(&self) -> Result<KeyTrace> {
        self.keys(&self.ibm_docker, TraceFile::IbmDocker)
    }

    pub fn tencent_photo(&self) -> Result<KeyTrace> {
        self.keys(&self.tencent_photo, TraceFile::TencentPhoto)
    }

    pub fn meta(&self) -> Result<OpTrace> {
        memoize(&self.meta, || {
            let reader = open_zstd(&self.path_of(TraceFile::Meta))?;
            Ok(Arc::new(parse_meta(reader, TraceFile::Meta.expected_ops())?))
        })
    }

    pub fn thesios(&self) -> Result<ThesiosTrace> {
        memoize(&self.thesios, || {
            let reader = open_zstd(&self.path_of(TraceFile::Thesios))?;
            let (block, file) = parse_thesios(reader, TraceFile::Thesios.expected_ops())?;
            Ok(ThesiosTrace {
                block: Arc::new(block),
                file: Arc::new(file),
            })
        })
    }

    fn keys(&self, slot: &OnceLock<KeyTrace>, file: TraceFile) -> Result<KeyTrace> {
        memoize(slot, || {
            let reader = open_zstd(&self.path_of(file))?;
            Ok(Arc::new(parse_keys(reader, file.expected_ops())?))
        })
    }
}

/// Return the cached value, or run `load` and cache it on success.
fn memoize<T: Clone>(slot: &OnceLock<T>, load: impl FnOnce() -> Result<T>) -> Result<T> {
    if let Some(value) = slot.get() {
        return Ok(value.clone());
    }
    let value = load()?;
    Ok(slot.get_or_init(|| value).clone())
}

#[instrument(level = "debug")]
fn open_zstd(path: &Path) -> Result<BufReader<zstd::Decoder<'static, BufReader<File>>>> {
    let file =
        File::open(path).with_context(|| format!("Failed to open trace {}", path.display()))?;
    let decoder = zstd::Decoder::new(file)
        .with_context(|| format!("Failed to create zstd decoder for {}", path.display()))?;
    debug!(path = %path.display(), "decoding trace");
    Ok(BufReader::new(decoder))
}

/// Newline-split lines with a trailing `\r` dropped. Invalid UTF-8 is
/// replaced rather than rejected, so one bad record never sinks a trace.
fn trace_lines<R: BufRead>(reader: R) -> impl Iterator<Item = Result<String>> {
    reader.split(b'\n').map(|line| {
        let mut bytes = line.context("Failed to read trace line")?;
        if bytes.last() == Some(&b'\r') {
            bytes.pop();
        }
        Ok(match String::from_utf8(bytes) {
            Ok(line) => line,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        })
    })
}

/// One key per non-empty line.
pub fn parse_keys<R: BufRead>(reader: R, capacity: usize) -> Result<Vec<StrKey>> {
    let mut keys = Vec::with_capacity(capacity);
    for line in trace_lines(reader) {
        let line = line?;
        if !line.is_empty() {
            keys.push(Arc::from(line));
        }
    }
    Ok(keys)
}

/// `key,ACTION` lines; lines without a comma are skipped.
pub fn parse_meta<R: BufRead>(reader: R, capacity: usize) -> Result<Vec<TraceOp>> {
    let mut ops = Vec::with_capacity(capacity);
    for line in trace_lines(reader) {
        let line = line?;
        let Some((key, action)) = line.split_once(',') else {
            continue;
        };
        ops.push(TraceOp {
            key: Arc::from(key),
            action: Action::parse(action),
        });
    }
    Ok(ops)
}

/// Block keys verbatim plus file keys (everything before the last `:`).
pub fn parse_thesios<R: BufRead>(
    reader: R,
    capacity: usize,
) -> Result<(Vec<StrKey>, Vec<StrKey>)> {
    let mut block = Vec::with_capacity(capacity);
    let mut file = Vec::with_capacity(capacity);
    for line in trace_lines(reader) {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        let file_key: StrKey = match line.rfind(':') {
            Some(idx) if idx > 0 => Arc::from(&line[..idx]),
            _ => Arc::from(line.as_str()),
        };
        block.push(Arc::from(line));
        file.push(file_key);
    }
    Ok((block, file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn keys_skip_empty_lines() {
        let keys = parse_keys(Cursor::new("a\n\nb\nc\n"), 0).unwrap();
        let keys: Vec<&str> = keys.iter().map(|k| &**k).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[test]
    fn meta_lines_need_a_comma() {
        let ops = parse_meta(Cursor::new("k1,GET\nbroken\nk2,SET\nk3,DELETE\n"), 0).unwrap();
        assert_eq!(ops.len(), 3);
        assert_eq!(ops[0].action, Action::Get);
        assert_eq!(&*ops[1].key, "k2");
        assert_eq!(ops[1].action, Action::Set);
        assert_eq!(ops[2].action, Action::Other);
    }

    #[test]
    fn thesios_file_view_strips_offset() {
        let (block, file) =
            parse_thesios(Cursor::new("abc:4096\nabc:8192\n:7\nnocolon\n"), 0).unwrap();
        assert_eq!(block.len(), 4);
        assert_eq!(&*file[0], "abc");
        assert_eq!(file[0], file[1]);
        // colon at index 0 keeps the whole line
        assert_eq!(&*file[2], ":7");
        assert_eq!(&*file[3], "nocolon");
    }

    #[test]
    fn invalid_utf8_lines_are_kept() {
        let keys = parse_keys(Cursor::new(&b"a\n\xff\xfe\nb\r\n"[..]), 0).unwrap();
        assert_eq!(keys.len(), 3);
        assert_eq!(&*keys[0], "a");
        assert_eq!(&*keys[1], "\u{FFFD}\u{FFFD}");
        assert_eq!(&*keys[2], "b");

        let ops = parse_meta(Cursor::new(&b"k\xff,GET\nk2,SET\n"[..]), 0).unwrap();
        assert_eq!(ops.len(), 2);
        assert_eq!(&*ops[0].key, "k\u{FFFD}");
        assert_eq!(ops[0].action, Action::Get);

        let (block, file) = parse_thesios(Cursor::new(&b"\xc3:10\nx:20\n"[..]), 0).unwrap();
        assert_eq!(block.len(), 2);
        assert_eq!(&*file[0], "\u{FFFD}");
        assert_eq!(&*file[1], "x");
    }

    #[test]
    fn last_line_without_newline_is_read() {
        let keys = parse_keys(Cursor::new("a\nb"), 0).unwrap();
        assert_eq!(keys.len(), 2);
        assert_eq!(&*keys[1], "b");
    }

    #[test]
    fn missing_trace_is_an_error_and_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let store = TraceStore::new(dir.path());
        assert!(store.cdn().is_err());

        let compressed = zstd::encode_all(Cursor::new("x\ny\nx\n"), 3).unwrap();
        std::fs::write(store.path_of(TraceFile::Cdn), compressed).unwrap();
        let keys = store.cdn().unwrap();
        assert_eq!(keys.len(), 3);

        // Second call is served from memory even if the file disappears
        std::fs::remove_file(store.path_of(TraceFile::Cdn)).unwrap();
        assert!(Arc::ptr_eq(&keys, &store.cdn().unwrap()));
    }
}
