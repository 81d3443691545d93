//! Isolated-process memory measurement
//!
//! Each cache is filled inside its own `cachemark-mem` process so heaps never
//! mix. The plain map baseline is subtracted to get per-item overhead.

use anyhow::{bail, Context, Result};
use cachemark_engine::{CacheFilter, ProbeReport, BASELINE_NAME};
use indicatif::ProgressBar;
use std::env;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};
use wait_timeout::ChildExt;

use crate::config::MemoryConfig;
use crate::metrics::{MemoryData, MemoryResult};

/// Probe binary name without platform suffix.
pub const PROBE_BIN: &str = "cachemark-mem";

/// Configured probe path, or `cachemark-mem` next to the running executable.
pub fn probe_path(cfg: &MemoryConfig) -> Result<PathBuf> {
    if let Some(path) = &cfg.probe_path {
        return Ok(path.clone());
    }
    let exe = env::current_exe().context("locate running executable")?;
    Ok(exe.with_file_name(format!("{}{}", PROBE_BIN, env::consts::EXE_SUFFIX)))
}

/// Parse the last JSON line a probe printed.
pub fn parse_report(stdout: &str) -> Result<ProbeReport> {
    let line = stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .last()
        .context("probe printed nothing")?;
    serde_json::from_str(line).with_context(|| format!("malformed probe output: {}", line))
}

/// Spawn one probe and return its report; a reported error becomes `Err`.
///
/// A probe still running after `timeout` is killed and reported as failed.
pub fn run_probe(
    probe: &Path,
    name: &str,
    capacity: usize,
    value_size: usize,
    timeout: Duration,
) -> Result<ProbeReport> {
    let mut child = Command::new(probe)
        .arg("--cache")
        .arg(name)
        .arg("--capacity")
        .arg(capacity.to_string())
        .arg("--value-size")
        .arg(value_size.to_string())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("spawn {}", probe.display()))?;

    // Drained concurrently; a full pipe would stall the probe
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let status = match child
        .wait_timeout(timeout)
        .with_context(|| format!("wait for {}", PROBE_BIN))?
    {
        Some(status) => status,
        None => {
            let _ = child.kill();
            let _ = child.wait();
            bail!("{} for {} did not finish within {:?}", PROBE_BIN, name, timeout);
        }
    };
    let stdout = stdout.join().unwrap_or_default();
    let stderr = stderr.join().unwrap_or_default();

    let report = parse_report(&String::from_utf8_lossy(&stdout)).map_err(|e| {
        if status.success() {
            e
        } else {
            let stderr = String::from_utf8_lossy(&stderr);
            e.context(format!("{} exited with {}: {}", PROBE_BIN, status, stderr.trim()))
        }
    })?;
    if let Some(err) = report.error {
        bail!("{}", err);
    }
    Ok(report)
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    })
}

/// Subtract the baseline and sort by total bytes, smallest first.
pub fn apply_baseline(results: &mut [MemoryResult], baseline_bytes: u64) {
    for r in results.iter_mut() {
        r.baseline_bytes = baseline_bytes;
        r.bytes_per_item = if r.items == 0 {
            0
        } else {
            (r.bytes as i64 - baseline_bytes as i64) / r.items as i64
        };
    }
    results.sort_by_key(|r| r.bytes);
}

/// Probe every selected cache, then the baseline.
///
/// A failing cache is logged and left out; a failing baseline fails the suite.
pub fn run_memory(filter: &CacheFilter, cfg: &MemoryConfig, progress: &ProgressBar) -> Result<MemoryData> {
    let probe = probe_path(cfg)?;
    let kinds = filter.kinds();
    progress.set_length(kinds.len() as u64 + 1);

    let mut results = Vec::with_capacity(kinds.len());
    for kind in kinds {
        match run_probe(&probe, kind.name(), cfg.capacity, cfg.value_size, cfg.timeout()) {
            Ok(report) => {
                debug!(cache = %report.name, bytes = report.bytes, items = report.items, "probe done");
                results.push(MemoryResult {
                    name: report.name,
                    items: report.items,
                    bytes: report.bytes,
                    bytes_per_item: 0,
                    baseline_bytes: 0,
                });
            }
            Err(e) => warn!(cache = kind.name(), error = %format!("{:#}", e), "memory probe failed"),
        }
        progress.inc(1);
    }

    let baseline = run_probe(&probe, BASELINE_NAME, cfg.capacity, cfg.value_size, cfg.timeout())
        .context("baseline benchmark")?;
    progress.inc(1);

    apply_baseline(&mut results, baseline.bytes);
    Ok(MemoryData {
        results,
        capacity: cfg.capacity,
        val_size: cfg.value_size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(name: &str, items: usize, bytes: u64) -> MemoryResult {
        MemoryResult {
            name: name.to_string(),
            items,
            bytes,
            bytes_per_item: 0,
            baseline_bytes: 0,
        }
    }

    #[test]
    fn baseline_is_subtracted_per_item() {
        let mut results = vec![result("big", 100, 50_000), result("small", 100, 20_000)];
        apply_baseline(&mut results, 10_000);
        assert_eq!(results[0].name, "small");
        assert_eq!(results[0].bytes_per_item, 100);
        assert_eq!(results[1].bytes_per_item, 400);
        assert!(results.iter().all(|r| r.baseline_bytes == 10_000));
    }

    #[test]
    fn below_baseline_goes_negative() {
        let mut results = vec![result("lean", 10, 500)];
        apply_baseline(&mut results, 1_000);
        assert_eq!(results[0].bytes_per_item, -50);
    }

    #[test]
    fn empty_cache_has_no_per_item_cost() {
        let mut results = vec![result("empty", 0, 4_096)];
        apply_baseline(&mut results, 0);
        assert_eq!(results[0].bytes_per_item, 0);
    }

    #[test]
    fn report_is_the_last_line() {
        let out = "warming up\n{\"name\":\"lru\",\"items\":3,\"bytes\":99}\n\n";
        let report = parse_report(out).unwrap();
        assert_eq!(report.name, "lru");
        assert_eq!(report.bytes, 99);
        assert!(report.error.is_none());
        assert!(parse_report("").is_err());
        assert!(parse_report("not json").is_err());
    }

    #[test]
    fn explicit_probe_path_wins() {
        let cfg = MemoryConfig {
            probe_path: Some(PathBuf::from("/opt/cachemark-mem")),
            ..MemoryConfig::default()
        };
        assert_eq!(probe_path(&cfg).unwrap(), PathBuf::from("/opt/cachemark-mem"));
        let default = probe_path(&MemoryConfig::default()).unwrap();
        assert!(default
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with(PROBE_BIN));
    }

    #[test]
    fn missing_probe_fails_the_suite() {
        let cfg = MemoryConfig {
            probe_path: Some(PathBuf::from("/nonexistent/cachemark-mem")),
            capacity: 10,
            ..MemoryConfig::default()
        };
        let err = run_memory(&CacheFilter::only(["lru"]), &cfg, &ProgressBar::hidden()).unwrap_err();
        assert!(format!("{:#}", err).contains("baseline benchmark"));
    }

    #[cfg(unix)]
    fn script(dir: &Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join("fake-probe.sh");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[test]
    fn hung_probe_is_killed_at_the_deadline() {
        let dir = tempfile::tempdir().unwrap();
        let probe = script(dir.path(), "exec sleep 30");
        let start = std::time::Instant::now();
        let err = run_probe(&probe, "lru", 10, 8, Duration::from_millis(200)).unwrap_err();
        assert!(start.elapsed() < Duration::from_secs(10), "{:?}", start.elapsed());
        assert!(err.to_string().contains("did not finish"), "{:#}", err);
    }

    #[cfg(unix)]
    #[test]
    fn probe_report_is_read_from_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let probe = script(
            dir.path(),
            r#"echo 'filling'; echo '{"name":"lru","items":10,"bytes":4096}'"#,
        );
        let report = run_probe(&probe, "lru", 10, 8, Duration::from_secs(10)).unwrap();
        assert_eq!(report.name, "lru");
        assert_eq!(report.items, 10);
        assert_eq!(report.bytes, 4_096);
    }

    #[cfg(unix)]
    #[test]
    fn failing_probe_carries_its_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let probe = script(dir.path(), "echo 'allocator exploded' >&2; exit 3");
        let err = run_probe(&probe, "lru", 10, 8, Duration::from_secs(10)).unwrap_err();
        let text = format!("{:#}", err);
        assert!(text.contains("allocator exploded"), "{}", text);
    }
}
