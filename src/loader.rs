//! Snapshot loading.
//!
//! Turns a result file (plain or xz-compressed JSON) into a normalized
//! [`Snapshot`]. The run timestamp is carried in the file name, e.g.
//! `results-2024-01-08_04-30-00.json.xz`, and is required: a series can
//! only be ordered when every member has a comparable date.

use crate::config::ReportContext;
use crate::error::LoadError;
use crate::models::{PackageResults, Snapshot};
use chrono::NaiveDateTime;
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, warn};
use xz2::read::XzDecoder;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

fn timestamp_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(\d{4}-\d{2}-\d{2}_\d{2}-\d{2}-\d{2})\.json(?:\.xz)?$")
            .expect("timestamp pattern is valid")
    })
}

/// Extract the run timestamp from the trailing segment of a result file name.
pub fn parse_timestamp(path: &Path) -> Result<NaiveDateTime, LoadError> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| LoadError::MalformedIdentifier(path.to_path_buf()))?;

    let captures = timestamp_pattern()
        .captures(name)
        .ok_or_else(|| LoadError::MalformedIdentifier(path.to_path_buf()))?;

    NaiveDateTime::parse_from_str(&captures[1], TIMESTAMP_FORMAT)
        .map_err(|_| LoadError::MalformedIdentifier(path.to_path_buf()))
}

/// Read a result file, decompressing transparently when it ends in `.xz`.
fn read_payload(path: &Path) -> Result<Vec<u8>, LoadError> {
    let io_err = |source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    };

    let raw = fs::read(path).map_err(io_err)?;

    if path.extension().is_some_and(|ext| ext == "xz") {
        let mut decoded = Vec::new();
        XzDecoder::new(raw.as_slice())
            .read_to_end(&mut decoded)
            .map_err(io_err)?;
        Ok(decoded)
    } else {
        Ok(raw)
    }
}

/// Load one result file into a [`Snapshot`].
///
/// Packages on the ignore-list are dropped before metadata inference so they
/// never reach any aggregate computation. Any failure here aborts the batch.
pub fn load_snapshot(path: &Path, ctx: &ReportContext) -> Result<Snapshot, LoadError> {
    let timestamp = parse_timestamp(path)?;
    let payload = read_payload(path)?;

    let mut packages: BTreeMap<String, PackageResults> = serde_json::from_slice(&payload)
        .map_err(|source| LoadError::CorruptPayload {
            path: path.to_path_buf(),
            source,
        })?;

    if !ctx.ignore.is_empty() {
        packages.retain(|name, _| !ctx.ignore.contains(name));
    }

    debug!(
        "Loaded {} with {} packages (run {})",
        path.display(),
        packages.len(),
        timestamp
    );

    Ok(Snapshot::new(
        timestamp,
        path.display().to_string(),
        packages,
        ctx.untested_is_passing,
    ))
}

/// Load a whole batch; the first failure aborts the run.
pub fn load_snapshots(paths: &[PathBuf], ctx: &ReportContext) -> Result<Vec<Snapshot>, LoadError> {
    paths.iter().map(|p| load_snapshot(p, ctx)).collect()
}

/// Discover previous result files in a local directory, newest first.
///
/// Files whose basename is already part of the current invocation are
/// skipped so the current run is not counted twice. Files without a
/// parseable timestamp are ignored with a warning rather than failing the
/// run; they were never produced by the test pipeline.
pub fn discover_previous_results(
    dir: &Path,
    exclude: &[PathBuf],
) -> std::io::Result<Vec<PathBuf>> {
    let exclude_names: Vec<&std::ffi::OsStr> =
        exclude.iter().filter_map(|p| p.file_name()).collect();

    let mut found = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name() else {
            continue;
        };
        if exclude_names.contains(&name) {
            continue;
        }
        match name.to_str() {
            Some(name_str) if timestamp_pattern().is_match(name_str) => found.push(path),
            Some(name_str) => {
                if name_str.ends_with(".json") || name_str.ends_with(".json.xz") {
                    warn!("Skipping {} (no timestamp in file name)", path.display());
                }
            }
            None => {}
        }
    }

    // Newest first; the timestamp is lexicographically sortable.
    found.sort();
    found.reverse();
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use xz2::write::XzEncoder;

    const SAMPLE: &str = r#"{
        "numpy": {
            "jammy-pip": {"test-passed": true, "runtime": 3.2},
            "jammy-apt": {"test-passed": false}
        },
        "flask": {
            "noble-pip": {"test-passed": true}
        }
    }"#;

    fn ctx() -> ReportContext {
        ReportContext::default()
    }

    #[test]
    fn test_parse_timestamp() {
        let ts = parse_timestamp(Path::new("results-2024-01-08_04-30-00.json")).unwrap();
        assert_eq!(ts.to_string(), "2024-01-08 04:30:00");

        let ts = parse_timestamp(Path::new("/tmp/results-2024-01-01_00-00-00.json.xz")).unwrap();
        assert_eq!(ts.to_string(), "2024-01-01 00:00:00");
    }

    #[test]
    fn test_parse_timestamp_rejects_missing_date() {
        let err = parse_timestamp(Path::new("results.json")).unwrap_err();
        assert!(matches!(err, LoadError::MalformedIdentifier(_)));
    }

    #[test]
    fn test_load_plain_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results-2024-01-08_00-00-00.json");
        fs::write(&path, SAMPLE).unwrap();

        let snapshot = load_snapshot(&path, &ctx()).unwrap();
        assert_eq!(snapshot.package_count(), 2);
        assert!(snapshot.packages["numpy"]["jammy-pip"].passed);
        assert!(!snapshot.packages["numpy"]["jammy-apt"].passed);
    }

    #[test]
    fn test_load_xz_compressed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results-2024-01-08_00-00-00.json.xz");

        let file = fs::File::create(&path).unwrap();
        let mut encoder = XzEncoder::new(file, 6);
        encoder.write_all(SAMPLE.as_bytes()).unwrap();
        encoder.finish().unwrap();

        let snapshot = load_snapshot(&path, &ctx()).unwrap();
        assert_eq!(snapshot.package_count(), 2);
    }

    #[test]
    fn test_load_rejects_corrupt_payload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results-2024-01-08_00-00-00.json");
        fs::write(&path, r#"["not", "a", "mapping"]"#).unwrap();

        let err = load_snapshot(&path, &ctx()).unwrap_err();
        assert!(matches!(err, LoadError::CorruptPayload { .. }));
    }

    #[test]
    fn test_ignore_list_drops_packages_at_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results-2024-01-08_00-00-00.json");
        fs::write(&path, SAMPLE).unwrap();

        let mut ctx = ctx();
        ctx.ignore.insert("flask".to_string());

        let snapshot = load_snapshot(&path, &ctx).unwrap();
        assert_eq!(snapshot.package_count(), 1);
        assert!(snapshot.packages.contains_key("numpy"));
    }

    #[test]
    fn test_discover_previous_results() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "results-2024-01-01_00-00-00.json.xz",
            "results-2024-01-08_00-00-00.json.xz",
            "notes.txt",
        ] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }

        let current = vec![dir.path().join("results-2024-01-08_00-00-00.json.xz")];
        let found = discover_previous_results(dir.path(), &current).unwrap();

        assert_eq!(found.len(), 1);
        assert!(found[0].ends_with("results-2024-01-01_00-00-00.json.xz"));
    }
}
