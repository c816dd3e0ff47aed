//! The ordered snapshot series and historical lookups.
//!
//! The series owns every snapshot for the duration of report generation;
//! everything downstream borrows from it.

use crate::models::Snapshot;
use chrono::NaiveDateTime;

/// Key for a historical lookup: either a literal test name or the derived
/// every-distribution flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupKey<'a> {
    /// A literal test name, e.g. `jammy-pip`.
    Test(&'a str),
    /// The per-package "every distribution has a passing option" flag.
    EveryDistributionPassing,
}

/// Snapshots sorted descending by timestamp; index 0 is the current run.
///
/// The sort is stable, so snapshots that share a timestamp keep their input
/// order (ordering between them is otherwise undefined).
#[derive(Debug, Default)]
pub struct SnapshotSeries {
    snapshots: Vec<Snapshot>,
}

impl SnapshotSeries {
    /// Build a series from unordered snapshots.
    pub fn new(mut snapshots: Vec<Snapshot>) -> Self {
        snapshots.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Self { snapshots }
    }

    /// The most recent snapshot, if the series is non-empty.
    pub fn current(&self) -> Option<&Snapshot> {
        self.snapshots.first()
    }

    /// All snapshots, newest first.
    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    /// Timestamp of the most recent snapshot at or after `from_index` where
    /// the package passed the given test (or carried the derived flag).
    ///
    /// `from_index` is where scanning begins; callers comparing against the
    /// current snapshot pass 1 so the current run itself is never returned.
    /// A package or test missing from an intermediate snapshot is skipped,
    /// not an error. `None` means the package never passed in the recorded
    /// history.
    pub fn last_passing(
        &self,
        from_index: usize,
        package: &str,
        key: LookupKey<'_>,
    ) -> Option<NaiveDateTime> {
        self.snapshots.get(from_index..)?.iter().find_map(|snapshot| {
            let passed = match key {
                LookupKey::Test(test_name) => snapshot
                    .packages
                    .get(package)
                    .and_then(|results| results.get(test_name))
                    .map(|outcome| outcome.passed),
                LookupKey::EveryDistributionPassing => snapshot
                    .derived(package)
                    .map(|d| d.every_distribution_passing),
            };
            match passed {
                Some(true) => Some(snapshot.timestamp),
                _ => None,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PackageResults, TestOutcome};
    use std::collections::BTreeMap;

    fn snapshot(stamp: &str, packages: &[(&str, &[(&str, bool)])]) -> Snapshot {
        let ts =
            chrono::NaiveDateTime::parse_from_str(stamp, "%Y-%m-%d_%H-%M-%S").unwrap();
        let mut map = BTreeMap::new();
        for (name, tests) in packages {
            let mut results = PackageResults::new();
            for (test_name, passed) in *tests {
                results.insert(
                    test_name.to_string(),
                    TestOutcome {
                        passed: *passed,
                        ..TestOutcome::default()
                    },
                );
            }
            map.insert(name.to_string(), results);
        }
        Snapshot::new(ts, format!("results-{stamp}.json"), map, true)
    }

    #[test]
    fn test_series_sorts_descending() {
        let series = SnapshotSeries::new(vec![
            snapshot("2024-01-01_00-00-00", &[]),
            snapshot("2024-01-15_00-00-00", &[]),
            snapshot("2024-01-08_00-00-00", &[]),
        ]);

        let stamps: Vec<String> = series
            .snapshots()
            .iter()
            .map(|s| s.timestamp.to_string())
            .collect();
        assert_eq!(
            stamps,
            vec![
                "2024-01-15 00:00:00",
                "2024-01-08 00:00:00",
                "2024-01-01 00:00:00"
            ]
        );
        assert_eq!(
            series.current().unwrap().timestamp.to_string(),
            "2024-01-15 00:00:00"
        );
    }

    #[test]
    fn test_equal_timestamps_keep_input_order() {
        let mut a = snapshot("2024-01-01_00-00-00", &[]);
        a.source = "first".to_string();
        let mut b = snapshot("2024-01-01_00-00-00", &[]);
        b.source = "second".to_string();

        let series = SnapshotSeries::new(vec![a, b]);
        assert_eq!(series.snapshots()[0].source, "first");
        assert_eq!(series.snapshots()[1].source, "second");
    }

    #[test]
    fn test_last_passing_finds_prior_pass() {
        let series = SnapshotSeries::new(vec![
            snapshot("2024-01-01_00-00-00", &[("pkgA", &[("jammy-pip", true)])]),
            snapshot("2024-01-08_00-00-00", &[("pkgA", &[("jammy-pip", false)])]),
        ]);

        let found = series.last_passing(1, "pkgA", LookupKey::Test("jammy-pip"));
        assert_eq!(found.unwrap().to_string(), "2024-01-01 00:00:00");
    }

    #[test]
    fn test_last_passing_never_returns_current() {
        // Only the current snapshot passes; scanning starts past it.
        let series = SnapshotSeries::new(vec![
            snapshot("2024-01-01_00-00-00", &[("pkgA", &[("jammy-pip", false)])]),
            snapshot("2024-01-08_00-00-00", &[("pkgA", &[("jammy-pip", true)])]),
        ]);

        assert_eq!(
            series.last_passing(1, "pkgA", LookupKey::Test("jammy-pip")),
            None
        );
    }

    #[test]
    fn test_last_passing_skips_missing_entries() {
        let series = SnapshotSeries::new(vec![
            snapshot("2024-01-01_00-00-00", &[("pkgA", &[("jammy-pip", true)])]),
            snapshot("2024-01-08_00-00-00", &[("other", &[("jammy-pip", true)])]),
            snapshot("2024-01-15_00-00-00", &[("pkgA", &[("jammy-pip", false)])]),
        ]);

        let found = series.last_passing(1, "pkgA", LookupKey::Test("jammy-pip"));
        assert_eq!(found.unwrap().to_string(), "2024-01-01 00:00:00");
    }

    #[test]
    fn test_last_passing_derived_flag() {
        let series = SnapshotSeries::new(vec![
            snapshot("2024-01-01_00-00-00", &[("pkgA", &[("jammy-pip", true)])]),
            snapshot("2024-01-08_00-00-00", &[("pkgA", &[("jammy-pip", false)])]),
        ]);

        let found = series.last_passing(1, "pkgA", LookupKey::EveryDistributionPassing);
        assert_eq!(found.unwrap().to_string(), "2024-01-01 00:00:00");
    }

    #[test]
    fn test_last_passing_out_of_range_start() {
        let series = SnapshotSeries::new(vec![snapshot(
            "2024-01-01_00-00-00",
            &[("pkgA", &[("jammy-pip", true)])],
        )]);
        assert_eq!(
            series.last_passing(5, "pkgA", LookupKey::Test("jammy-pip")),
            None
        );
    }
}
