//! Report assembly.
//!
//! Composes the snapshot series, the historical index, the summary rows,
//! and the popularity ranking into one render-ready payload. The payload
//! is the contract with the renderer; its ordering is deterministic so the
//! same snapshot set yields the same report regardless of input order.

pub mod render;

use crate::models::PackageResults;
use crate::ranking::RankTable;
use crate::series::{LookupKey, SnapshotSeries};
use crate::summary::SummaryRow;
use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// One package row in the final report.
#[derive(Debug, Clone, Serialize)]
pub struct PackageRow {
    pub name: String,
    /// Zero-padded popularity rank, or the unranked placeholder.
    pub rank: String,
    /// Whether every distribution currently has a passing option; absent
    /// when the package is missing from the current snapshot.
    pub distro_passing: Option<bool>,
    /// When `distro_passing` is false: the last run where the flag held.
    /// `None` inside the `Some` means it never held previously.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distro_last_passing: Option<Option<NaiveDateTime>>,
    /// When `distro_passing` is false: the distributions with no passing
    /// install option, by name (`other` for unrecognized tests).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failing_distributions: Vec<String>,
    /// The package's full outcome map in the current snapshot.
    pub results: PackageResults,
    /// For every currently failing-or-timed-out test: the last run where it
    /// passed, or `None` if it never did.
    pub last_passing: BTreeMap<String, Option<NaiveDateTime>>,
}

/// The complete render payload.
#[derive(Debug, Serialize)]
pub struct ReportPayload {
    /// Timestamp of the current snapshot.
    pub generated: Option<NaiveDateTime>,
    /// Week-over-week summary rows; empty when no anchor weekday was given.
    pub summary: Vec<SummaryRow>,
    /// Sorted union of test names across all snapshots.
    pub test_names: Vec<String>,
    /// One row per package, sorted case-insensitively by name.
    pub packages: Vec<PackageRow>,
}

/// Assemble the payload for the whole series.
pub fn assemble(
    series: &SnapshotSeries,
    ranks: &RankTable,
    summary: Vec<SummaryRow>,
) -> ReportPayload {
    let mut package_names: BTreeSet<&str> = BTreeSet::new();
    let mut test_names: BTreeSet<&str> = BTreeSet::new();
    for snapshot in series.snapshots() {
        for (package, results) in &snapshot.packages {
            package_names.insert(package);
            test_names.extend(results.keys().map(String::as_str));
        }
    }

    let mut sorted_names: Vec<&str> = package_names.into_iter().collect();
    sorted_names.sort_by(|a, b| {
        a.to_lowercase()
            .cmp(&b.to_lowercase())
            .then_with(|| a.cmp(b))
    });

    let test_names: Vec<String> = test_names.into_iter().map(String::from).collect();
    let current = series.current();

    let packages = sorted_names
        .into_iter()
        .map(|name| {
            let derived = current.and_then(|snapshot| snapshot.derived(name));
            let distro_passing = derived.map(|d| d.every_distribution_passing);
            let distro_last_passing = match distro_passing {
                Some(false) => Some(series.last_passing(
                    1,
                    name,
                    LookupKey::EveryDistributionPassing,
                )),
                _ => None,
            };
            let failing_distributions = match (distro_passing, derived) {
                (Some(false), Some(derived)) => derived
                    .failing_distributions()
                    .map(|distro| match distro {
                        Some(distro) => distro.to_string(),
                        None => "other".to_string(),
                    })
                    .collect(),
                _ => Vec::new(),
            };

            let results = current
                .and_then(|snapshot| snapshot.packages.get(name))
                .cloned()
                .unwrap_or_default();

            let last_passing = results
                .iter()
                .filter(|(_, outcome)| outcome.needs_attention())
                .map(|(test_name, _)| {
                    (
                        test_name.clone(),
                        series.last_passing(1, name, LookupKey::Test(test_name)),
                    )
                })
                .collect();

            PackageRow {
                name: name.to_string(),
                rank: ranks.format_rank(name),
                distro_passing,
                distro_last_passing,
                failing_distributions,
                results,
                last_passing,
            }
        })
        .collect();

    ReportPayload {
        generated: current.map(|snapshot| snapshot.timestamp),
        summary,
        test_names,
        packages,
    }
}
