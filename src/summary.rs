//! Week-over-week summary comparison.
//!
//! Picks a reference snapshot anchored on a weekday and computes signed
//! deltas between it and the current snapshot. When no snapshot predates
//! the computed reference date, the summary degrades to a single column
//! with "N/A" deltas.

use crate::models::Snapshot;
use crate::series::SnapshotSeries;
use chrono::{Datelike, Duration, NaiveDateTime, Timelike};
use serde::Serialize;
use tracing::warn;

/// One summary metric across the reference (if any) and current snapshots.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryRow {
    pub label: String,
    /// Reference column first, current column last.
    pub values: Vec<String>,
    /// Signed delta (`+N`/`-N`), `N/A` when there is no reference column,
    /// and absent for non-numeric rows such as the date.
    pub delta: Option<String>,
}

/// Compute the reference cutoff for the given anchor weekday (Monday = 0).
///
/// The cutoff is the anchor weekday of the current snapshot's ISO week at
/// 23:59, pushed back one week when the current weekday is on-or-before the
/// anchor, so the cutoff is always strictly in the past relative to the
/// current run's week position.
fn reference_cutoff(current: NaiveDateTime, anchor_weekday: u8) -> NaiveDateTime {
    let end_of_day = current
        .with_hour(23)
        .and_then(|d| d.with_minute(59))
        .and_then(|d| d.with_second(0))
        .expect("23:59:00 is a valid time of day");

    let weekday = current.weekday().num_days_from_monday() as i64;
    let mut cutoff =
        end_of_day - Duration::days(weekday) + Duration::days(i64::from(anchor_weekday));
    if weekday <= i64::from(anchor_weekday) {
        cutoff -= Duration::days(7);
    }
    cutoff
}

struct Metrics {
    date: String,
    total: usize,
    passing: usize,
    failing: usize,
    distro_passing: usize,
}

impl Metrics {
    fn of(snapshot: &Snapshot) -> Self {
        let total = snapshot.package_count();
        let failing = snapshot.failing_package_count();
        Self {
            date: snapshot.timestamp.format("%A, %B %d, %Y").to_string(),
            total,
            passing: total - failing,
            failing,
            distro_passing: snapshot.distro_passing_count(),
        }
    }
}

fn signed_delta(current: usize, reference: usize) -> String {
    let d = current as i64 - reference as i64;
    if d >= 0 {
        format!("+{d}")
    } else {
        d.to_string()
    }
}

/// Build the summary rows. An unset anchor weekday skips the whole
/// comparison and yields an empty summary.
pub fn weekday_summary(series: &SnapshotSeries, anchor_weekday: Option<u8>) -> Vec<SummaryRow> {
    let Some(anchor) = anchor_weekday else {
        return Vec::new();
    };
    let Some(current) = series.current() else {
        return Vec::new();
    };

    let cutoff = reference_cutoff(current.timestamp, anchor);
    let reference = series
        .snapshots()
        .iter()
        .find(|snapshot| snapshot.timestamp < cutoff);

    if reference.is_none() {
        warn!("No reference snapshot older than {cutoff}; summary has no deltas");
    }

    let columns: Vec<Metrics> = reference
        .into_iter()
        .chain(std::iter::once(current))
        .map(Metrics::of)
        .collect();
    let has_reference = columns.len() == 2;

    let numeric = |label: &str, pick: fn(&Metrics) -> usize| SummaryRow {
        label: label.to_string(),
        values: columns.iter().map(|m| pick(m).to_string()).collect(),
        delta: Some(if has_reference {
            signed_delta(pick(&columns[columns.len() - 1]), pick(&columns[0]))
        } else {
            "N/A".to_string()
        }),
    };

    vec![
        SummaryRow {
            label: "date".to_string(),
            values: columns.iter().map(|m| m.date.clone()).collect(),
            delta: None,
        },
        numeric("number of packages", |m| m.total),
        numeric("all tests passed", |m| m.passing),
        numeric("some tests failed", |m| m.failing),
        numeric("each distribution has passing option", |m| m.distro_passing),
    ]
}
