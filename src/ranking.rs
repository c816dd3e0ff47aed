//! Package popularity ranking.
//!
//! The ranking is best-effort: a network failure or a changed response
//! format degrades to an empty table and every package renders with the
//! unranked placeholder. The aggregator itself never sees an error.

use serde::Deserialize;
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Placeholder rank for packages absent from the ranking.
pub const UNRANKED: &str = "~";

/// Default source for the most-downloaded PyPI packages.
pub const DEFAULT_RANKING_URL: &str =
    "https://hugovk.github.io/top-pypi-packages/top-pypi-packages-30-days.min.json";

/// A source of ranked package names, most popular first.
///
/// Implementations return an empty list on failure instead of an error, so
/// report assembly never branches on network-specific failure types.
pub trait RankingSource {
    fn fetch_ranks(&self) -> impl Future<Output = Vec<String>> + Send;
}

#[derive(Debug, Deserialize)]
struct RankingDocument {
    rows: Vec<RankingRow>,
}

#[derive(Debug, Deserialize)]
struct RankingRow {
    project: String,
    download_count: u64,
}

/// Fetches the top-pypi-packages JSON document over HTTP.
pub struct PypiRankingSource {
    url: String,
    timeout: Duration,
}

impl PypiRankingSource {
    pub fn new(url: String, timeout: Duration) -> Self {
        Self { url, timeout }
    }

    async fn try_fetch(&self) -> Result<Vec<String>, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(self.timeout).build()?;
        let mut document: RankingDocument =
            client.get(&self.url).send().await?.error_for_status()?.json().await?;

        // The list should be sorted already, but lets not assume that.
        document
            .rows
            .sort_by(|a, b| b.download_count.cmp(&a.download_count));

        Ok(document.rows.into_iter().map(|row| row.project).collect())
    }
}

impl RankingSource for PypiRankingSource {
    async fn fetch_ranks(&self) -> Vec<String> {
        match self.try_fetch().await {
            Ok(names) => {
                debug!("Fetched {} ranked packages from {}", names.len(), self.url);
                names
            }
            Err(e) => {
                warn!("Failed to load package ranking from {}: {e}", self.url);
                Vec::new()
            }
        }
    }
}

/// A fixed ranking for offline use.
#[allow(dead_code)] // Exercised by tests
pub struct StaticRankingSource(pub Vec<String>);

impl RankingSource for StaticRankingSource {
    async fn fetch_ranks(&self) -> Vec<String> {
        self.0.clone()
    }
}

/// Zero-padded 1-based rank strings for every ranked package.
#[derive(Debug, Default)]
pub struct RankTable {
    ranks: HashMap<String, usize>,
    width: usize,
}

impl RankTable {
    /// Build the table from a ranked name list (most popular first).
    ///
    /// Width is `floor(log10(len)) + 1`; an empty list short-circuits the
    /// computation and leaves every package unranked.
    pub fn new(ranked_names: Vec<String>) -> Self {
        if ranked_names.is_empty() {
            return Self::default();
        }

        let width = (ranked_names.len() as f64).log10().floor() as usize + 1;
        let ranks = ranked_names
            .into_iter()
            .enumerate()
            .map(|(i, name)| (name, i + 1))
            .collect();

        Self { ranks, width }
    }

    /// The rank string for a package, or [`UNRANKED`] when absent.
    pub fn format_rank(&self, package: &str) -> String {
        match self.ranks.get(package) {
            Some(rank) => format!("{rank:0width$}", width = self.width),
            None => UNRANKED.to_string(),
        }
    }

    /// Number of ranked packages.
    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }
}
