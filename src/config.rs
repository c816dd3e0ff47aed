//! Configuration file handling.
//!
//! This module handles loading `.wheelreport.toml` files, merging them
//! with CLI arguments, and producing the [`ReportContext`] that is passed
//! explicitly into the aggregation pipeline. There is no process-wide
//! configuration state.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::ranking::DEFAULT_RANKING_URL;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,

    /// Popularity ranking settings.
    #[serde(default)]
    pub ranking: RankingConfig,
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Package names excluded from every aggregate computation.
    #[serde(default)]
    pub ignore: Vec<String>,

    /// Whether a package with no recognized-distribution tests counts as
    /// having a passing option on every distribution. The fold over an
    /// empty map is vacuously true; this makes that choice explicit.
    #[serde(default = "default_true")]
    pub untested_is_passing: bool,

    /// Weekday (Monday = 0) to anchor the summary comparison on.
    #[serde(default)]
    pub compare_weekday: Option<u8>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            ignore: Vec::new(),
            untested_is_passing: true,
            compare_weekday: None,
        }
    }
}

/// Popularity ranking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingConfig {
    /// Whether to fetch the ranking at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// URL of the ranked package list.
    #[serde(default = "default_ranking_url")]
    pub url: String,

    /// Fetch timeout in seconds.
    #[serde(default = "default_ranking_timeout")]
    pub timeout_seconds: u64,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: default_ranking_url(),
            timeout_seconds: default_ranking_timeout(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_ranking_url() -> String {
    DEFAULT_RANKING_URL.to_string()
}

fn default_ranking_timeout() -> u64 {
    10
}

/// The merged, per-invocation context handed to the aggregator.
#[derive(Debug, Clone)]
pub struct ReportContext {
    /// Package names to drop at load time.
    pub ignore: HashSet<String>,
    /// Vacuous-truth policy for packages without recognized tests.
    pub untested_is_passing: bool,
    /// Anchor weekday for the summary comparison, if any.
    pub compare_weekday: Option<u8>,
}

impl Default for ReportContext {
    fn default() -> Self {
        Config::default().report_context()
    }
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        Ok(config)
    }

    /// Check the invariants the CLI enforces on its own flags.
    ///
    /// A weekday outside 0-6 would push the reference cutoff into the
    /// future and the summary would compare the current run against itself.
    fn validate(&self) -> Result<()> {
        if let Some(weekday) = self.report.compare_weekday {
            if weekday > 6 {
                anyhow::bail!("compare_weekday must be between 0 and 6, got {weekday}");
            }
        }
        Ok(())
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but
    /// can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(".wheelreport.toml");

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence; repeatable flags extend rather than
    /// replace the configured list.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        self.report
            .ignore
            .extend(args.ignore.iter().cloned());

        if args.untested_is_failing {
            self.report.untested_is_passing = false;
        }

        if let Some(weekday) = args.compare_weekday_num {
            self.report.compare_weekday = Some(weekday);
        }

        if args.no_ranking {
            self.ranking.enabled = false;
        }
        if let Some(ref url) = args.ranking_url {
            self.ranking.url = url.clone();
        }
    }

    /// Build the context object the aggregation pipeline runs with.
    pub fn report_context(&self) -> ReportContext {
        ReportContext {
            ignore: self.report.ignore.iter().cloned().collect(),
            untested_is_passing: self.report.untested_is_passing,
            compare_weekday: self.report.compare_weekday,
        }
    }
}
