//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// WheelReport - historical report generator for package installation tests
///
/// Parse one or more dated result files and render an HTML page comparing
/// the current run against the recorded history.
///
/// Examples:
///   wheelreport results-2024-01-08_04-30-00.json.xz
///   wheelreport results-*.json.xz --compare-weekday-num 2 -o index.html
///   wheelreport new.json --results-dir ./history --ignore torch
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Paths to result files, one per test run
    ///
    /// File names must end in a `YYYY-MM-DD_HH-MM-SS` timestamp before the
    /// `.json` or `.json.xz` extension.
    #[arg(value_name = "results.json", required = true, num_args = 1..)]
    pub resultfiles: Vec<PathBuf>,

    /// Ignore packages with the specified name; can be used more than once
    ///
    /// Ignored packages are excluded from all aggregate computations.
    #[arg(long, value_name = "NAME")]
    pub ignore: Vec<String>,

    /// Weekday number (Monday = 0) to hinge the summary comparison on
    ///
    /// When omitted, the report carries no week-over-week summary.
    #[arg(long, value_name = "0-6", value_parser = clap::value_parser!(u8).range(0..=6))]
    pub compare_weekday_num: Option<u8>,

    /// File name to write the report (stdout if omitted)
    #[arg(short, long, value_name = "FILE")]
    pub output_file: Option<PathBuf>,

    /// Directory containing previous result files to include
    ///
    /// Files whose basename matches one of the given result files are
    /// skipped, so the current run is not counted twice.
    #[arg(long, value_name = "DIR")]
    pub results_dir: Option<PathBuf>,

    /// Output format (html, json)
    #[arg(long, default_value = "html", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Skip fetching the package popularity ranking
    ///
    /// All ranks render as the unranked placeholder.
    #[arg(long)]
    pub no_ranking: bool,

    /// Override the URL of the package popularity ranking
    #[arg(long, value_name = "URL", env = "WHEELREPORT_RANKING_URL")]
    pub ranking_url: Option<String>,

    /// Count packages without recognized-distribution tests as failing
    ///
    /// By default an untested package vacuously has a passing option on
    /// every distribution; this flag flips that.
    #[arg(long)]
    pub untested_is_failing: bool,

    /// Path to configuration file
    ///
    /// If not specified, looks for .wheelreport.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// HTML page (default)
    #[default]
    Html,
    /// JSON payload
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref url) = self.ranking_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Ranking URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if let Some(ref dir) = self.results_dir {
            if !dir.is_dir() {
                return Err(format!(
                    "Results directory does not exist: {}",
                    dir.display()
                ));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
