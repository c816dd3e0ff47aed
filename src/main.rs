//! WheelReport - historical package installation test reports
//!
//! A CLI tool that aggregates dated package-installation test results
//! into one HTML (or JSON) comparison report: current status, a
//! weekday-anchored week-over-week summary, "last passed" history for
//! every failing test, and PyPI popularity ranks.
//!
//! Exit codes:
//!   0 - Report generated
//!   1 - Runtime error (unreadable result file, bad config, etc.)

mod cli;
mod config;
mod error;
mod loader;
mod models;
mod ranking;
mod report;
mod series;
mod summary;

use anyhow::{Context, Result};
use cli::{Args, OutputFormat};
use config::Config;
use ranking::{PypiRankingSource, RankTable, RankingSource};
use series::SnapshotSeries;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Initialize logging
    init_logging(&args);

    info!("WheelReport v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    if let Err(e) = run_report(args).await {
        eprintln!("\nError: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Initialize logging based on verbosity settings.
///
/// Logs go to stderr: stdout is reserved for the report when no output
/// file is given.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Run the complete report workflow.
async fn run_report(args: Args) -> Result<()> {
    // Load configuration and merge CLI arguments over it
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    let ctx = config.report_context();

    // Step 1: Collect the result files
    let files = collect_result_files(&args)?;
    info!("Aggregating {} result files", files.len());

    // Step 2: Load every snapshot; any load failure aborts the batch
    let snapshots = loader::load_snapshots(&files, &ctx)
        .context("Failed to load result files; no report was generated")?;
    let series = SnapshotSeries::new(snapshots);

    if let Some(current) = series.current() {
        info!(
            "Current run: {} from {} ({} packages)",
            current.timestamp,
            current.source,
            current.package_count()
        );
    }

    // Step 3: Fetch the popularity ranking (best-effort)
    let ranks = fetch_ranking(&config).await;
    if ranks.is_empty() {
        info!("No popularity ranking; packages render unranked");
    } else {
        info!("Popularity ranking covers {} packages", ranks.len());
    }

    // Step 4: Aggregate and assemble the payload
    let summary = summary::weekday_summary(&series, ctx.compare_weekday);
    let payload = report::assemble(&series, &ranks, summary);

    // Step 5: Render
    let output = match args.format {
        OutputFormat::Html => report::render::render_html(&payload),
        OutputFormat::Json => report::render::render_json(&payload)?,
    };

    match args.output_file {
        Some(ref path) => {
            std::fs::write(path, &output)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            info!("Report written to {}", path.display());
        }
        None => print!("{}", output),
    }

    Ok(())
}

/// The result files named on the command line, plus any previous runs
/// discovered in `--results-dir`.
fn collect_result_files(args: &Args) -> Result<Vec<PathBuf>> {
    let mut files = args.resultfiles.clone();

    if let Some(ref dir) = args.results_dir {
        let previous = loader::discover_previous_results(dir, &files)
            .with_context(|| format!("Failed to read results directory {}", dir.display()))?;
        if previous.is_empty() {
            warn!("No previous result files found in {}", dir.display());
        } else {
            info!(
                "Found {} previous result files in {}",
                previous.len(),
                dir.display()
            );
        }
        files.extend(previous);
    }

    Ok(files)
}

/// Fetch the popularity ranking. Failures degrade to an empty table; the
/// report still renders with every rank as the placeholder.
async fn fetch_ranking(config: &Config) -> RankTable {
    if !config.ranking.enabled {
        debug!("Ranking fetch disabled");
        return RankTable::default();
    }

    let source = PypiRankingSource::new(
        config.ranking.url.clone(),
        Duration::from_secs(config.ranking.timeout_seconds),
    );
    RankTable::new(source.fetch_ranks().await)
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from .wheelreport.toml");
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
