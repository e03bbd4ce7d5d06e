//! CLI entry point for the daily broke report pipeline.
//!
//! Provides subcommands for a single computation pass, a scheduled loop, and
//! printing the persisted summary document.

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use broke_report::config::MillConfig;
use broke_report::historian::{Historian, PiWebHistorian};
use broke_report::pipeline::{RunOutcome, run_once};
use broke_report::sources::CsvSourceDir;

#[derive(Parser)]
#[command(name = "broke_report")]
#[command(about = "Daily per-machine broke report pipeline", long_about = None)]
struct Cli {
    /// JSON config file overriding the built-in mill defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding the date-partitioned source CSV exports
    #[arg(short, long, default_value = "sources")]
    sources: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute and persist the report for a single day
    Run {
        /// Run as if today were this date (the report day is the day before)
        #[arg(long, value_name = "YYYY-MM-DD")]
        date: Option<NaiveDate>,
    },
    /// Run on a fixed interval, recomputing yesterday's report each pass
    Watch {
        /// Seconds between passes
        #[arg(short, long, default_value_t = 600)]
        interval: u64,
    },
    /// Print the persisted summary document
    Show,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/broke_report.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("broke_report.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse().unwrap()));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse().unwrap()));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => MillConfig::load(path)?,
        None => MillConfig::default(),
    };
    let sources = CsvSourceDir::new(&cli.sources);

    match cli.command {
        Commands::Run { date } => {
            let historian = connect_historian();
            let today = date.unwrap_or_else(|| Local::now().date_naive());
            let outcome = run_once(
                &config,
                &sources,
                historian.as_ref().map(|h| h as &dyn Historian),
                today,
            )?;
            log_outcome(&outcome);
        }
        Commands::Watch { interval } => {
            info!(interval, "watching; recomputing yesterday's report each pass");
            loop {
                let historian = connect_historian();
                let today = Local::now().date_naive();
                match run_once(
                    &config,
                    &sources,
                    historian.as_ref().map(|h| h as &dyn Historian),
                    today,
                ) {
                    Ok(outcome) => log_outcome(&outcome),
                    Err(err) => error!(error = ?err, "pass failed"),
                }
                std::thread::sleep(Duration::from_secs(interval));
            }
        }
        Commands::Show => {
            let content = std::fs::read_to_string(&config.summary_file)
                .with_context(|| format!("reading summary {}", config.summary_file.display()))?;
            println!("{content}");
        }
    }

    Ok(())
}

/// Builds the historian client from `PI_WEB_API_URL`. An absent or unusable
/// historian degrades the QCS/reel figures to zero; it never blocks the run.
fn connect_historian() -> Option<PiWebHistorian> {
    let url = match std::env::var("PI_WEB_API_URL") {
        Ok(url) if !url.is_empty() => url,
        _ => {
            warn!("PI_WEB_API_URL not set; QCS/reel figures will be zero");
            return None;
        }
    };

    match PiWebHistorian::new(url) {
        Ok(historian) => Some(historian),
        Err(err) => {
            warn!(error = %err, "historian client unavailable; QCS/reel figures will be zero");
            None
        }
    }
}

fn log_outcome(outcome: &RunOutcome) {
    for derived in &outcome.derived {
        info!(
            machine = %derived.record.machine_id,
            total_loss = derived.record.total_loss,
            shrinkage_percent = derived.record.shrinkage_percent,
            degraded_fields = derived.degraded.len(),
            "machine computed"
        );
    }
    info!(date = %outcome.calculation_date, "pass complete");
}
