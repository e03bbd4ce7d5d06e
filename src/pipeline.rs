//! One full pass: fetch, normalize, derive, merge, roll up.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use tracing::{info, warn};

use crate::config::MillConfig;
use crate::historian::Historian;
use crate::history;
use crate::metrics::{self, DerivedMetrics, MetricsRecord};
use crate::normalize;
use crate::sources::{SourceAdapter, SourceTables};
use crate::summary::{self, SummaryDocument};

/// Everything a single pass produced, for callers that want more than the
/// persisted artifacts.
#[derive(Debug)]
pub struct RunOutcome {
    pub calculation_date: NaiveDate,
    pub derived: Vec<DerivedMetrics>,
    pub summary: SummaryDocument,
}

/// Runs the pipeline once, computing the report for the day before `today`.
///
/// Source and historian failures degrade the affected fields to zero and the
/// pass completes; persistence failures are fatal and carry the failing path.
pub fn run_once(
    config: &MillConfig,
    sources: &dyn SourceAdapter,
    historian: Option<&dyn Historian>,
    today: NaiveDate,
) -> Result<RunOutcome> {
    let calculation_date = today
        .pred_opt()
        .context("no previous day to compute for")?;
    info!(date = %calculation_date, "starting daily broke computation");

    let tables = fetch_tables(sources, calculation_date);
    let normalized = normalize::normalize(tables, config);
    let derived = metrics::derive_all(&normalized, historian, config, calculation_date);
    let records: Vec<MetricsRecord> = derived.iter().map(|d| d.record.clone()).collect();

    let existing = history::load_history(&config.history_file)?;
    let merged = history::merge(existing, &records);
    history::store_history(&config.history_file, &merged)?;
    info!(rows = merged.len(), path = %config.history_file.display(), "historical table updated");

    let summary = summary::rollup(&merged, &config.machines, calculation_date);
    summary::store_summary(&config.summary_file, &summary)?;
    info!(path = %config.summary_file.display(), "summary document updated");

    Ok(RunOutcome {
        calculation_date,
        derived,
        summary,
    })
}

/// Fetches the three source tables, degrading each failure to an empty table
/// so the pass still completes with the fields that table feeds at zero.
fn fetch_tables(sources: &dyn SourceAdapter, date: NaiveDate) -> SourceTables {
    let production = sources.production(date).unwrap_or_else(|err| {
        warn!(error = %err, "production fetch failed; treating as empty");
        Vec::new()
    });
    let rewinder = sources.rewinder(date).unwrap_or_else(|err| {
        warn!(error = %err, "rewinder fetch failed; treating as empty");
        Vec::new()
    });
    let rejections = sources.rejections(date).unwrap_or_else(|err| {
        warn!(error = %err, "rejection fetch failed; treating as empty");
        Vec::new()
    });

    info!(
        production = production.len(),
        rewinder = rewinder.len(),
        rejections = rejections.len(),
        "source tables fetched"
    );

    SourceTables {
        production,
        rewinder,
        rejections,
    }
}
