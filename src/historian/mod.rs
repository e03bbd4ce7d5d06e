//! Time-series historian access.
//!
//! The pipeline needs exactly two operations: resolve a series by name and
//! read the value recorded at (or nearest) a timestamp. Both may fail; the
//! derivation engine degrades failures to 0.0 instead of aborting the run.

mod pi_web;

pub use pi_web::PiWebHistorian;

use anyhow::{Result, anyhow};
use chrono::NaiveDateTime;

/// Handle to a resolved series.
#[derive(Debug, Clone)]
pub struct SeriesHandle {
    /// Historian-internal identifier used for stream reads.
    pub id: String,
    /// The series name the handle was resolved from.
    pub name: String,
}

pub trait Historian {
    /// Resolves a series by name. `Ok(None)` when the historian has no such
    /// series.
    fn lookup(&self, series: &str) -> Result<Option<SeriesHandle>>;

    /// Reads the value recorded at or nearest `at`.
    fn read(&self, handle: &SeriesHandle, at: NaiveDateTime) -> Result<f64>;
}

/// Resolves `series` and reads its value at `at` in one step.
pub fn read_series(historian: &dyn Historian, series: &str, at: NaiveDateTime) -> Result<f64> {
    let handle = historian
        .lookup(series)?
        .ok_or_else(|| anyhow!("series '{series}' not found"))?;
    historian.read(&handle, at)
}
