//! Source adapters: the three upstream result sets for a calculation date.
//!
//! Fetch mechanics stay behind [`SourceAdapter`]; the pipeline only ever sees
//! already-shaped in-memory rows. [`CsvSourceDir`] reads the date-partitioned
//! CSV exports dropped by the plant's extraction jobs.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::fs::File;
use std::path::PathBuf;

use crate::records::{ProductionRecord, RejectionRecord, RewinderLog};

/// The three raw tables for one calculation date.
#[derive(Debug, Default)]
pub struct SourceTables {
    pub production: Vec<ProductionRecord>,
    pub rewinder: Vec<RewinderLog>,
    pub rejections: Vec<RejectionRecord>,
}

pub trait SourceAdapter {
    fn production(&self, date: NaiveDate) -> Result<Vec<ProductionRecord>>;
    fn rewinder(&self, date: NaiveDate) -> Result<Vec<RewinderLog>>;
    fn rejections(&self, date: NaiveDate) -> Result<Vec<RejectionRecord>>;
}

/// Reads `<base>/<source>/date=YYYY-MM-DD.csv` exports.
///
/// A missing day file is an empty table; a file that exists but cannot be
/// parsed is an error.
pub struct CsvSourceDir {
    base_dir: PathBuf,
}

impl CsvSourceDir {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    fn load<T: serde::de::DeserializeOwned>(&self, source: &str, date: NaiveDate) -> Result<Vec<T>> {
        let path = self.base_dir.join(source).join(format!("date={date}.csv"));
        if !path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&path).with_context(|| format!("opening {}", path.display()))?;
        let mut reader = csv::Reader::from_reader(file);

        let mut rows = Vec::new();
        for result in reader.deserialize() {
            let row: T = result.with_context(|| format!("reading {}", path.display()))?;
            rows.push(row);
        }

        Ok(rows)
    }
}

impl SourceAdapter for CsvSourceDir {
    fn production(&self, date: NaiveDate) -> Result<Vec<ProductionRecord>> {
        self.load("production", date)
    }

    fn rewinder(&self, date: NaiveDate) -> Result<Vec<RewinderLog>> {
        self.load("rewinder", date)
    }

    fn rejections(&self, date: NaiveDate) -> Result<Vec<RejectionRecord>> {
        self.load("rejections", date)
    }
}
