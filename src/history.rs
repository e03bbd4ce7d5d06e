//! The persistent historical metrics table.
//!
//! One CSV file holding every [`MetricsRecord`] ever computed, rewritten
//! wholesale on each run. Merging replaces rows for re-run (date, machine)
//! keys, keeping the table at one row per key under repeated runs.

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs::File;
use std::path::Path;
use tracing::debug;

use crate::metrics::MetricsRecord;

/// Loads the persisted table. An absent file is an empty table.
pub fn load_history(path: &Path) -> Result<Vec<MetricsRecord>> {
    if !path.exists() {
        debug!(path = %path.display(), "no historical table yet");
        return Ok(Vec::new());
    }

    let file =
        File::open(path).with_context(|| format!("opening historical table {}", path.display()))?;
    let mut reader = csv::Reader::from_reader(file);

    let mut rows = Vec::new();
    for result in reader.deserialize() {
        let record: MetricsRecord =
            result.with_context(|| format!("reading historical table {}", path.display()))?;
        rows.push(record);
    }

    Ok(rows)
}

/// Drops existing rows matching any new row's (date, machine) key, appends
/// the new rows, and sorts by (date, machine). Re-running a day therefore
/// yields the same table as running it once.
pub fn merge(existing: Vec<MetricsRecord>, new: &[MetricsRecord]) -> Vec<MetricsRecord> {
    let replaced: HashSet<_> = new
        .iter()
        .map(|r| (r.calculation_date, r.machine_id))
        .collect();

    let mut merged: Vec<MetricsRecord> = existing
        .into_iter()
        .filter(|r| !replaced.contains(&(r.calculation_date, r.machine_id)))
        .collect();
    merged.extend(new.iter().cloned());
    merged.sort_by_key(|r| (r.calculation_date, r.machine_id));
    merged
}

/// Rewrites the whole table. Rows land in a sibling temp file first and are
/// renamed over the target, so a crash mid-write leaves the prior table
/// intact rather than truncated.
pub fn store_history(path: &Path, rows: &[MetricsRecord]) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }

    let tmp = path.with_extension("csv.tmp");
    {
        let file =
            File::create(&tmp).with_context(|| format!("creating {}", tmp.display()))?;
        let mut writer = csv::Writer::from_writer(file);
        for row in rows {
            writer
                .serialize(row)
                .with_context(|| format!("writing historical table {}", tmp.display()))?;
        }
        writer
            .flush()
            .with_context(|| format!("flushing historical table {}", tmp.display()))?;
    }
    std::fs::rename(&tmp, path)
        .with_context(|| format!("replacing historical table {}", path.display()))?;

    Ok(())
}
