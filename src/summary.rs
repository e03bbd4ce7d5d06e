//! Daily/monthly broke rollup, persisted as the dashboard summary document.

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::metrics::{MetricsRecord, round2};
use crate::records::MachineId;

/// Broke totals for one machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineBroke {
    pub daily_broke: f64,
    pub monthly_broke: f64,
}

/// The rolling summary, rebuilt in full on every run from the post-merge
/// historical table so it always reflects the durable record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryDocument {
    pub last_calculated_date: NaiveDate,
    pub machines: BTreeMap<MachineId, MachineBroke>,
}

/// Sums `total_loss` per machine for the run's date and for the calendar
/// month up to it. Every configured machine gets an entry, zeroed when it
/// has no rows.
pub fn rollup(
    history: &[MetricsRecord],
    machines: &[MachineId],
    calculation_date: NaiveDate,
) -> SummaryDocument {
    let month_start = calculation_date.with_day(1).unwrap_or(calculation_date);

    let mut out = BTreeMap::new();
    for &machine in machines {
        let mut daily = 0.0;
        let mut monthly = 0.0;
        for row in history.iter().filter(|r| r.machine_id == machine) {
            if row.calculation_date == calculation_date {
                daily += row.total_loss;
            }
            if row.calculation_date >= month_start && row.calculation_date <= calculation_date {
                monthly += row.total_loss;
            }
        }
        out.insert(
            machine,
            MachineBroke {
                daily_broke: round2(daily),
                monthly_broke: round2(monthly),
            },
        );
    }

    SummaryDocument {
        last_calculated_date: calculation_date,
        machines: out,
    }
}

/// Overwrites the summary document with pretty-printed JSON, via a sibling
/// temp file and rename like the historical table.
pub fn store_summary(path: &Path, summary: &SummaryDocument) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }

    let body = serde_json::to_string_pretty(summary).context("serializing summary document")?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, body).with_context(|| format!("writing summary {}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("replacing summary {}", path.display()))?;

    Ok(())
}
