//! Per-machine metric derivation: the daily loss and shrinkage figures.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::MillConfig;
use crate::historian::{Historian, read_series};
use crate::normalize::NormalizedTables;
use crate::records::MachineId;

/// Rejection reason whose quantity counts as QC rejection.
pub const REPULP_REASON: &str = "Repulp";
/// Disposition code whose quantity counts as handling loss.
pub const HANDLING_LOSS_CODE: &str = "Handling Loss";

/// One day's computed figures for one machine.
///
/// Masses are in tons, percentages in percent. Every figure is rounded to
/// 2 decimals when the record is built; the rounding is part of the persisted
/// contract, not display formatting. Derived figures may go negative on
/// inconsistent upstream data and are not clamped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsRecord {
    pub calculation_date: NaiveDate,
    pub machine_id: MachineId,
    pub sap_production: f64,
    pub qcs_production: f64,
    pub reel_production: f64,
    pub actual_qcs_production: f64,
    pub jumbo_cutoff: f64,
    pub rewinder_input: f64,
    pub rewinder_output: f64,
    pub rewinder_loss: f64,
    pub qc_rejection: f64,
    pub handling_loss: f64,
    pub total_loss: f64,
    pub shrinkage_percent: f64,
    pub actual_loss: f64,
    pub actual_shrinkage_percent: f64,
}

impl MetricsRecord {
    fn zeroed(calculation_date: NaiveDate, machine_id: MachineId) -> Self {
        Self {
            calculation_date,
            machine_id,
            sap_production: 0.0,
            qcs_production: 0.0,
            reel_production: 0.0,
            actual_qcs_production: 0.0,
            jumbo_cutoff: 0.0,
            rewinder_input: 0.0,
            rewinder_output: 0.0,
            rewinder_loss: 0.0,
            qc_rejection: 0.0,
            handling_loss: 0.0,
            total_loss: 0.0,
            shrinkage_percent: 0.0,
            actual_loss: 0.0,
            actual_shrinkage_percent: 0.0,
        }
    }
}

/// A field that fell back to its zero default, and why.
#[derive(Debug, Clone)]
pub struct Degradation {
    pub field: &'static str,
    pub reason: String,
}

/// Derivation output: the persisted record plus the fields that degraded,
/// so a degraded zero stays distinguishable from a genuine one.
#[derive(Debug)]
pub struct DerivedMetrics {
    pub record: MetricsRecord,
    pub degraded: Vec<Degradation>,
}

/// Derives one [`MetricsRecord`] per configured machine, in report order.
pub fn derive_all(
    tables: &NormalizedTables,
    historian: Option<&dyn Historian>,
    config: &MillConfig,
    calculation_date: NaiveDate,
) -> Vec<DerivedMetrics> {
    config
        .machines
        .iter()
        .map(|&machine| derive_machine(tables, historian, config, calculation_date, machine))
        .collect()
}

fn derive_machine(
    tables: &NormalizedTables,
    historian: Option<&dyn Historian>,
    config: &MillConfig,
    calculation_date: NaiveDate,
    machine: MachineId,
) -> DerivedMetrics {
    let mut record = MetricsRecord::zeroed(calculation_date, machine);
    let mut degraded = Vec::new();

    let sap_kg: f64 = tables
        .production
        .iter()
        .filter(|t| t.machine == Some(machine))
        .map(|t| t.row.quantity_kg)
        .sum();
    record.sap_production = round2(sap_kg / 1000.0);

    // QCS day/reel counters from the historian. Each series degrades to 0.0
    // on its own; without a historian the four QCS figures stay zero.
    match historian {
        Some(historian) => match config.series.get(&machine) {
            Some(series) => {
                let at = read_timestamp(calculation_date, config.read_hour);
                let qcs = read_or_zero(historian, &series.day_tonnage, at, machine, "qcs_production", &mut degraded);
                let reel = read_or_zero(historian, &series.reel_tonnage, at, machine, "reel_production", &mut degraded);

                record.qcs_production = round2(qcs);
                record.reel_production = round2(reel);
                record.actual_qcs_production = round2(qcs - reel);
                record.jumbo_cutoff = round2(record.actual_qcs_production - record.sap_production);
            }
            None => {
                warn!(machine = %machine, "no historian series configured; QCS figures default to 0");
                degrade_qcs(&mut degraded, "no series configured for machine");
            }
        },
        None => degrade_qcs(&mut degraded, "historian unavailable"),
    }

    let (mut input_kg, mut output_kg) = (0.0, 0.0);
    for t in tables.rewinder.iter().filter(|t| t.machine == Some(machine)) {
        input_kg += t.row.input_kg;
        output_kg += t.row.output_kg;
    }
    record.rewinder_input = round2(input_kg / 1000.0);
    record.rewinder_output = round2(output_kg / 1000.0);
    record.rewinder_loss = round2((input_kg - output_kg) / 1000.0);

    let (mut rejection_kg, mut handling_kg) = (0.0, 0.0);
    for t in tables.rejections.iter().filter(|t| t.machine == Some(machine)) {
        if t.row.reason == REPULP_REASON {
            rejection_kg += t.row.quantity_kg;
        }
        // Loss sitting in a finished-goods location is already counted there.
        if t.row.disposition == HANDLING_LOSS_CODE
            && !config.excluded_handling_locations.contains(&t.row.storage_location)
        {
            handling_kg += t.row.quantity_kg;
        }
    }
    record.qc_rejection = round2(rejection_kg / 1000.0);
    record.handling_loss = round2(handling_kg / 1000.0);

    record.total_loss = round2(record.rewinder_loss + record.qc_rejection + record.handling_loss);
    record.shrinkage_percent = round2(loss_share(record.total_loss, record.rewinder_input));
    record.actual_loss = round2(record.jumbo_cutoff + record.total_loss);
    record.actual_shrinkage_percent = round2(loss_share(record.actual_loss, record.rewinder_input));

    DerivedMetrics { record, degraded }
}

fn read_or_zero(
    historian: &dyn Historian,
    series: &str,
    at: NaiveDateTime,
    machine: MachineId,
    field: &'static str,
    degraded: &mut Vec<Degradation>,
) -> f64 {
    match read_series(historian, series, at) {
        Ok(value) => value,
        Err(err) => {
            warn!(machine = %machine, series = %series, error = %err, "historian read failed; defaulting to 0");
            degraded.push(Degradation {
                field,
                reason: err.to_string(),
            });
            0.0
        }
    }
}

fn degrade_qcs(degraded: &mut Vec<Degradation>, reason: &str) {
    for field in ["qcs_production", "reel_production"] {
        degraded.push(Degradation {
            field,
            reason: reason.to_string(),
        });
    }
}

/// Loss as a percentage of rewinder input. A machine that fed nothing through
/// the rewinder reads as zero shrinkage, not a division failure.
fn loss_share(loss: f64, input: f64) -> f64 {
    if input == 0.0 { 0.0 } else { loss / input * 100.0 }
}

/// Day counters are read the morning after the production day, once the
/// historian has rolled the daily totals over.
fn read_timestamp(calculation_date: NaiveDate, read_hour: u32) -> NaiveDateTime {
    let time = NaiveTime::from_hms_opt(read_hour, 0, 0).unwrap_or(NaiveTime::MIN);
    calculation_date
        .succ_opt()
        .unwrap_or(calculation_date)
        .and_time(time)
}

/// Rounds to 2 decimal places, the persisted contract for every figure.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
