//! Source-table normalization: dedup by natural key, machine tagging.

use std::collections::HashSet;
use tracing::debug;

use crate::config::MillConfig;
use crate::records::{MachineId, ProductionRecord, RejectionRecord, RewinderLog};
use crate::sources::SourceTables;

/// A source row tagged with the machine it belongs to. `None` means the raw
/// code had no mapping; such rows are skipped by the derivation engine.
#[derive(Debug, Clone)]
pub struct Tagged<T> {
    pub machine: Option<MachineId>,
    pub row: T,
}

/// Deduplicated, machine-tagged source tables.
#[derive(Debug, Default)]
pub struct NormalizedTables {
    pub production: Vec<Tagged<ProductionRecord>>,
    pub rewinder: Vec<Tagged<RewinderLog>>,
    pub rejections: Vec<Tagged<RejectionRecord>>,
}

pub fn normalize(tables: SourceTables, config: &MillConfig) -> NormalizedTables {
    NormalizedTables {
        production: normalize_production(tables.production, config),
        rewinder: normalize_rewinder(tables.rewinder, config),
        rejections: normalize_rejections(tables.rejections, config),
    }
}

/// Keyed by posting batch; machine from the storage location.
pub fn normalize_production(
    rows: Vec<ProductionRecord>,
    config: &MillConfig,
) -> Vec<Tagged<ProductionRecord>> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for row in rows {
        if !seen.insert(row.batch.clone()) {
            continue;
        }
        let machine = config.production_locations.get(&row.storage_location).copied();
        if machine.is_none() {
            debug!(batch = %row.batch, location = %row.storage_location, "unmapped production location");
        }
        out.push(Tagged { machine, row });
    }
    out
}

/// Keyed by the produced set's batch; machine from the two-character code
/// embedded in the consumed jumbo batch number.
pub fn normalize_rewinder(rows: Vec<RewinderLog>, config: &MillConfig) -> Vec<Tagged<RewinderLog>> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for row in rows {
        if !seen.insert(row.output_batch.clone()) {
            continue;
        }
        // Machine code sits at offsets 4..6 of the jumbo batch number.
        let machine = row
            .batch
            .get(4..6)
            .and_then(|code| config.rewinder_batch_codes.get(code))
            .copied();
        if machine.is_none() {
            debug!(batch = %row.batch, "unmapped rewinder batch code");
        }
        out.push(Tagged { machine, row });
    }
    out
}

/// Keyed by rejected batch; machine from the storage location.
pub fn normalize_rejections(
    rows: Vec<RejectionRecord>,
    config: &MillConfig,
) -> Vec<Tagged<RejectionRecord>> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for row in rows {
        if !seen.insert(row.batch.clone()) {
            continue;
        }
        let machine = config.rejection_locations.get(&row.storage_location).copied();
        if machine.is_none() {
            debug!(batch = %row.batch, location = %row.storage_location, "unmapped rejection location");
        }
        out.push(Tagged { machine, row });
    }
    out
}
