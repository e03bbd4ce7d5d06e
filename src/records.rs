//! Raw source row types and machine identity.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical paper machine identifier.
///
/// Raw location and batch codes from the upstream systems are translated to
/// one of these via the mapping tables in [`crate::config::MillConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MachineId {
    #[serde(rename = "PM1")]
    Pm1,
    #[serde(rename = "PM3")]
    Pm3,
    #[serde(rename = "PM4")]
    Pm4,
}

impl fmt::Display for MachineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MachineId::Pm1 => "PM1",
            MachineId::Pm3 => "PM3",
            MachineId::Pm4 => "PM4",
        })
    }
}

/// One material posting from the production records export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductionRecord {
    /// Batch number, the natural key of a posting.
    pub batch: String,
    /// Storage location the posting was booked to (e.g. "PM1").
    pub storage_location: String,
    /// Posted quantity in kilograms.
    pub quantity_kg: f64,
}

/// One rewinder operation from the rewinder log export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewinderLog {
    /// Batch number of the produced set, the natural key of an operation.
    pub output_batch: String,
    /// Batch number of the consumed jumbo reel; carries the machine code.
    pub batch: String,
    /// Jumbo weight fed into the rewinder, in kilograms.
    pub input_kg: f64,
    /// Finished set weight out of the rewinder, in kilograms.
    pub output_kg: f64,
}

/// One quality rejection from the rejection records export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectionRecord {
    /// Rejected batch number, the natural key of a rejection.
    pub batch: String,
    /// Storage location the rejection was recorded against.
    pub storage_location: String,
    /// Movement reason, e.g. "Repulp".
    pub reason: String,
    /// Disposition code, e.g. "Handling Loss".
    pub disposition: String,
    /// Rejected quantity in kilograms.
    pub quantity_kg: f64,
}
