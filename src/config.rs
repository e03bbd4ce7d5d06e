//! Pipeline configuration: machine list, code mappings, historian series.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::records::MachineId;

/// Historian series names for one machine's QCS counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineSeries {
    /// Running day tonnage counter.
    pub day_tonnage: String,
    /// Current reel tonnage counter.
    pub reel_tonnage: String,
}

/// Immutable pipeline configuration.
///
/// The defaults mirror the mill's production setup. A JSON config file may
/// override any subset of fields, which also lets tests run with alternate
/// mappings instead of patching ambient state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MillConfig {
    /// Machines to compute, in report order.
    pub machines: Vec<MachineId>,
    /// Production storage location -> machine.
    pub production_locations: HashMap<String, MachineId>,
    /// Two-character rewinder batch code -> machine.
    pub rewinder_batch_codes: HashMap<String, MachineId>,
    /// Rejection storage location -> machine.
    pub rejection_locations: HashMap<String, MachineId>,
    /// Historian series per machine.
    pub series: HashMap<MachineId, MachineSeries>,
    /// Finished-goods locations whose handling loss is already counted
    /// elsewhere and must not be counted again.
    pub excluded_handling_locations: HashSet<String>,
    /// Hour of day (0-23) at which the historian day counters are read,
    /// the morning after the production day.
    pub read_hour: u32,
    /// Persisted historical metrics table.
    pub history_file: PathBuf,
    /// Persisted dashboard summary document.
    pub summary_file: PathBuf,
}

impl Default for MillConfig {
    fn default() -> Self {
        Self {
            machines: vec![MachineId::Pm1, MachineId::Pm3, MachineId::Pm4],
            production_locations: HashMap::from([
                ("PM1".to_string(), MachineId::Pm1),
                ("PM3".to_string(), MachineId::Pm3),
                ("PM4".to_string(), MachineId::Pm4),
            ]),
            rewinder_batch_codes: HashMap::from([
                ("01".to_string(), MachineId::Pm1),
                ("03".to_string(), MachineId::Pm3),
                ("04".to_string(), MachineId::Pm4),
            ]),
            rejection_locations: HashMap::from([
                ("RP1".to_string(), MachineId::Pm1),
                ("RP3".to_string(), MachineId::Pm3),
                ("RP4".to_string(), MachineId::Pm4),
                ("C502".to_string(), MachineId::Pm3),
            ]),
            series: HashMap::from([
                (
                    MachineId::Pm1,
                    MachineSeries {
                        day_tonnage: "PSPD_TBN_PM01_QCS:DayTonnage".to_string(),
                        reel_tonnage: "PSPD_TBN_PM01_QCS:ReelTonnage".to_string(),
                    },
                ),
                (
                    MachineId::Pm3,
                    MachineSeries {
                        day_tonnage: "PSPD_TBN_PM03_QCS:DayTonnage".to_string(),
                        reel_tonnage: "PSPD_TBN_PM03_QCS:ReelTonnage".to_string(),
                    },
                ),
                (
                    MachineId::Pm4,
                    MachineSeries {
                        day_tonnage: "PSPD_TBN_PM04_QCS:DayTonnage".to_string(),
                        reel_tonnage: "PSPD_TBN_PM04_QCS:ReelTonnage".to_string(),
                    },
                ),
            ]),
            excluded_handling_locations: HashSet::from([
                "FH1".to_string(),
                "FH3".to_string(),
                "FH4".to_string(),
            ]),
            read_hour: 6,
            history_file: PathBuf::from("data/daily_metrics_history.csv"),
            summary_file: PathBuf::from("data/dashboard_summary.json"),
        }
    }
}

impl MillConfig {
    /// Loads the config from a JSON file at `path`. Fields absent from the
    /// file keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_covers_all_machines() {
        let config = MillConfig::default();
        assert_eq!(config.machines.len(), 3);
        for machine in &config.machines {
            assert!(config.series.contains_key(machine));
        }
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: MillConfig = serde_json::from_str(r#"{"read_hour": 7}"#).unwrap();
        assert_eq!(config.read_hour, 7);
        assert_eq!(config.machines, MillConfig::default().machines);
        assert!(!config.excluded_handling_locations.is_empty());
    }

    #[test]
    fn test_json_roundtrip() {
        let config = MillConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: MillConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.machines, config.machines);
        assert_eq!(back.rejection_locations, config.rejection_locations);
        assert_eq!(back.history_file, config.history_file);
    }
}
