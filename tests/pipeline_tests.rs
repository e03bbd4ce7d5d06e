use anyhow::{Result, anyhow};
use chrono::NaiveDate;
use std::env;
use std::fs;
use std::path::PathBuf;

use broke_report::config::MillConfig;
use broke_report::history::load_history;
use broke_report::pipeline::run_once;
use broke_report::records::{MachineId, ProductionRecord, RejectionRecord, RewinderLog};
use broke_report::sources::{CsvSourceDir, SourceAdapter};
use broke_report::summary::SummaryDocument;

/// In-memory stand-in for the plant exports.
#[derive(Default)]
struct FixtureSources {
    production: Vec<ProductionRecord>,
    rewinder: Vec<RewinderLog>,
    rejections: Vec<RejectionRecord>,
}

impl SourceAdapter for FixtureSources {
    fn production(&self, _date: NaiveDate) -> Result<Vec<ProductionRecord>> {
        Ok(self.production.clone())
    }

    fn rewinder(&self, _date: NaiveDate) -> Result<Vec<RewinderLog>> {
        Ok(self.rewinder.clone())
    }

    fn rejections(&self, _date: NaiveDate) -> Result<Vec<RejectionRecord>> {
        Ok(self.rejections.clone())
    }
}

/// Fails every fetch, for the degradation test.
struct UnreachableSources;

impl SourceAdapter for UnreachableSources {
    fn production(&self, _date: NaiveDate) -> Result<Vec<ProductionRecord>> {
        Err(anyhow!("database unreachable"))
    }

    fn rewinder(&self, _date: NaiveDate) -> Result<Vec<RewinderLog>> {
        Err(anyhow!("database unreachable"))
    }

    fn rejections(&self, _date: NaiveDate) -> Result<Vec<RejectionRecord>> {
        Err(anyhow!("database unreachable"))
    }
}

fn test_config(name: &str) -> (MillConfig, PathBuf) {
    let dir = env::temp_dir().join(format!("broke_report_it_{name}"));
    let _ = fs::remove_dir_all(&dir); // clean up any prior run

    let mut config = MillConfig::default();
    config.history_file = dir.join("daily_metrics_history.csv");
    config.summary_file = dir.join("dashboard_summary.json");
    (config, dir)
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 8, 6).unwrap()
}

fn fixture_sources() -> FixtureSources {
    FixtureSources {
        production: vec![
            ProductionRecord {
                batch: "0005123401".to_string(),
                storage_location: "PM1".to_string(),
                quantity_kg: 3000.0,
            },
            // Duplicate posting of the same batch, must be dropped.
            ProductionRecord {
                batch: "0005123401".to_string(),
                storage_location: "PM1".to_string(),
                quantity_kg: 999.0,
            },
            ProductionRecord {
                batch: "0005123402".to_string(),
                storage_location: "PM1".to_string(),
                quantity_kg: 2000.0,
            },
        ],
        rewinder: vec![RewinderLog {
            output_batch: "0007770001".to_string(),
            batch: "2518019001".to_string(),
            input_kg: 100_000.0,
            output_kg: 90_000.0,
        }],
        rejections: vec![
            RejectionRecord {
                batch: "0009990001".to_string(),
                storage_location: "RP1".to_string(),
                reason: "Repulp".to_string(),
                disposition: "".to_string(),
                quantity_kg: 5_000.0,
            },
            RejectionRecord {
                batch: "0009990002".to_string(),
                storage_location: "RP1".to_string(),
                reason: "".to_string(),
                disposition: "Handling Loss".to_string(),
                quantity_kg: 2_000.0,
            },
        ],
    }
}

#[test]
fn test_full_pass_writes_both_artifacts() {
    let (config, dir) = test_config("full_pass");
    let sources = fixture_sources();

    let outcome = run_once(&config, &sources, None, today()).unwrap();

    assert_eq!(
        outcome.calculation_date,
        NaiveDate::from_ymd_opt(2026, 8, 5).unwrap()
    );

    let pm1 = &outcome.derived[0].record;
    assert_eq!(pm1.machine_id, MachineId::Pm1);
    assert_eq!(pm1.sap_production, 5.0);
    assert_eq!(pm1.rewinder_loss, 10.0);
    assert_eq!(pm1.qc_rejection, 5.0);
    assert_eq!(pm1.handling_loss, 2.0);
    assert_eq!(pm1.total_loss, 17.0);
    assert_eq!(pm1.shrinkage_percent, 17.0);

    // One row per configured machine, quiet machines included.
    let history = load_history(&config.history_file).unwrap();
    assert_eq!(history.len(), config.machines.len());

    let summary: SummaryDocument =
        serde_json::from_str(&fs::read_to_string(&config.summary_file).unwrap()).unwrap();
    assert_eq!(summary.machines[&MachineId::Pm1].daily_broke, 17.0);
    assert_eq!(summary.machines[&MachineId::Pm1].monthly_broke, 17.0);
    assert_eq!(summary.machines[&MachineId::Pm3].daily_broke, 0.0);

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_rerun_replaces_instead_of_duplicating() {
    let (config, dir) = test_config("rerun");
    let sources = fixture_sources();

    run_once(&config, &sources, None, today()).unwrap();
    let first = load_history(&config.history_file).unwrap();
    run_once(&config, &sources, None, today()).unwrap();
    let second = load_history(&config.history_file).unwrap();

    assert_eq!(first, second);

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_history_accumulates_across_days() {
    let (config, dir) = test_config("accumulate");
    let sources = fixture_sources();

    run_once(&config, &sources, None, today()).unwrap();
    run_once(&config, &sources, None, today().succ_opt().unwrap()).unwrap();

    let history = load_history(&config.history_file).unwrap();
    assert_eq!(history.len(), config.machines.len() * 2);

    // The monthly figure now spans both days.
    let summary: SummaryDocument =
        serde_json::from_str(&fs::read_to_string(&config.summary_file).unwrap()).unwrap();
    assert_eq!(summary.machines[&MachineId::Pm1].daily_broke, 17.0);
    assert_eq!(summary.machines[&MachineId::Pm1].monthly_broke, 34.0);

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_unreachable_sources_still_complete_the_pass() {
    let (config, dir) = test_config("unreachable");

    let outcome = run_once(&config, &UnreachableSources, None, today()).unwrap();

    assert_eq!(outcome.derived.len(), config.machines.len());
    for derived in &outcome.derived {
        assert_eq!(derived.record.sap_production, 0.0);
        assert_eq!(derived.record.total_loss, 0.0);
    }
    assert!(config.history_file.exists());

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_csv_source_dir_end_to_end() {
    let (config, dir) = test_config("csv_sources");
    let sources_dir = dir.join("sources");
    let production_dir = sources_dir.join("production");
    fs::create_dir_all(&production_dir).unwrap();

    let file = fs::File::create(production_dir.join("date=2026-08-05.csv")).unwrap();
    let mut writer = csv::Writer::from_writer(file);
    writer
        .serialize(ProductionRecord {
            batch: "0005123401".to_string(),
            storage_location: "PM3".to_string(),
            quantity_kg: 4_500.0,
        })
        .unwrap();
    writer.flush().unwrap();

    let adapter = CsvSourceDir::new(&sources_dir);
    let outcome = run_once(&config, &adapter, None, today()).unwrap();

    let pm3 = outcome
        .derived
        .iter()
        .find(|d| d.record.machine_id == MachineId::Pm3)
        .unwrap();
    assert_eq!(pm3.record.sap_production, 4.5);

    fs::remove_dir_all(&dir).unwrap();
}
