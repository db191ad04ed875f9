//! Per-cycle diagnostics and firmware logs flowing into the report.

use std::sync::Arc;

use crate::helpers::assertions::*;
use crate::helpers::config::*;
use crate::helpers::run::*;

use dpmo_core::types::{BootTarget, PowerState, ScenarioKind, Verdict};
use dpmo_runner::drivers::{Drivers, SimulatedSut};

/// Every OS diagnostic runs once per cycle; a failing check is recorded
/// but does not end the run.
#[test]
fn test_e2e_os_diagnostics_recorded_per_cycle() {
    let config = TestConfigBuilder::new(ScenarioKind::G3General)
        .cycles(3)
        .build();
    let sut = Arc::new(SimulatedSut::new(PowerState::G3));
    let check = Arc::new(CountingCheck::new("mce").failing_on(2));
    let report = Arc::new(RecordingReport::default());
    let drivers = Drivers::simulated(Arc::clone(&sut))
        .with_check(check.clone())
        .with_report(report.clone());

    let summary = run_with(config, drivers);

    assert_pass(&summary);
    assert_eq!(check.calls(), 3);
    let records = report.records();
    let results: Vec<(u32, bool)> = records.iter().map(|r| (r.cycle, r.passed)).collect();
    assert_eq!(results, vec![(1, true), (2, false), (3, true)]);
    assert!(records.iter().all(|r| r.checker == "mce"));

    let finished = report.summary().expect("summary should be reported");
    assert_eq!(finished.verdict, Verdict::Pass);
    assert_eq!(finished.run_id, summary.run_id);
}

/// Firmware shell commands are reported as `firmware:<command>` checks.
#[test]
fn test_e2e_firmware_commands_recorded() {
    let config = TestConfigBuilder::new(ScenarioKind::G3General)
        .cycles(2)
        .boot_target(BootTarget::Uefi)
        .firmware_commands(&["pci", "memmap"])
        .build();
    let sut = Arc::new(
        SimulatedSut::new(PowerState::G3)
            .with_boot_order(BootTarget::Uefi)
            .with_failing("fw.exec memmap"),
    );
    let report = Arc::new(RecordingReport::default());
    let drivers = Drivers::simulated(Arc::clone(&sut)).with_report(report.clone());

    let summary = run_with(config, drivers);

    assert_pass(&summary);
    let records: Vec<(u32, String, bool)> = report
        .records()
        .into_iter()
        .map(|r| (r.cycle, r.checker, r.passed))
        .collect();
    assert_eq!(
        records,
        vec![
            (1, "firmware:pci".to_owned(), true),
            (1, "firmware:memmap".to_owned(), false),
            (2, "firmware:pci".to_owned(), true),
            (2, "firmware:memmap".to_owned(), false),
        ]
    );
}

/// A firmware log is captured at the start of each cycle.
#[test]
fn test_e2e_firmware_log_per_cycle() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let log_dir = dir.path().join("fw");
    let config = TestConfigBuilder::new(ScenarioKind::G3General)
        .cycles(2)
        .firmware_log_dir(&log_dir.display().to_string())
        .build();
    let sut = Arc::new(SimulatedSut::new(PowerState::G3));

    let summary = run_simulated(config, &sut);

    assert_pass(&summary);
    assert!(log_dir.join("firmware_1.log").exists());
    assert!(log_dir.join("firmware_2.log").exists());
    assert!(!log_dir.join("firmware_3.log").exists());
}

/// The summary reaches the report even when the run fails.
#[test]
fn test_e2e_summary_reported_on_failure() {
    let config = TestConfigBuilder::new(ScenarioKind::S5General).build();
    let sut = Arc::new(SimulatedSut::new(PowerState::G3));
    let report = Arc::new(RecordingReport::default());
    let drivers = Drivers::simulated(sut).with_report(report.clone());

    let summary = run_with(config, drivers);

    assert_fail_with(&summary, "IN_G3");
    let finished = report.summary().expect("summary should be reported");
    assert_eq!(finished.verdict, Verdict::Fail);
    assert_eq!(finished.reason, summary.reason);
}
