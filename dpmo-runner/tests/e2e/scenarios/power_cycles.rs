//! Power-cycle variants driven to PASS on the simulated SUT.

use std::sync::Arc;
use std::time::Duration;

use crate::helpers::assertions::*;
use crate::helpers::config::*;
use crate::helpers::run::*;

use dpmo_core::types::{BootTarget, PowerState, ScenarioKind};
use dpmo_runner::drivers::SimulatedSut;

/// How long a blocking low-power request keeps the caller waiting after the
/// SUT has switched, well past the test debounce interval.
const BLOCKING_RETURN: Duration = Duration::from_millis(300);

/// G3General: AC on, boot, shut down, AC off, for every cycle.
#[test]
fn test_e2e_g3_general_three_cycles() {
    let config = TestConfigBuilder::new(ScenarioKind::G3General)
        .cycles(3)
        .build();
    let sut = Arc::new(SimulatedSut::new(PowerState::G3));

    let summary = run_simulated(config, &sut);

    assert_pass(&summary);
    assert_eq!(summary.cycles_completed, 3);
    let expected: Vec<String> = (0..3)
        .flat_map(|_| ["ac_on", "os.shutdown", "ac_off"])
        .map(str::to_owned)
        .collect();
    assert_eq!(sut.history(), expected);
    assert_eq!(sut.current(), PowerState::G3);
}

/// G3General booting into the firmware shell shuts down from the shell.
#[test]
fn test_e2e_g3_general_uefi_target() {
    let config = TestConfigBuilder::new(ScenarioKind::G3General)
        .cycles(2)
        .boot_target(BootTarget::Uefi)
        .build();
    let sut = Arc::new(SimulatedSut::new(PowerState::G3).with_boot_order(BootTarget::Uefi));

    let summary = run_simulated(config, &sut);

    assert_pass(&summary);
    let history = sut.history();
    assert_eq!(history.iter().filter(|a| *a == "fw.shutdown").count(), 2);
    assert!(!history.iter().any(|a| a == "os.shutdown"));
}

/// G3DcOn: AC on parks the SUT in S5 and a DC on boots it.
#[test]
fn test_e2e_g3_dc_on_cycle() {
    let config = TestConfigBuilder::new(ScenarioKind::G3DcOn)
        .cycles(2)
        .build();
    let sut = Arc::new(SimulatedSut::new(PowerState::G3).with_ac_on_state(PowerState::S5));

    let summary = run_simulated(config, &sut);

    assert_pass(&summary);
    let expected: Vec<String> = (0..2)
        .flat_map(|_| ["ac_on", "dc_on", "os.shutdown", "ac_off"])
        .map(str::to_owned)
        .collect();
    assert_eq!(sut.history(), expected);
}

/// G3Surprise: AC is pulled while the OS is running.
#[test]
fn test_e2e_g3_surprise_cycle() {
    let config = TestConfigBuilder::new(ScenarioKind::G3Surprise)
        .cycles(2)
        .build();
    let sut = Arc::new(SimulatedSut::new(PowerState::G3));

    let summary = run_simulated(config, &sut);

    assert_pass(&summary);
    assert_eq!(sut.history(), vec!["ac_on", "ac_off", "ac_on", "ac_off"]);
}

/// G3SurpriseDcOn: one clean shutdown and one surprise AC off per cycle.
#[test]
fn test_e2e_g3_surprise_dc_on_cycle() {
    let config = TestConfigBuilder::new(ScenarioKind::G3SurpriseDcOn).build();
    let sut = Arc::new(SimulatedSut::new(PowerState::G3));

    let summary = run_simulated(config, &sut);

    assert_pass(&summary);
    assert_eq!(sut.history(), vec!["ac_on", "os.shutdown", "dc_on", "ac_off"]);
}

/// S5General from a SUT parked in S5: the run opens with IN_S5.
#[test]
fn test_e2e_s5_general_from_s5() {
    let config = TestConfigBuilder::new(ScenarioKind::S5General)
        .cycles(2)
        .build();
    let sut = Arc::new(SimulatedSut::new(PowerState::S5));

    let summary = run_simulated(config, &sut);

    assert_pass(&summary);
    assert_eq!(
        sut.history(),
        vec!["dc_on", "os.shutdown", "dc_on", "os.shutdown"]
    );
    assert_eq!(sut.current(), PowerState::S5);
}

/// S3General from a running OS: sleep, wake by DC on, repeat.
#[test]
fn test_e2e_s3_general_from_os() {
    let config = TestConfigBuilder::new(ScenarioKind::S3General)
        .cycles(2)
        .build();
    let sut = Arc::new(SimulatedSut::new(PowerState::S0));

    let summary = run_simulated(config, &sut);

    assert_pass(&summary);
    assert_eq!(
        sut.history(),
        vec!["os.sleep", "dc_on", "os.sleep", "dc_on", "os.sleep"]
    );
}

/// A shutdown request that returns only after S5 has settled is still a
/// requested shutdown.
#[test]
fn test_e2e_blocking_shutdown_is_not_auto_shutdown() {
    let config = TestConfigBuilder::new(ScenarioKind::G3General)
        .cycles(2)
        .build();
    let sut = Arc::new(
        SimulatedSut::new(PowerState::G3).with_slow_return("os.shutdown", BLOCKING_RETURN),
    );

    let summary = run_simulated(config, &sut);

    assert_pass(&summary);
    let expected: Vec<String> = (0..2)
        .flat_map(|_| ["ac_on", "os.shutdown", "ac_off"])
        .map(str::to_owned)
        .collect();
    assert_eq!(sut.history(), expected);
}

/// Same for the firmware shell shutdown.
#[test]
fn test_e2e_blocking_firmware_shutdown_is_not_auto_shutdown() {
    let config = TestConfigBuilder::new(ScenarioKind::S5General)
        .boot_target(BootTarget::Uefi)
        .build();
    let sut = Arc::new(
        SimulatedSut::new(PowerState::S5)
            .with_boot_order(BootTarget::Uefi)
            .with_slow_return("fw.shutdown", BLOCKING_RETURN),
    );

    let summary = run_simulated(config, &sut);

    assert_pass(&summary);
    assert_eq!(sut.history(), vec!["dc_on", "fw.shutdown"]);
}

/// A sleep request that returns only after S3 has settled is still a
/// requested sleep.
#[test]
fn test_e2e_blocking_sleep_is_not_auto_sleep() {
    let config = TestConfigBuilder::new(ScenarioKind::S3General)
        .cycles(2)
        .build();
    let sut = Arc::new(
        SimulatedSut::new(PowerState::S0).with_slow_return("os.sleep", BLOCKING_RETURN),
    );

    let summary = run_simulated(config, &sut);

    assert_pass(&summary);
    assert_eq!(
        sut.history(),
        vec!["os.sleep", "dc_on", "os.sleep", "dc_on", "os.sleep"]
    );
}
