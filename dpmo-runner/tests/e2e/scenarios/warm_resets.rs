//! Warm-reset variants, including resets that pass briefly through S5.

use std::sync::Arc;
use std::time::Duration;

use crate::helpers::assertions::*;
use crate::helpers::config::*;
use crate::helpers::run::*;

use dpmo_core::types::{BootTarget, PowerState, ScenarioKind};
use dpmo_runner::drivers::SimulatedSut;

/// Boot time on the simulated SUT, well above the power poll interval so
/// IN_S0 is always handled before the boot target answers.
const BOOT_DELAY: Duration = Duration::from_millis(200);

fn booted_sut() -> SimulatedSut {
    SimulatedSut::new(PowerState::S0).with_boot_delay(BOOT_DELAY)
}

/// ResetGeneral from the OS: one `os.reset` per cycle, power never leaves S0.
#[test]
fn test_e2e_reset_general_os() {
    let config = TestConfigBuilder::new(ScenarioKind::ResetGeneral)
        .cycles(3)
        .build();
    let sut = Arc::new(booted_sut());

    let summary = run_simulated(config, &sut);

    assert_pass(&summary);
    assert_eq!(sut.history(), vec!["os.reset", "os.reset", "os.reset"]);
}

/// ResetGeneral from the firmware shell resets from the shell.
#[test]
fn test_e2e_reset_general_uefi() {
    let config = TestConfigBuilder::new(ScenarioKind::ResetGeneral)
        .cycles(2)
        .boot_target(BootTarget::Uefi)
        .firmware_commands(&["pci"])
        .build();
    let sut = Arc::new(booted_sut().with_boot_order(BootTarget::Uefi));

    let summary = run_simulated(config, &sut);

    assert_pass(&summary);
    assert_eq!(
        sut.history(),
        vec!["fw.exec pci", "fw.reset", "fw.exec pci", "fw.reset"]
    );
}

/// ResetUefi2Os passes through the firmware shell once per cycle.
#[test]
fn test_e2e_reset_uefi_to_os() {
    let config = TestConfigBuilder::new(ScenarioKind::ResetUefi2Os)
        .cycles(2)
        .build();
    let sut = Arc::new(booted_sut());

    let summary = run_simulated(config, &sut);

    assert_pass(&summary);
    let one_cycle = [
        "fw.set_boot_order_to_firmware",
        "os.reset",
        "os.set_boot_order_to_os",
        "fw.reset",
    ];
    let expected: Vec<String> = one_cycle
        .iter()
        .chain(one_cycle.iter())
        .map(|a| (*a).to_owned())
        .collect();
    assert_eq!(sut.history(), expected);
    assert_eq!(sut.boot_order(), BootTarget::Os);
}

/// A reset that dips through S5 for less than the debounce interval is
/// seen as AUTO_RESET_S5, which fails the run under the default policy.
#[test]
fn test_e2e_reset_through_s5_fails_by_default() {
    let config = TestConfigBuilder::new(ScenarioKind::ResetGeneral)
        .cycles(2)
        .debounce_secs(0.5)
        .build();
    let sut = Arc::new(
        booted_sut()
            .with_reset_via_s5(true)
            .with_reset_hold(Duration::from_millis(100)),
    );

    let summary = run_simulated(config, &sut);

    assert_fail_with(&summary, "AUTO_RESET_S5");
    assert_eq!(summary.cycles_completed, 1);
}

/// With `stop_on_auto_reset_s5 = false` the same reset is tolerated.
#[test]
fn test_e2e_reset_through_s5_tolerated_when_lenient() {
    let config = TestConfigBuilder::new(ScenarioKind::ResetGeneral)
        .cycles(2)
        .debounce_secs(0.5)
        .lenient()
        .build();
    let sut = Arc::new(
        booted_sut()
            .with_reset_via_s5(true)
            .with_reset_hold(Duration::from_millis(100)),
    );

    let summary = run_simulated(config, &sut);

    assert_pass(&summary);
    assert_eq!(sut.history(), vec!["os.reset", "os.reset"]);
}
