//! Fault paths: spontaneous transitions, hung boots, failing actions and an
//! unreadable power status. Every one of them must still end in a summary.

use std::sync::Arc;
use std::time::Duration;

use crate::helpers::assertions::*;
use crate::helpers::config::*;
use crate::helpers::run::*;

use dpmo_core::types::{PowerState, ScenarioKind, Verdict};
use dpmo_runner::drivers::{Drivers, SimulatedSut};

/// Slow enough boot that a state injected shortly after S0 lands before
/// the OS answers.
const SLOW_BOOT: Duration = Duration::from_millis(400);

/// A spontaneous sleep while booting is AUTO_SLEEP, fatal by default.
#[test]
fn test_e2e_auto_sleep_fails_by_default() {
    let config = TestConfigBuilder::new(ScenarioKind::G3General)
        .cycles(2)
        .build();
    let sut = Arc::new(SimulatedSut::new(PowerState::G3).with_boot_delay(SLOW_BOOT));
    let injector = inject_after_s0(&sut, Duration::from_millis(100), PowerState::S3);

    let summary = run_simulated(config, &sut);
    injector.join().expect("injector thread panicked");

    assert_fail_with(&summary, "AUTO_SLEEP");
    assert_eq!(summary.cycles_completed, 1);
}

/// With `stop_on_auto_sleep = false` the SUT is woken by DC on and the
/// cycle continues.
#[test]
fn test_e2e_auto_sleep_recovered_when_lenient() {
    let config = TestConfigBuilder::new(ScenarioKind::G3General)
        .lenient()
        .build();
    let sut = Arc::new(SimulatedSut::new(PowerState::G3).with_boot_delay(SLOW_BOOT));
    let injector = inject_after_s0(&sut, Duration::from_millis(100), PowerState::S3);

    let summary = run_simulated(config, &sut);
    injector.join().expect("injector thread panicked");

    assert_pass(&summary);
    assert_eq!(
        sut.history(),
        vec!["ac_on", "inject S3", "dc_on", "os.shutdown", "ac_off"]
    );
}

/// A spontaneous shutdown in S5General's OS leg is AUTO_SHUTDOWN.
#[test]
fn test_e2e_auto_shutdown_fails_by_default() {
    let config = TestConfigBuilder::new(ScenarioKind::S5General)
        .cycles(2)
        .build();
    let sut = Arc::new(SimulatedSut::new(PowerState::S5).with_boot_delay(SLOW_BOOT));
    let injector = inject_after_s0(&sut, Duration::from_millis(100), PowerState::S5);

    let summary = run_simulated(config, &sut);
    injector.join().expect("injector thread panicked");

    assert_fail_with(&summary, "AUTO_SHUTDOWN");
}

/// The OS never comes up: the cycle watchdog fires and the run fails.
#[test]
fn test_e2e_hung_boot_times_out() {
    let config = TestConfigBuilder::new(ScenarioKind::G3General)
        .cycles(2)
        .cycle_timeout_secs(1)
        .probe_window_secs(1)
        .build();
    let sut = Arc::new(SimulatedSut::new(PowerState::G3).with_hung_boot());

    let summary = run_simulated(config, &sut);

    assert_fail_with(&summary, "cycle timeout");
    assert_eq!(summary.cycles_completed, 1);
    assert_eq!(sut.history(), vec!["ac_on"]);
}

/// An UNKNOWN power status is fatal whatever the flags say.
#[test]
fn test_e2e_unknown_power_state_is_fatal() {
    // ResetGeneral never reads the power status itself, so only the
    // power observer sees UNKNOWN.
    let config = TestConfigBuilder::new(ScenarioKind::ResetGeneral)
        .cycles(5)
        .build();
    let sut = Arc::new(
        SimulatedSut::new(PowerState::S0)
            .with_boot_delay(SLOW_BOOT)
            .with_unknown_after(10),
    );

    let summary = run_simulated(config, &sut);

    assert_fail_with(&summary, "power status could not be determined");
    assert_eq!(summary.cycles_completed, 0);
}

/// A failing control action ends the run with the handler error.
#[test]
fn test_e2e_failing_action_ends_run() {
    let config = TestConfigBuilder::new(ScenarioKind::G3General).build();
    let sut = Arc::new(SimulatedSut::new(PowerState::G3).with_failing("os.shutdown"));

    let summary = run_simulated(config, &sut);

    assert_eq!(summary.verdict, Verdict::Fail);
    let reason = summary.reason.unwrap_or_default();
    assert!(reason.contains("IN_OS"), "{reason}");
    assert!(reason.contains("os.shutdown"), "{reason}");
}

/// A forbidden event for the variant is an immediate FAIL.
#[test]
fn test_e2e_forbidden_g3_in_s5_general() {
    let config = TestConfigBuilder::new(ScenarioKind::S5General).build();
    let sut = Arc::new(SimulatedSut::new(PowerState::G3));

    let summary = run_with(config, Drivers::simulated(Arc::clone(&sut)));

    assert_fail_with(&summary, "IN_G3 is not allowed in S5General");
    assert!(sut.history().is_empty());
}
