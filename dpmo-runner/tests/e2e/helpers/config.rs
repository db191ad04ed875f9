//! Test configuration builder.
//!
//! Timings are scaled down so a cycle completes in well under a second on
//! the simulated SUT.

use dpmo_core::config::DpmoConfig;
use dpmo_core::types::{BootTarget, ScenarioKind};

/// Builder for `DpmoConfig` with fast observer timings.
pub struct TestConfigBuilder {
    config: DpmoConfig,
}

#[allow(dead_code)]
impl TestConfigBuilder {
    pub fn new(scenario: ScenarioKind) -> Self {
        let mut config = DpmoConfig::default();
        config.cycle.scenario = scenario;
        config.cycle.target_cycles = 1;
        config.cycle.os_idle_secs = 0;
        config.cycle.ac_off_to_g3_idle_secs = 0;
        config.cycle.power_transition_timeout_secs = 2;
        config.cycle.cycle_timeout_secs = 30;
        config.driver.kind = "simulated".to_owned();
        config.observer.power_poll_interval_ms = 10;
        config.observer.debounce_secs = 0.05;
        config.observer.probe_interval_ms = 10;
        config.observer.probe_window_secs = 5;
        config.observer.stop_timeout_secs = 2;
        Self { config }
    }

    pub fn cycles(mut self, cycles: u32) -> Self {
        self.config.cycle.target_cycles = cycles;
        self
    }

    pub fn boot_target(mut self, target: BootTarget) -> Self {
        self.config.cycle.boot_target = target;
        self
    }

    pub fn debounce_secs(mut self, secs: f64) -> Self {
        self.config.observer.debounce_secs = secs;
        self
    }

    pub fn cycle_timeout_secs(mut self, secs: u64) -> Self {
        self.config.cycle.cycle_timeout_secs = secs;
        self
    }

    pub fn probe_window_secs(mut self, secs: u64) -> Self {
        self.config.observer.probe_window_secs = secs;
        self
    }

    pub fn firmware_commands(mut self, commands: &[&str]) -> Self {
        self.config.diagnostics.firmware_commands =
            commands.iter().map(|c| (*c).to_owned()).collect();
        self
    }

    pub fn firmware_log_dir(mut self, dir: &str) -> Self {
        self.config.general.firmware_log_dir = dir.to_owned();
        self
    }

    /// Recover from every spontaneous transition instead of failing.
    pub fn lenient(mut self) -> Self {
        let policy = &mut self.config.policy;
        policy.stop_on_auto_sleep = false;
        policy.stop_on_auto_hibernate = false;
        policy.stop_on_auto_shutdown = false;
        policy.stop_on_auto_reset_s3 = false;
        policy.stop_on_auto_reset_s4 = false;
        policy.stop_on_auto_reset_s5 = false;
        self
    }

    pub fn build(self) -> DpmoConfig {
        self.config
    }
}
