//! CLI argument definitions for dpmo-runner.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.

use std::path::PathBuf;

use clap::Parser;

use dpmo_core::config::DpmoConfig;
use dpmo_core::types::ScenarioKind;

/// DPMO AC/DC power-cycle test runner.
///
/// Drives the system under test through repeated power cycles of the selected
/// scenario and reports PASS or FAIL.
#[derive(Parser, Debug)]
#[command(name = "dpmo-runner")]
#[command(version, about, long_about = None)]
pub struct RunnerCli {
    /// Path to dpmo.toml configuration file.
    #[arg(short, long, default_value = "dpmo.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_format: Option<String>,

    /// Override the scenario variant (e.g. G3General, S5General).
    #[arg(long)]
    pub scenario: Option<ScenarioKind>,

    /// Override the target cycle count.
    #[arg(long)]
    pub cycles: Option<u32>,

    /// Run against the in-process simulated SUT instead of the configured driver.
    #[arg(long)]
    pub simulate: bool,

    /// Validate configuration file and exit without running.
    #[arg(long)]
    pub validate: bool,
}

impl RunnerCli {
    /// Applies CLI overrides on top of a loaded configuration.
    pub fn apply_overrides(&self, config: &mut DpmoConfig) {
        if let Some(level) = &self.log_level {
            config.general.log_level = level.clone();
        }
        if let Some(format) = &self.log_format {
            config.general.log_format = format.clone();
        }
        if let Some(scenario) = self.scenario {
            config.cycle.scenario = scenario;
        }
        if let Some(cycles) = self.cycles {
            config.cycle.target_cycles = cycles;
        }
        if self.simulate {
            config.driver.kind = "simulated".to_owned();
        }
    }
}
