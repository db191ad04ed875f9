//! Collaborator drivers and their assembly.
//!
//! [`Drivers`] bundles everything the observers and the scenario talk to:
//! power, OS, firmware, diagnostic hooks and the report sink.
//!
//! - [`command`]: shell command driver and command-based diagnostic checks
//! - [`simulated`]: in-process SUT for dry runs and end-to-end tests

pub mod command;
pub mod simulated;

use std::sync::Arc;

use anyhow::Result;

use dpmo_core::config::DpmoConfig;
use dpmo_core::control::{DiagnosticHook, FirmwareControl, OsControl, PowerControl, ReportSink};

use crate::report::JsonLinesReport;

pub use command::{CommandCheck, CommandDriver};
pub use simulated::SimulatedSut;

/// Collaborators for one run.
pub struct Drivers {
    pub power: Arc<dyn PowerControl>,
    pub os: Arc<dyn OsControl>,
    pub firmware: Arc<dyn FirmwareControl>,
    pub checks: Vec<Arc<dyn DiagnosticHook>>,
    pub report: Arc<dyn ReportSink>,
}

impl Drivers {
    /// Builds the drivers selected by `driver.kind`.
    ///
    /// Configured diagnostic checks only run with the command driver; the
    /// simulated SUT has no OS to run them against.
    ///
    /// # Errors
    ///
    /// Fails on an unknown driver kind or if the report file cannot be opened.
    pub fn from_config(config: &DpmoConfig) -> Result<Self> {
        let report: Arc<dyn ReportSink> = Arc::new(
            JsonLinesReport::from_config_path(&config.general.report_path)
                .map_err(|e| anyhow::anyhow!("failed to open report: {}", e))?,
        );

        let drivers = match config.driver.kind.as_str() {
            "command" => {
                let driver = Arc::new(CommandDriver::from_config(&config.driver));
                let mut drivers = Self::command(driver);
                for check in &config.diagnostics.checks {
                    drivers = drivers.with_check(Arc::new(CommandCheck::new(
                        check.name.clone(),
                        config.driver.shell.clone(),
                        check.command.clone(),
                    )));
                }
                drivers
            }
            "simulated" => {
                if !config.diagnostics.checks.is_empty() {
                    tracing::info!(
                        checks = config.diagnostics.checks.len(),
                        "simulated driver: diagnostic commands are skipped"
                    );
                }
                Self::simulated(Arc::new(SimulatedSut::from_config(
                    &config.driver.simulated,
                    config.cycle.boot_target,
                )))
            }
            other => {
                return Err(anyhow::anyhow!(
                    "unknown driver kind '{}', expected 'command' or 'simulated'",
                    other
                ));
            }
        };

        tracing::info!(
            kind = %config.driver.kind,
            checks = drivers.checks.len(),
            "drivers initialized"
        );
        Ok(drivers.with_report(report))
    }

    /// One command driver serving power, OS and firmware.
    pub fn command(driver: Arc<CommandDriver>) -> Self {
        Self::from_shared(driver)
    }

    /// One simulated SUT serving power, OS and firmware.
    pub fn simulated(sut: Arc<SimulatedSut>) -> Self {
        Self::from_shared(sut)
    }

    fn from_shared<T>(shared: Arc<T>) -> Self
    where
        T: PowerControl + OsControl + FirmwareControl,
    {
        Self {
            power: shared.clone(),
            os: shared.clone(),
            firmware: shared,
            checks: Vec::new(),
            report: Arc::new(JsonLinesReport::log_only()),
        }
    }

    pub fn with_check(mut self, check: Arc<dyn DiagnosticHook>) -> Self {
        self.checks.push(check);
        self
    }

    pub fn with_report(mut self, report: Arc<dyn ReportSink>) -> Self {
        self.report = report;
        self
    }
}
