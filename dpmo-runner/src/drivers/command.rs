//! Shell command driver.
//!
//! Every capability maps to one configured command string run as
//! `<shell> -c "<command>"`. An empty command string means the action is not
//! supported by this bench and yields `ControlError::Unsupported`.

use std::path::Path;
use std::process::{Command, Output, Stdio};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use dpmo_core::config::{CommandSet, DriverConfig};
use dpmo_core::control::{DiagnosticHook, FirmwareControl, OsControl, PowerControl};
use dpmo_core::error::ControlError;
use dpmo_core::types::PowerState;

/// Runs one command string through `shell -c`.
fn spawn_shell(shell: &str, action: &str, command: &str) -> Result<std::process::Child, ControlError> {
    Command::new(shell)
        .arg("-c")
        .arg(command)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| ControlError::CommandFailed {
            action: action.to_owned(),
            reason: format!("failed to spawn '{shell}': {e}"),
        })
}

/// Runs one command string through `shell -c`, reading its output until it
/// exits or `timeout` elapses.
async fn run_to_deadline(
    shell: &str,
    action: &str,
    command: &str,
    timeout: Duration,
) -> Result<Output, ControlError> {
    let child = tokio::process::Command::new(shell)
        .arg("-c")
        .arg(command)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| ControlError::CommandFailed {
            action: action.to_owned(),
            reason: format!("failed to spawn '{shell}': {e}"),
        })?;

    match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(output) => Ok(output?),
        Err(_) => {
            // Dropping the wait future kills the child.
            warn!(
                action,
                timeout_secs = timeout.as_secs(),
                "command timed out, killing process"
            );
            Err(ControlError::CommandFailed {
                action: action.to_owned(),
                reason: format!("timed out after {}s", timeout.as_secs()),
            })
        }
    }
}

fn check_status(action: &str, output: Output) -> Result<Output, ControlError> {
    if output.status.success() {
        return Ok(output);
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    Err(ControlError::CommandFailed {
        action: action.to_owned(),
        reason: format!("{}: {}", output.status, stderr.trim()),
    })
}

/// Capability driver backed by shell commands.
#[derive(Debug, Clone)]
pub struct CommandDriver {
    shell: String,
    commands: CommandSet,
    wait_poll_interval: Duration,
}

impl CommandDriver {
    pub fn new(shell: impl Into<String>, commands: CommandSet) -> Self {
        Self {
            shell: shell.into(),
            commands,
            wait_poll_interval: Duration::from_secs(1),
        }
    }

    pub fn from_config(config: &DriverConfig) -> Self {
        Self::new(config.shell.clone(), config.commands.clone())
            .with_wait_poll_interval(Duration::from_millis(config.wait_poll_interval_ms.max(1)))
    }

    pub fn with_wait_poll_interval(mut self, interval: Duration) -> Self {
        self.wait_poll_interval = interval;
        self
    }

    fn template<'a>(&self, action: &str, command: &'a str) -> Result<&'a str, ControlError> {
        if command.trim().is_empty() {
            return Err(ControlError::Unsupported(action.to_owned()));
        }
        Ok(command)
    }

    /// Runs `command` to completion and fails on a non-zero exit.
    fn run(&self, action: &str, command: &str) -> Result<Output, ControlError> {
        let command = self.template(action, command)?;
        debug!(action, command, "running driver command");
        let output = spawn_shell(&self.shell, action, command)?.wait_with_output()?;
        check_status(action, output)
    }

    /// Like [`run`](Self::run) but kills the child once `timeout` elapses.
    ///
    /// Both pipes are read while the child runs, so chatty commands cannot
    /// stall on a full pipe.
    fn run_with_timeout(
        &self,
        action: &str,
        command: &str,
        timeout: Duration,
    ) -> Result<Output, ControlError> {
        let command = self.template(action, command)?;
        debug!(
            action,
            command,
            timeout_secs = timeout.as_secs(),
            "running driver command"
        );

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let output = runtime.block_on(run_to_deadline(&self.shell, action, command, timeout))?;
        check_status(action, output)
    }

    /// Exit code 0 means reachable. Every failure, including spawn errors, is "not reachable".
    fn probe(&self, action: &str, command: &str) -> bool {
        match self.run(action, command) {
            Ok(_) => true,
            Err(e) => {
                debug!(action, error = %e, "probe negative");
                false
            }
        }
    }
}

impl PowerControl for CommandDriver {
    fn power_state(&self) -> Result<PowerState, ControlError> {
        let output = self.run("power_state", &self.commands.power_state)?;
        let raw = String::from_utf8_lossy(&output.stdout);
        Ok(PowerState::from_raw(&raw))
    }

    fn ac_on(&self) -> Result<(), ControlError> {
        self.run("ac_on", &self.commands.ac_on).map(drop)
    }

    fn ac_off(&self) -> Result<(), ControlError> {
        self.run("ac_off", &self.commands.ac_off).map(drop)
    }

    fn dc_on(&self) -> Result<(), ControlError> {
        self.run("dc_on", &self.commands.dc_on).map(drop)
    }

    fn dc_off(&self) -> Result<(), ControlError> {
        self.run("dc_off", &self.commands.dc_off).map(drop)
    }

    fn wait_for_power(&self, state: PowerState, timeout: Duration) -> Result<bool, ControlError> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.power_state()? == state {
                return Ok(true);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(false);
            }
            std::thread::sleep(self.wait_poll_interval.min(deadline - now));
        }
    }
}

impl OsControl for CommandDriver {
    fn is_in_os(&self) -> bool {
        self.probe("os_probe", &self.commands.os_probe)
    }

    fn shutdown(&self, timeout: Duration) -> Result<(), ControlError> {
        self.run_with_timeout("os_shutdown", &self.commands.os_shutdown, timeout)
            .map(drop)
    }

    fn reset(&self) -> Result<(), ControlError> {
        self.run("os_reset", &self.commands.os_reset).map(drop)
    }

    fn sleep(&self, timeout: Duration) -> Result<(), ControlError> {
        self.run_with_timeout("os_sleep", &self.commands.os_sleep, timeout)
            .map(drop)
    }

    fn hibernate(&self, timeout: Duration) -> Result<(), ControlError> {
        self.run_with_timeout("os_hibernate", &self.commands.os_hibernate, timeout)
            .map(drop)
    }

    fn set_boot_order_to_os(&self) -> Result<(), ControlError> {
        self.run("os_boot_to_os", &self.commands.os_boot_to_os)
            .map(drop)
    }
}

impl FirmwareControl for CommandDriver {
    fn is_in_firmware_shell(&self) -> bool {
        self.probe("firmware_probe", &self.commands.firmware_probe)
    }

    fn shutdown(&self, timeout: Duration) -> Result<(), ControlError> {
        self.run_with_timeout(
            "firmware_shutdown",
            &self.commands.firmware_shutdown,
            timeout,
        )
        .map(drop)
    }

    fn reset(&self) -> Result<(), ControlError> {
        self.run("firmware_reset", &self.commands.firmware_reset)
            .map(drop)
    }

    /// `{cmd}` in the `firmware_exec` template is replaced by `command`.
    fn execute_shell_command(&self, command: &str) -> Result<String, ControlError> {
        let template = self.template("firmware_exec", &self.commands.firmware_exec)?;
        let output = self.run("firmware_exec", &template.replace("{cmd}", command))?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn set_boot_order_to_firmware(&self) -> Result<(), ControlError> {
        self.run(
            "firmware_boot_to_firmware",
            &self.commands.firmware_boot_to_firmware,
        )
        .map(drop)
    }

    /// `{path}` in the `firmware_save_log` template is replaced by `path`.
    fn save_log(&self, path: &Path) -> Result<(), ControlError> {
        let template = self.template("firmware_save_log", &self.commands.firmware_save_log)?;
        let command = template.replace("{path}", &path.display().to_string());
        self.run("firmware_save_log", &command).map(drop)
    }
}

/// Diagnostic hook running one shell command; exit code 0 passes.
///
/// The cycle number is exported to the command as `DPMO_CYCLE`.
#[derive(Debug, Clone)]
pub struct CommandCheck {
    name: String,
    shell: String,
    command: String,
}

impl CommandCheck {
    pub fn new(
        name: impl Into<String>,
        shell: impl Into<String>,
        command: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            shell: shell.into(),
            command: command.into(),
        }
    }
}

impl DiagnosticHook for CommandCheck {
    fn name(&self) -> &str {
        &self.name
    }

    fn check(&self, cycle: u32) -> Result<bool, ControlError> {
        let status = Command::new(&self.shell)
            .arg("-c")
            .arg(&self.command)
            .env("DPMO_CYCLE", cycle.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| ControlError::CommandFailed {
                action: self.name.clone(),
                reason: format!("failed to spawn '{}': {e}", self.shell),
            })?;
        Ok(status.success())
    }
}
