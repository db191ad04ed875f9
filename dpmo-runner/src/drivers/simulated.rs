//! In-process simulated SUT.
//!
//! Models just enough of a real bench for dry runs and end-to-end tests:
//! power transitions are instant, the OS or firmware shell becomes reachable
//! `boot_delay` after the SUT enters S0, and the boot order decides which of
//! the two answers. A warm reset can optionally pass through S5 for a short
//! hold before returning to S0.
//!
//! Faults can be injected to exercise the failure paths (failing actions,
//! hung boots, spontaneous state changes, an unreadable power status).
//! Low-power requests can also be made to block after the SUT has already
//! switched, like a shutdown command that waits for the power-off.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tracing::debug;

use dpmo_core::config::SimulatedConfig;
use dpmo_core::control::{FirmwareControl, OsControl, PowerControl};
use dpmo_core::error::ControlError;
use dpmo_core::types::{BootTarget, PowerState};

/// Time spent in S5 by a reset when `reset_via_s5` is enabled.
const DEFAULT_RESET_HOLD: Duration = Duration::from_millis(750);

/// Polling slice used by `wait_for_power`.
const WAIT_POLL_SLICE: Duration = Duration::from_millis(10);

#[derive(Debug)]
struct SutState {
    power: PowerState,
    /// Start of the current boot and the target it boots into; `None` while off.
    booted: Option<(Instant, BootTarget)>,
    /// Target of the next boot.
    boot_order: BootTarget,
    /// Future power states, applied in order once due.
    scheduled: VecDeque<(Instant, PowerState)>,
    history: Vec<String>,
    status_reads: u64,
}

impl SutState {
    fn apply_due(&mut self, now: Instant) {
        while let Some(&(at, state)) = self.scheduled.front() {
            if at > now {
                break;
            }
            self.power = state;
            self.scheduled.pop_front();
        }
    }

    fn enter(&mut self, state: PowerState) {
        self.scheduled.clear();
        self.power = state;
        self.booted = None;
    }

    fn boot(&mut self, now: Instant) {
        self.scheduled.clear();
        self.power = PowerState::S0;
        self.booted = Some((now, self.boot_order));
    }
}

/// Simulated system under test.
#[derive(Debug)]
pub struct SimulatedSut {
    state: Mutex<SutState>,
    boot_delay: Duration,
    ac_on_state: PowerState,
    reset_via_s5: bool,
    reset_hold: Duration,
    failing: HashSet<String>,
    slow_returns: HashMap<String, Duration>,
    hung_boot: bool,
    unknown_after: Option<u64>,
}

impl SimulatedSut {
    /// A SUT sitting in `initial` with the OS as boot target.
    pub fn new(initial: PowerState) -> Self {
        let now = Instant::now();
        Self {
            state: Mutex::new(SutState {
                power: initial,
                // Already booted when starting in S0.
                booted: (initial == PowerState::S0).then_some((now, BootTarget::Os)),
                boot_order: BootTarget::Os,
                scheduled: VecDeque::new(),
                history: Vec::new(),
                status_reads: 0,
            }),
            boot_delay: Duration::ZERO,
            ac_on_state: PowerState::S0,
            reset_via_s5: false,
            reset_hold: DEFAULT_RESET_HOLD,
            failing: HashSet::new(),
            slow_returns: HashMap::new(),
            hung_boot: false,
            unknown_after: None,
        }
    }

    /// Builds a SUT from `[driver.simulated]`, starting in G3.
    pub fn from_config(config: &SimulatedConfig, boot_target: BootTarget) -> Self {
        Self::new(PowerState::G3)
            .with_boot_delay(Duration::from_millis(config.boot_delay_ms))
            .with_ac_on_state(config.ac_on_state)
            .with_boot_order(boot_target)
            .with_reset_via_s5(config.reset_via_s5)
    }

    pub fn with_boot_delay(mut self, delay: Duration) -> Self {
        self.boot_delay = delay;
        self
    }

    /// State reached from G3 by AC on (S0 or S5).
    pub fn with_ac_on_state(mut self, state: PowerState) -> Self {
        self.ac_on_state = state;
        self
    }

    /// Sets the next boot target. A SUT created in S0 is moved there directly.
    pub fn with_boot_order(self, target: BootTarget) -> Self {
        {
            let mut sut = self.lock();
            sut.boot_order = target;
            if let Some((_, running)) = sut.booted.as_mut() {
                *running = target;
            }
        }
        self
    }

    pub fn with_reset_via_s5(mut self, enabled: bool) -> Self {
        self.reset_via_s5 = enabled;
        self
    }

    pub fn with_reset_hold(mut self, hold: Duration) -> Self {
        self.reset_hold = hold;
        self
    }

    /// Makes `action` (e.g. `"ac_on"`, `"os.shutdown"`, `"fw.exec pci"`) fail.
    pub fn with_failing(mut self, action: impl Into<String>) -> Self {
        self.failing.insert(action.into());
        self
    }

    /// `action` (`"os.shutdown"`, `"os.sleep"`, `"os.hibernate"` or
    /// `"fw.shutdown"`) switches state at once but returns only after `delay`.
    pub fn with_slow_return(mut self, action: impl Into<String>, delay: Duration) -> Self {
        self.slow_returns.insert(action.into(), delay);
        self
    }

    /// The OS and firmware never become reachable.
    pub fn with_hung_boot(mut self) -> Self {
        self.hung_boot = true;
        self
    }

    /// Reports `UNKNOWN` once more than `reads` status reads have been served.
    pub fn with_unknown_after(mut self, reads: u64) -> Self {
        self.unknown_after = Some(reads);
        self
    }

    /// Forces a spontaneous transition, as if the SUT changed state on its own.
    pub fn inject(&self, state: PowerState) {
        let mut sut = self.lock();
        sut.history.push(format!("inject {state}"));
        if state == PowerState::S0 {
            sut.boot(Instant::now());
        } else {
            sut.enter(state);
        }
    }

    /// Every action issued so far, in order.
    pub fn history(&self) -> Vec<String> {
        self.lock().history.clone()
    }

    /// Current power state, with due transitions applied.
    pub fn current(&self) -> PowerState {
        let mut sut = self.lock();
        sut.apply_due(Instant::now());
        sut.power
    }

    pub fn boot_order(&self) -> BootTarget {
        self.lock().boot_order
    }

    fn lock(&self) -> MutexGuard<'_, SutState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Records `action` and applies the injected failure, if any.
    fn act(&self, sut: &mut SutState, action: &str) -> Result<(), ControlError> {
        sut.history.push(action.to_owned());
        debug!(action, power = %sut.power, "simulated action");
        if self.failing.contains(action) {
            return Err(ControlError::CommandFailed {
                action: action.to_owned(),
                reason: "injected failure".to_owned(),
            });
        }
        Ok(())
    }

    fn is_booted_into(&self, target: BootTarget) -> bool {
        if self.hung_boot {
            return false;
        }
        let now = Instant::now();
        let mut sut = self.lock();
        sut.apply_due(now);
        sut.power == PowerState::S0
            && sut.booted.is_some_and(|(started, running)| {
                running == target
                    && now
                        .checked_duration_since(started)
                        .is_some_and(|up| up >= self.boot_delay)
            })
    }

    fn require_booted(&self, target: BootTarget, action: &str) -> Result<(), ControlError> {
        if self.is_booted_into(target) {
            Ok(())
        } else {
            Err(ControlError::CommandFailed {
                action: action.to_owned(),
                reason: format!("{target} is not reachable"),
            })
        }
    }

    fn warm_reset(&self, action: &str) -> Result<(), ControlError> {
        let mut sut = self.lock();
        self.act(&mut sut, action)?;
        let now = Instant::now();
        if self.reset_via_s5 {
            sut.enter(PowerState::S5);
            let back = now + self.reset_hold;
            sut.scheduled.push_back((back, PowerState::S0));
            sut.booted = Some((back, sut.boot_order));
        } else {
            sut.boot(now);
        }
        Ok(())
    }

    /// Enters a low-power `state` on request, then honors any slow return.
    fn request_low_power(&self, action: &str, state: PowerState) -> Result<(), ControlError> {
        {
            let mut sut = self.lock();
            self.act(&mut sut, action)?;
            sut.enter(state);
        }
        if let Some(delay) = self.slow_returns.get(action) {
            std::thread::sleep(*delay);
        }
        Ok(())
    }

    fn power_action(
        &self,
        action: &str,
        apply: impl FnOnce(&mut SutState, Instant),
    ) -> Result<(), ControlError> {
        let now = Instant::now();
        let mut sut = self.lock();
        sut.apply_due(now);
        self.act(&mut sut, action)?;
        apply(&mut sut, now);
        Ok(())
    }
}

impl PowerControl for SimulatedSut {
    fn power_state(&self) -> Result<PowerState, ControlError> {
        let mut sut = self.lock();
        sut.status_reads += 1;
        if self.unknown_after.is_some_and(|limit| sut.status_reads > limit) {
            return Ok(PowerState::Unknown);
        }
        sut.apply_due(Instant::now());
        Ok(sut.power)
    }

    fn ac_on(&self) -> Result<(), ControlError> {
        let ac_on_state = self.ac_on_state;
        self.power_action("ac_on", |sut, now| {
            if sut.power != PowerState::G3 {
                return;
            }
            if ac_on_state == PowerState::S0 {
                sut.boot(now);
            } else {
                sut.enter(ac_on_state);
            }
        })
    }

    fn ac_off(&self) -> Result<(), ControlError> {
        self.power_action("ac_off", |sut, _| sut.enter(PowerState::G3))
    }

    fn dc_on(&self) -> Result<(), ControlError> {
        self.power_action("dc_on", |sut, now| {
            if matches!(sut.power, PowerState::S3 | PowerState::S4 | PowerState::S5) {
                sut.boot(now);
            }
        })
    }

    fn dc_off(&self) -> Result<(), ControlError> {
        self.power_action("dc_off", |sut, _| {
            if sut.power == PowerState::S0 {
                sut.enter(PowerState::S5);
            }
        })
    }

    fn wait_for_power(&self, state: PowerState, timeout: Duration) -> Result<bool, ControlError> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.current() == state {
                return Ok(true);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(false);
            }
            std::thread::sleep(WAIT_POLL_SLICE.min(deadline - now));
        }
    }
}

impl OsControl for SimulatedSut {
    fn is_in_os(&self) -> bool {
        self.is_booted_into(BootTarget::Os)
    }

    fn shutdown(&self, _timeout: Duration) -> Result<(), ControlError> {
        self.require_booted(BootTarget::Os, "os.shutdown")?;
        self.request_low_power("os.shutdown", PowerState::S5)
    }

    fn reset(&self) -> Result<(), ControlError> {
        self.require_booted(BootTarget::Os, "os.reset")?;
        self.warm_reset("os.reset")
    }

    fn sleep(&self, _timeout: Duration) -> Result<(), ControlError> {
        self.require_booted(BootTarget::Os, "os.sleep")?;
        self.request_low_power("os.sleep", PowerState::S3)
    }

    fn hibernate(&self, _timeout: Duration) -> Result<(), ControlError> {
        self.require_booted(BootTarget::Os, "os.hibernate")?;
        self.request_low_power("os.hibernate", PowerState::S4)
    }

    fn set_boot_order_to_os(&self) -> Result<(), ControlError> {
        let mut sut = self.lock();
        self.act(&mut sut, "os.set_boot_order_to_os")?;
        sut.boot_order = BootTarget::Os;
        Ok(())
    }
}

impl FirmwareControl for SimulatedSut {
    fn is_in_firmware_shell(&self) -> bool {
        self.is_booted_into(BootTarget::Uefi)
    }

    fn shutdown(&self, _timeout: Duration) -> Result<(), ControlError> {
        self.require_booted(BootTarget::Uefi, "fw.shutdown")?;
        self.request_low_power("fw.shutdown", PowerState::S5)
    }

    fn reset(&self) -> Result<(), ControlError> {
        self.require_booted(BootTarget::Uefi, "fw.reset")?;
        self.warm_reset("fw.reset")
    }

    fn execute_shell_command(&self, command: &str) -> Result<String, ControlError> {
        let action = format!("fw.exec {command}");
        self.require_booted(BootTarget::Uefi, &action)?;
        let mut sut = self.lock();
        self.act(&mut sut, &action)?;
        Ok(format!("{command}: ok\n"))
    }

    fn set_boot_order_to_firmware(&self) -> Result<(), ControlError> {
        let mut sut = self.lock();
        self.act(&mut sut, "fw.set_boot_order_to_firmware")?;
        sut.boot_order = BootTarget::Uefi;
        Ok(())
    }

    /// Writes the action history as the "serial log".
    fn save_log(&self, path: &Path) -> Result<(), ControlError> {
        let history = {
            let mut sut = self.lock();
            self.act(&mut sut, "fw.save_log")?;
            sut.history.join("\n")
        };
        std::fs::write(path, history + "\n")?;
        Ok(())
    }
}
