//! `Scenario` trait: 이벤트 태그마다 핸들러 하나
//!
//! 기본 메서드는 모든 변형이 공유하는 동작을 구현합니다.
//!
//! - `IN_S0`: `power_detect`와 설정된 부팅 대상의 프로브를 무장
//! - 안정 상태와 부팅 이벤트: 기본적으로 보류
//! - `AUTO_SLEEP/HIBERNATE/SHUTDOWN`: 정책에 따라 실패 또는 DC on으로 복구
//! - `AUTO_RESET_*`: 정책에 따라 실패 또는 재무장
//! - `TIMEOUT`: 정책에 따라 실패, 전원 재투입(fail-safe), 재프로브 중 하나
//!
//! 변형은 흐름이 다른 핸들러만 재정의합니다.

use dpmo_core::error::ControlError;
use dpmo_core::event::Event;
use dpmo_core::types::{PowerState, ScenarioKind, Verdict};
use dpmo_observer::Flag;
use tracing::{info, warn};

use crate::context::ScenarioContext;

/// `Ok(None)`이면 실행 계속, `Ok(Some(verdict))`이면 종료
pub type HandlerResult = Result<Option<Verdict>, ControlError>;

pub trait Scenario: Send {
    fn kind(&self) -> ScenarioKind;

    /// `power_detect`, `s0`에 더해 옵저버 시작 전에 무장할 플래그
    ///
    /// 변형의 시작 상태에 이미 머물러 있는 SUT는 `AUTO_*` 대신
    /// 해당 `IN_*` 이벤트로 실행을 엽니다.
    fn entry_flags(&self) -> &'static [Flag] {
        &[]
    }

    fn on_in_g3(&mut self, _ctx: &mut ScenarioContext) -> HandlerResult {
        Ok(None)
    }

    fn on_in_s5(&mut self, _ctx: &mut ScenarioContext) -> HandlerResult {
        Ok(None)
    }

    fn on_in_s4(&mut self, _ctx: &mut ScenarioContext) -> HandlerResult {
        Ok(None)
    }

    fn on_in_s3(&mut self, _ctx: &mut ScenarioContext) -> HandlerResult {
        Ok(None)
    }

    fn on_in_s0(&mut self, ctx: &mut ScenarioContext) -> HandlerResult {
        ctx.arm(&[Flag::PowerDetect]);
        ctx.arm_boot_probe();
        Ok(None)
    }

    fn on_in_os(&mut self, _ctx: &mut ScenarioContext) -> HandlerResult {
        Ok(None)
    }

    fn on_in_uefi(&mut self, _ctx: &mut ScenarioContext) -> HandlerResult {
        Ok(None)
    }

    fn on_auto_sleep(&mut self, ctx: &mut ScenarioContext) -> HandlerResult {
        let stop = ctx.policy().stop_on_auto_sleep;
        recover_from_low_power(ctx, Event::AutoSleep, stop, PowerState::S3)
    }

    fn on_auto_hibernate(&mut self, ctx: &mut ScenarioContext) -> HandlerResult {
        let stop = ctx.policy().stop_on_auto_hibernate;
        recover_from_low_power(ctx, Event::AutoHibernate, stop, PowerState::S4)
    }

    fn on_auto_shutdown(&mut self, ctx: &mut ScenarioContext) -> HandlerResult {
        let stop = ctx.policy().stop_on_auto_shutdown;
        recover_from_low_power(ctx, Event::AutoShutdown, stop, PowerState::S5)
    }

    fn on_auto_reset_s3(&mut self, ctx: &mut ScenarioContext) -> HandlerResult {
        let stop = ctx.policy().stop_on_auto_reset_s3;
        rearm_after_reset(ctx, Event::AutoResetS3, stop)
    }

    fn on_auto_reset_s4(&mut self, ctx: &mut ScenarioContext) -> HandlerResult {
        let stop = ctx.policy().stop_on_auto_reset_s4;
        rearm_after_reset(ctx, Event::AutoResetS4, stop)
    }

    fn on_auto_reset_s5(&mut self, ctx: &mut ScenarioContext) -> HandlerResult {
        let stop = ctx.policy().stop_on_auto_reset_s5;
        rearm_after_reset(ctx, Event::AutoResetS5, stop)
    }

    fn on_timeout(&mut self, ctx: &mut ScenarioContext) -> HandlerResult {
        if ctx.policy().stop_on_timeout {
            return Ok(ctx.fail("cycle timeout"));
        }

        ctx.flags().disarm(Flag::PowerDetect);
        if ctx.policy().fail_safe {
            info!(cycle = ctx.counter().current(), "timeout, fail-safe power cycle");
            ctx.ac_off()?;
            ctx.ac_on()?;
            ctx.arm(&[Flag::PowerDetect, Flag::S0]);
        } else {
            info!(cycle = ctx.counter().current(), "timeout, re-probing boot target");
            ctx.arm_boot_recovery();
        }
        Ok(None)
    }

    /// `event`를 해당 핸들러로 보냅니다.
    fn handle(&mut self, event: Event, ctx: &mut ScenarioContext) -> HandlerResult {
        match event {
            Event::InG3 => self.on_in_g3(ctx),
            Event::InS5 => self.on_in_s5(ctx),
            Event::InS4 => self.on_in_s4(ctx),
            Event::InS3 => self.on_in_s3(ctx),
            Event::InS0 => self.on_in_s0(ctx),
            Event::InOs => self.on_in_os(ctx),
            Event::InUefi => self.on_in_uefi(ctx),
            Event::AutoSleep => self.on_auto_sleep(ctx),
            Event::AutoHibernate => self.on_auto_hibernate(ctx),
            Event::AutoShutdown => self.on_auto_shutdown(ctx),
            Event::AutoResetS3 => self.on_auto_reset_s3(ctx),
            Event::AutoResetS4 => self.on_auto_reset_s4(ctx),
            Event::AutoResetS5 => self.on_auto_reset_s5(ctx),
            Event::Timeout => self.on_timeout(ctx),
        }
    }
}

fn recover_from_low_power(
    ctx: &mut ScenarioContext,
    event: Event,
    stop: bool,
    from: PowerState,
) -> HandlerResult {
    if stop {
        return Ok(ctx.fail(format!("unexpected {event}")));
    }
    warn!(event = %event, "unexpected low-power state, waking SUT");
    ctx.dc_on_to_s0(from)?;
    ctx.arm(&[Flag::PowerDetect, Flag::S0]);
    Ok(None)
}

fn rearm_after_reset(ctx: &mut ScenarioContext, event: Event, stop: bool) -> HandlerResult {
    if stop {
        return Ok(ctx.fail(format!("unexpected {event}")));
    }
    warn!(event = %event, "unexpected reset, continuing");
    ctx.arm(&[Flag::PowerDetect, Flag::S0]);
    Ok(None)
}

// --- 공통 흐름 단계 ---

/// OS에서 대기하고 진단을 실행한 뒤 shutdown하여 S5를 기다립니다.
pub(crate) fn os_shutdown_leg(ctx: &mut ScenarioContext) -> Result<(), ControlError> {
    ctx.idle_in_os();
    ctx.run_os_diagnostics();
    shutdown_from_os(ctx)
}

/// 펌웨어 셸에서 대기하고 펌웨어 점검을 실행한 뒤 shutdown하여 S5를 기다립니다.
pub(crate) fn firmware_shutdown_leg(ctx: &mut ScenarioContext) -> Result<(), ControlError> {
    ctx.idle_in_os();
    ctx.run_firmware_checks();
    shutdown_from_firmware(ctx)
}

/// S5 대기는 요청 전에 무장합니다. SUT가 이미 꺼진 뒤에도 호출이
/// 디바운스 시간을 넘겨 블록될 수 있습니다.
pub(crate) fn shutdown_from_os(ctx: &mut ScenarioContext) -> Result<(), ControlError> {
    let timeout = ctx.settings().power_transition_timeout;
    ctx.arm(&[Flag::PowerDetect, Flag::S5]);
    ctx.os().shutdown(timeout)
}

pub(crate) fn shutdown_from_firmware(ctx: &mut ScenarioContext) -> Result<(), ControlError> {
    let timeout = ctx.settings().power_transition_timeout;
    ctx.arm(&[Flag::PowerDetect, Flag::S5]);
    ctx.firmware().shutdown(timeout)
}
