//! G3 기반 변형: 매 사이클 AC를 완전히 끊었다가 다시 넣습니다.

use dpmo_core::error::ControlError;
use dpmo_core::event::Event;
use dpmo_core::types::{PowerState, ScenarioKind};
use dpmo_observer::Flag;

use crate::context::ScenarioContext;
use crate::scenario::{
    HandlerResult, Scenario, firmware_shutdown_leg, os_shutdown_leg, shutdown_from_firmware,
    shutdown_from_os,
};

/// G3 → 사이클 시작 → AC on → S0 → OS/UEFI → 대기+진단 → shutdown → S5 → AC off → G3
#[derive(Debug, Default)]
pub struct G3General;

impl Scenario for G3General {
    fn kind(&self) -> ScenarioKind {
        ScenarioKind::G3General
    }

    fn on_in_g3(&mut self, ctx: &mut ScenarioContext) -> HandlerResult {
        ctx.idle_in_g3();
        if let Some(verdict) = ctx.start_new_cycle() {
            return Ok(Some(verdict));
        }
        ctx.ac_on_from_g3_to_s0()?;
        ctx.arm(&[Flag::PowerDetect, Flag::S0]);
        Ok(None)
    }

    fn on_in_s5(&mut self, ctx: &mut ScenarioContext) -> HandlerResult {
        ac_off_to_g3(ctx)
    }

    fn on_in_s4(&mut self, ctx: &mut ScenarioContext) -> HandlerResult {
        Ok(ctx.forbidden(Event::InS4, self.kind()))
    }

    fn on_in_s3(&mut self, ctx: &mut ScenarioContext) -> HandlerResult {
        Ok(ctx.forbidden(Event::InS3, self.kind()))
    }

    fn on_in_os(&mut self, ctx: &mut ScenarioContext) -> HandlerResult {
        os_shutdown_leg(ctx)?;
        Ok(None)
    }

    fn on_in_uefi(&mut self, ctx: &mut ScenarioContext) -> HandlerResult {
        firmware_shutdown_leg(ctx)?;
        Ok(None)
    }
}

/// G3 → 사이클 시작 → AC on → S5 → DC on → S0 → OS/UEFI → shutdown → S5 → AC off → G3
///
/// 같은 S5라도 AC on 직후(DC on 대기)인지 shutdown 이후인지에 따라
/// 다음 동작이 달라지므로 구간 상태를 따로 유지합니다.
#[derive(Debug, Default)]
pub struct G3DcOn {
    awaiting_dc_on: bool,
}

impl Scenario for G3DcOn {
    fn kind(&self) -> ScenarioKind {
        ScenarioKind::G3DcOn
    }

    fn on_in_g3(&mut self, ctx: &mut ScenarioContext) -> HandlerResult {
        ctx.idle_in_g3();
        if let Some(verdict) = ctx.start_new_cycle() {
            return Ok(Some(verdict));
        }
        ctx.ac_on_from_g3_to_s5()?;
        self.awaiting_dc_on = true;
        ctx.arm(&[Flag::PowerDetect, Flag::S5]);
        Ok(None)
    }

    fn on_in_s5(&mut self, ctx: &mut ScenarioContext) -> HandlerResult {
        if std::mem::take(&mut self.awaiting_dc_on) {
            ctx.dc_on_to_s0(PowerState::S5)?;
            ctx.arm(&[Flag::PowerDetect, Flag::S0]);
            return Ok(None);
        }
        ac_off_to_g3(ctx)
    }

    fn on_in_s4(&mut self, ctx: &mut ScenarioContext) -> HandlerResult {
        Ok(ctx.forbidden(Event::InS4, self.kind()))
    }

    fn on_in_s3(&mut self, ctx: &mut ScenarioContext) -> HandlerResult {
        Ok(ctx.forbidden(Event::InS3, self.kind()))
    }

    fn on_in_os(&mut self, ctx: &mut ScenarioContext) -> HandlerResult {
        os_shutdown_leg(ctx)?;
        Ok(None)
    }

    fn on_in_uefi(&mut self, ctx: &mut ScenarioContext) -> HandlerResult {
        firmware_shutdown_leg(ctx)?;
        Ok(None)
    }
}

/// G3 → 사이클 시작 → AC on → S0 → OS/UEFI → 대기+진단 → AC off (surprise) → G3
#[derive(Debug, Default)]
pub struct G3Surprise;

impl Scenario for G3Surprise {
    fn kind(&self) -> ScenarioKind {
        ScenarioKind::G3Surprise
    }

    fn on_in_g3(&mut self, ctx: &mut ScenarioContext) -> HandlerResult {
        ctx.idle_in_g3();
        if let Some(verdict) = ctx.start_new_cycle() {
            return Ok(Some(verdict));
        }
        ctx.ac_on_from_g3_to_s0()?;
        ctx.arm(&[Flag::PowerDetect, Flag::S0]);
        Ok(None)
    }

    fn on_in_s5(&mut self, ctx: &mut ScenarioContext) -> HandlerResult {
        ac_off_to_g3(ctx)
    }

    fn on_in_s4(&mut self, ctx: &mut ScenarioContext) -> HandlerResult {
        Ok(ctx.forbidden(Event::InS4, self.kind()))
    }

    fn on_in_s3(&mut self, ctx: &mut ScenarioContext) -> HandlerResult {
        Ok(ctx.forbidden(Event::InS3, self.kind()))
    }

    fn on_in_os(&mut self, ctx: &mut ScenarioContext) -> HandlerResult {
        ctx.idle_in_os();
        ctx.run_os_diagnostics();
        surprise_ac_off(ctx)
    }

    fn on_in_uefi(&mut self, ctx: &mut ScenarioContext) -> HandlerResult {
        ctx.idle_in_os();
        ctx.run_firmware_checks();
        surprise_ac_off(ctx)
    }
}

/// G3 → 사이클 시작 → AC on → OS/UEFI → shutdown → S5 → DC on → OS/UEFI → AC off (surprise) → G3
///
/// 한 사이클에 부팅이 두 번 있으며, 첫 부팅은 정상 종료로, 두 번째 부팅은
/// 갑작스러운 AC off로 끝납니다.
#[derive(Debug, Default)]
pub struct G3SurpriseDcOn {
    second_boot: bool,
}

impl G3SurpriseDcOn {
    fn leave_boot(
        &mut self,
        ctx: &mut ScenarioContext,
        shutdown: fn(&mut ScenarioContext) -> Result<(), ControlError>,
        checks: fn(&ScenarioContext),
    ) -> HandlerResult {
        if self.second_boot {
            self.second_boot = false;
            ctx.idle_in_os();
            checks(ctx);
            return surprise_ac_off(ctx);
        }
        self.second_boot = true;
        shutdown(ctx)?;
        Ok(None)
    }
}

impl Scenario for G3SurpriseDcOn {
    fn kind(&self) -> ScenarioKind {
        ScenarioKind::G3SurpriseDcOn
    }

    fn on_in_g3(&mut self, ctx: &mut ScenarioContext) -> HandlerResult {
        ctx.idle_in_g3();
        if let Some(verdict) = ctx.start_new_cycle() {
            return Ok(Some(verdict));
        }
        self.second_boot = false;
        ctx.ac_on_from_g3_to_s0()?;
        ctx.arm(&[Flag::PowerDetect, Flag::S0]);
        Ok(None)
    }

    fn on_in_s5(&mut self, ctx: &mut ScenarioContext) -> HandlerResult {
        ctx.dc_on_to_s0(PowerState::S5)?;
        ctx.arm(&[Flag::PowerDetect, Flag::S0]);
        Ok(None)
    }

    fn on_in_s4(&mut self, ctx: &mut ScenarioContext) -> HandlerResult {
        Ok(ctx.forbidden(Event::InS4, self.kind()))
    }

    fn on_in_s3(&mut self, ctx: &mut ScenarioContext) -> HandlerResult {
        Ok(ctx.forbidden(Event::InS3, self.kind()))
    }

    fn on_in_os(&mut self, ctx: &mut ScenarioContext) -> HandlerResult {
        self.leave_boot(ctx, shutdown_from_os, ScenarioContext::run_os_diagnostics)
    }

    fn on_in_uefi(&mut self, ctx: &mut ScenarioContext) -> HandlerResult {
        self.leave_boot(ctx, shutdown_from_firmware, ScenarioContext::run_firmware_checks)
    }
}

fn ac_off_to_g3(ctx: &mut ScenarioContext) -> HandlerResult {
    ctx.ac_off_from_s5_to_g3()?;
    ctx.arm(&[Flag::PowerDetect]);
    Ok(None)
}

fn surprise_ac_off(ctx: &mut ScenarioContext) -> HandlerResult {
    ctx.arm(&[Flag::PowerDetect]);
    ctx.ac_off_from_s0_to_g3()?;
    Ok(None)
}
