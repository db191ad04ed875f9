//! S5 / S3 기반 변형: AC는 유지한 채 DC on으로만 깨웁니다.

use dpmo_core::event::Event;
use dpmo_core::types::{PowerState, ScenarioKind};
use dpmo_observer::Flag;

use crate::context::ScenarioContext;
use crate::scenario::{HandlerResult, Scenario, firmware_shutdown_leg, os_shutdown_leg};

/// S5 → 사이클 시작 → DC on → S0 → OS/UEFI → 대기+진단 → shutdown → S5
#[derive(Debug, Default)]
pub struct S5General;

impl Scenario for S5General {
    fn kind(&self) -> ScenarioKind {
        ScenarioKind::S5General
    }

    fn entry_flags(&self) -> &'static [Flag] {
        &[Flag::S5]
    }

    fn on_in_g3(&mut self, ctx: &mut ScenarioContext) -> HandlerResult {
        Ok(ctx.forbidden(Event::InG3, self.kind()))
    }

    fn on_in_s5(&mut self, ctx: &mut ScenarioContext) -> HandlerResult {
        if let Some(verdict) = ctx.start_new_cycle() {
            return Ok(Some(verdict));
        }
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
        os_shutdown_leg(ctx)?;
        Ok(None)
    }

    fn on_in_uefi(&mut self, ctx: &mut ScenarioContext) -> HandlerResult {
        firmware_shutdown_leg(ctx)?;
        Ok(None)
    }
}

/// S3 → 사이클 시작 → DC on → S0 → OS → 대기+진단 → sleep → S3
///
/// 펌웨어 셸에서는 S3 진입이 불가능하므로 UEFI 도달도 실패로 처리합니다.
#[derive(Debug, Default)]
pub struct S3General;

impl Scenario for S3General {
    fn kind(&self) -> ScenarioKind {
        ScenarioKind::S3General
    }

    fn entry_flags(&self) -> &'static [Flag] {
        &[Flag::S3]
    }

    fn on_in_g3(&mut self, ctx: &mut ScenarioContext) -> HandlerResult {
        Ok(ctx.forbidden(Event::InG3, self.kind()))
    }

    fn on_in_s5(&mut self, ctx: &mut ScenarioContext) -> HandlerResult {
        Ok(ctx.forbidden(Event::InS5, self.kind()))
    }

    fn on_in_s4(&mut self, ctx: &mut ScenarioContext) -> HandlerResult {
        Ok(ctx.forbidden(Event::InS4, self.kind()))
    }

    fn on_in_s3(&mut self, ctx: &mut ScenarioContext) -> HandlerResult {
        if let Some(verdict) = ctx.start_new_cycle() {
            return Ok(Some(verdict));
        }
        ctx.dc_on_to_s0(PowerState::S3)?;
        ctx.arm(&[Flag::PowerDetect, Flag::S0]);
        Ok(None)
    }

    fn on_in_os(&mut self, ctx: &mut ScenarioContext) -> HandlerResult {
        ctx.idle_in_os();
        ctx.run_os_diagnostics();
        let timeout = ctx.settings().power_transition_timeout;
        ctx.arm(&[Flag::PowerDetect, Flag::S3]);
        ctx.os().sleep(timeout)?;
        Ok(None)
    }

    fn on_in_uefi(&mut self, ctx: &mut ScenarioContext) -> HandlerResult {
        Ok(ctx.forbidden(Event::InUefi, self.kind()))
    }
}
