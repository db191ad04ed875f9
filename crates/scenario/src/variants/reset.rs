//! 웜 리셋 변형: 전원을 끊지 않고 OS/펌웨어에서 재시작합니다.

use dpmo_core::event::Event;
use dpmo_core::types::ScenarioKind;
use dpmo_observer::Flag;

use crate::context::ScenarioContext;
use crate::scenario::{HandlerResult, Scenario};

/// OS/UEFI → 대기 → 사이클 시작 → 진단 → 리셋 → OS/UEFI
///
/// 전원 상태가 S0를 벗어나면 실패입니다.
#[derive(Debug, Default)]
pub struct ResetGeneral;

impl Scenario for ResetGeneral {
    fn kind(&self) -> ScenarioKind {
        ScenarioKind::ResetGeneral
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
        Ok(ctx.forbidden(Event::InS3, self.kind()))
    }

    fn on_in_os(&mut self, ctx: &mut ScenarioContext) -> HandlerResult {
        ctx.idle_in_os();
        if let Some(verdict) = ctx.start_new_cycle() {
            return Ok(Some(verdict));
        }
        ctx.run_os_diagnostics();
        ctx.os().reset()?;
        ctx.arm(&[Flag::OsDetect, Flag::PowerDetect, Flag::S0]);
        Ok(None)
    }

    fn on_in_uefi(&mut self, ctx: &mut ScenarioContext) -> HandlerResult {
        ctx.idle_in_os();
        if let Some(verdict) = ctx.start_new_cycle() {
            return Ok(Some(verdict));
        }
        ctx.run_firmware_checks();
        ctx.firmware().reset()?;
        ctx.arm(&[Flag::UefiDetect, Flag::PowerDetect, Flag::S0]);
        Ok(None)
    }
}

/// OS → 대기 → 사이클 시작 → 진단 → 부팅 순서를 펌웨어로 → 리셋
///   → UEFI → 부팅 순서를 OS로 → 리셋 → OS
///
/// 한 사이클은 OS에서 시작하여 펌웨어 셸을 한 번 거쳐 OS로 돌아옵니다.
#[derive(Debug, Default)]
pub struct ResetUefi2Os;

impl Scenario for ResetUefi2Os {
    fn kind(&self) -> ScenarioKind {
        ScenarioKind::ResetUefi2Os
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
        Ok(ctx.forbidden(Event::InS3, self.kind()))
    }

    fn on_in_os(&mut self, ctx: &mut ScenarioContext) -> HandlerResult {
        ctx.idle_in_os();
        if let Some(verdict) = ctx.start_new_cycle() {
            return Ok(Some(verdict));
        }
        ctx.run_os_diagnostics();
        ctx.firmware().set_boot_order_to_firmware()?;
        ctx.os().reset()?;
        ctx.arm(&[Flag::UefiDetect]);
        Ok(None)
    }

    fn on_in_uefi(&mut self, ctx: &mut ScenarioContext) -> HandlerResult {
        ctx.idle_in_os();
        ctx.os().set_boot_order_to_os()?;
        ctx.firmware().reset()?;
        ctx.arm(&[Flag::OsDetect, Flag::PowerDetect, Flag::S0]);
        Ok(None)
    }
}
