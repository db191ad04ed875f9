//! 시나리오 엔진: 이벤트를 변형 핸들러로 전달하고 판정을 돌려줍니다.

use tracing::{debug, info};

use dpmo_core::error::ScenarioError;
use dpmo_core::event::Event;
use dpmo_core::types::{CycleCounter, ScenarioKind, Verdict};

use crate::context::ScenarioContext;
use crate::scenario::Scenario;
use crate::variants;

/// 변형 하나와 그 실행 컨텍스트
pub struct ScenarioEngine {
    scenario: Box<dyn Scenario>,
    ctx: ScenarioContext,
    events_handled: u64,
}

impl ScenarioEngine {
    pub fn new(scenario: Box<dyn Scenario>, ctx: ScenarioContext) -> Self {
        Self {
            scenario,
            ctx,
            events_handled: 0,
        }
    }

    pub fn from_kind(kind: ScenarioKind, ctx: ScenarioContext) -> Self {
        Self::new(variants::create(kind), ctx)
    }

    pub fn kind(&self) -> ScenarioKind {
        self.scenario.kind()
    }

    pub fn context(&self) -> &ScenarioContext {
        &self.ctx
    }

    pub fn counter(&self) -> CycleCounter {
        self.ctx.counter()
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.ctx.failure_reason()
    }

    pub fn events_handled(&self) -> u64 {
        self.events_handled
    }

    /// 변형의 시작 상태 플래그를 무장합니다. 옵저버 시작 전에 한 번 호출합니다.
    pub fn arm_entry(&self) {
        self.ctx.arm(self.scenario.entry_flags());
    }

    /// 이벤트 하나를 처리합니다.
    ///
    /// `Ok(None)`이면 실행이 계속되고, `Ok(Some(_))`이면 실행이 끝납니다.
    ///
    /// # Errors
    ///
    /// 핸들러 안에서 제어 동작이 실패하면 `ScenarioError::Handler`.
    pub fn handle(&mut self, event: Event) -> Result<Option<Verdict>, ScenarioError> {
        self.events_handled += 1;
        debug!(
            event = %event,
            cycle = self.ctx.counter().current(),
            scenario = %self.scenario.kind(),
            "dispatching event"
        );

        let verdict = self
            .scenario
            .handle(event, &mut self.ctx)
            .map_err(|source| ScenarioError::Handler {
                event: event.as_str().to_owned(),
                source,
            })?;

        if let Some(verdict) = verdict {
            info!(
                verdict = %verdict,
                event = %event,
                cycles = %self.ctx.counter(),
                "scenario finished"
            );
        }
        Ok(verdict)
    }
}
