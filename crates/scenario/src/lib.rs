#![doc = include_str!("../README.md")]
//!
//! # 모듈 구성
//!
//! - [`context`]: 공유 실행 상태와 전원 전환 헬퍼 (`ScenarioContext`, `ScenarioSettings`)
//! - [`scenario`]: 이벤트별 핸들러 trait과 공통 복구 기본 동작 (`Scenario`)
//! - [`variants`]: 구체 시나리오 변형 8종과 팩토리
//! - [`engine`]: 활성 변형으로의 이벤트 디스패치 (`ScenarioEngine`)

pub mod context;
pub mod engine;
pub mod scenario;
pub mod variants;

#[cfg(test)]
mod testing;

// --- 주요 타입 re-export ---

// 컨텍스트
pub use context::{ScenarioContext, ScenarioContextBuilder, ScenarioSettings};

// 핸들러
pub use scenario::{HandlerResult, Scenario};

// 엔진
pub use engine::ScenarioEngine;

// 변형
pub use variants::{
    G3DcOn, G3General, G3Surprise, G3SurpriseDcOn, ResetGeneral, ResetUefi2Os, S3General,
    S5General, create, create_by_name,
};
