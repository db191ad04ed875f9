#![doc = include_str!("../README.md")]
//!
//! # 모듈 구성
//!
//! - [`flags`]: 공유 일회성 무장 플래그 (`ArmingFlags`, `Flag`)
//! - [`worker`]: 옵저버 스레드 수명 주기 (`Observer`, `ObserverHandle`, `ObserverRegistry`)
//! - [`power`]: 전원 상태 디바운스 및 분류 (`PowerStateObserver`)
//! - [`probe`]: OS / 펌웨어 부팅 감지 (`BootProbeObserver`)
//! - [`timeout`]: 사이클 워치독 (`CycleClock`, `CycleTimeoutMonitor`)
//!
//! # 아키텍처
//!
//! ```text
//!  PowerControl ──▶ PowerStateObserver ──┐
//!  OsControl    ──▶ BootProbeObserver  ──┤
//!  FirmwareCtl  ──▶ BootProbeObserver  ──┼──put──▶ EventQueue ──▶ dispatch
//!  CycleClock   ──▶ CycleTimeoutMonitor ─┘
//!                        ▲
//!                  ArmingFlags (시나리오가 무장)
//! ```

pub mod flags;
pub mod power;
pub mod probe;
pub mod timeout;
pub mod worker;

// --- 주요 타입 re-export ---

// 플래그
pub use flags::{ArmingFlags, Flag};

// 워커 수명 주기
pub use worker::{Observer, ObserverHandle, ObserverRegistry, ObserverState, StopSignal};

// 옵저버
pub use power::{DebounceRecord, PowerStateObserver};
pub use probe::{BootProbeObserver, ProbeTarget, ProbeTiming};
pub use timeout::{CycleClock, CycleTimeoutMonitor};
