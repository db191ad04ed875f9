//! 협력자 trait: 옵저버와 시나리오가 외부 세계를 다루는 유일한 경로
//!
//! 실제 드라이버와 테스트 목은 같은 trait을 구현하므로 서로 바꿔 끼울 수 있습니다.
//!
//! # 아키텍처
//!
//! ```text
//!   observers ──┐           ┌── CommandDriver (셸 명령)
//!               ├─▶ traits ─┤
//!   scenarios ──┘           └── SimulatedSut / 테스트 목
//! ```
//!
//! 모든 호출은 동기식이며 드라이버가 필요한 만큼 블록될 수 있습니다.
//! 옵저버와 디스패치 스레드는 각자 전용 OS 스레드를 가지므로 다른
//! 구성 요소를 멈추게 하지 않습니다. 블록되는 동안에도 SUT 상태는
//! 바뀔 수 있으므로, 호출자는 기다리는 상태의 플래그를 호출 전에 무장해야 합니다.

use std::path::Path;
use std::time::Duration;

use crate::error::ControlError;
use crate::types::{CheckRecord, PowerState, RunSummary};

/// 전원 릴레이와 전원 상태 조회
pub trait PowerControl: Send + Sync + 'static {
    /// SUT의 원시 전원 상태를 읽습니다.
    ///
    /// # Errors
    ///
    /// 상태를 전혀 읽을 수 없으면 `ControlError`. 읽었지만 분류할 수 없는
    /// 값은 `Ok(PowerState::Unknown)`입니다.
    fn power_state(&self) -> Result<PowerState, ControlError>;

    /// AC 전원 공급
    fn ac_on(&self) -> Result<(), ControlError>;

    /// AC 전원 차단
    fn ac_off(&self) -> Result<(), ControlError>;

    /// 전원 버튼 누름 (wake / power on)
    fn dc_on(&self) -> Result<(), ControlError>;

    /// 전원 버튼 길게 누름 (soft off)
    fn dc_off(&self) -> Result<(), ControlError>;

    /// SUT가 `state`를 보고하거나 `timeout`이 지날 때까지 기다립니다.
    ///
    /// 시간 초과는 에러가 아니라 `Ok(false)`입니다.
    fn wait_for_power(&self, state: PowerState, timeout: Duration) -> Result<bool, ControlError>;
}

/// OS 쪽 명령 실행
pub trait OsControl: Send + Sync + 'static {
    /// SUT OS에 도달 가능하면 `true`
    fn is_in_os(&self) -> bool;

    /// OS 정상 종료. 최대 `timeout`까지 블록될 수 있습니다.
    fn shutdown(&self, timeout: Duration) -> Result<(), ControlError>;

    /// OS에서 warm reset
    fn reset(&self) -> Result<(), ControlError>;

    /// S3 (suspend to RAM)
    fn sleep(&self, timeout: Duration) -> Result<(), ControlError>;

    /// S4 (suspend to disk)
    fn hibernate(&self, timeout: Duration) -> Result<(), ControlError>;

    /// 다음 부팅 대상을 OS로 설정
    fn set_boot_order_to_os(&self) -> Result<(), ControlError>;
}

/// 펌웨어(UEFI 셸) 쪽 명령 실행
pub trait FirmwareControl: Send + Sync + 'static {
    /// SUT가 펌웨어 셸 프롬프트에 있으면 `true`
    fn is_in_firmware_shell(&self) -> bool;

    /// 펌웨어 셸에서 전원 끄기
    fn shutdown(&self, timeout: Duration) -> Result<(), ControlError>;

    /// 펌웨어 셸에서 warm reset
    fn reset(&self) -> Result<(), ControlError>;

    /// 펌웨어 셸 명령을 실행하고 출력을 반환
    ///
    /// # Errors
    ///
    /// 명령을 보낼 수 없거나 0이 아닌 코드로 끝나면 `ControlError`
    fn execute_shell_command(&self, command: &str) -> Result<String, ControlError>;

    /// 다음 부팅 대상을 펌웨어 셸로 설정
    fn set_boot_order_to_firmware(&self) -> Result<(), ControlError>;

    /// 지금까지 수집된 펌웨어 시리얼 로그를 `path`에 저장
    fn save_log(&self, path: &Path) -> Result<(), ControlError>;
}

/// OS에 있는 동안 실행하는 진단 (에러/로그 수집)
///
/// 결과는 보고만 되고 시나리오의 다음 단계를 바꾸지 않습니다.
pub trait DiagnosticHook: Send + Sync + 'static {
    /// 보고서에 쓰이는 점검기 이름
    fn name(&self) -> &str;

    /// `cycle`에 대한 점검. `Ok(false)`는 점검이 문제를 찾았다는 뜻입니다.
    ///
    /// # Errors
    ///
    /// 점검을 실행할 수 없으면 `ControlError`. 호출자는 실패한 점검으로 기록합니다.
    fn check(&self, cycle: u32) -> Result<bool, ControlError>;
}

/// 사이클별 점검 결과와 최종 실행 요약의 저장소
pub trait ReportSink: Send + Sync + 'static {
    /// 점검 결과 하나를 기록
    fn record(&self, record: CheckRecord);

    /// 실행 요약을 기록하고 지금까지의 내용을 모두 내보냅니다.
    fn finish(&self, summary: &RunSummary) -> Result<(), ControlError>;
}

/// 모든 것을 버리는 보고서 싱크
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReport;

impl ReportSink for NullReport {
    fn record(&self, _record: CheckRecord) {}

    fn finish(&self, _summary: &RunSummary) -> Result<(), ControlError> {
        Ok(())
    }
}
