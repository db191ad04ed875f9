//! 에러 타입: 도메인별 에러 정의

use crate::types::PowerState;

/// DPMO 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum DpmoError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 옵저버 스레드 에러
    #[error("observer error: {0}")]
    Observer(#[from] ObserverError),

    /// 시나리오 실행 에러
    #[error("scenario error: {0}")]
    Scenario(#[from] ScenarioError),

    /// 외부 제어 드라이버 에러
    #[error("control error: {0}")]
    Control(#[from] ControlError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 옵저버 에러
///
/// `UnknownPowerState`와 `Fault`는 실행을 즉시 중단시키는 치명적 에러입니다.
#[derive(Debug, thiserror::Error)]
pub enum ObserverError {
    /// 전원 상태를 판별할 수 없음 (치명적)
    #[error("power status could not be determined (raw state: {state})")]
    UnknownPowerState {
        /// 드라이버가 보고한 원시 상태
        state: PowerState,
    },

    /// 옵저버가 큐로 보고한 치명적 장애
    #[error("observer '{observer}' faulted: {reason}")]
    Fault {
        /// 옵저버 이름
        observer: String,
        /// 장애 사유
        reason: String,
    },

    /// 스레드 생성 실패
    #[error("failed to spawn observer '{observer}': {reason}")]
    Spawn { observer: String, reason: String },

    /// 이미 실행 중
    #[error("observer '{0}' is already running")]
    AlreadyRunning(String),

    /// 제한된 재시도 후에도 스레드가 종료되지 않음
    #[error("observer '{observer}' did not stop after {attempts} attempts")]
    StopTimeout { observer: String, attempts: u32 },

    /// 스레드가 패닉으로 종료됨
    #[error("observer '{0}' panicked")]
    Panicked(String),

    /// 모든 생산자가 사라져 큐가 닫힘
    #[error("event queue closed")]
    QueueClosed,
}

/// 외부 협력자(전원/OS/펌웨어 드라이버) 에러
#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    /// 외부 명령 실행 실패
    #[error("command '{action}' failed: {reason}")]
    CommandFailed {
        /// 수행하려던 동작 이름 (예: `ac_off`)
        action: String,
        /// 실패 사유
        reason: String,
    },

    /// 드라이버가 해당 동작을 지원하지 않음
    #[error("action '{0}' is not supported by this driver")]
    Unsupported(String),

    /// 드라이버 내부 에러
    #[error("driver error: {0}")]
    Driver(String),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 시나리오 에러
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    /// 알 수 없는 시나리오 이름
    #[error("unknown scenario variant: {0}")]
    UnknownVariant(String),

    /// 시나리오 구성 누락/오류
    #[error("scenario build failed for '{field}': {reason}")]
    Build { field: String, reason: String },

    /// 핸들러 내 제어 동작 실패
    #[error("handler for {event} failed: {source}")]
    Handler {
        /// 처리 중이던 이벤트 태그
        event: String,
        /// 원인 에러
        #[source]
        source: ControlError,
    },
}
