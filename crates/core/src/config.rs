//! 설정 관리: dpmo.toml 파싱 및 런타임 설정
//!
//! [`DpmoConfig`]는 실행 전체의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`DPMO_CYCLE_TARGET_CYCLES=20` 형식)
//! 3. 설정 파일 (`dpmo.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # fn example() -> Result<(), dpmo_core::error::DpmoError> {
//! use dpmo_core::config::DpmoConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = DpmoConfig::load("dpmo.toml")?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = DpmoConfig::parse("[cycle]\ntarget_cycles = 5")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, DpmoError};
use crate::types::{BootTarget, PowerState, ScenarioKind};

/// 전원 옵저버 최대 샘플 간격 (ms)
pub const MAX_POWER_POLL_INTERVAL_MS: u64 = 500;

/// 모든 시간 설정의 상한 (초, 7일)
///
/// 옵저버 스레드의 `Instant + Duration` 계산이 넘치지 않는 범위입니다.
pub const MAX_DURATION_SECS: u64 = 7 * 24 * 60 * 60;

/// DPMO 통합 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DpmoConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 사이클 설정
    #[serde(default)]
    pub cycle: CycleConfig,
    /// 정책 설정
    #[serde(default)]
    pub policy: PolicyConfig,
    /// 옵저버 설정
    #[serde(default)]
    pub observer: ObserverConfig,
    /// 드라이버 설정
    #[serde(default)]
    pub driver: DriverConfig,
    /// 진단 설정
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,
    /// 메트릭 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl DpmoConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    ///
    /// 설정 로딩 순서:
    /// 1. TOML 파일 파싱
    /// 2. 환경변수 오버라이드 적용
    /// 3. 유효성 검증
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DpmoError> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드, 검증 없음).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, DpmoError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                DpmoError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                DpmoError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, DpmoError> {
        toml::from_str(toml_str).map_err(|e| {
            DpmoError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `DPMO_{SECTION}_{FIELD}`
    /// 예: `DPMO_CYCLE_SCENARIO=S5General`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "DPMO_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "DPMO_GENERAL_LOG_FORMAT");
        override_string(&mut self.general.report_path, "DPMO_GENERAL_REPORT_PATH");
        override_string(
            &mut self.general.firmware_log_dir,
            "DPMO_GENERAL_FIRMWARE_LOG_DIR",
        );

        // Cycle
        override_parsed(&mut self.cycle.scenario, "DPMO_CYCLE_SCENARIO");
        override_u32(&mut self.cycle.target_cycles, "DPMO_CYCLE_TARGET_CYCLES");
        override_parsed(&mut self.cycle.boot_target, "DPMO_CYCLE_BOOT_TARGET");
        override_u64(
            &mut self.cycle.cycle_timeout_secs,
            "DPMO_CYCLE_CYCLE_TIMEOUT_SECS",
        );
        override_u64(
            &mut self.cycle.power_transition_timeout_secs,
            "DPMO_CYCLE_POWER_TRANSITION_TIMEOUT_SECS",
        );
        override_u64(
            &mut self.cycle.ac_off_to_g3_idle_secs,
            "DPMO_CYCLE_AC_OFF_TO_G3_IDLE_SECS",
        );
        override_u64(&mut self.cycle.os_idle_secs, "DPMO_CYCLE_OS_IDLE_SECS");

        // Policy
        override_bool(&mut self.policy.stop_on_timeout, "DPMO_POLICY_STOP_ON_TIMEOUT");
        override_bool(&mut self.policy.fail_safe, "DPMO_POLICY_FAIL_SAFE");
        override_bool(
            &mut self.policy.stop_on_auto_sleep,
            "DPMO_POLICY_STOP_ON_AUTO_SLEEP",
        );
        override_bool(
            &mut self.policy.stop_on_auto_hibernate,
            "DPMO_POLICY_STOP_ON_AUTO_HIBERNATE",
        );
        override_bool(
            &mut self.policy.stop_on_auto_shutdown,
            "DPMO_POLICY_STOP_ON_AUTO_SHUTDOWN",
        );
        override_bool(
            &mut self.policy.stop_on_auto_reset_s3,
            "DPMO_POLICY_STOP_ON_AUTO_RESET_S3",
        );
        override_bool(
            &mut self.policy.stop_on_auto_reset_s4,
            "DPMO_POLICY_STOP_ON_AUTO_RESET_S4",
        );
        override_bool(
            &mut self.policy.stop_on_auto_reset_s5,
            "DPMO_POLICY_STOP_ON_AUTO_RESET_S5",
        );

        // Observer
        override_u64(
            &mut self.observer.power_poll_interval_ms,
            "DPMO_OBSERVER_POWER_POLL_INTERVAL_MS",
        );
        override_f64(&mut self.observer.debounce_secs, "DPMO_OBSERVER_DEBOUNCE_SECS");
        override_u64(
            &mut self.observer.probe_window_secs,
            "DPMO_OBSERVER_PROBE_WINDOW_SECS",
        );
        override_u64(
            &mut self.observer.probe_interval_ms,
            "DPMO_OBSERVER_PROBE_INTERVAL_MS",
        );
        override_u64(
            &mut self.observer.stop_timeout_secs,
            "DPMO_OBSERVER_STOP_TIMEOUT_SECS",
        );
        override_u32(
            &mut self.observer.stop_max_attempts,
            "DPMO_OBSERVER_STOP_MAX_ATTEMPTS",
        );

        // Driver
        override_string(&mut self.driver.kind, "DPMO_DRIVER_KIND");
        override_string(&mut self.driver.shell, "DPMO_DRIVER_SHELL");

        // Metrics
        override_bool(&mut self.metrics.enabled, "DPMO_METRICS_ENABLED");
        override_string(&mut self.metrics.listen_addr, "DPMO_METRICS_LISTEN_ADDR");
        override_u16(&mut self.metrics.port, "DPMO_METRICS_PORT");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), DpmoError> {
        // log_level 검증
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        // log_format 검증
        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        if self.cycle.target_cycles == 0 {
            return Err(invalid("cycle.target_cycles", "must be greater than 0"));
        }

        if self.cycle.scenario == ScenarioKind::S3General
            && self.cycle.boot_target == BootTarget::Uefi
        {
            return Err(invalid(
                "cycle.boot_target",
                "S3General requires boot target 'os' (the firmware shell cannot suspend)",
            ));
        }

        if self.observer.power_poll_interval_ms == 0
            || self.observer.power_poll_interval_ms > MAX_POWER_POLL_INTERVAL_MS
        {
            return Err(invalid(
                "observer.power_poll_interval_ms",
                format!("must be 1-{MAX_POWER_POLL_INTERVAL_MS}"),
            ));
        }

        if !self.observer.debounce_secs.is_finite() || self.observer.debounce_secs < 0.0 {
            return Err(invalid(
                "observer.debounce_secs",
                "must be a non-negative number",
            ));
        }
        if self.observer.debounce_secs > MAX_DURATION_SECS as f64 {
            return Err(invalid(
                "observer.debounce_secs",
                format!("must be at most {MAX_DURATION_SECS}"),
            ));
        }

        // 시간 상한 검증
        let durations_secs = [
            ("cycle.cycle_timeout_secs", self.cycle.cycle_timeout_secs),
            (
                "cycle.power_transition_timeout_secs",
                self.cycle.power_transition_timeout_secs,
            ),
            (
                "cycle.ac_off_to_g3_idle_secs",
                self.cycle.ac_off_to_g3_idle_secs,
            ),
            ("cycle.os_idle_secs", self.cycle.os_idle_secs),
            ("observer.probe_window_secs", self.observer.probe_window_secs),
            ("observer.stop_timeout_secs", self.observer.stop_timeout_secs),
        ];
        for (field, secs) in durations_secs {
            if secs > MAX_DURATION_SECS {
                return Err(invalid(field, format!("must be at most {MAX_DURATION_SECS}")));
            }
        }
        let durations_ms = [
            ("observer.probe_interval_ms", self.observer.probe_interval_ms),
            ("driver.wait_poll_interval_ms", self.driver.wait_poll_interval_ms),
        ];
        for (field, ms) in durations_ms {
            if ms > MAX_DURATION_SECS * 1000 {
                return Err(invalid(
                    field,
                    format!("must be at most {}", MAX_DURATION_SECS * 1000),
                ));
            }
        }

        if self.observer.probe_interval_ms == 0 {
            return Err(invalid("observer.probe_interval_ms", "must be greater than 0"));
        }

        if self.observer.stop_timeout_secs == 0 {
            return Err(invalid("observer.stop_timeout_secs", "must be greater than 0"));
        }

        if self.observer.stop_max_attempts == 0 {
            return Err(invalid("observer.stop_max_attempts", "must be greater than 0"));
        }

        // driver 검증
        let valid_kinds = ["command", "simulated"];
        if !valid_kinds.contains(&self.driver.kind.as_str()) {
            return Err(invalid(
                "driver.kind",
                format!("must be one of: {}", valid_kinds.join(", ")),
            ));
        }

        if self.driver.kind == "command" && self.driver.commands.power_state.trim().is_empty() {
            return Err(invalid(
                "driver.commands.power_state",
                "must not be empty when driver.kind is 'command'",
            ));
        }

        if !matches!(
            self.driver.simulated.ac_on_state,
            PowerState::S0 | PowerState::S5
        ) {
            return Err(invalid("driver.simulated.ac_on_state", "must be S0 or S5"));
        }

        for (i, check) in self.diagnostics.checks.iter().enumerate() {
            if check.name.trim().is_empty() || check.command.trim().is_empty() {
                return Err(invalid(
                    &format!("diagnostics.checks[{i}]"),
                    "name and command must not be empty",
                ));
            }
        }

        if self.metrics.enabled && self.metrics.port == 0 {
            return Err(invalid("metrics.port", "must be greater than 0"));
        }

        Ok(())
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> DpmoError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason: reason.into(),
    }
    .into()
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
    /// 진단 결과 리포트 파일 경로 (비어 있으면 로그로만 출력)
    pub report_path: String,
    /// 사이클별 펌웨어 로그 저장 디렉토리 (비어 있으면 저장하지 않음)
    pub firmware_log_dir: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
            report_path: String::new(),
            firmware_log_dir: String::new(),
        }
    }
}

/// 사이클 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CycleConfig {
    /// 실행할 시나리오 변형
    pub scenario: ScenarioKind,
    /// 목표 사이클 수
    pub target_cycles: u32,
    /// 부팅 대상 (os, uefi)
    pub boot_target: BootTarget,
    /// 사이클당 최대 소요 시간 (초, 0이면 감시 안 함)
    pub cycle_timeout_secs: u64,
    /// 전원 전환 대기 최대 시간 (초)
    pub power_transition_timeout_secs: u64,
    /// AC off 후 G3에서 대기하는 시간 (초)
    pub ac_off_to_g3_idle_secs: u64,
    /// OS/UEFI 도달 후 다음 동작 전 대기 시간 (초)
    pub os_idle_secs: u64,
}

impl CycleConfig {
    /// 사이클 제한 시간
    pub fn cycle_timeout(&self) -> Duration {
        Duration::from_secs(self.cycle_timeout_secs)
    }

    /// 전원 전환 대기 시간
    pub fn power_transition_timeout(&self) -> Duration {
        Duration::from_secs(self.power_transition_timeout_secs)
    }
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            scenario: ScenarioKind::G3General,
            target_cycles: 10,
            boot_target: BootTarget::Os,
            cycle_timeout_secs: 1800,
            power_transition_timeout_secs: 300,
            ac_off_to_g3_idle_secs: 10,
            os_idle_secs: 30,
        }
    }
}

/// 정책 설정
///
/// 타임아웃과 요청하지 않은 전환(auto 이벤트)에 대한 중단/복구 정책입니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// 타임아웃 시 실패 처리
    pub stop_on_timeout: bool,
    /// 타임아웃 시 AC off/on으로 강제 복구 (stop_on_timeout이 false일 때)
    pub fail_safe: bool,
    /// AUTO_SLEEP 시 실패 처리
    pub stop_on_auto_sleep: bool,
    /// AUTO_HIBERNATE 시 실패 처리
    pub stop_on_auto_hibernate: bool,
    /// AUTO_SHUTDOWN 시 실패 처리
    pub stop_on_auto_shutdown: bool,
    /// AUTO_RESET_S3 시 실패 처리
    pub stop_on_auto_reset_s3: bool,
    /// AUTO_RESET_S4 시 실패 처리
    pub stop_on_auto_reset_s4: bool,
    /// AUTO_RESET_S5 시 실패 처리
    pub stop_on_auto_reset_s5: bool,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            stop_on_timeout: true,
            fail_safe: false,
            stop_on_auto_sleep: true,
            stop_on_auto_hibernate: true,
            stop_on_auto_shutdown: true,
            stop_on_auto_reset_s3: true,
            stop_on_auto_reset_s4: true,
            stop_on_auto_reset_s5: true,
        }
    }
}

/// 옵저버 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObserverConfig {
    /// 전원 상태 샘플 간격 (ms, 1-500)
    pub power_poll_interval_ms: u64,
    /// 상태 안정 판정 시간 (초)
    pub debounce_secs: f64,
    /// OS/펌웨어 프로브 재시도 창 (초)
    pub probe_window_secs: u64,
    /// 프로브 간격 (ms)
    pub probe_interval_ms: u64,
    /// 옵저버 종료 대기 시간 (시도당, 초)
    pub stop_timeout_secs: u64,
    /// 옵저버 종료 최대 시도 횟수
    pub stop_max_attempts: u32,
}

impl ObserverConfig {
    /// 전원 상태 샘플 간격
    pub fn power_poll_interval(&self) -> Duration {
        Duration::from_millis(self.power_poll_interval_ms)
    }

    /// 상태 안정 판정 시간
    pub fn debounce(&self) -> Duration {
        Duration::from_secs_f64(self.debounce_secs.max(0.0))
    }

    /// 프로브 재시도 창
    pub fn probe_window(&self) -> Duration {
        Duration::from_secs(self.probe_window_secs)
    }

    /// 프로브 간격
    pub fn probe_interval(&self) -> Duration {
        Duration::from_millis(self.probe_interval_ms)
    }

    /// 시도당 종료 대기 시간
    pub fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_timeout_secs)
    }
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            power_poll_interval_ms: MAX_POWER_POLL_INTERVAL_MS,
            debounce_secs: 3.0,
            probe_window_secs: 60,
            probe_interval_ms: 1000,
            stop_timeout_secs: 60,
            stop_max_attempts: 3,
        }
    }
}

/// 드라이버 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// 드라이버 종류 (command, simulated)
    pub kind: String,
    /// 명령 실행 셸
    pub shell: String,
    /// `wait_for_power` 폴링 간격 (ms)
    pub wait_poll_interval_ms: u64,
    /// 명령 드라이버 설정
    pub commands: CommandSet,
    /// 시뮬레이터 설정
    pub simulated: SimulatedConfig,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            kind: "command".to_owned(),
            shell: "sh".to_owned(),
            wait_poll_interval_ms: 1000,
            commands: CommandSet::default(),
            simulated: SimulatedConfig::default(),
        }
    }
}

/// 외부 명령 집합
///
/// 각 항목은 셸 명령 문자열입니다. 비어 있는 항목은 지원하지 않는 동작으로 취급됩니다.
/// `firmware_exec`의 `{cmd}`와 `firmware_save_log`의 `{path}`는 실행 시 치환됩니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandSet {
    /// 전원 상태를 표준 출력으로 내보내는 명령 (G3/S5/S4/S3/S0)
    pub power_state: String,
    pub ac_on: String,
    pub ac_off: String,
    pub dc_on: String,
    pub dc_off: String,
    /// 종료 코드 0이면 OS 도달
    pub os_probe: String,
    pub os_shutdown: String,
    pub os_reset: String,
    pub os_sleep: String,
    pub os_hibernate: String,
    pub os_boot_to_os: String,
    /// 종료 코드 0이면 펌웨어 셸 도달
    pub firmware_probe: String,
    pub firmware_shutdown: String,
    pub firmware_reset: String,
    pub firmware_exec: String,
    pub firmware_boot_to_firmware: String,
    pub firmware_save_log: String,
}

/// 시뮬레이터 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatedConfig {
    /// S0 진입 후 OS/펌웨어가 응답하기까지의 시간 (ms)
    pub boot_delay_ms: u64,
    /// G3에서 AC on 시 도달하는 상태 (S0, S5)
    pub ac_on_state: PowerState,
    /// 웜 리셋이 S5를 거쳐 S0로 돌아오는지 여부
    pub reset_via_s5: bool,
}

impl Default for SimulatedConfig {
    fn default() -> Self {
        Self {
            boot_delay_ms: 2000,
            ac_on_state: PowerState::S0,
            reset_via_s5: false,
        }
    }
}

/// 진단 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// OS에서 사이클마다 실행할 진단 명령
    pub checks: Vec<CheckConfig>,
    /// 펌웨어 셸에서 사이클마다 실행할 명령
    pub firmware_commands: Vec<String>,
}

/// 진단 명령 하나
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckConfig {
    /// 리포트에 표시될 이름
    pub name: String,
    /// 실행할 셸 명령 (종료 코드 0 = 통과)
    pub command: String,
}

/// 메트릭 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Prometheus 엔드포인트 활성화 여부
    pub enabled: bool,
    /// 바인딩 주소
    pub listen_addr: String,
    /// 포트
    pub port: u16,
    /// 엔드포인트 경로
    pub endpoint: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1".to_owned(),
            port: 9100,
            endpoint: "/metrics".to_owned(),
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_u16(target: &mut u16, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u16>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u16 from env var, ignoring"
            ),
        }
    }
}

fn override_u32(target: &mut u32, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u32>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u32 from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

fn override_f64(target: &mut f64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<f64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse f64 from env var, ignoring"
            ),
        }
    }
}

fn override_parsed<T: FromStr>(target: &mut T, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<T>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse value from env var, ignoring"
            ),
        }
    }
}
