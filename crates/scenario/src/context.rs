//! 시나리오 컨텍스트: 협력자, 플래그, 사이클 카운터, 전원 전환 헬퍼
//!
//! 변형 핸들러는 모두 [`ScenarioContext`]를 통해서만 외부 세계를 조작합니다.
//! 컨텍스트는 디스패치 스레드가 단독으로 소유하며, 옵저버와는
//! [`ArmingFlags`]와 [`CycleClock`]만 공유합니다.
//!
//! # 전원 전환 헬퍼
//! 각 헬퍼는 (1) 현재 상태가 기대한 시작 상태인지 확인하고
//! (2) 동작을 수행한 뒤 (3) 목표 상태를 `power_transition_timeout` 동안 기다립니다.
//! 시작 상태 불일치와 대기 시간 초과는 경고 후 `Ok(false)`로 끝나며,
//! 멈춘 사이클은 사이클 타임아웃이 잡아냅니다.
//! 드라이버 에러는 `Err`로 전파되어 실행 전체를 중단시킵니다.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use dpmo_core::config::{DpmoConfig, PolicyConfig};
use dpmo_core::control::{
    DiagnosticHook, FirmwareControl, NullReport, OsControl, PowerControl, ReportSink,
};
use dpmo_core::error::{ControlError, ScenarioError};
use dpmo_core::event::Event;
use dpmo_core::metrics as m;
use dpmo_core::types::{BootTarget, CheckRecord, CycleCounter, PowerState, ScenarioKind, Verdict};
use dpmo_observer::{ArmingFlags, CycleClock, Flag};

/// 핸들러가 사용하는 실행 설정
#[derive(Debug, Clone)]
pub struct ScenarioSettings {
    /// 부팅 대상
    pub boot_target: BootTarget,
    /// 목표 사이클 수
    pub target_cycles: u32,
    /// 전원 전환 대기 최대 시간
    pub power_transition_timeout: Duration,
    /// AC off 후 G3 대기 시간
    pub ac_off_to_g3_idle: Duration,
    /// OS/UEFI 도달 후 대기 시간
    pub os_idle: Duration,
    /// 사이클별 펌웨어 로그 디렉토리
    pub firmware_log_dir: Option<PathBuf>,
    /// 펌웨어 셸 진단 명령
    pub firmware_commands: Vec<String>,
    /// 타임아웃/auto 이벤트 정책
    pub policy: PolicyConfig,
}

impl ScenarioSettings {
    /// 전체 설정에서 시나리오 설정을 추출합니다.
    pub fn from_config(config: &DpmoConfig) -> Self {
        let log_dir = config.general.firmware_log_dir.trim();
        Self {
            boot_target: config.cycle.boot_target,
            target_cycles: config.cycle.target_cycles,
            power_transition_timeout: config.cycle.power_transition_timeout(),
            ac_off_to_g3_idle: Duration::from_secs(config.cycle.ac_off_to_g3_idle_secs),
            os_idle: Duration::from_secs(config.cycle.os_idle_secs),
            firmware_log_dir: (!log_dir.is_empty()).then(|| PathBuf::from(log_dir)),
            firmware_commands: config.diagnostics.firmware_commands.clone(),
            policy: config.policy.clone(),
        }
    }
}

impl Default for ScenarioSettings {
    fn default() -> Self {
        Self::from_config(&DpmoConfig::default())
    }
}

#[derive(Debug, Clone, Copy)]
enum PowerAction {
    AcOn,
    AcOff,
    DcOn,
    DcOff,
}

impl PowerAction {
    fn as_str(self) -> &'static str {
        match self {
            Self::AcOn => "ac_on",
            Self::AcOff => "ac_off",
            Self::DcOn => "dc_on",
            Self::DcOff => "dc_off",
        }
    }

    fn issue(self, power: &dyn PowerControl) -> Result<(), ControlError> {
        match self {
            Self::AcOn => power.ac_on(),
            Self::AcOff => power.ac_off(),
            Self::DcOn => power.dc_on(),
            Self::DcOff => power.dc_off(),
        }
    }
}

/// 시나리오 실행 컨텍스트
pub struct ScenarioContext {
    power: Arc<dyn PowerControl>,
    os: Arc<dyn OsControl>,
    firmware: Arc<dyn FirmwareControl>,
    diagnostics: Vec<Arc<dyn DiagnosticHook>>,
    report: Arc<dyn ReportSink>,
    flags: Arc<ArmingFlags>,
    clock: Arc<CycleClock>,
    counter: CycleCounter,
    settings: ScenarioSettings,
    failure: Option<String>,
}

impl ScenarioContext {
    pub fn builder() -> ScenarioContextBuilder {
        ScenarioContextBuilder::new()
    }

    pub fn os(&self) -> &dyn OsControl {
        self.os.as_ref()
    }

    pub fn firmware(&self) -> &dyn FirmwareControl {
        self.firmware.as_ref()
    }

    pub fn flags(&self) -> &ArmingFlags {
        &self.flags
    }

    pub fn counter(&self) -> CycleCounter {
        self.counter
    }

    pub fn settings(&self) -> &ScenarioSettings {
        &self.settings
    }

    pub fn policy(&self) -> &PolicyConfig {
        &self.settings.policy
    }

    pub fn boot_target(&self) -> BootTarget {
        self.settings.boot_target
    }

    /// 마지막 FAIL 판정의 사유
    pub fn failure_reason(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    // --- 플래그 ---

    /// 여러 플래그를 한 번에 켭니다.
    pub fn arm(&self, flags: &[Flag]) {
        for flag in flags {
            self.flags.arm(*flag);
        }
        debug!(armed = ?self.flags, "flags armed");
    }

    /// 부팅 대상에 맞는 도달 프로브(`os_detect` / `uefi_detect`)를 켭니다.
    pub fn arm_boot_probe(&self) {
        let flag = match self.settings.boot_target {
            BootTarget::Os => Flag::OsDetect,
            BootTarget::Uefi => Flag::UefiDetect,
        };
        self.arm(&[flag]);
    }

    /// 타임아웃 복구용 일회성 프로브(`os_init` / `uefi_init`)를 켭니다.
    pub fn arm_boot_recovery(&self) {
        let flag = match self.settings.boot_target {
            BootTarget::Os => Flag::OsInit,
            BootTarget::Uefi => Flag::UefiInit,
        };
        self.arm(&[flag]);
    }

    // --- 판정 ---

    /// FAIL 판정을 기록하고 반환합니다.
    pub fn fail(&mut self, reason: impl Into<String>) -> Option<Verdict> {
        let reason = reason.into();
        error!(cycle = self.counter.current(), reason = %reason, "TEST FAIL");
        self.failure = Some(reason);
        Some(Verdict::Fail)
    }

    /// 변형이 허용하지 않는 이벤트에 대한 FAIL
    pub fn forbidden(&mut self, event: Event, kind: ScenarioKind) -> Option<Verdict> {
        self.fail(format!("{event} is not allowed in {kind}"))
    }

    /// 새 사이클을 시작합니다.
    ///
    /// 이미 목표에 도달했다면 아무 동작 없이 PASS를 반환합니다.
    pub fn start_new_cycle(&mut self) -> Option<Verdict> {
        let Some(cycle) = self.counter.advance() else {
            info!(cycles = self.counter.target(), "TEST PASS: target cycles reached");
            return Some(Verdict::Pass);
        };

        info!(cycle, target = self.counter.target(), "IN CYCLE");
        if let Some(previous) = self.clock.restart() {
            metrics::histogram!(m::CYCLE_DURATION_SECONDS).record(previous.as_secs_f64());
        }
        self.flags.arm(Flag::CycleWatchdog);
        metrics::counter!(m::CYCLES_STARTED_TOTAL).increment(1);
        metrics::gauge!(m::CYCLE_CURRENT).set(f64::from(cycle));

        self.capture_firmware_log(cycle);
        None
    }

    fn capture_firmware_log(&self, cycle: u32) {
        let Some(dir) = &self.settings.firmware_log_dir else {
            return;
        };
        if let Err(e) = std::fs::create_dir_all(dir) {
            warn!(dir = %dir.display(), error = %e, "cannot create firmware log directory");
            return;
        }
        let path = dir.join(format!("firmware_{cycle}.log"));
        match self.firmware.save_log(&path) {
            Ok(()) => debug!(cycle, path = %path.display(), "firmware log saved"),
            Err(e) => warn!(cycle, error = %e, "firmware log capture failed"),
        }
    }

    // --- 대기 / 진단 ---

    /// 디스패치 스레드를 `duration` 동안 멈춥니다.
    pub fn idle(&self, duration: Duration) {
        if duration.is_zero() {
            return;
        }
        debug!(secs = duration.as_secs_f64(), "idle");
        std::thread::sleep(duration);
    }

    /// OS 도달 후 대기 시간만큼 멈춥니다.
    pub fn idle_in_os(&self) {
        self.idle(self.settings.os_idle);
    }

    /// AC off 후 G3 대기 시간만큼 멈춥니다.
    pub fn idle_in_g3(&self) {
        self.idle(self.settings.ac_off_to_g3_idle);
    }

    /// 현재 사이클에 대해 모든 OS 진단을 실행하고 결과를 리포트합니다.
    ///
    /// 진단 결과는 시나리오 진행에 영향을 주지 않습니다.
    pub fn run_os_diagnostics(&self) {
        let cycle = self.counter.current();
        for hook in &self.diagnostics {
            let passed = match hook.check(cycle) {
                Ok(passed) => passed,
                Err(e) => {
                    warn!(cycle, checker = hook.name(), error = %e, "diagnostic could not run");
                    false
                }
            };
            self.record(cycle, hook.name().to_owned(), passed);
        }
    }

    /// 현재 사이클에 대해 펌웨어 셸 진단 명령을 실행하고 결과를 리포트합니다.
    pub fn run_firmware_checks(&self) {
        let cycle = self.counter.current();
        for command in &self.settings.firmware_commands {
            let passed = match self.firmware.execute_shell_command(command) {
                Ok(output) => {
                    debug!(cycle, command = %command, bytes = output.len(), "firmware command done");
                    true
                }
                Err(e) => {
                    warn!(cycle, command = %command, error = %e, "firmware command failed");
                    false
                }
            };
            self.record(cycle, format!("firmware:{command}"), passed);
        }
    }

    fn record(&self, cycle: u32, checker: String, passed: bool) {
        let result = if passed { "pass" } else { "fail" };
        metrics::counter!(m::DIAGNOSTICS_TOTAL, m::LABEL_RESULT => result).increment(1);
        info!(cycle, checker = %checker, result, "diagnostic result");
        self.report.record(CheckRecord {
            cycle,
            checker,
            passed,
        });
    }

    // --- 전원 전환 ---

    fn transition(
        &self,
        action: PowerAction,
        from: Option<PowerState>,
        to: PowerState,
    ) -> Result<bool, ControlError> {
        if let Some(expected) = from {
            let current = self.power.power_state()?;
            if current != expected {
                warn!(
                    action = action.as_str(),
                    expected = %expected,
                    current = %current,
                    "unexpected power state, skipping transition"
                );
                metrics::counter!(
                    m::POWER_TRANSITIONS_TOTAL,
                    m::LABEL_ACTION => action.as_str(),
                    m::LABEL_RESULT => "skipped"
                )
                .increment(1);
                return Ok(false);
            }
        }

        info!(action = action.as_str(), target = %to, "power transition");
        action.issue(self.power.as_ref())?;
        let reached = self
            .power
            .wait_for_power(to, self.settings.power_transition_timeout)?;

        let result = if reached { "ok" } else { "timeout" };
        metrics::counter!(
            m::POWER_TRANSITIONS_TOTAL,
            m::LABEL_ACTION => action.as_str(),
            m::LABEL_RESULT => result
        )
        .increment(1);
        if !reached {
            warn!(
                action = action.as_str(),
                target = %to,
                timeout_secs = self.settings.power_transition_timeout.as_secs(),
                "power transition did not complete in time"
            );
        }
        Ok(reached)
    }

    /// G3에서 AC on, S0까지 대기
    pub fn ac_on_from_g3_to_s0(&self) -> Result<bool, ControlError> {
        self.transition(PowerAction::AcOn, Some(PowerState::G3), PowerState::S0)
    }

    /// G3에서 AC on, S5까지 대기
    pub fn ac_on_from_g3_to_s5(&self) -> Result<bool, ControlError> {
        self.transition(PowerAction::AcOn, Some(PowerState::G3), PowerState::S5)
    }

    /// S5에서 AC off, G3까지 대기
    pub fn ac_off_from_s5_to_g3(&self) -> Result<bool, ControlError> {
        self.transition(PowerAction::AcOff, Some(PowerState::S5), PowerState::G3)
    }

    /// S0에서 AC off (surprise), G3까지 대기
    pub fn ac_off_from_s0_to_g3(&self) -> Result<bool, ControlError> {
        self.transition(PowerAction::AcOff, Some(PowerState::S0), PowerState::G3)
    }

    /// S3/S4/S5에서 DC on, S0까지 대기
    pub fn dc_on_to_s0(&self, from: PowerState) -> Result<bool, ControlError> {
        self.transition(PowerAction::DcOn, Some(from), PowerState::S0)
    }

    /// S0에서 DC off, S5까지 대기
    pub fn dc_off_from_s0_to_s5(&self) -> Result<bool, ControlError> {
        self.transition(PowerAction::DcOff, Some(PowerState::S0), PowerState::S5)
    }

    /// 상태 확인 없이 AC off, G3까지 대기
    pub fn ac_off(&self) -> Result<bool, ControlError> {
        self.transition(PowerAction::AcOff, None, PowerState::G3)
    }

    /// 상태 확인 없이 AC on, S0까지 대기
    pub fn ac_on(&self) -> Result<bool, ControlError> {
        self.transition(PowerAction::AcOn, None, PowerState::S0)
    }
}

/// 시나리오 컨텍스트 빌더
///
/// 전원/OS/펌웨어 협력자는 필수이며, 나머지는 기본값을 사용합니다.
pub struct ScenarioContextBuilder {
    power: Option<Arc<dyn PowerControl>>,
    os: Option<Arc<dyn OsControl>>,
    firmware: Option<Arc<dyn FirmwareControl>>,
    diagnostics: Vec<Arc<dyn DiagnosticHook>>,
    report: Option<Arc<dyn ReportSink>>,
    flags: Option<Arc<ArmingFlags>>,
    clock: Option<Arc<CycleClock>>,
    settings: ScenarioSettings,
}

impl ScenarioContextBuilder {
    pub fn new() -> Self {
        Self {
            power: None,
            os: None,
            firmware: None,
            diagnostics: Vec::new(),
            report: None,
            flags: None,
            clock: None,
            settings: ScenarioSettings::default(),
        }
    }

    pub fn power(mut self, power: Arc<dyn PowerControl>) -> Self {
        self.power = Some(power);
        self
    }

    pub fn os(mut self, os: Arc<dyn OsControl>) -> Self {
        self.os = Some(os);
        self
    }

    pub fn firmware(mut self, firmware: Arc<dyn FirmwareControl>) -> Self {
        self.firmware = Some(firmware);
        self
    }

    /// OS 진단을 추가합니다. 추가한 순서대로 실행됩니다.
    pub fn diagnostic(mut self, hook: Arc<dyn DiagnosticHook>) -> Self {
        self.diagnostics.push(hook);
        self
    }

    /// 리포트 싱크 (기본값: [`NullReport`])
    pub fn report(mut self, report: Arc<dyn ReportSink>) -> Self {
        self.report = Some(report);
        self
    }

    /// 옵저버와 공유할 플래그 (기본값: 모두 꺼진 새 집합)
    pub fn flags(mut self, flags: Arc<ArmingFlags>) -> Self {
        self.flags = Some(flags);
        self
    }

    /// 타임아웃 감시와 공유할 사이클 시계
    pub fn clock(mut self, clock: Arc<CycleClock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn settings(mut self, settings: ScenarioSettings) -> Self {
        self.settings = settings;
        self
    }

    /// 컨텍스트를 빌드합니다.
    ///
    /// # Errors
    ///
    /// 필수 협력자가 빠졌거나 목표 사이클이 0이면 `ScenarioError::Build`.
    pub fn build(self) -> Result<ScenarioContext, ScenarioError> {
        fn required<T>(value: Option<T>, field: &str) -> Result<T, ScenarioError> {
            value.ok_or_else(|| ScenarioError::Build {
                field: field.to_owned(),
                reason: "must be provided".to_owned(),
            })
        }

        if self.settings.target_cycles == 0 {
            return Err(ScenarioError::Build {
                field: "target_cycles".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        Ok(ScenarioContext {
            power: required(self.power, "power")?,
            os: required(self.os, "os")?,
            firmware: required(self.firmware, "firmware")?,
            diagnostics: self.diagnostics,
            report: self.report.unwrap_or_else(|| Arc::new(NullReport)),
            flags: self.flags.unwrap_or_default(),
            clock: self.clock.unwrap_or_default(),
            counter: CycleCounter::new(self.settings.target_cycles),
            settings: self.settings,
            failure: None,
        })
    }
}

impl Default for ScenarioContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}
