//! 테스트용 목 협력자
//!
//! 모든 목은 수행한 동작을 하나의 공유 로그에 기록하여,
//! 핸들러가 어떤 순서로 무엇을 호출했는지 검증할 수 있게 합니다.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use dpmo_core::config::{DpmoConfig, PolicyConfig};
use dpmo_core::control::{DiagnosticHook, FirmwareControl, OsControl, PowerControl, ReportSink};
use dpmo_core::error::ControlError;
use dpmo_core::types::{BootTarget, CheckRecord, PowerState, RunSummary};
use dpmo_observer::{ArmingFlags, CycleClock, Flag};

use crate::context::{ScenarioContext, ScenarioSettings};

/// 공유 동작 로그
#[derive(Debug, Clone, Default)]
pub struct ActionLog(Arc<Mutex<Vec<String>>>);

impl ActionLog {
    pub fn push(&self, action: impl Into<String>) {
        self.0.lock().unwrap().push(action.into());
    }

    pub fn actions(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }

    pub fn is_empty(&self) -> bool {
        self.0.lock().unwrap().is_empty()
    }
}

/// 요청 시점에 무장돼 있던 플래그 기록
#[derive(Debug, Clone, Default)]
pub struct ArmedAtRequest(Arc<Mutex<Vec<(String, Vec<Flag>)>>>);

impl ArmedAtRequest {
    fn record(&self, action: &str, flags: &ArmingFlags) {
        self.0.lock().unwrap().push((action.to_owned(), flags.armed()));
    }

    /// `action`이 마지막으로 요청될 때 무장돼 있던 플래그
    pub fn get(&self, action: &str) -> Option<Vec<Flag>> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(a, _)| a == action)
            .map(|(_, flags)| flags.clone())
    }
}

/// 전원 목: 동작에 따라 상태가 즉시 바뀝니다.
pub struct MockPower {
    state: Mutex<PowerState>,
    ac_on_state: PowerState,
    log: ActionLog,
    fail_action: Option<&'static str>,
    stuck: bool,
}

impl MockPower {
    pub fn new(log: &ActionLog) -> Self {
        Self {
            state: Mutex::new(PowerState::G3),
            ac_on_state: PowerState::S0,
            log: log.clone(),
            fail_action: None,
            stuck: false,
        }
    }

    pub fn with_state(self, state: PowerState) -> Self {
        *self.state.lock().unwrap() = state;
        self
    }

    pub fn with_ac_on_state(mut self, state: PowerState) -> Self {
        self.ac_on_state = state;
        self
    }

    /// 지정한 동작이 드라이버 에러를 반환하게 합니다.
    pub fn with_failing(mut self, action: &'static str) -> Self {
        self.fail_action = Some(action);
        self
    }

    /// 동작을 받아도 상태가 바뀌지 않게 합니다.
    pub fn stuck(mut self) -> Self {
        self.stuck = true;
        self
    }

    pub fn state(&self) -> PowerState {
        *self.state.lock().unwrap()
    }

    pub fn set_state(&self, state: PowerState) {
        *self.state.lock().unwrap() = state;
    }

    fn act(&self, action: &'static str, next: PowerState) -> Result<(), ControlError> {
        self.log.push(action);
        if self.fail_action == Some(action) {
            return Err(ControlError::CommandFailed {
                action: action.to_owned(),
                reason: "relay not responding".to_owned(),
            });
        }
        if !self.stuck {
            self.set_state(next);
        }
        Ok(())
    }
}

impl PowerControl for MockPower {
    fn power_state(&self) -> Result<PowerState, ControlError> {
        Ok(self.state())
    }
    fn ac_on(&self) -> Result<(), ControlError> {
        self.act("ac_on", self.ac_on_state)
    }
    fn ac_off(&self) -> Result<(), ControlError> {
        self.act("ac_off", PowerState::G3)
    }
    fn dc_on(&self) -> Result<(), ControlError> {
        self.act("dc_on", PowerState::S0)
    }
    fn dc_off(&self) -> Result<(), ControlError> {
        self.act("dc_off", PowerState::S5)
    }
    fn wait_for_power(&self, state: PowerState, _timeout: Duration) -> Result<bool, ControlError> {
        Ok(self.state() == state)
    }
}

/// OS 목
pub struct MockOs {
    log: ActionLog,
    power: Option<Arc<MockPower>>,
    watch: Option<(Arc<ArmingFlags>, ArmedAtRequest)>,
}

impl MockOs {
    pub fn new(log: &ActionLog) -> Self {
        Self {
            log: log.clone(),
            power: None,
            watch: None,
        }
    }

    /// 저전력 요청마다 그 시점의 플래그를 기록합니다.
    pub fn watching(mut self, flags: &Arc<ArmingFlags>, record: &ArmedAtRequest) -> Self {
        self.watch = Some((Arc::clone(flags), record.clone()));
        self
    }

    fn request(&self, action: &str, state: PowerState) {
        if let Some((flags, record)) = &self.watch {
            record.record(action, flags);
        }
        self.log.push(action);
        self.enter(state);
    }

    /// shutdown/sleep 시 전원 목의 상태도 함께 바꿉니다.
    pub fn driving(mut self, power: &Arc<MockPower>) -> Self {
        self.power = Some(Arc::clone(power));
        self
    }

    fn enter(&self, state: PowerState) {
        if let Some(power) = &self.power {
            power.set_state(state);
        }
    }
}

impl OsControl for MockOs {
    fn is_in_os(&self) -> bool {
        true
    }
    fn shutdown(&self, _: Duration) -> Result<(), ControlError> {
        self.request("os.shutdown", PowerState::S5);
        Ok(())
    }
    fn reset(&self) -> Result<(), ControlError> {
        self.log.push("os.reset");
        Ok(())
    }
    fn sleep(&self, _: Duration) -> Result<(), ControlError> {
        self.request("os.sleep", PowerState::S3);
        Ok(())
    }
    fn hibernate(&self, _: Duration) -> Result<(), ControlError> {
        self.request("os.hibernate", PowerState::S4);
        Ok(())
    }
    fn set_boot_order_to_os(&self) -> Result<(), ControlError> {
        self.log.push("os.set_boot_order_to_os");
        Ok(())
    }
}

/// 펌웨어 목
pub struct MockFirmware {
    log: ActionLog,
    failing_command: Option<String>,
    saved_logs: Mutex<Vec<PathBuf>>,
}

impl MockFirmware {
    pub fn new(log: &ActionLog) -> Self {
        Self {
            log: log.clone(),
            failing_command: None,
            saved_logs: Mutex::new(Vec::new()),
        }
    }

    pub fn with_failing_command(mut self, command: &str) -> Self {
        self.failing_command = Some(command.to_owned());
        self
    }

    pub fn saved_logs(&self) -> Vec<PathBuf> {
        self.saved_logs.lock().unwrap().clone()
    }
}

impl FirmwareControl for MockFirmware {
    fn is_in_firmware_shell(&self) -> bool {
        true
    }
    fn shutdown(&self, _: Duration) -> Result<(), ControlError> {
        self.log.push("fw.shutdown");
        Ok(())
    }
    fn reset(&self) -> Result<(), ControlError> {
        self.log.push("fw.reset");
        Ok(())
    }
    fn execute_shell_command(&self, command: &str) -> Result<String, ControlError> {
        self.log.push(format!("fw.exec {command}"));
        if self.failing_command.as_deref() == Some(command) {
            return Err(ControlError::CommandFailed {
                action: command.to_owned(),
                reason: "exit status 1".to_owned(),
            });
        }
        Ok(String::new())
    }
    fn set_boot_order_to_firmware(&self) -> Result<(), ControlError> {
        self.log.push("fw.set_boot_order_to_firmware");
        Ok(())
    }
    fn save_log(&self, path: &Path) -> Result<(), ControlError> {
        self.saved_logs.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }
}

/// 결과가 고정된 진단 목
pub struct MockCheck {
    name: &'static str,
    outcome: Result<bool, &'static str>,
}

impl MockCheck {
    pub fn passing(name: &'static str) -> Self {
        Self {
            name,
            outcome: Ok(true),
        }
    }

    pub fn failing(name: &'static str) -> Self {
        Self {
            name,
            outcome: Ok(false),
        }
    }

    pub fn broken(name: &'static str) -> Self {
        Self {
            name,
            outcome: Err("ssh: connection refused"),
        }
    }
}

impl DiagnosticHook for MockCheck {
    fn name(&self) -> &str {
        self.name
    }
    fn check(&self, _cycle: u32) -> Result<bool, ControlError> {
        self.outcome
            .map_err(|reason| ControlError::Driver(reason.to_owned()))
    }
}

/// 기록을 메모리에 보관하는 리포트
#[derive(Default)]
pub struct MemoryReport {
    records: Mutex<Vec<CheckRecord>>,
    summaries: Mutex<Vec<RunSummary>>,
}

impl MemoryReport {
    pub fn records(&self) -> Vec<CheckRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn summaries(&self) -> Vec<RunSummary> {
        self.summaries.lock().unwrap().clone()
    }
}

impl ReportSink for MemoryReport {
    fn record(&self, record: CheckRecord) {
        self.records.lock().unwrap().push(record);
    }
    fn finish(&self, summary: &RunSummary) -> Result<(), ControlError> {
        self.summaries.lock().unwrap().push(summary.clone());
        Ok(())
    }
}

/// 대기 시간이 없는 테스트용 설정
pub fn fast_settings(target_cycles: u32) -> ScenarioSettings {
    let mut config = DpmoConfig::default();
    config.cycle.target_cycles = target_cycles;
    config.cycle.os_idle_secs = 0;
    config.cycle.ac_off_to_g3_idle_secs = 0;
    ScenarioSettings::from_config(&config)
}

/// 모든 auto 이벤트를 복구하도록 설정된 정책
pub fn lenient_policy() -> PolicyConfig {
    PolicyConfig {
        stop_on_timeout: false,
        fail_safe: false,
        stop_on_auto_sleep: false,
        stop_on_auto_hibernate: false,
        stop_on_auto_shutdown: false,
        stop_on_auto_reset_s3: false,
        stop_on_auto_reset_s4: false,
        stop_on_auto_reset_s5: false,
    }
}

/// 목 협력자 묶음
pub struct Harness {
    pub log: ActionLog,
    pub power: Arc<MockPower>,
    pub firmware: Arc<MockFirmware>,
    pub report: Arc<MemoryReport>,
    pub flags: Arc<ArmingFlags>,
    pub clock: Arc<CycleClock>,
    pub armed_at_request: ArmedAtRequest,
}

impl Harness {
    pub fn new(initial: PowerState) -> Self {
        let log = ActionLog::default();
        Self {
            power: Arc::new(MockPower::new(&log).with_state(initial)),
            firmware: Arc::new(MockFirmware::new(&log)),
            report: Arc::new(MemoryReport::default()),
            flags: Arc::new(ArmingFlags::new()),
            clock: Arc::new(CycleClock::new()),
            armed_at_request: ArmedAtRequest::default(),
            log,
        }
    }

    pub fn with_power(mut self, power: MockPower) -> Self {
        self.power = Arc::new(power);
        self
    }

    pub fn with_firmware(mut self, firmware: MockFirmware) -> Self {
        self.firmware = Arc::new(firmware);
        self
    }

    pub fn context(&self, settings: ScenarioSettings) -> ScenarioContext {
        self.context_with_checks(settings, Vec::new())
    }

    pub fn context_with_checks(
        &self,
        settings: ScenarioSettings,
        checks: Vec<Arc<dyn DiagnosticHook>>,
    ) -> ScenarioContext {
        let mut builder = ScenarioContext::builder()
            .power(self.power.clone())
            .os(Arc::new(
                MockOs::new(&self.log)
                    .driving(&self.power)
                    .watching(&self.flags, &self.armed_at_request),
            ))
            .firmware(self.firmware.clone())
            .report(self.report.clone())
            .flags(Arc::clone(&self.flags))
            .clock(Arc::clone(&self.clock))
            .settings(settings);
        for check in checks {
            builder = builder.diagnostic(check);
        }
        builder.build().unwrap()
    }
}

/// UEFI 부팅 대상 설정
pub fn uefi_settings(target_cycles: u32) -> ScenarioSettings {
    let mut settings = fast_settings(target_cycles);
    settings.boot_target = BootTarget::Uefi;
    settings
}
