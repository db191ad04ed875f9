//! 부팅 도달 프로브: OS / 펌웨어 셸 감지
//!
//! `*_detect` 또는 `*_init` 플래그가 켜져 있는 동안 `probe_interval` 간격으로
//! 대상에 도달했는지 확인합니다. 한 번의 프로브 창(`probe_window`) 안에서
//! 도달하면 `IN_OS` / `IN_UEFI`를 한 번 내고 두 플래그를 모두 끕니다.
//! 창이 끝날 때까지 도달하지 못하면 아무 이벤트도 내지 않고 플래그를 유지하여,
//! 다음 폴링에서 새 창을 엽니다.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dpmo_core::control::{FirmwareControl, OsControl};
use dpmo_core::error::ObserverError;
use dpmo_core::event::{Event, EventSender};
use dpmo_core::metrics as m;
use tracing::{debug, info, warn};

use crate::flags::{ArmingFlags, Flag};
use crate::worker::{Observer, StopSignal};

/// 프로브 대상
#[derive(Clone)]
pub enum ProbeTarget {
    /// OS 도달 (`is_in_os`)
    Os(Arc<dyn OsControl>),
    /// 펌웨어 셸 도달 (`is_in_firmware_shell`)
    Firmware(Arc<dyn FirmwareControl>),
}

impl ProbeTarget {
    fn name(&self) -> &'static str {
        match self {
            Self::Os(_) => "os",
            Self::Firmware(_) => "firmware",
        }
    }

    fn flags(&self) -> (Flag, Flag) {
        match self {
            Self::Os(_) => (Flag::OsDetect, Flag::OsInit),
            Self::Firmware(_) => (Flag::UefiDetect, Flag::UefiInit),
        }
    }

    fn event(&self) -> Event {
        match self {
            Self::Os(_) => Event::InOs,
            Self::Firmware(_) => Event::InUefi,
        }
    }

    fn probe(&self) -> bool {
        match self {
            Self::Os(os) => os.is_in_os(),
            Self::Firmware(fw) => fw.is_in_firmware_shell(),
        }
    }
}

/// 프로브 타이밍
#[derive(Debug, Clone, Copy)]
pub struct ProbeTiming {
    /// 한 번의 프로브 창 길이
    pub window: Duration,
    /// 창 안에서의 프로브 간격
    pub interval: Duration,
}

/// 부팅 도달 옵저버
pub struct BootProbeObserver {
    target: ProbeTarget,
    flags: Arc<ArmingFlags>,
    events: EventSender,
    timing: ProbeTiming,
}

impl BootProbeObserver {
    /// OS 도달 옵저버를 생성합니다.
    pub fn os(
        os: Arc<dyn OsControl>,
        flags: Arc<ArmingFlags>,
        events: EventSender,
        timing: ProbeTiming,
    ) -> Self {
        Self::new(ProbeTarget::Os(os), flags, events, timing)
    }

    /// 펌웨어 셸 도달 옵저버를 생성합니다.
    pub fn firmware(
        firmware: Arc<dyn FirmwareControl>,
        flags: Arc<ArmingFlags>,
        events: EventSender,
        timing: ProbeTiming,
    ) -> Self {
        Self::new(ProbeTarget::Firmware(firmware), flags, events, timing)
    }

    pub fn new(
        target: ProbeTarget,
        flags: Arc<ArmingFlags>,
        events: EventSender,
        timing: ProbeTiming,
    ) -> Self {
        Self {
            target,
            flags,
            events,
            timing,
        }
    }

    fn is_requested(&self) -> bool {
        let (detect, init) = self.target.flags();
        self.flags.is_armed(detect) || self.flags.is_armed(init)
    }

    /// 프로브 창 하나를 실행합니다.
    ///
    /// 도달하면 `true`를 반환합니다. 정지 신호가 오면 즉시 `false`로 끝납니다.
    pub fn run_window(&self, stop: &StopSignal) -> bool {
        let deadline = Instant::now() + self.timing.window;
        let name = self.target.name();
        let mut attempts: u32 = 0;

        loop {
            if stop.is_set() {
                return false;
            }

            attempts = attempts.saturating_add(1);
            metrics::counter!(m::PROBE_ATTEMPTS_TOTAL, m::LABEL_OBSERVER => name).increment(1);
            if self.target.probe() {
                debug!(observer = name, attempts, "boot target reached");
                return true;
            }

            if Instant::now() >= deadline {
                warn!(
                    observer = name,
                    attempts,
                    window_secs = self.timing.window.as_secs(),
                    "boot target not reached within probe window"
                );
                return false;
            }
            if !stop.sleep(self.timing.interval) {
                return false;
            }
        }
    }
}

impl Observer for BootProbeObserver {
    fn name(&self) -> &'static str {
        self.target.name()
    }

    fn poll_interval(&self) -> Duration {
        self.timing.interval
    }

    fn poll(&mut self, stop: &StopSignal) -> Result<(), ObserverError> {
        if !self.is_requested() {
            return Ok(());
        }

        if self.run_window(stop) {
            // 창이 도는 사이 디스패치 스레드가 플래그를 내렸을 수 있음
            if !self.is_requested() {
                return Ok(());
            }
            let (detect, init) = self.target.flags();
            self.flags.disarm(detect);
            self.flags.disarm(init);

            let event = self.target.event();
            info!(observer = self.target.name(), event = %event, "boot detected");
            self.events.put(event);
        }
        Ok(())
    }
}
