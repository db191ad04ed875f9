//! 전원 상태 옵저버: 디바운스, 분류, 리셋 에지 감지
//!
//! 원시 전원 상태를 고정 간격으로 샘플링하여 연속 신호를 이산 이벤트로 바꿉니다.
//!
//! - **안정 상태**: `power_detect`가 무장된 동안 디바운스 시간보다 오래 유지된
//!   상태는, 시나리오가 요청한 경우 `IN_S3/S4/S5/G3`, 아니면
//!   `AUTO_SLEEP/HIBERNATE/SHUTDOWN`이 됩니다.
//! - **S0 복귀 에지**: S3/S4/S5 진입 시 일회성 래치가 세워지고, 래치가 선 채로
//!   S0를 다시 보면 `AUTO_RESET_S3/S4/S5`가 됩니다.
//!
//! `IN_S0`는 `power_detect`와 무관하게 `s0`가 무장돼 있고 샘플이 S0이면 발생합니다.
//!
//! 알고리즘 전체는 [`PowerStateObserver::step`]에 있으며 샘플 시각을 인자로
//! 받으므로 결정적으로 구동할 수 있습니다.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dpmo_core::control::PowerControl;
use dpmo_core::error::ObserverError;
use dpmo_core::event::{Event, EventSender};
use dpmo_core::metrics as m;
use dpmo_core::types::PowerState;
use tracing::{debug, info, warn};

use crate::flags::{ArmingFlags, Flag};
use crate::worker::{Observer, StopSignal};

/// 마지막으로 관찰한 상태와 처음 관찰한 시각
///
/// 전원 옵저버가 소유하며, 감지가 해제될 때마다 비워집니다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DebounceRecord {
    pub last_state: Option<PowerState>,
    pub last_change: Option<Instant>,
}

impl DebounceRecord {
    fn reset(&mut self) {
        *self = Self::default();
    }

    fn held_for(&self, now: Instant) -> Option<Duration> {
        self.last_change.map(|since| now.saturating_duration_since(since))
    }
}

/// S3/S4/S5 → S0 에지용 일회성 "그 상태에 있었음" 래치
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct ResetLatches {
    s3: bool,
    s4: bool,
    s5: bool,
}

pub struct PowerStateObserver {
    power: Arc<dyn PowerControl>,
    flags: Arc<ArmingFlags>,
    events: EventSender,
    debounce: Duration,
    poll_interval: Duration,
    record: DebounceRecord,
    latches: ResetLatches,
    last_sample: Option<PowerState>,
}

impl PowerStateObserver {
    pub fn new(
        power: Arc<dyn PowerControl>,
        flags: Arc<ArmingFlags>,
        events: EventSender,
        debounce: Duration,
        poll_interval: Duration,
    ) -> Self {
        Self {
            power,
            flags,
            events,
            debounce,
            poll_interval,
            record: DebounceRecord::default(),
            latches: ResetLatches::default(),
            last_sample: None,
        }
    }

    /// 현재 디바운스 기록
    pub fn record(&self) -> DebounceRecord {
        self.record
    }

    /// `now`에 얻은 원시 샘플 하나를 처리하고 발생한 이벤트를 반환합니다.
    ///
    /// 무장 플래그는 여기서 소비되며, 반환된 이벤트를 큐에 넣는 것은 호출자의 몫입니다.
    ///
    /// # Errors
    ///
    /// `Unknown` 샘플이면 플래그와 무관하게 `ObserverError::UnknownPowerState`
    pub fn step(&mut self, state: PowerState, now: Instant) -> Result<Vec<Event>, ObserverError> {
        let mut emitted = Vec::new();

        if state == PowerState::S0 && self.flags.take(Flag::S0) {
            emitted.push(Event::InS0);
        }

        if state == PowerState::Unknown {
            return Err(ObserverError::UnknownPowerState { state });
        }

        if !self.flags.is_armed(Flag::PowerDetect) {
            self.latches = ResetLatches::default();
            self.record.reset();
            return Ok(emitted);
        }

        if self.record.last_state == Some(state) {
            let settled = self
                .record
                .held_for(now)
                .is_some_and(|held| held > self.debounce);
            if settled {
                if let Some(event) = self.settle(state) {
                    emitted.push(event);
                }
            }
        } else {
            if let Some(event) = self.track_edge(state) {
                emitted.push(event);
            }
            self.record = DebounceRecord {
                last_state: Some(state),
                last_change: Some(now),
            };
        }

        Ok(emitted)
    }

    /// 디바운스 시간을 넘겨 유지된 상태를 분류합니다.
    fn settle(&mut self, state: PowerState) -> Option<Event> {
        let (wait_flag, expected, auto) = match state {
            PowerState::S3 => (Flag::S3, Event::InS3, Event::AutoSleep),
            PowerState::S4 => (Flag::S4, Event::InS4, Event::AutoHibernate),
            PowerState::S5 => (Flag::S5, Event::InS5, Event::AutoShutdown),
            PowerState::G3 => {
                self.disarm_detection();
                return Some(Event::InG3);
            }
            PowerState::S0 | PowerState::Unknown => return None,
        };

        self.disarm_detection();
        if self.flags.take(wait_flag) {
            Some(expected)
        } else {
            Some(auto)
        }
    }

    /// 안정된 저전력 상태는 예상된 정지이므로, 이후의 S0 복귀는 자발적 리셋이 아닙니다.
    fn disarm_detection(&mut self) {
        self.flags.disarm(Flag::PowerDetect);
        self.latches = ResetLatches::default();
        self.record.reset();
    }

    /// 상태 변화에 맞춰 리셋 래치를 갱신합니다.
    fn track_edge(&mut self, state: PowerState) -> Option<Event> {
        match state {
            PowerState::S5 => self.latches.s5 = true,
            PowerState::S3 => self.latches.s3 = true,
            PowerState::S4 => self.latches.s4 = true,
            PowerState::S0 => {
                if std::mem::take(&mut self.latches.s5) {
                    return Some(Event::AutoResetS5);
                }
                if std::mem::take(&mut self.latches.s3) {
                    return Some(Event::AutoResetS3);
                }
                if std::mem::take(&mut self.latches.s4) {
                    return Some(Event::AutoResetS4);
                }
            }
            PowerState::G3 | PowerState::Unknown => {}
        }
        None
    }
}

impl Observer for PowerStateObserver {
    fn name(&self) -> &'static str {
        "power"
    }

    fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    fn poll(&mut self, _stop: &StopSignal) -> Result<(), ObserverError> {
        let state = match self.power.power_state() {
            Ok(state) => state,
            Err(e) => {
                metrics::counter!(m::POWER_SAMPLE_ERRORS_TOTAL).increment(1);
                warn!(error = %e, "power status read failed, retrying next poll");
                return Ok(());
            }
        };
        metrics::counter!(m::POWER_SAMPLES_TOTAL).increment(1);

        if self.last_sample != Some(state) {
            debug!(state = %state, previous = ?self.last_sample, "power state changed");
            self.last_sample = Some(state);
        }

        for event in self.step(state, Instant::now())? {
            info!(event = %event, state = %state, "power event");
            self.events.put(event);
        }
        Ok(())
    }
}
