//! 사이클 타임아웃 워치독
//!
//! 디스패치 스레드는 새 사이클이 시작될 때마다 공유 [`CycleClock`]을 재시작하고
//! `cycle_watchdog`을 무장합니다. 모니터는 사이클이 상한을 넘기면 `TIMEOUT`을
//! 한 번만 내보내며, 다음 사이클 시작이 워치독을 다시 무장합니다.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use dpmo_core::error::ObserverError;
use dpmo_core::event::{Event, EventSender};
use dpmo_core::metrics as m;
use tracing::warn;

use crate::flags::{ArmingFlags, Flag};
use crate::worker::{Observer, StopSignal};

/// 진행 중인 사이클의 시작 시각 (시나리오와 모니터가 공유)
#[derive(Debug, Default)]
pub struct CycleClock {
    started: Mutex<Option<Instant>>,
}

impl CycleClock {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<Instant>> {
        // 오염된 락도 유효한 Instant를 담고 있음
        self.started
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// `now`를 새 사이클의 시작으로 기록합니다.
    ///
    /// 이전 사이클이 있었다면 그 진행 시간을 반환합니다.
    pub fn restart_at(&self, now: Instant) -> Option<Duration> {
        let previous = self.lock().replace(now);
        previous.map(|since| now.saturating_duration_since(since))
    }

    pub fn restart(&self) -> Option<Duration> {
        self.restart_at(Instant::now())
    }

    pub fn started_at(&self) -> Option<Instant> {
        *self.lock()
    }

    pub fn elapsed(&self) -> Option<Duration> {
        self.started_at().map(|since| since.elapsed())
    }
}

pub struct CycleTimeoutMonitor {
    clock: Arc<CycleClock>,
    flags: Arc<ArmingFlags>,
    events: EventSender,
    ceiling: Duration,
    poll_interval: Duration,
}

impl CycleTimeoutMonitor {
    /// `ceiling`이 0이면 워치독이 꺼집니다.
    pub fn new(
        clock: Arc<CycleClock>,
        flags: Arc<ArmingFlags>,
        events: EventSender,
        ceiling: Duration,
        poll_interval: Duration,
    ) -> Self {
        Self {
            clock,
            flags,
            events,
            ceiling,
            poll_interval,
        }
    }

    /// `now` 시점에 진행 중인 사이클이 상한을 넘겼으면 `TIMEOUT`을 반환합니다.
    ///
    /// `cycle_watchdog`을 소비하므로 한 사이클은 최대 한 번만 타임아웃됩니다.
    pub fn check(&self, now: Instant) -> Option<Event> {
        if self.ceiling.is_zero() || !self.flags.is_armed(Flag::CycleWatchdog) {
            return None;
        }
        let started = self.clock.started_at()?;
        let elapsed = now.saturating_duration_since(started);
        if elapsed > self.ceiling && self.flags.take(Flag::CycleWatchdog) {
            warn!(
                elapsed_secs = elapsed.as_secs(),
                ceiling_secs = self.ceiling.as_secs(),
                "cycle exceeded its time limit"
            );
            metrics::counter!(m::TIMEOUTS_TOTAL).increment(1);
            return Some(Event::Timeout);
        }
        None
    }
}

impl Observer for CycleTimeoutMonitor {
    fn name(&self) -> &'static str {
        "timeout"
    }

    fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    fn poll(&mut self, _stop: &StopSignal) -> Result<(), ObserverError> {
        if let Some(event) = self.check(Instant::now()) {
            self.events.put(event);
        }
        Ok(())
    }
}
