//! 옵저버 스레드: 수명 주기, 재시도 제한 종료, 순서 있는 레지스트리
//!
//! 옵저버마다 이름 있는 OS 스레드 하나에서 `poll → sleep(poll_interval)`을
//! 반복하며, 종료 요청을 받거나 `poll`이 치명적 에러를 반환하면 멈춥니다.
//! 치명적 에러는 이벤트 큐에 장애로 보고됩니다.
//!
//! # 수명 주기
//!
//! ```text
//! Registered → start_all() → Running → stop() → Stopped
//!                               │
//!                               └─ fatal poll error → Faulted
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use dpmo_core::error::ObserverError;
use dpmo_core::event::EventSender;
use dpmo_core::metrics as m;
use tracing::{debug, error, info, warn};

/// 중단 가능한 대기와 종료 확인의 단위
const STOP_POLL_SLICE: Duration = Duration::from_millis(10);

/// 옵저버 루프 한 번의 본체
pub trait Observer: Send + 'static {
    /// 스레드 이름, 로그, 메트릭에 쓰이는 짧은 이름
    fn name(&self) -> &'static str;

    /// 두 `poll` 호출 사이의 간격
    fn poll_interval(&self) -> Duration;

    /// 관찰 단계 하나를 수행합니다.
    ///
    /// 오래 걸리는 단계는 `stop`을 확인하고, 설정되면 일찍 반환해야 합니다.
    ///
    /// # Errors
    ///
    /// 모든 에러는 치명적입니다. 루프가 끝나고 에러는 이벤트 큐에 장애로 보고됩니다.
    fn poll(&mut self, stop: &StopSignal) -> Result<(), ObserverError>;
}

/// 옵저버 스레드와 핸들이 공유하는 협력적 종료 플래그
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    flag: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// `duration` 동안 짧은 단위로 나누어 잠듭니다.
    ///
    /// 시간이 다 지나기 전에 신호가 설정되면 `false`를 반환합니다.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.is_set() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            std::thread::sleep(STOP_POLL_SLICE.min(deadline - now));
        }
    }
}

/// 옵저버 스레드 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserverState {
    Running,
    Stopped,
    /// 종료를 요청했지만 스레드가 끝나지 않아 분리된 채 남겨짐
    Detached,
}

impl fmt::Display for ObserverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Stopped => write!(f, "stopped"),
            Self::Detached => write!(f, "detached"),
        }
    }
}

/// 실행 중인 옵저버 스레드 핸들
pub struct ObserverHandle {
    name: &'static str,
    stop: StopSignal,
    thread: Option<JoinHandle<()>>,
    state: ObserverState,
}

impl ObserverHandle {
    /// `observer`를 `dpmo-<name>` 이름의 전용 스레드에서 실행합니다.
    ///
    /// # Errors
    ///
    /// OS가 스레드 생성을 거부하면 `ObserverError::Spawn`
    pub fn spawn(
        mut observer: Box<dyn Observer>,
        events: EventSender,
    ) -> Result<Self, ObserverError> {
        let name = observer.name();
        let stop = StopSignal::new();
        let thread_stop = stop.clone();

        let thread = std::thread::Builder::new()
            .name(format!("dpmo-{name}"))
            .spawn(move || run_loop(observer.as_mut(), &thread_stop, &events))
            .map_err(|e| ObserverError::Spawn {
                observer: name.to_owned(),
                reason: e.to_string(),
            })?;

        info!(observer = name, "observer started");
        Ok(Self {
            name,
            stop,
            thread: Some(thread),
            state: ObserverState::Running,
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn state(&self) -> ObserverState {
        self.state
    }

    /// 스레드가 살아 있는 동안 `true`
    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// 스레드에 종료를 요청하고 join합니다.
    ///
    /// 시도마다 최대 `timeout`을 기다리며 `max_attempts`번까지 재시도합니다.
    /// 스레드를 강제로 죽이지 않으며, 마지막 시도 후에는 스레드를 분리된 채
    /// 두고 `StopTimeout`을 보고합니다.
    ///
    /// 이미 종료된 핸들에 대한 `stop`은 아무 일도 하지 않습니다.
    ///
    /// # Errors
    ///
    /// - 모든 시도 후에도 스레드가 살아 있으면 `ObserverError::StopTimeout`
    /// - 스레드가 패닉으로 끝났으면 `ObserverError::Panicked`
    pub fn stop(&mut self, timeout: Duration, max_attempts: u32) -> Result<(), ObserverError> {
        let Some(thread) = self.thread.take() else {
            return Ok(());
        };
        self.stop.set();

        let attempts = max_attempts.max(1);
        for attempt in 1..=attempts {
            if wait_finished(&thread, timeout) {
                self.state = ObserverState::Stopped;
                return match thread.join() {
                    Ok(()) => {
                        info!(observer = self.name, attempt, "observer stopped");
                        Ok(())
                    }
                    Err(_) => Err(ObserverError::Panicked(self.name.to_owned())),
                };
            }
            warn!(
                observer = self.name,
                attempt,
                max_attempts = attempts,
                timeout_ms = timeout.as_millis() as u64,
                "observer did not stop in time, retrying"
            );
        }

        error!(
            observer = self.name,
            attempts, "observer failed to stop, leaving thread detached"
        );
        self.state = ObserverState::Detached;
        Err(ObserverError::StopTimeout {
            observer: self.name.to_owned(),
            attempts,
        })
    }
}

impl fmt::Debug for ObserverHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverHandle")
            .field("name", &self.name)
            .field("state", &self.state)
            .finish()
    }
}

fn wait_finished(thread: &JoinHandle<()>, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while !thread.is_finished() {
        let now = Instant::now();
        if now >= deadline {
            return false;
        }
        std::thread::sleep(STOP_POLL_SLICE.min(deadline - now));
    }
    true
}

fn run_loop(observer: &mut dyn Observer, stop: &StopSignal, events: &EventSender) {
    let name = observer.name();
    let interval = observer.poll_interval();
    debug!(
        observer = name,
        interval_ms = interval.as_millis() as u64,
        "observer loop entered"
    );

    while !stop.is_set() {
        if let Err(e) = observer.poll(stop) {
            error!(observer = name, error = %e, "observer fault, leaving loop");
            metrics::counter!(m::OBSERVER_FAULTS_TOTAL, m::LABEL_OBSERVER => name).increment(1);
            events.fault(name, e.to_string());
            return;
        }
        if !stop.sleep(interval) {
            break;
        }
    }

    debug!(observer = name, "observer loop exited");
}

/// 옵저버 레지스트리: 한 묶음으로 시작하고 종료합니다.
///
/// 옵저버는 등록 순서대로 시작하고 같은 순서로 종료합니다
/// (다음에 기대하는 이벤트의 생산자가 먼저).
pub struct ObserverRegistry {
    pending: Vec<Box<dyn Observer>>,
    running: Vec<ObserverHandle>,
    stop_timeout: Duration,
    stop_max_attempts: u32,
}

impl ObserverRegistry {
    pub fn new(stop_timeout: Duration, stop_max_attempts: u32) -> Self {
        Self {
            pending: Vec::new(),
            running: Vec::new(),
            stop_timeout,
            stop_max_attempts,
        }
    }

    /// [`start_all`](Self::start_all)에서 시작할 옵저버를 등록합니다.
    pub fn register(&mut self, observer: Box<dyn Observer>) {
        self.pending.push(observer);
    }

    /// 등록된 모든 옵저버를 실행합니다.
    ///
    /// 실패하면 이미 시작한 옵저버를 다시 종료한 뒤 에러를 반환합니다.
    ///
    /// # Errors
    ///
    /// 두 번 호출하면 `AlreadyRunning`, 그 외에는 스레드 생성 에러
    pub fn start_all(&mut self, events: &EventSender) -> Result<(), ObserverError> {
        if !self.running.is_empty() {
            return Err(ObserverError::AlreadyRunning("registry".to_owned()));
        }

        for observer in std::mem::take(&mut self.pending) {
            match ObserverHandle::spawn(observer, events.clone()) {
                Ok(handle) => self.running.push(handle),
                Err(e) => {
                    warn!(error = %e, "observer startup failed, rolling back");
                    for stop_err in self.stop_all() {
                        error!(error = %stop_err, "rollback stop failed");
                    }
                    return Err(e);
                }
            }
        }
        info!(observers = self.running.len(), "all observers started");
        Ok(())
    }

    /// 실행 중인 모든 옵저버를 종료하며, 실패해도 계속 진행합니다.
    ///
    /// 깨끗하게 종료되지 않은 옵저버의 에러를 반환합니다.
    pub fn stop_all(&mut self) -> Vec<ObserverError> {
        let mut errors = Vec::new();
        for handle in &mut self.running {
            if let Err(e) = handle.stop(self.stop_timeout, self.stop_max_attempts) {
                error!(observer = handle.name(), error = %e, "failed to stop observer");
                errors.push(e);
            }
        }
        errors
    }

    /// 시작 여부와 무관하게 등록된 옵저버 수
    pub fn count(&self) -> usize {
        self.pending.len() + self.running.len()
    }

    /// 시작한 옵저버 각각의 현재 상태 (시작 순서)
    pub fn states(&self) -> Vec<(&'static str, ObserverState)> {
        self.running.iter().map(|h| (h.name(), h.state())).collect()
    }
}
