//! 이벤트 시스템: 심볼릭 이벤트와 공유 이벤트 큐
//!
//! 옵저버 스레드들이 [`EventSender`]로 이벤트를 넣고,
//! 디스패치 스레드 하나가 [`EventQueue::get`]으로 꺼냅니다.
//!
//! # 흐름
//! ```text
//! PowerStateObserver ────┐
//! BootProbeObserver (OS) ┤
//! BootProbeObserver (FW) ┼──▶ EventQueue ──▶ dispatch thread ──▶ Scenario
//! CycleTimeoutMonitor ───┘
//! ```
//!
//! 큐는 명시적으로 생성되어 각 옵저버와 오케스트레이터에 주입됩니다.
//! 전역 싱글턴은 없습니다.

use std::fmt;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;

use crate::error::ObserverError;
use crate::metrics as m;

/// `get_timeout` 폴링 간격
const TIMEOUT_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// 옵저버가 생성하는 이벤트 (닫힌 집합)
///
/// 태그 외의 페이로드는 없습니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    /// G3 도달
    InG3,
    /// S5 도달
    InS5,
    /// S4 도달
    InS4,
    /// S3 도달
    InS3,
    /// S0 도달
    InS0,
    /// OS 부팅 확인
    InOs,
    /// 펌웨어 셸 도달 확인
    InUefi,
    /// 요청하지 않은 S3 진입
    AutoSleep,
    /// 요청하지 않은 S4 진입
    AutoHibernate,
    /// 요청하지 않은 S5 진입
    AutoShutdown,
    /// S3를 거쳐 S0로 복귀
    AutoResetS3,
    /// S4를 거쳐 S0로 복귀
    AutoResetS4,
    /// S5를 거쳐 S0로 복귀
    AutoResetS5,
    /// 사이클 제한 시간 초과
    Timeout,
}

impl Event {
    /// 이벤트 태그 문자열
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InG3 => "IN_G3",
            Self::InS5 => "IN_S5",
            Self::InS4 => "IN_S4",
            Self::InS3 => "IN_S3",
            Self::InS0 => "IN_S0",
            Self::InOs => "IN_OS",
            Self::InUefi => "IN_UEFI",
            Self::AutoSleep => "AUTO_SLEEP",
            Self::AutoHibernate => "AUTO_HIBERNATE",
            Self::AutoShutdown => "AUTO_SHUTDOWN",
            Self::AutoResetS3 => "AUTO_RESET_S3",
            Self::AutoResetS4 => "AUTO_RESET_S4",
            Self::AutoResetS5 => "AUTO_RESET_S5",
            Self::Timeout => "TIMEOUT",
        }
    }

    /// 요청하지 않은 전환(auto) 이벤트인지 여부
    pub fn is_auto(&self) -> bool {
        matches!(
            self,
            Self::AutoSleep
                | Self::AutoHibernate
                | Self::AutoShutdown
                | Self::AutoResetS3
                | Self::AutoResetS4
                | Self::AutoResetS5
        )
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 큐 내부 항목
///
/// 치명적 옵저버 장애는 이벤트와 같은 FIFO로 전달되어
/// 디스패치 루프가 순서대로 관찰합니다.
#[derive(Debug)]
enum Envelope {
    Event(Event),
    Fault { observer: String, reason: String },
}

/// 이벤트 생산자 핸들
///
/// 복제하여 각 옵저버 스레드에 나눠줍니다. `put`은 블로킹하지 않습니다.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<Envelope>,
}

impl EventSender {
    /// 이벤트를 큐에 넣습니다.
    ///
    /// 소비자가 이미 사라진 경우(실행 종료 후)에는 조용히 버립니다.
    pub fn put(&self, event: Event) {
        metrics::counter!(m::EVENTS_EMITTED_TOTAL, m::LABEL_EVENT => event.as_str()).increment(1);
        if self.tx.send(Envelope::Event(event)).is_err() {
            tracing::debug!(event = %event, "event queue consumer gone, dropping event");
        }
    }

    /// 치명적 옵저버 장애를 보고합니다.
    pub fn fault(&self, observer: &str, reason: impl Into<String>) {
        let reason = reason.into();
        if self
            .tx
            .send(Envelope::Fault {
                observer: observer.to_owned(),
                reason,
            })
            .is_err()
        {
            tracing::debug!(observer, "event queue consumer gone, dropping fault");
        }
    }
}

/// 공유 이벤트 큐 (다중 생산자, 단일 소비자)
#[derive(Debug)]
pub struct EventQueue {
    tx: mpsc::UnboundedSender<Envelope>,
    rx: mpsc::UnboundedReceiver<Envelope>,
}

impl EventQueue {
    /// 빈 큐를 생성합니다.
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx }
    }

    /// 생산자 핸들을 반환합니다.
    pub fn sender(&self) -> EventSender {
        EventSender {
            tx: self.tx.clone(),
        }
    }

    /// 이벤트가 들어올 때까지 현재 스레드를 블로킹합니다.
    ///
    /// tokio 런타임 컨텍스트 안에서 호출하면 패닉하므로
    /// 전용 디스패치 스레드에서만 사용합니다.
    ///
    /// # Errors
    ///
    /// 옵저버가 치명적 장애를 보고했다면 [`ObserverError::Fault`]를 반환합니다.
    pub fn get(&mut self) -> Result<Event, ObserverError> {
        match self.rx.blocking_recv() {
            Some(envelope) => open(envelope),
            None => Err(ObserverError::QueueClosed),
        }
    }

    /// 대기 중인 항목이 있으면 즉시 꺼냅니다.
    pub fn try_get(&mut self) -> Option<Result<Event, ObserverError>> {
        self.rx.try_recv().ok().map(open)
    }

    /// 최대 `timeout` 동안 기다립니다. 시간 내에 항목이 없으면 `None`.
    pub fn get_timeout(&mut self, timeout: Duration) -> Option<Result<Event, ObserverError>> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(item) = self.try_get() {
                return Some(item);
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            std::thread::sleep(TIMEOUT_POLL_INTERVAL.min(deadline - now));
        }
    }

    /// 남아 있는 이벤트를 모두 꺼냅니다. 장애 항목은 건너뜁니다.
    pub fn drain(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        while let Some(item) = self.try_get() {
            if let Ok(event) = item {
                events.push(event);
            }
        }
        events
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

fn open(envelope: Envelope) -> Result<Event, ObserverError> {
    match envelope {
        Envelope::Event(event) => Ok(event),
        Envelope::Fault { observer, reason } => Err(ObserverError::Fault { observer, reason }),
    }
}
