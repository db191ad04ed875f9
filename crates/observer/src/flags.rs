//! 아밍 플래그: 옵저버와 시나리오가 공유하는 일회성 활성화 플래그
//!
//! 시나리오(디스패치 스레드)가 플래그를 켜고, 옵저버가 이벤트를 낸 뒤 끕니다.
//! 한 번 꺼진 플래그는 시나리오가 다시 켜기 전까지 같은 이벤트를 만들지 않습니다.
//!
//! # 메모리 순서
//!
//! - `arm` / `disarm`: `Release` 저장
//! - `is_armed`: `Acquire` 읽기
//! - `take`: `AcqRel` swap (한 번만 소비됨을 보장)
//!
//! 핸들러가 제어 동작 이후 플래그를 켜면, 옵저버의 다음 폴링은
//! 그 이전에 일어난 모든 쓰기를 함께 관찰합니다.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

const FLAG_COUNT: usize = 10;

/// 플래그 식별자
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flag {
    /// 전원 상태 변화 감지 (디바운스/분류 활성화)
    PowerDetect,
    /// 다음 S0 관찰 시 IN_S0
    S0,
    /// 다음 S3 안정 시 IN_S3 (없으면 AUTO_SLEEP)
    S3,
    /// 다음 S4 안정 시 IN_S4 (없으면 AUTO_HIBERNATE)
    S4,
    /// 다음 S5 안정 시 IN_S5 (없으면 AUTO_SHUTDOWN)
    S5,
    /// OS 도달 프로브
    OsDetect,
    /// OS 도달 프로브 (타임아웃 복구용 일회성)
    OsInit,
    /// 펌웨어 셸 도달 프로브
    UefiDetect,
    /// 펌웨어 셸 도달 프로브 (타임아웃 복구용 일회성)
    UefiInit,
    /// 사이클 타임아웃 감시
    CycleWatchdog,
}

impl Flag {
    /// 모든 플래그
    pub const ALL: [Self; FLAG_COUNT] = [
        Self::PowerDetect,
        Self::S0,
        Self::S3,
        Self::S4,
        Self::S5,
        Self::OsDetect,
        Self::OsInit,
        Self::UefiDetect,
        Self::UefiInit,
        Self::CycleWatchdog,
    ];

    fn index(self) -> usize {
        self as usize
    }

    /// 로그용 이름
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PowerDetect => "power_detect",
            Self::S0 => "s0",
            Self::S3 => "s3",
            Self::S4 => "s4",
            Self::S5 => "s5",
            Self::OsDetect => "os_detect",
            Self::OsInit => "os_init",
            Self::UefiDetect => "uefi_detect",
            Self::UefiInit => "uefi_init",
            Self::CycleWatchdog => "cycle_watchdog",
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 공유 아밍 플래그 집합
///
/// `Arc<ArmingFlags>`로 감싸 옵저버 스레드들과 디스패치 스레드가 함께 사용합니다.
pub struct ArmingFlags {
    flags: [AtomicBool; FLAG_COUNT],
}

impl ArmingFlags {
    /// 모든 플래그가 꺼진 상태로 생성합니다.
    pub fn new() -> Self {
        Self {
            flags: std::array::from_fn(|_| AtomicBool::new(false)),
        }
    }

    /// 실행 시작 시의 초기 상태로 생성합니다.
    ///
    /// `power_detect`와 `s0`만 켜져 있어, SUT가 이미 S0면 IN_S0로,
    /// 이미 안정된 저전력 상태면 해당 이벤트로 실행이 시작됩니다.
    pub fn at_startup() -> Self {
        let flags = Self::new();
        flags.arm(Flag::PowerDetect);
        flags.arm(Flag::S0);
        flags
    }

    /// 플래그를 켭니다.
    pub fn arm(&self, flag: Flag) {
        self.flags[flag.index()].store(true, Ordering::Release);
    }

    /// 플래그를 끕니다.
    pub fn disarm(&self, flag: Flag) {
        self.flags[flag.index()].store(false, Ordering::Release);
    }

    /// 플래그가 켜져 있는지 확인합니다.
    pub fn is_armed(&self, flag: Flag) -> bool {
        self.flags[flag.index()].load(Ordering::Acquire)
    }

    /// 플래그를 끄고 직전 값을 반환합니다.
    ///
    /// 동시에 여러 곳에서 호출해도 `true`는 한 번만 돌려받습니다.
    pub fn take(&self, flag: Flag) -> bool {
        self.flags[flag.index()].swap(false, Ordering::AcqRel)
    }

    /// 켜져 있는 플래그 목록 (로그/테스트용)
    pub fn armed(&self) -> Vec<Flag> {
        Flag::ALL
            .into_iter()
            .filter(|flag| self.is_armed(*flag))
            .collect()
    }
}

impl Default for ArmingFlags {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ArmingFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.armed()).finish()
    }
}
