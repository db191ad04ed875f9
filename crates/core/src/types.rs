//! 도메인 타입: 전원 상태, 부팅 대상, 판정, 사이클 카운터
//!
//! 옵저버, 시나리오, 오케스트레이터가 공유하는 데이터 구조를 정의합니다.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// SUT 전원 상태 (ACPI 스타일)
///
/// 외부 전원 상태 조회 프리미티브만 이 값을 생성합니다.
/// `Unknown`은 치명적 상태로 취급됩니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PowerState {
    /// 전원 완전 차단 (AC off)
    G3,
    /// 소프트 오프
    S5,
    /// 최대 절전 (hibernate)
    S4,
    /// 절전 (sleep)
    S3,
    /// 동작 중
    S0,
    /// 판별 불가
    Unknown,
}

impl PowerState {
    /// 드라이버 출력 문자열을 전원 상태로 변환합니다.
    ///
    /// 대소문자와 앞뒤 공백을 무시하며, 인식할 수 없는 값은 `Unknown`이 됩니다.
    pub fn from_raw(raw: &str) -> Self {
        raw.parse().unwrap_or(Self::Unknown)
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::G3 => write!(f, "G3"),
            Self::S5 => write!(f, "S5"),
            Self::S4 => write!(f, "S4"),
            Self::S3 => write!(f, "S3"),
            Self::S0 => write!(f, "S0"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

impl FromStr for PowerState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "G3" => Ok(Self::G3),
            "S5" => Ok(Self::S5),
            "S4" => Ok(Self::S4),
            "S3" => Ok(Self::S3),
            "S0" => Ok(Self::S0),
            "UNKNOWN" => Ok(Self::Unknown),
            other => Err(format!("unrecognized power state: '{other}'")),
        }
    }
}

/// 부팅 대상
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BootTarget {
    /// 운영체제
    Os,
    /// 펌웨어 셸 (UEFI)
    Uefi,
}

impl fmt::Display for BootTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Os => write!(f, "os"),
            Self::Uefi => write!(f, "uefi"),
        }
    }
}

impl FromStr for BootTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "os" => Ok(Self::Os),
            "uefi" => Ok(Self::Uefi),
            other => Err(format!("unknown boot target: '{other}'")),
        }
    }
}

/// 시나리오 변형 (flow)
///
/// 이전 도구의 이름(`GeneralS3`, `Uefi2OsReset`)도 별칭으로 받습니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScenarioKind {
    /// G3 → AC on → OS/UEFI → shutdown → S5 → AC off → G3
    G3General,
    /// G3 → AC on → S5 → DC on → OS/UEFI → shutdown → S5 → AC off → G3
    G3DcOn,
    /// G3 → AC on → OS/UEFI → AC off (surprise) → G3
    G3Surprise,
    /// G3 → AC on → OS/UEFI → shutdown → S5 → DC on → OS/UEFI → AC off → G3
    G3SurpriseDcOn,
    /// S5 → DC on → OS/UEFI → shutdown → S5
    S5General,
    /// S3 → DC on → OS → sleep → S3
    #[serde(alias = "GeneralS3")]
    S3General,
    /// OS/UEFI → warm reset → OS/UEFI
    ResetGeneral,
    /// OS → reset → UEFI → reset → OS
    #[serde(alias = "Uefi2OsReset")]
    ResetUefi2Os,
}

impl ScenarioKind {
    /// 지원하는 모든 변형
    pub const ALL: [Self; 8] = [
        Self::G3General,
        Self::G3DcOn,
        Self::G3Surprise,
        Self::G3SurpriseDcOn,
        Self::S5General,
        Self::S3General,
        Self::ResetGeneral,
        Self::ResetUefi2Os,
    ];

    /// 정식 이름
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::G3General => "G3General",
            Self::G3DcOn => "G3DcOn",
            Self::G3Surprise => "G3Surprise",
            Self::G3SurpriseDcOn => "G3SurpriseDcOn",
            Self::S5General => "S5General",
            Self::S3General => "S3General",
            Self::ResetGeneral => "ResetGeneral",
            Self::ResetUefi2Os => "ResetUefi2Os",
        }
    }
}

impl fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScenarioKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        match name {
            "GeneralS3" => return Ok(Self::S3General),
            "Uefi2OsReset" => return Ok(Self::ResetUefi2Os),
            _ => {}
        }
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| format!("unknown scenario variant: '{name}'"))
    }
}

/// 실행 최종 판정
///
/// 핸들러는 `Option<Verdict>`를 반환하며, `None`은 아직 판정되지 않음(pending)을 뜻합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    /// 목표 사이클 도달
    Pass,
    /// 정책 위반 또는 치명적 에러
    Fail,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass => write!(f, "PASS"),
            Self::Fail => write!(f, "FAIL"),
        }
    }
}

/// 사이클 카운터 `(current, target)`
///
/// `current`는 감소하지 않으며 사이클 시작마다 정확히 1씩 증가합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleCounter {
    current: u32,
    target: u32,
}

impl CycleCounter {
    /// 새 카운터를 생성합니다 (`current = 0`).
    pub fn new(target: u32) -> Self {
        Self { current: 0, target }
    }

    /// 지금까지 시작된 사이클 수
    pub fn current(&self) -> u32 {
        self.current
    }

    /// 목표 사이클 수
    pub fn target(&self) -> u32 {
        self.target
    }

    /// 목표에 도달했는지 여부
    pub fn is_complete(&self) -> bool {
        self.current >= self.target
    }

    /// 다음 사이클로 진행합니다.
    ///
    /// 이미 목표에 도달했다면 `None`을 반환하고 카운터는 변하지 않습니다.
    pub fn advance(&mut self) -> Option<u32> {
        if self.is_complete() {
            return None;
        }
        self.current += 1;
        Some(self.current)
    }
}

impl fmt::Display for CycleCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.current, self.target)
    }
}

/// 진단 결과 레코드 `(cycle, checker, passed)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckRecord {
    /// 사이클 번호
    pub cycle: u32,
    /// 진단기 이름
    pub checker: String,
    /// 통과 여부
    pub passed: bool,
}

impl fmt::Display for CheckRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let result = if self.passed { "pass" } else { "fail" };
        write!(f, "cycle {} {}: {}", self.cycle, self.checker, result)
    }
}

/// 실행 요약
///
/// 성공/실패/중단 경로 모두에서 생성되어 리포트로 전달됩니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// 실행 ID
    pub run_id: Uuid,
    /// 시나리오 이름
    pub scenario: String,
    /// 최종 판정
    pub verdict: Verdict,
    /// 도달한 사이클 수
    pub cycles_completed: u32,
    /// 목표 사이클 수
    pub target_cycles: u32,
    /// 경과 시간 (초)
    pub elapsed_secs: f64,
    /// 실패/중단 사유
    pub reason: Option<String>,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} after {}/{} cycles ({:.1}s)",
            self.scenario, self.verdict, self.cycles_completed, self.target_cycles, self.elapsed_secs,
        )?;
        if let Some(reason) = &self.reason {
            write!(f, ": {reason}")?;
        }
        Ok(())
    }
}
