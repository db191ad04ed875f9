//! 메트릭 상수 및 설명 등록
//!
//! 모든 Prometheus 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 크레이트는 이 상수로 `metrics::counter!()`, `metrics::gauge!()`,
//! `metrics::histogram!()` 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `dpmo_`
//! - 접미어: `_total` (counter), `_seconds` (histogram), 없음 (gauge)

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 이벤트 태그 레이블 키 (IN_G3, AUTO_SLEEP, ...)
pub const LABEL_EVENT: &str = "event";

/// 옵저버 이름 레이블 키 (power, os, firmware, timeout)
pub const LABEL_OBSERVER: &str = "observer";

/// 판정 레이블 키 (PASS, FAIL)
pub const LABEL_VERDICT: &str = "verdict";

/// 전원 동작 레이블 키 (ac_on, dc_on, ...)
pub const LABEL_ACTION: &str = "action";

/// 결과 레이블 키 (success, failure)
pub const LABEL_RESULT: &str = "result";

// ─── 이벤트 / 옵저버 ───────────────────────────────────────────────

/// 큐에 들어간 이벤트 수 (counter, label: event)
pub const EVENTS_EMITTED_TOTAL: &str = "dpmo_events_emitted_total";

/// 전원 상태 샘플 수 (counter)
pub const POWER_SAMPLES_TOTAL: &str = "dpmo_power_samples_total";

/// 전원 상태 조회 실패 수 (counter)
pub const POWER_SAMPLE_ERRORS_TOTAL: &str = "dpmo_power_sample_errors_total";

/// OS/펌웨어 프로브 시도 수 (counter, label: observer)
pub const PROBE_ATTEMPTS_TOTAL: &str = "dpmo_probe_attempts_total";

/// 옵저버 치명적 장애 수 (counter, label: observer)
pub const OBSERVER_FAULTS_TOTAL: &str = "dpmo_observer_faults_total";

// ─── 시나리오 ──────────────────────────────────────────────────────

/// 현재 사이클 번호 (gauge)
pub const CYCLE_CURRENT: &str = "dpmo_cycle_current";

/// 시작된 사이클 수 (counter)
pub const CYCLES_STARTED_TOTAL: &str = "dpmo_cycles_started_total";

/// 사이클 소요 시간 (histogram, 초)
pub const CYCLE_DURATION_SECONDS: &str = "dpmo_cycle_duration_seconds";

/// 전원 전환 동작 수 (counter, labels: action, result)
pub const POWER_TRANSITIONS_TOTAL: &str = "dpmo_power_transitions_total";

/// 진단 실행 수 (counter, label: result)
pub const DIAGNOSTICS_TOTAL: &str = "dpmo_diagnostics_total";

/// 사이클 타임아웃 수 (counter)
pub const TIMEOUTS_TOTAL: &str = "dpmo_timeouts_total";

// ─── 실행 ─────────────────────────────────────────────────────────

/// 완료된 실행 수 (counter, label: verdict)
pub const RUNS_TOTAL: &str = "dpmo_runs_total";

/// 실행 소요 시간 (histogram, 초)
pub const RUN_DURATION_SECONDS: &str = "dpmo_run_duration_seconds";

/// 모든 메트릭의 설명을 등록합니다.
///
/// 레코더 설치 직후 한 번 호출합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge, describe_histogram};

    describe_counter!(EVENTS_EMITTED_TOTAL, "Events put on the event queue");
    describe_counter!(POWER_SAMPLES_TOTAL, "Raw power status samples taken");
    describe_counter!(
        POWER_SAMPLE_ERRORS_TOTAL,
        "Power status reads that failed and were retried"
    );
    describe_counter!(PROBE_ATTEMPTS_TOTAL, "OS and firmware probe attempts");
    describe_counter!(OBSERVER_FAULTS_TOTAL, "Fatal observer faults");

    describe_gauge!(CYCLE_CURRENT, "Current cycle number");
    describe_counter!(CYCLES_STARTED_TOTAL, "Cycles started");
    describe_histogram!(
        CYCLE_DURATION_SECONDS,
        metrics::Unit::Seconds,
        "Wall-clock duration of completed cycles"
    );
    describe_counter!(POWER_TRANSITIONS_TOTAL, "Power transitions requested");
    describe_counter!(DIAGNOSTICS_TOTAL, "Diagnostic checks executed");
    describe_counter!(TIMEOUTS_TOTAL, "Cycle timeouts raised");

    describe_counter!(RUNS_TOTAL, "Finished runs by verdict");
    describe_histogram!(
        RUN_DURATION_SECONDS,
        metrics::Unit::Seconds,
        "Wall-clock duration of finished runs"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_names_share_prefix() {
        for name in [
            EVENTS_EMITTED_TOTAL,
            POWER_SAMPLES_TOTAL,
            CYCLE_CURRENT,
            CYCLE_DURATION_SECONDS,
            RUNS_TOTAL,
        ] {
            assert!(name.starts_with("dpmo_"), "{name}");
        }
    }

    #[test]
    fn describe_all_without_recorder_is_noop() {
        describe_all();
    }
}
