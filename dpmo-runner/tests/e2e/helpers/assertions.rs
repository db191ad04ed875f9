//! Verdict assertions for E2E tests.

use dpmo_core::types::{RunSummary, Verdict};

/// Assert the run passed with every target cycle completed.
///
/// # Panics
///
/// Panics with the summary line if the run did not pass.
#[allow(dead_code)]
pub fn assert_pass(summary: &RunSummary) {
    assert_eq!(summary.verdict, Verdict::Pass, "{summary}");
    assert_eq!(summary.cycles_completed, summary.target_cycles, "{summary}");
    assert!(summary.reason.is_none(), "{summary}");
}

/// Assert the run failed with a reason containing `needle`.
///
/// # Panics
///
/// Panics if the run passed or the reason does not match.
#[allow(dead_code)]
pub fn assert_fail_with(summary: &RunSummary, needle: &str) {
    assert_eq!(summary.verdict, Verdict::Fail, "{summary}");
    let reason = summary.reason.as_deref().unwrap_or_default();
    assert!(
        reason.contains(needle),
        "expected reason containing {needle:?}, got {summary}"
    );
}
