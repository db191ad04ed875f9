//! E2E integration tests for dpmo-runner.
//!
//! These tests run complete scenarios against the in-process simulated SUT,
//! with the real observers, queue and dispatch loop, and check verdicts,
//! the issued action sequence and the report contents.
//!
//! # Test Structure
//!
//! - `helpers/` -- Shared test utilities (config builder, recording report, run helpers)
//! - `scenarios/` -- Test files organized by flow (power cycles, warm resets, faults, report)
//!
//! # Running
//!
//! ```bash
//! cargo test -p dpmo-runner --test e2e
//! ```

mod helpers;
mod scenarios;
