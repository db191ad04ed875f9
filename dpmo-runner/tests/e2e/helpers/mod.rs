//! Shared E2E test helpers.
//!
//! Provides a fast-timing config builder, a recording report sink and
//! diagnostic hook, and helpers to run a scenario to its verdict.

pub mod assertions;
pub mod config;
pub mod run;
