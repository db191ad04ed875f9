//! DPMO runner library.
//!
//! This library exposes the runner's modules for integration testing.
//! In production, `dpmo-runner` is used as a binary (main.rs).
//!
//! - [`orchestrator`]: assembly, dispatch loop and cleanup for one run
//! - [`drivers`]: command and simulated SUT drivers
//! - [`report`]: JSON Lines report sink
//! - [`signals`]: SIGINT/SIGTERM watcher

pub mod cli;
pub mod drivers;
pub mod logging;
pub mod metrics_server;
pub mod orchestrator;
pub mod report;
pub mod signals;

pub use drivers::{CommandCheck, CommandDriver, Drivers, SimulatedSut};
pub use orchestrator::Orchestrator;
pub use report::JsonLinesReport;
