//! Runs rejected at build time, before any observer starts.

use std::sync::Arc;

use crate::helpers::config::*;

use dpmo_core::types::{BootTarget, PowerState, ScenarioKind};
use dpmo_runner::drivers::{Drivers, SimulatedSut};
use dpmo_runner::orchestrator::Orchestrator;

fn build_error(config: dpmo_core::config::DpmoConfig) -> String {
    let sut = Arc::new(SimulatedSut::new(PowerState::G3));
    match Orchestrator::build_from_config(config, Drivers::simulated(Arc::clone(&sut))) {
        Ok(_) => panic!("build should fail"),
        Err(e) => {
            assert!(sut.history().is_empty(), "no action before a valid config");
            format!("{e:#}")
        }
    }
}

#[test]
fn test_e2e_zero_cycles_rejected() {
    let config = TestConfigBuilder::new(ScenarioKind::G3General)
        .cycles(0)
        .build();
    let err = build_error(config);
    assert!(err.contains("cycle.target_cycles"), "{err}");
}

#[test]
fn test_e2e_s3_general_uefi_rejected() {
    let config = TestConfigBuilder::new(ScenarioKind::S3General)
        .boot_target(BootTarget::Uefi)
        .build();
    let err = build_error(config);
    assert!(err.contains("cycle.boot_target"), "{err}");
}

#[test]
fn test_e2e_negative_debounce_rejected() {
    let config = TestConfigBuilder::new(ScenarioKind::G3General)
        .debounce_secs(-1.0)
        .build();
    let err = build_error(config);
    assert!(err.contains("observer.debounce_secs"), "{err}");
}
