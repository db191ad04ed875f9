//! Run helpers, recording report sink and diagnostic hook.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use dpmo_core::config::DpmoConfig;
use dpmo_core::control::{DiagnosticHook, ReportSink};
use dpmo_core::error::ControlError;
use dpmo_core::types::{CheckRecord, PowerState, RunSummary};
use dpmo_runner::drivers::{Drivers, SimulatedSut};
use dpmo_runner::orchestrator::Orchestrator;

/// Report sink that keeps everything in memory.
#[derive(Default)]
pub struct RecordingReport {
    records: Mutex<Vec<CheckRecord>>,
    summary: Mutex<Option<RunSummary>>,
}

#[allow(dead_code)]
impl RecordingReport {
    pub fn records(&self) -> Vec<CheckRecord> {
        self.records.lock().expect("lock poisoned").clone()
    }

    pub fn summary(&self) -> Option<RunSummary> {
        self.summary.lock().expect("lock poisoned").clone()
    }
}

impl ReportSink for RecordingReport {
    fn record(&self, record: CheckRecord) {
        self.records.lock().expect("lock poisoned").push(record);
    }

    fn finish(&self, summary: &RunSummary) -> Result<(), ControlError> {
        *self.summary.lock().expect("lock poisoned") = Some(summary.clone());
        Ok(())
    }
}

/// Diagnostic hook that counts its calls and fails on one chosen cycle.
pub struct CountingCheck {
    name: &'static str,
    calls: AtomicU32,
    fail_on: Option<u32>,
}

#[allow(dead_code)]
impl CountingCheck {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            calls: AtomicU32::new(0),
            fail_on: None,
        }
    }

    pub fn failing_on(mut self, cycle: u32) -> Self {
        self.fail_on = Some(cycle);
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DiagnosticHook for CountingCheck {
    fn name(&self) -> &str {
        self.name
    }

    fn check(&self, cycle: u32) -> Result<bool, ControlError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.fail_on != Some(cycle))
    }
}

/// Runs `config` against `sut` with the default drivers.
pub fn run_simulated(config: DpmoConfig, sut: &Arc<SimulatedSut>) -> RunSummary {
    run_with(config, Drivers::simulated(Arc::clone(sut)))
}

/// Runs `config` with explicit drivers; the signal watcher stays off.
pub fn run_with(config: DpmoConfig, drivers: Drivers) -> RunSummary {
    let mut orchestrator = Orchestrator::build_from_config(config, drivers)
        .expect("orchestrator should build")
        .with_signal_watcher(false);
    orchestrator.run().expect("run should produce a summary")
}

/// Spawns a thread that waits for `sut` to reach S0, lets the scenario
/// settle for `after`, then forces `state`.
#[allow(dead_code)]
pub fn inject_after_s0(
    sut: &Arc<SimulatedSut>,
    after: Duration,
    state: PowerState,
) -> std::thread::JoinHandle<()> {
    let sut = Arc::clone(sut);
    std::thread::spawn(move || {
        let deadline = Instant::now() + Duration::from_secs(10);
        while sut.current() != PowerState::S0 {
            assert!(Instant::now() < deadline, "SUT never reached S0");
            std::thread::sleep(Duration::from_millis(5));
        }
        std::thread::sleep(after);
        sut.inject(state);
    })
}
