//! Run orchestration -- assembly, dispatch loop, and cleanup.
//!
//! The [`Orchestrator`] wires one run together: it validates the
//! configuration, creates the event queue, the shared arming flags and the
//! cycle clock, builds the scenario engine and registers the observers.
//!
//! # Observer Order (start and stop)
//!
//! 1. power (`PowerStateObserver`)
//! 2. os (`BootProbeObserver`)
//! 3. firmware (`BootProbeObserver`)
//! 4. timeout (`CycleTimeoutMonitor`)
//!
//! # Run
//!
//! ```text
//! start observers ─▶ loop { queue.get() ─▶ engine.handle() } ─▶ stop observers
//!                        ends on verdict / observer fault / handler error
//!                                                              │
//!                                       report.finish(summary) ◀┘
//! ```
//!
//! Cleanup always runs, and the terminal PASS/FAIL line is always logged.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use uuid::Uuid;

use dpmo_core::config::DpmoConfig;
use dpmo_core::control::ReportSink;
use dpmo_core::event::EventQueue;
use dpmo_core::metrics as m;
use dpmo_core::types::{RunSummary, Verdict};
use dpmo_observer::{
    ArmingFlags, BootProbeObserver, CycleClock, CycleTimeoutMonitor, ObserverRegistry,
    PowerStateObserver, ProbeTiming,
};
use dpmo_scenario::{ScenarioContext, ScenarioEngine, ScenarioSettings};

use crate::drivers::Drivers;
use crate::metrics_server;
use crate::signals::SignalWatcher;

/// How a run ended, before it is turned into a [`RunSummary`].
#[derive(Debug)]
struct Outcome {
    verdict: Verdict,
    reason: Option<String>,
}

impl Outcome {
    fn fail(reason: impl Into<String>) -> Self {
        Self {
            verdict: Verdict::Fail,
            reason: Some(reason.into()),
        }
    }
}

/// One power-cycle run.
pub struct Orchestrator {
    config: DpmoConfig,
    run_id: Uuid,
    queue: EventQueue,
    flags: Arc<ArmingFlags>,
    engine: ScenarioEngine,
    observers: ObserverRegistry,
    report: Arc<dyn ReportSink>,
    watch_signals: bool,
}

impl Orchestrator {
    /// Load `dpmo.toml` and build the orchestrator with the configured drivers.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded or validated,
    /// or if the drivers cannot be created.
    pub fn build(config_path: &Path) -> Result<Self> {
        let config = DpmoConfig::load(config_path)
            .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?;
        let drivers = Drivers::from_config(&config)?;
        Self::build_from_config(config, drivers)
    }

    /// Build from an already-loaded configuration and explicit drivers.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails, the metrics recorder cannot be
    /// installed, or the scenario context is incomplete.
    pub fn build_from_config(config: DpmoConfig, drivers: Drivers) -> Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

        if config.metrics.enabled {
            metrics_server::install_metrics_recorder(&config.metrics)?;
        }

        let queue = EventQueue::new();
        let flags = Arc::new(ArmingFlags::at_startup());
        let clock = Arc::new(CycleClock::new());

        let mut builder = ScenarioContext::builder()
            .power(Arc::clone(&drivers.power))
            .os(Arc::clone(&drivers.os))
            .firmware(Arc::clone(&drivers.firmware))
            .report(Arc::clone(&drivers.report))
            .flags(Arc::clone(&flags))
            .clock(Arc::clone(&clock))
            .settings(ScenarioSettings::from_config(&config));
        for check in &drivers.checks {
            builder = builder.diagnostic(Arc::clone(check));
        }
        let ctx = builder
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build scenario context: {}", e))?;
        let engine = ScenarioEngine::from_kind(config.cycle.scenario, ctx);
        engine.arm_entry();

        let observers = register_observers(&config, &drivers, &queue, &flags, &clock);

        tracing::info!(
            scenario = %config.cycle.scenario,
            target_cycles = config.cycle.target_cycles,
            boot_target = %config.cycle.boot_target,
            observers = observers.count(),
            "orchestrator initialized"
        );

        Ok(Self {
            config,
            run_id: Uuid::new_v4(),
            queue,
            flags,
            engine,
            observers,
            report: drivers.report,
            watch_signals: true,
        })
    }

    /// Enables or disables the SIGINT/SIGTERM watcher (on by default).
    pub fn with_signal_watcher(mut self, enabled: bool) -> Self {
        self.watch_signals = enabled;
        self
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn config(&self) -> &DpmoConfig {
        &self.config
    }

    pub fn flags(&self) -> &ArmingFlags {
        &self.flags
    }

    pub fn engine(&self) -> &ScenarioEngine {
        &self.engine
    }

    /// Runs the scenario to a verdict.
    ///
    /// Blocks the calling thread, which becomes the dispatch thread; it must
    /// not be inside a tokio runtime. A run can only be started once.
    ///
    /// A FAIL verdict is a normal outcome (`Ok`). Failures to stop observers
    /// or to persist the report are logged but do not change the verdict.
    ///
    /// # Errors
    ///
    /// Returns an error only if the signal watcher cannot be started.
    pub fn run(&mut self) -> Result<RunSummary> {
        let span = tracing::info_span!(
            "run",
            run_id = %self.run_id,
            scenario = %self.engine.kind()
        );
        let _entered = span.enter();
        let started = Instant::now();

        let signals = if self.watch_signals {
            Some(SignalWatcher::spawn(self.queue.sender())?)
        } else {
            None
        };

        tracing::info!(
            target_cycles = self.config.cycle.target_cycles,
            "run starting"
        );
        let outcome = match self.observers.start_all(&self.queue.sender()) {
            Ok(()) => self.dispatch(),
            Err(e) => {
                tracing::error!(error = %e, "observer startup failed");
                Outcome::fail(format!("observer startup failed: {e}"))
            }
        };

        tracing::info!("stopping observers");
        for e in self.observers.stop_all() {
            tracing::error!(error = %e, "observer did not stop cleanly");
        }
        if let Some(watcher) = signals {
            watcher.stop();
        }

        let summary = self.summary(outcome, started.elapsed());
        record_run_metrics(&summary);
        if let Err(e) = self.report.finish(&summary) {
            tracing::error!(error = %e, "failed to write run summary");
        }

        match summary.verdict {
            Verdict::Pass => tracing::info!(
                verdict = %summary.verdict,
                cycles = summary.cycles_completed,
                target = summary.target_cycles,
                "{}",
                summary
            ),
            Verdict::Fail => tracing::error!(
                verdict = %summary.verdict,
                cycles = summary.cycles_completed,
                target = summary.target_cycles,
                "{}",
                summary
            ),
        }
        Ok(summary)
    }

    /// Single consumer loop: one event at a time, in arrival order.
    fn dispatch(&mut self) -> Outcome {
        loop {
            let event = match self.queue.get() {
                Ok(event) => event,
                Err(e) => {
                    tracing::error!(error = %e, "fatal observer error, ending run");
                    return Outcome::fail(e.to_string());
                }
            };

            match self.engine.handle(event) {
                Ok(None) => {}
                Ok(Some(Verdict::Pass)) => {
                    return Outcome {
                        verdict: Verdict::Pass,
                        reason: None,
                    };
                }
                Ok(Some(Verdict::Fail)) => {
                    let reason = self
                        .engine
                        .failure_reason()
                        .map_or_else(|| format!("{event} failed"), str::to_owned);
                    return Outcome::fail(reason);
                }
                Err(e) => {
                    tracing::error!(error = %e, "scenario handler failed, ending run");
                    return Outcome::fail(e.to_string());
                }
            }
        }
    }

    fn summary(&self, outcome: Outcome, elapsed: Duration) -> RunSummary {
        let counter = self.engine.counter();
        RunSummary {
            run_id: self.run_id,
            scenario: self.engine.kind().to_string(),
            verdict: outcome.verdict,
            cycles_completed: counter.current(),
            target_cycles: counter.target(),
            elapsed_secs: elapsed.as_secs_f64(),
            reason: outcome.reason,
        }
    }
}

/// Registers the four observers in start order.
fn register_observers(
    config: &DpmoConfig,
    drivers: &Drivers,
    queue: &EventQueue,
    flags: &Arc<ArmingFlags>,
    clock: &Arc<CycleClock>,
) -> ObserverRegistry {
    let observer = &config.observer;
    let timing = ProbeTiming {
        window: observer.probe_window(),
        interval: observer.probe_interval(),
    };

    let mut registry = ObserverRegistry::new(observer.stop_timeout(), observer.stop_max_attempts);
    registry.register(Box::new(PowerStateObserver::new(
        Arc::clone(&drivers.power),
        Arc::clone(flags),
        queue.sender(),
        observer.debounce(),
        observer.power_poll_interval(),
    )));
    registry.register(Box::new(BootProbeObserver::os(
        Arc::clone(&drivers.os),
        Arc::clone(flags),
        queue.sender(),
        timing,
    )));
    registry.register(Box::new(BootProbeObserver::firmware(
        Arc::clone(&drivers.firmware),
        Arc::clone(flags),
        queue.sender(),
        timing,
    )));
    registry.register(Box::new(CycleTimeoutMonitor::new(
        Arc::clone(clock),
        Arc::clone(flags),
        queue.sender(),
        config.cycle.cycle_timeout(),
        observer.power_poll_interval(),
    )));
    registry
}

fn record_run_metrics(summary: &RunSummary) {
    let verdict = summary.verdict.to_string();
    metrics::counter!(m::RUNS_TOTAL, m::LABEL_VERDICT => verdict).increment(1);
    metrics::histogram!(m::RUN_DURATION_SECONDS).record(summary.elapsed_secs);
}
