use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

use dpmo_core::config::DpmoConfig;
use dpmo_core::types::{RunSummary, Verdict};
use dpmo_runner::cli::RunnerCli;
use dpmo_runner::drivers::Drivers;
use dpmo_runner::logging::init_tracing;
use dpmo_runner::orchestrator::Orchestrator;

/// Exit code for configuration and initialization errors.
const EXIT_SETUP_ERROR: u8 = 2;

fn main() -> ExitCode {
    let cli = RunnerCli::parse();

    // 설정 로드: 파일 -> 환경변수 -> CLI 순으로 오버라이드
    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("dpmo-runner: {e:#}");
            return ExitCode::from(EXIT_SETUP_ERROR);
        }
    };

    if cli.validate {
        println!("configuration OK: {}", cli.config.display());
        return ExitCode::SUCCESS;
    }

    match run(config) {
        Ok(summary) => match summary.verdict {
            Verdict::Pass => ExitCode::SUCCESS,
            Verdict::Fail => ExitCode::FAILURE,
        },
        Err(e) => {
            tracing::error!(error = %e, "dpmo-runner failed to start");
            eprintln!("dpmo-runner: {e:#}");
            ExitCode::from(EXIT_SETUP_ERROR)
        }
    }
}

fn load_config(cli: &RunnerCli) -> Result<DpmoConfig> {
    let mut config = DpmoConfig::from_file(&cli.config)
        .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?;
    config.apply_env_overrides();
    cli.apply_overrides(&mut config);
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;
    Ok(config)
}

fn run(config: DpmoConfig) -> Result<RunSummary> {
    init_tracing(&config.general)?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        scenario = %config.cycle.scenario,
        "dpmo-runner starting"
    );

    let drivers = Drivers::from_config(&config)?;
    let mut orchestrator = Orchestrator::build_from_config(config, drivers)?;
    let summary = orchestrator.run()?;

    println!("{summary}");
    Ok(summary)
}
