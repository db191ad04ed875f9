//! Tracing setup for the runner.
//!
//! Every observer polls on its own `dpmo-<name>` thread (`dpmo-power`,
//! `dpmo-os`, `dpmo-firmware`, `dpmo-timeout`, plus `dpmo-signals`) while the
//! scenario handlers run on the main thread, so thread names are always
//! written: they are what ties a `power event` line to the observer that
//! emitted it. `general.log_format` selects JSON lines for collected bench
//! logs or multi-line pretty output for a console.

use anyhow::Result;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use dpmo_core::config::GeneralConfig;

type OutputLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Installs the global subscriber for one run.
///
/// `RUST_LOG` wins over `general.log_level`, which lets a single module be
/// turned up (`RUST_LOG=dpmo_observer=debug`) without editing the config.
///
/// # Errors
///
/// Fails on an unknown `log_format` or if a subscriber is already installed.
pub fn init_tracing(config: &GeneralConfig) -> Result<()> {
    let output = output_layer(&config.log_format)?;
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(output)
        .with(filter)
        .try_init()
        .map_err(|e| {
            anyhow::anyhow!(
                "failed to initialize {} tracing subscriber: {}",
                config.log_format,
                e
            )
        })
}

fn output_layer(format: &str) -> Result<OutputLayer> {
    let layer = match format {
        "json" => fmt::layer()
            .json()
            .with_current_span(true)
            .with_thread_names(true)
            .boxed(),
        "pretty" => fmt::layer().pretty().with_thread_names(true).boxed(),
        other => {
            return Err(anyhow::anyhow!(
                "unknown log format '{}', expected 'json' or 'pretty'",
                other
            ));
        }
    };
    Ok(layer)
}
