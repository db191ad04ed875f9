//! SIGINT / SIGTERM watcher.
//!
//! The dispatch loop is synchronous, so signals are awaited on a small
//! current-thread tokio runtime living on its own thread. A received signal
//! is put on the event queue as an observer fault, which ends the run as
//! FAIL through the normal cleanup path.

use std::thread::JoinHandle;

use anyhow::Result;
use tokio::sync::oneshot;

use dpmo_core::event::EventSender;

/// Name reported as the fault source.
pub const SIGNAL_SOURCE: &str = "signal";

/// Handle to the signal watcher thread. Dropping it stops the watcher.
pub struct SignalWatcher {
    cancel: Option<oneshot::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl SignalWatcher {
    /// Spawns the watcher thread (`dpmo-signals`).
    ///
    /// # Errors
    ///
    /// Fails if the runtime or the thread cannot be created.
    pub fn spawn(events: EventSender) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build signal runtime: {}", e))?;
        let (cancel_tx, cancel_rx) = oneshot::channel();

        let thread = std::thread::Builder::new()
            .name("dpmo-signals".to_owned())
            .spawn(move || {
                runtime.block_on(async move {
                    match wait_for_signal(cancel_rx).await {
                        Ok(Some(signal)) => {
                            tracing::warn!(signal, "signal received, aborting run");
                            events.fault(SIGNAL_SOURCE, format!("received {signal}"));
                        }
                        Ok(None) => tracing::debug!("signal watcher cancelled"),
                        Err(e) => tracing::error!(error = %e, "signal watcher unavailable"),
                    }
                });
            })
            .map_err(|e| anyhow::anyhow!("failed to spawn signal watcher: {}", e))?;

        Ok(Self {
            cancel: Some(cancel_tx),
            thread: Some(thread),
        })
    }

    /// Stops the watcher and joins its thread.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            // The watcher may already have exited after a signal.
            let _ = cancel.send(());
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::error!("signal watcher panicked");
            }
        }
    }
}

impl Drop for SignalWatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Waits for SIGTERM or SIGINT, or for cancellation (`Ok(None)`).
async fn wait_for_signal(cancel: oneshot::Receiver<()>) -> Result<Option<&'static str>> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => Some("SIGTERM"),
        _ = sigint.recv() => Some("SIGINT"),
        _ = cancel => None,
    })
}
