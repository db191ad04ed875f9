//! JSON Lines report sink.
//!
//! Every check record is appended as one JSON object per line, followed by a
//! final summary line when the run finishes:
//!
//! ```text
//! {"type":"check","cycle":1,"checker":"mce","passed":true}
//! {"type":"summary","run_id":"…","scenario":"G3General","verdict":"PASS",…}
//! ```
//!
//! Without a path the sink only logs.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::Serialize;
use tracing::{info, warn};

use dpmo_core::control::ReportSink;
use dpmo_core::error::ControlError;
use dpmo_core::types::{CheckRecord, RunSummary};

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum Line<'a> {
    Check(&'a CheckRecord),
    Summary(&'a RunSummary),
}

/// Appends check records and the run summary to a JSON Lines file.
pub struct JsonLinesReport {
    path: Option<PathBuf>,
    writer: Mutex<Option<BufWriter<File>>>,
}

impl JsonLinesReport {
    /// Opens (or creates) `path` in append mode, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::Io` if the file cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ControlError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        info!(path = %path.display(), "report file opened");
        Ok(Self {
            path: Some(path.to_path_buf()),
            writer: Mutex::new(Some(BufWriter::new(file))),
        })
    }

    /// Sink that only logs records.
    pub fn log_only() -> Self {
        Self {
            path: None,
            writer: Mutex::new(None),
        }
    }

    /// Opens `path`, or falls back to [`log_only`](Self::log_only) when it is empty.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::Io` if a non-empty path cannot be opened.
    pub fn from_config_path(path: &str) -> Result<Self, ControlError> {
        if path.trim().is_empty() {
            Ok(Self::log_only())
        } else {
            Self::open(path)
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn write_line(&self, line: &Line<'_>) -> Result<(), ControlError> {
        let mut guard = self.writer.lock().unwrap_or_else(|p| p.into_inner());
        let Some(writer) = guard.as_mut() else {
            return Ok(());
        };
        serde_json::to_writer(&mut *writer, line)
            .map_err(|e| ControlError::Driver(format!("failed to serialize report line: {e}")))?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

impl ReportSink for JsonLinesReport {
    fn record(&self, record: CheckRecord) {
        info!(
            cycle = record.cycle,
            checker = %record.checker,
            passed = record.passed,
            "check recorded"
        );
        if let Err(e) = self.write_line(&Line::Check(&record)) {
            warn!(error = %e, "failed to write check record");
        }
    }

    fn finish(&self, summary: &RunSummary) -> Result<(), ControlError> {
        info!(summary = %summary, "run summary");
        self.write_line(&Line::Summary(summary))?;
        let mut guard = self.writer.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(writer) = guard.as_mut() {
            writer.flush()?;
        }
        Ok(())
    }
}
