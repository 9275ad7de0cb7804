// ============================================================
// Layer 6 — Training Log
// ============================================================
// Append-only audit trail of a training run. One line per
// event:
//
//   2024-07-15 09:12:03.418220: Loaded 365 attendance rows
//
// Lines are never rewritten; the file grows across runs.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

pub struct TrainingLog {
    path: PathBuf,
}

impl TrainingLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one timestamped line, creating the file and its
    /// directory on first use. The message is mirrored to tracing.
    pub fn append(&self, message: &str) -> Result<()> {
        tracing::info!("{message}");

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Cannot create log directory '{}'", parent.display()))?;
        }

        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Cannot open training log '{}'", self.path.display()))?;

        writeln!(f, "{}", format_line(Local::now(), message))?;
        Ok(())
    }
}

fn format_line(at: DateTime<Local>, message: &str) -> String {
    // Multi-line error chains stay on one log line
    let flat = message.replace('\n', " | ");
    format!("{}: {}", at.format(TIMESTAMP_FORMAT), flat)
}
