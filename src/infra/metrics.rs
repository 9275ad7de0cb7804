// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Records per-epoch regression metrics to a CSV file so the
// learning curve of each stage can be inspected later.
//
// Output file: <model_dir>/metrics.csv
//
//   stage,epoch,train_loss,val_loss,val_mae
//   attendance,1,0.981200,0.954100,21.400000
//   attendance,2,0.612300,0.640800,16.950000
//   ...
//
// Losses are MSE on standardised targets; val_mae is in the
// original unit (customers or dishes sold).

use anyhow::Result;
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::PathBuf,
};
use serde::{Deserialize, Serialize};

use crate::domain::features::Stage;

/// One row of metrics for a single epoch of one stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub stage:      Stage,
    pub epoch:      usize,
    pub train_loss: f64,
    /// NaN when the validation split is empty
    pub val_loss:   f64,
    pub val_mae:    f64,
}

impl EpochMetrics {
    pub fn new(stage: Stage, epoch: usize, train_loss: f64, val_loss: f64, val_mae: f64) -> Self {
        Self { stage, epoch, train_loss, val_loss, val_mae }
    }

    /// Returns true if this epoch improved over the previous best val_loss
    pub fn is_improvement(&self, best_val_loss: f64) -> bool {
        self.val_loss < best_val_loss
    }
}

/// Logs epoch metrics to a CSV file for later analysis.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Create a new MetricsLogger.
    /// Writes the CSV header if the file doesn't exist yet.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        let csv_path = dir.join("metrics.csv");
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)?;
            writeln!(f, "stage,epoch,train_loss,val_loss,val_mae")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    /// Append one epoch's metrics as a new row in the CSV.
    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)?;

        writeln!(
            f,
            "{},{},{:.6},{:.6},{:.6}",
            m.stage,
            m.epoch,
            m.train_loss,
            m.val_loss,
            m.val_mae,
        )?;

        tracing::debug!(
            "{} epoch {}: train_loss={:.4}, val_loss={:.4}, val_mae={:.2}",
            m.stage,
            m.epoch,
            m.train_loss,
            m.val_loss,
            m.val_mae,
        );

        Ok(())
    }

    pub fn csv_path(&self) -> &PathBuf {
        &self.csv_path
    }
}
