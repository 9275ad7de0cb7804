// ============================================================
// Layer 3 — Error Taxonomy
// ============================================================
// Typed failures shared by the store, the training pipeline
// and the inference orchestrator. The application and CLI
// layers wrap these in anyhow::Error; the orchestrator turns
// them into a user-facing ForecastStatus.

use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::features::Stage;

#[derive(Debug, Error)]
pub enum ForecastError {
    /// No fitted model is loaded for the stage. Recoverable: train, then retry.
    #[error("{0} model is not available; run `train` first")]
    ModelUnavailable(Stage),

    /// The regressor ran but produced something unusable (NaN, wrong arity, backend error)
    #[error("{stage} prediction failed: {reason}")]
    PredictionFailed { stage: Stage, reason: String },

    /// Out-of-domain query value, rejected before it reaches a regressor
    #[error("invalid input `{field}` = {value}: {reason}")]
    PredictionInputInvalid {
        field:  &'static str,
        value:  f64,
        reason: &'static str,
    },

    /// Attendance row whose date already exists in the store
    #[error("attendance record for {0} already exists")]
    UniqueConstraintViolation(NaiveDate),

    /// Food row whose date has no attendance row
    #[error("food record '{dish}' on {date} has no attendance record for that date")]
    OrphanedFoodRecord { date: NaiveDate, dish: String },

    /// Row that violates a data-model invariant (e.g. delivery_sales > total_sales)
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    /// Input batch whose columns do not match the expected schema
    #[error("schema mismatch in {source_name}: expected {expected:?}, found {found:?}")]
    SchemaMismatch {
        source_name: String,
        expected:    Vec<String>,
        found:       Vec<String>,
    },

    /// A CSV row that could not be parsed into a record
    #[error("malformed row {line} in {source_name}: {reason}")]
    MalformedRow {
        source_name: String,
        line:        u64,
        reason:      String,
    },

    /// Nothing left to fit a stage on
    #[error("not enough data to train the {0} model")]
    InsufficientData(Stage),

    /// Store file missing on a path that only reads or changes rows
    #[error("store '{}' does not exist; run `init-db` or `ingest` first", .0.display())]
    StoreNotFound(PathBuf),

    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ForecastResult<T> = Result<T, ForecastError>;
