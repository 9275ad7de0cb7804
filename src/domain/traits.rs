// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// Seams between the layers:
//
//   Regressor    — a fitted model that maps one feature vector
//                  to a continuous value. Implemented by the burn
//                  MLP in Layer 5 and by stubs in tests.
//   RecordSource — anything that yields historical batches for
//                  training. Implemented by the CSV directory
//                  loader and by the Schema Store.

use anyhow::Result;

use crate::domain::records::{AttendanceRecord, FoodRecord};

// ─── Regressor ────────────────────────────────────────────────────────────────
/// A fitted regression model.
pub trait Regressor {
    /// Number of features the model was fitted on
    fn input_size(&self) -> usize;

    /// Raw continuous prediction for one feature vector.
    fn predict(&self, features: &[f32]) -> Result<f64>;
}

// ─── RecordBatch ──────────────────────────────────────────────────────────────
/// Rows of one entity from one source (one CSV file, one table).
/// `columns` is the canonical column list the rows were read from;
/// batches of the same entity concatenate only if these match.
#[derive(Debug, Clone)]
pub struct RecordBatch<T> {
    pub source:  String,
    pub columns: Vec<String>,
    pub rows:    Vec<T>,
}

impl<T> RecordBatch<T> {
    pub fn new(source: impl Into<String>, columns: Vec<String>, rows: Vec<T>) -> Self {
        Self { source: source.into(), columns, rows }
    }
}

// ─── RecordSource ─────────────────────────────────────────────────────────────
/// Any place historical observations can be collected from.
pub trait RecordSource {
    /// Short description for logs
    fn describe(&self) -> String;

    fn attendance_batches(&self) -> Result<Vec<RecordBatch<AttendanceRecord>>>;

    fn food_batches(&self) -> Result<Vec<RecordBatch<FoodRecord>>>;
}
