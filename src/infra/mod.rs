// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Everything that touches a file on disk on behalf of the
// other layers:
//
//   store.rs        — Schema Store: the SQLite database with the
//                     attendance and food tables, bulk append
//                     with per-row integrity reports
//
//   checkpoint.rs   — Saving and loading the two stage models
//                     (burn record + JSON manifest) and the
//                     TrainConfig of the last run
//
//   metrics.rs      — Per-epoch regression metrics as CSV
//
//   training_log.rs — Append-only "<timestamp>: <message>"
//                     audit trail of training runs

/// SQLite schema store
pub mod store;

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Training metrics CSV logger
pub mod metrics;

/// Timestamped training log file
pub mod training_log;
