// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between the raw historical observations and the
// tensors the trainer consumes:
//
//   CSV files / Schema Store
//       │
//       ▼
//   loader        → RecordBatch<AttendanceRecord | FoodRecord>
//       │
//       ▼
//   joiner        → concatenated rows, food joined on date,
//       │           orphans separated
//       ▼
//   dataset       → TabularSample (encoded features + label)
//       │
//       ▼
//   splitter      → train / validation
//       │
//       ▼
//   preprocessor  → standardised features and labels
//       │
//       ▼
//   batcher       → [N, F] / [N, 1] tensors

/// Reads attendance_*.csv / food_*.csv files
pub mod loader;

/// Concatenates batches and joins food rows onto attendance days
pub mod joiner;

/// Stage datasets built through the feature encoder
pub mod dataset;

/// Seeded train/validation split
pub mod splitter;

/// Column-wise standardisation
pub mod preprocessor;

/// Stacks samples into burn tensors
pub mod batcher;
