// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types and traits that define the core concepts:
// the two record types, the feature encoder, the error
// taxonomy and the seams other layers implement.
//
// Rules for this layer:
//   - NO burn types
//   - NO file or database I/O
//   - encoding is pure and deterministic

/// Typed error taxonomy shared by every layer
pub mod error;

/// Fixed-order feature vectors and the season rule
pub mod features;

/// AttendanceRecord / FoodRecord
pub mod records;

/// Regressor and RecordSource abstractions
pub mod traits;
