// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Coordinates the other layers to accomplish one goal each:
// training, forecasting, or maintaining the schema store.
//
// Rules for this layer:
//   - No model code here (that's Layer 5)
//   - No printing here (that's Layer 1)
//   - No SQL or file formats here (that's Layers 4 and 6)
//   - Only workflow coordination

/// The training workflow
pub mod train_use_case;

/// The two-stage forecast orchestrator
pub mod forecast_use_case;

/// Schema store maintenance and CSV ingestion
pub mod database_use_case;
