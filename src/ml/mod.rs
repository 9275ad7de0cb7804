// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All burn model code lives here (the checkpoint manager in
// Layer 6 only records and restores modules built here).
//
//   model.rs      — TabularRegressor: standardised inputs,
//                   two ReLU hidden layers, scalar output;
//                   ModelManifest saved next to the weights
//
//   trainer.rs    — fit_regressor: seeded split, scaler fit,
//                   Adam on MSE, per-epoch validation
//
//   inferencer.rs — StageModel (Regressor over a fitted MLP)
//                   and the two stage entry points that turn
//                   raw outputs into non-negative counts
//
//   provider.rs   — ModelProvider: the loaded regressors,
//                   injected into the forecast use case

/// MLP regressor architecture and its manifest
pub mod model;

/// Training loop with validation and metrics
pub mod trainer;

/// Stage predictions from a fitted regressor
pub mod inferencer;

/// Holder of the two loaded stage models
pub mod provider;

#[cfg(test)]
pub mod testing;
