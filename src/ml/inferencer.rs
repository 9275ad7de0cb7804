// ============================================================
// Layer 5 — Inferencer
// ============================================================
// StageModel wraps a fitted TabularRegressor with the scalers
// it was trained with and exposes it through the Regressor
// trait. predict_attendance / predict_food_sales turn the raw
// regressor output into a non-negative integer count.

use anyhow::{anyhow, ensure, Result};
use burn::{
    backend::{ndarray::NdArrayDevice, NdArray},
    prelude::*,
    tensor::TensorData,
};

use crate::domain::error::{ForecastError, ForecastResult};
use crate::domain::features::{AttendanceFeatures, FoodFeatures, Stage};
use crate::domain::traits::Regressor;
use crate::ml::model::{ModelManifest, TabularRegressor};
use crate::ml::provider::ModelProvider;

pub type InferBackend = NdArray;

pub struct StageModel {
    manifest: ModelManifest,
    model:    TabularRegressor<InferBackend>,
    device:   NdArrayDevice,
}

impl StageModel {
    pub fn new(manifest: ModelManifest, model: TabularRegressor<InferBackend>) -> Self {
        Self { manifest, model, device: NdArrayDevice::default() }
    }

    pub fn stage(&self) -> Stage {
        self.manifest.stage
    }

    pub fn manifest(&self) -> &ModelManifest {
        &self.manifest
    }

    pub fn module(&self) -> &TabularRegressor<InferBackend> {
        &self.model
    }

    /// Predictions in the label's own unit for a batch of raw feature rows.
    pub fn predict_batch(&self, rows: &[Vec<f32>]) -> Result<Vec<f64>> {
        let width = self.manifest.config.input_size;
        ensure!(!rows.is_empty(), "no rows to predict");
        ensure!(
            rows.iter().all(|r| r.len() == width),
            "{} model expects {} features per row",
            self.stage(),
            width
        );

        let flat: Vec<f32> = rows
            .iter()
            .flat_map(|r| self.manifest.input_scaler.transform(r))
            .collect();
        let inputs = Tensor::<InferBackend, 2>::from_data(
            TensorData::new(flat, [rows.len(), width]),
            &self.device,
        );

        let scaled: Vec<f32> = self
            .model
            .forward(inputs)
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| anyhow!("cannot read model output: {e:?}"))?;

        Ok(scaled
            .into_iter()
            .map(|v| self.manifest.target_scaler.unscale_value(0, v as f64))
            .collect())
    }
}

impl Regressor for StageModel {
    fn input_size(&self) -> usize {
        self.manifest.config.input_size
    }

    fn predict(&self, features: &[f32]) -> Result<f64> {
        self.predict_batch(&[features.to_vec()])?
            .first()
            .copied()
            .ok_or_else(|| anyhow!("model returned no output"))
    }
}

/// Round a continuous prediction to a count; negatives clamp to 0.
fn to_count(stage: Stage, raw: f64) -> ForecastResult<u32> {
    if !raw.is_finite() {
        return Err(ForecastError::PredictionFailed {
            stage,
            reason: format!("model returned {raw}"),
        });
    }
    Ok(raw.round().clamp(0.0, u32::MAX as f64) as u32)
}

fn run_stage(stage: Stage, regressor: &dyn Regressor, features: &[f32]) -> ForecastResult<u32> {
    if regressor.input_size() != features.len() {
        return Err(ForecastError::PredictionFailed {
            stage,
            reason: format!(
                "model expects {} features, got {}",
                regressor.input_size(),
                features.len()
            ),
        });
    }
    let raw = regressor
        .predict(features)
        .map_err(|e| ForecastError::PredictionFailed { stage, reason: format!("{e:#}") })?;
    tracing::debug!("{stage} model: raw output {raw:.3}");
    to_count(stage, raw)
}

/// Stage 1: predicted customers for one day.
pub fn predict_attendance(models: &ModelProvider, features: &AttendanceFeatures) -> ForecastResult<u32> {
    run_stage(Stage::Attendance, models.attendance()?, features)
}

/// Stage 2: predicted unit sales for one dish on one day. `features[4]`
/// and `features[5]` must come from the same query's stage-1 result.
pub fn predict_food_sales(models: &ModelProvider, features: &FoodFeatures) -> ForecastResult<u32> {
    run_stage(Stage::Food, models.food()?, features)
}
