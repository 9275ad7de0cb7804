// ============================================================
// Layer 5 — Model Provider
// ============================================================
// Owns the two fitted regressors for the lifetime of a process.
// Built once at start-up from the checkpoint directory and
// handed to the forecast use case; reload() re-reads the
// directory after a training run.
//
// A stage whose artifacts are missing or unreadable is left
// empty. Asking for it yields ModelUnavailable instead of
// aborting the process.

use crate::domain::error::{ForecastError, ForecastResult};
use crate::domain::features::Stage;
use crate::domain::traits::Regressor;
use crate::infra::checkpoint::CheckpointManager;

pub struct ModelProvider {
    checkpoints: Option<CheckpointManager>,
    attendance:  Option<Box<dyn Regressor>>,
    food:        Option<Box<dyn Regressor>>,
}

impl ModelProvider {
    pub fn load(checkpoints: CheckpointManager) -> Self {
        let mut provider = Self { checkpoints: Some(checkpoints), attendance: None, food: None };
        provider.reload();
        provider
    }

    /// Provider over already-built regressors, with nothing to reload from.
    pub fn from_regressors(
        attendance: Option<Box<dyn Regressor>>,
        food:       Option<Box<dyn Regressor>>,
    ) -> Self {
        Self { checkpoints: None, attendance, food }
    }

    pub fn reload(&mut self) {
        let Some(checkpoints) = &self.checkpoints else {
            return;
        };
        self.attendance = load_stage(checkpoints, Stage::Attendance);
        self.food       = load_stage(checkpoints, Stage::Food);
    }

    pub fn attendance(&self) -> ForecastResult<&dyn Regressor> {
        self.attendance
            .as_deref()
            .ok_or(ForecastError::ModelUnavailable(Stage::Attendance))
    }

    pub fn food(&self) -> ForecastResult<&dyn Regressor> {
        self.food
            .as_deref()
            .ok_or(ForecastError::ModelUnavailable(Stage::Food))
    }

    pub fn is_ready(&self) -> bool {
        self.attendance.is_some() && self.food.is_some()
    }
}

fn load_stage(checkpoints: &CheckpointManager, stage: Stage) -> Option<Box<dyn Regressor>> {
    if !checkpoints.exists(stage) {
        tracing::warn!(
            "No {stage} model in '{}'; {stage} predictions are unavailable until training runs",
            checkpoints.dir().display()
        );
        return None;
    }
    match checkpoints.load_stage(stage) {
        Ok(model) => {
            tracing::info!("Loaded {stage} model from '{}'", checkpoints.dir().display());
            Some(Box::new(model))
        }
        Err(e) => {
            tracing::warn!("{stage} model could not be loaded: {e:#}");
            None
        }
    }
}
