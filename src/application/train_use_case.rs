// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Collect attendance + food batches  (Layer 4 / 6)
//   Step 2: Concatenate same-entity batches    (Layer 4 - data)
//   Step 3: Drop repeated attendance dates     (Layer 4 - data)
//   Step 4: Join food rows onto attendance     (Layer 4 - data)
//   Step 5: Save config                        (Layer 6 - infra)
//   Step 6: Fit the attendance model           (Layer 5 - ml)
//   Step 7: Fit the food model                 (Layer 5 - ml)
//   Step 8: Persist both models                (Layer 6 - infra)
//
// Every step is written to the training log. Nothing is saved
// until both stages have been fitted; a fitting failure leaves
// the model directory as it was. The two saves themselves are
// not atomic as a pair.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::{
    dataset::TabularDataset,
    joiner::{concat_batches, dedup_attendance, join_on_date},
    loader::CsvDirectorySource,
};
use crate::domain::traits::RecordSource;
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::MetricsLogger,
    store::SchemaStore,
    training_log::TrainingLog,
};
use crate::ml::model::TrainingSummary;
use crate::ml::trainer::{fit_regressor, FitOptions};

// ─── Training Configuration ──────────────────────────────────────────────────
// Serialisable so every run leaves its settings next to the models.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub attendance_dir: String,
    pub food_dir:       String,
    /// Train from the schema store instead of the CSV directories
    pub db_path:        Option<String>,
    pub model_dir:      String,
    pub log_file:       String,
    pub epochs:         usize,
    pub batch_size:     usize,
    pub lr:             f64,
    pub hidden_size:    usize,
    pub train_fraction: f64,
    pub seed:           u64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        let fit = FitOptions::default();
        Self {
            attendance_dir: "attendance_data".to_string(),
            food_dir:       "food_data".to_string(),
            db_path:        None,
            model_dir:      "models".to_string(),
            log_file:       "logs/training_log.txt".to_string(),
            epochs:         fit.epochs,
            batch_size:     fit.batch_size,
            lr:             fit.lr,
            hidden_size:    fit.hidden_size,
            train_fraction: fit.train_fraction,
            seed:           fit.seed,
        }
    }
}

impl TrainConfig {
    pub fn fit_options(&self) -> FitOptions {
        FitOptions {
            epochs:         self.epochs,
            batch_size:     self.batch_size,
            lr:             self.lr,
            hidden_size:    self.hidden_size,
            train_fraction: self.train_fraction,
            seed:           self.seed,
        }
    }
}

/// What a successful run did.
#[derive(Debug, Clone)]
pub struct TrainReport {
    pub attendance_rows:    usize,
    pub food_rows:          usize,
    pub orphaned_food_rows: usize,
    pub duplicate_dates:    usize,
    pub attendance:         TrainingSummary,
    pub food:               TrainingSummary,
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Train from the configured source and log to the configured file.
    pub fn execute(&self) -> Result<TrainReport> {
        let cfg = &self.config;
        let log = TrainingLog::new(&cfg.log_file);

        let source: Box<dyn RecordSource> = match &cfg.db_path {
            Some(db) => Box::new(SchemaStore::new(db)),
            None     => Box::new(CsvDirectorySource::new(&cfg.attendance_dir, &cfg.food_dir)),
        };
        self.execute_with(source.as_ref(), &log)
    }

    /// Run the pipeline against any record source. A failure is
    /// written to the log with its full chain, then returned.
    pub fn execute_with(&self, source: &dyn RecordSource, log: &TrainingLog) -> Result<TrainReport> {
        let result = self.run(source, log);
        if let Err(e) = &result {
            tracing::error!("Training failed: {e:#}");
            if let Err(log_err) = log.append(&format!("Training failed: {e:#}")) {
                tracing::warn!("Could not write to training log: {log_err:#}");
            }
        }
        result
    }

    fn run(&self, source: &dyn RecordSource, log: &TrainingLog) -> Result<TrainReport> {
        let cfg = &self.config;
        log.append(&format!("Training started from {}", source.describe()))?;

        // ── Step 1-2: Collect and concatenate ─────────────────────────────────
        let batches = source.attendance_batches().context("Cannot collect attendance data")?;
        let batch_count = batches.len();
        let attendance = concat_batches(batches)?;
        log.append(&format!("Loaded {} attendance rows from {batch_count} source(s)", attendance.len()))?;

        let batches = source.food_batches().context("Cannot collect food data")?;
        let batch_count = batches.len();
        let food = concat_batches(batches)?;
        log.append(&format!("Loaded {} food rows from {batch_count} source(s)", food.len()))?;

        // ── Step 3: Repeated dates ────────────────────────────────────────────
        let (attendance, duplicates) = dedup_attendance(attendance);
        if !duplicates.is_empty() {
            tracing::warn!("Repeated attendance dates: {duplicates:?}");
            log.append(&format!(
                "Dropped {} attendance row(s) with a repeated date; first occurrence kept",
                duplicates.len()
            ))?;
        }

        // ── Step 4: Join ──────────────────────────────────────────────────────
        let joined = join_on_date(food, &attendance);
        if !joined.orphaned.is_empty() {
            for row in &joined.orphaned {
                tracing::debug!("Orphaned food row: {} on {}", row.dish_name, row.date);
            }
            log.append(&format!(
                "Dropped {} food row(s) with no attendance record for their date",
                joined.orphaned.len()
            ))?;
        }

        // ── Step 5: Config ────────────────────────────────────────────────────
        let checkpoints = CheckpointManager::new(&cfg.model_dir);
        checkpoints.save_config(cfg)?;
        let metrics = MetricsLogger::new(&cfg.model_dir)?;
        let opts    = cfg.fit_options();

        // ── Step 6: Attendance model ──────────────────────────────────────────
        log.append(&format!("Fitting attendance model on {} rows", attendance.len()))?;
        let attendance_model = fit_regressor(TabularDataset::attendance(&attendance), &opts, &metrics)?;
        log.append(&fitted_message("Attendance", &attendance_model.manifest().summary))?;

        // ── Step 7: Food model ────────────────────────────────────────────────
        log.append(&format!("Fitting food model on {} rows", joined.rows.len()))?;
        let food_model = fit_regressor(TabularDataset::food(&joined.rows), &opts, &metrics)?;
        log.append(&fitted_message("Food", &food_model.manifest().summary))?;

        // ── Step 8: Persist ───────────────────────────────────────────────────
        checkpoints.save_stage(&attendance_model)?;
        checkpoints.save_stage(&food_model)?;
        log.append(&format!("Saved models to '{}'", cfg.model_dir))?;
        log.append("Training complete")?;

        Ok(TrainReport {
            attendance_rows:    attendance.len(),
            food_rows:          joined.rows.len(),
            orphaned_food_rows: joined.orphaned.len(),
            duplicate_dates:    duplicates.len(),
            attendance:         attendance_model.manifest().summary.clone(),
            food:               food_model.manifest().summary.clone(),
        })
    }
}

fn fitted_message(name: &str, summary: &TrainingSummary) -> String {
    match summary.val_mae {
        Some(mae) => format!(
            "{name} model fitted: {} epochs, validation MAE {mae:.2}",
            summary.epochs
        ),
        None => format!("{name} model fitted: {} epochs, no validation rows", summary.epochs),
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    use crate::application::forecast_use_case::{FoodQuery, ForecastUseCase};
    use crate::domain::error::ForecastError;
    use crate::domain::features::Stage;
    use crate::domain::records::{
        tests::{attendance, food},
        AttendanceRecord, FoodRecord, ATTENDANCE_COLUMNS, FOOD_COLUMNS,
    };
    use crate::domain::traits::RecordBatch;
    use crate::ml::provider::ModelProvider;

    struct MemorySource {
        attendance: Vec<RecordBatch<AttendanceRecord>>,
        food:       Vec<RecordBatch<FoodRecord>>,
    }

    impl RecordSource for MemorySource {
        fn describe(&self) -> String { "memory".to_string() }

        fn attendance_batches(&self) -> Result<Vec<RecordBatch<AttendanceRecord>>> {
            Ok(self.attendance.clone())
        }

        fn food_batches(&self) -> Result<Vec<RecordBatch<FoodRecord>>> {
            Ok(self.food.clone())
        }
    }

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    /// 24 days of July 2024, two dishes per day, plus one orphaned dish row.
    fn history() -> MemorySource {
        let start = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
        let mut days   = Vec::new();
        let mut dishes = Vec::new();
        for i in 0..24u32 {
            let date = (start + Duration::days(i as i64)).format("%Y-%m-%d").to_string();
            days.push(attendance(&date, 60 + 3 * i));
            dishes.push(food(&date, "moussaka", 15 + i));
            dishes.push(food(&date, "gyros", 25 + i / 2));
        }
        dishes.push(food("2024-12-24", "gyros", 10));

        MemorySource {
            attendance: vec![RecordBatch::new("memory", columns(&ATTENDANCE_COLUMNS), days)],
            food:       vec![RecordBatch::new("memory", columns(&FOOD_COLUMNS), dishes)],
        }
    }

    fn config(dir: &std::path::Path) -> TrainConfig {
        TrainConfig {
            model_dir:   dir.join("models").display().to_string(),
            log_file:    dir.join("logs/training_log.txt").display().to_string(),
            epochs:      4,
            batch_size:  8,
            hidden_size: 8,
            ..TrainConfig::default()
        }
    }

    #[test]
    fn test_training_fits_saves_and_reloads_both_models() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        let log = TrainingLog::new(&cfg.log_file);

        let report = TrainUseCase::new(cfg.clone()).execute_with(&history(), &log).unwrap();
        assert_eq!(report.attendance_rows, 24);
        assert_eq!(report.food_rows, 48);
        assert_eq!(report.orphaned_food_rows, 1);
        assert_eq!(report.attendance.samples, 24);

        let models = ModelProvider::load(CheckpointManager::new(&cfg.model_dir));
        assert!(models.is_ready());

        let forecaster = ForecastUseCase::new(models);
        let query = FoodQuery::new(
            "moussaka",
            NaiveDate::from_ymd_opt(2024, 7, 15).unwrap(),
            28.0,
            12.5,
        );
        assert!(forecaster.forecast_status(&query).is_success());

        let text = std::fs::read_to_string(&cfg.log_file).unwrap();
        assert!(text.contains("Dropped 1 food row(s)"));
        assert!(text.lines().last().unwrap().ends_with(": Training complete"));
        assert!(dir.path().join("models/train_config.json").is_file());
        assert!(dir.path().join("models/metrics.csv").is_file());
    }

    #[test]
    fn test_running_forecaster_picks_up_models_after_reload() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        let log = TrainingLog::new(&cfg.log_file);

        let mut forecaster = ForecastUseCase::new(ModelProvider::load(CheckpointManager::new(&cfg.model_dir)));
        let query = FoodQuery::new(
            "gyros",
            NaiveDate::from_ymd_opt(2024, 7, 20).unwrap(),
            30.0,
            9.0,
        );
        assert!(matches!(forecaster.forecast(&query), Err(ForecastError::ModelUnavailable(_))));
        assert!(!forecaster.forecast_status(&query).is_success());

        TrainUseCase::new(cfg.clone()).execute_with(&history(), &log).unwrap();

        // trained files alone do not change an already loaded forecaster
        assert!(!forecaster.forecast_status(&query).is_success());

        forecaster.reload_models();
        let forecast = forecaster.forecast(&query).unwrap();
        assert_eq!(forecast.dish_name, "gyros");
        assert!(forecaster.forecast_status(&query).is_success());
    }

    #[test]
    fn test_mismatched_batches_abort_and_are_logged() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        let log = TrainingLog::new(&cfg.log_file);

        let mut source = history();
        let mut shuffled = columns(&ATTENDANCE_COLUMNS);
        shuffled.swap(0, 1);
        source.attendance.push(RecordBatch::new("second.csv", shuffled, Vec::new()));

        let err = TrainUseCase::new(cfg.clone()).execute_with(&source, &log).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ForecastError>(),
            Some(ForecastError::SchemaMismatch { .. })
        ));
        let text = std::fs::read_to_string(&cfg.log_file).unwrap();
        assert!(text.contains("Training failed: schema mismatch in second.csv"));
        assert!(!CheckpointManager::new(&cfg.model_dir).exists(Stage::Attendance));
    }

    #[test]
    fn test_no_joinable_food_rows_is_insufficient_data() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        let log = TrainingLog::new(&cfg.log_file);

        let mut source = history();
        source.food = vec![RecordBatch::new(
            "memory",
            columns(&FOOD_COLUMNS),
            vec![food("2030-01-01", "gyros", 3)],
        )];

        let err = TrainUseCase::new(cfg.clone()).execute_with(&source, &log).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ForecastError>(),
            Some(ForecastError::InsufficientData(Stage::Food))
        ));
        // neither stage is persisted when the second one fails
        assert!(!CheckpointManager::new(&cfg.model_dir).exists(Stage::Attendance));
    }
}
