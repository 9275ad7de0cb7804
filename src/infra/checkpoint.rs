// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores the two stage models.
//
// Per stage, two files sit side by side in the model directory:
//
//   models/
//     attendance_model.mpk.gz   ← burn record (full precision)
//     attendance_model.json     ← ModelManifest: architecture,
//                                 scalers, training summary
//     food_model.mpk.gz
//     food_model.json
//     train_config.json         ← TrainConfig of the last run
//     metrics.csv               ← written by MetricsLogger
//
// The manifest is needed to rebuild the module before its
// weights can be loaded into it, so it is read first.

use anyhow::{bail, Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};
use burn::{
    backend::ndarray::NdArrayDevice,
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkGzFileRecorder, Recorder},
};

use crate::application::train_use_case::TrainConfig;
use crate::domain::features::Stage;
use crate::ml::inferencer::{InferBackend, StageModel};
use crate::ml::model::ModelManifest;

type ModelRecorder = NamedMpkGzFileRecorder<FullPrecisionSettings>;

pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Does not touch the filesystem; directories are created on save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Weights path without extension; the recorder appends `.mpk.gz`.
    fn weights_path(&self, stage: Stage) -> PathBuf {
        self.dir.join(stage.artifact_name())
    }

    fn manifest_path(&self, stage: Stage) -> PathBuf {
        self.dir.join(format!("{}.json", stage.artifact_name()))
    }

    /// True when a manifest for the stage has been written.
    pub fn exists(&self, stage: Stage) -> bool {
        self.manifest_path(stage).is_file()
    }

    pub fn save_stage(&self, model: &StageModel) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create model directory '{}'", self.dir.display()))?;

        let stage = model.stage();
        let path  = self.weights_path(stage);
        ModelRecorder::new()
            .record(model.module().clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save {stage} model to '{}'", path.display()))?;

        let manifest_path = self.manifest_path(stage);
        let json = serde_json::to_string_pretty(model.manifest())?;
        fs::write(&manifest_path, json)
            .with_context(|| format!("Cannot write manifest '{}'", manifest_path.display()))?;

        tracing::debug!("Saved {stage} model to '{}'", self.dir.display());
        Ok(())
    }

    pub fn load_stage(&self, stage: Stage) -> Result<StageModel> {
        let manifest_path = self.manifest_path(stage);
        let json = fs::read_to_string(&manifest_path).with_context(|| {
            format!(
                "Cannot read '{}'. Have you run 'train' first?",
                manifest_path.display()
            )
        })?;
        let manifest: ModelManifest = serde_json::from_str(&json)
            .with_context(|| format!("Malformed manifest '{}'", manifest_path.display()))?;

        if manifest.stage != stage {
            bail!("'{}' holds a {} model, not {stage}", manifest_path.display(), manifest.stage);
        }
        if manifest.config.input_size != stage.feature_count() {
            bail!(
                "{stage} model was fitted on {} features, expected {}",
                manifest.config.input_size,
                stage.feature_count()
            );
        }

        let device = NdArrayDevice::default();
        let path   = self.weights_path(stage);
        let record = ModelRecorder::new()
            .load(path.clone(), &device)
            .with_context(|| format!("Cannot load {stage} weights from '{}'", path.display()))?;

        let model = manifest.config.init::<InferBackend>(&device).load_record(record);
        tracing::debug!("Loaded {stage} model from '{}'", self.dir.display());
        Ok(StageModel::new(manifest, model))
    }

    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create model directory '{}'", self.dir.display()))?;

        let path = self.dir.join("train_config.json");
        let json = serde_json::to_string_pretty(cfg)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;

        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }
}
