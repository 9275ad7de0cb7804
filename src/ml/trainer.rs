// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Fits one stage regressor with Adam on standardised data:
//
//   TabularDataset
//       │ split_train_val (seeded)
//       ▼
//   Standardizer fitted on the training split only
//       │
//       ▼
//   epoch loop: DataLoader (seeded shuffle) → MSE → Adam step
//       │       validation loader on model.valid() (no autodiff)
//       ▼
//   StageModel (best validation epoch, or last epoch when
//               there is no validation split)
//
// Training runs on Autodiff<NdArray>; model.valid() returns the
// same module on plain NdArray, which is what inference uses.

use anyhow::{anyhow, ensure, Result};
use burn::{
    backend::{ndarray::NdArrayDevice, Autodiff, NdArray},
    data::{
        dataloader::{DataLoader, DataLoaderBuilder},
        dataset::Dataset,
    },
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
};

use crate::data::{
    batcher::{TabularBatch, TabularBatcher},
    dataset::{TabularDataset, TabularSample},
    preprocessor::Standardizer,
    splitter::split_train_val,
};
use crate::domain::error::ForecastError;
use crate::infra::metrics::{EpochMetrics, MetricsLogger};
use crate::ml::inferencer::{InferBackend, StageModel};
use crate::ml::model::{ModelManifest, TabularRegressor, TabularRegressorConfig, TrainingSummary};

pub type TrainBackend = Autodiff<NdArray>;

/// Hyper-parameters shared by both stages.
#[derive(Debug, Clone)]
pub struct FitOptions {
    pub epochs:         usize,
    pub batch_size:     usize,
    pub lr:             f64,
    pub hidden_size:    usize,
    pub train_fraction: f64,
    pub seed:           u64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            epochs:         200,
            batch_size:     32,
            lr:             1e-3,
            hidden_size:    32,
            train_fraction: 0.8,
            seed:           42,
        }
    }
}

pub fn fit_regressor(
    dataset: TabularDataset,
    opts:    &FitOptions,
    metrics: &MetricsLogger,
) -> Result<StageModel> {
    let stage = dataset.stage();
    let width = stage.feature_count();
    let feature_names: Vec<String> = dataset.feature_names().iter().map(|s| s.to_string()).collect();

    ensure!(opts.epochs > 0, "epochs must be at least 1");
    ensure!(opts.batch_size > 0, "batch_size must be at least 1");
    ensure!(opts.lr > 0.0 && opts.lr.is_finite(), "learning rate must be positive");

    if dataset.is_empty() {
        return Err(ForecastError::InsufficientData(stage).into());
    }
    let total = dataset.len();

    let (train, val) = split_train_val(dataset.into_samples(), opts.train_fraction, opts.seed);
    if train.is_empty() {
        return Err(ForecastError::InsufficientData(stage).into());
    }
    tracing::info!("{stage}: {} training rows, {} validation rows", train.len(), val.len());

    // ── Scalers (training split only) ─────────────────────────────────────────
    let feature_rows: Vec<&[f32]> = train.iter().map(|s| s.features.as_slice()).collect();
    let target_rows:  Vec<[f32; 1]> = train.iter().map(|s| [s.target]).collect();
    let input_scaler  = Standardizer::fit(&feature_rows, width);
    let target_scaler = Standardizer::fit(&target_rows, 1);

    let train_samples = train.len();
    let val_samples   = val.len();
    let train_dataset = TabularDataset::new(stage, scale_samples(&train, &input_scaler, &target_scaler));
    let val_dataset   = TabularDataset::new(stage, scale_samples(&val, &input_scaler, &target_scaler));

    // ── Model + optimiser ─────────────────────────────────────────────────────
    let device = NdArrayDevice::default();
    let config = TabularRegressorConfig::new(width, opts.hidden_size);
    let mut model: TabularRegressor<TrainBackend> = config.init(&device);
    let mut optim = AdamConfig::new().with_epsilon(1e-8).init();

    // ── Training data loader (reshuffled every epoch) ─────────────────────────
    let train_loader = DataLoaderBuilder::new(TabularBatcher::<TrainBackend>::new())
        .batch_size(opts.batch_size)
        .shuffle(opts.seed)
        .set_device(device.clone())
        .build(train_dataset);

    // ── Validation data loader (no autodiff) ──────────────────────────────────
    let val_loader = DataLoaderBuilder::new(TabularBatcher::<InferBackend>::new())
        .batch_size(opts.batch_size)
        .set_device(device)
        .build(val_dataset);

    let mut best: Option<(usize, f64, f64, TabularRegressor<InferBackend>)> = None;

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in 1..=opts.epochs {
        let mut loss_sum = 0.0f64;
        let mut batches  = 0usize;
        for batch in train_loader.iter() {
            let loss = model.forward_loss(batch.inputs, batch.targets);
            loss_sum += loss.clone().into_scalar().elem::<f64>();
            batches  += 1;

            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(opts.lr, model, grads);
        }
        let train_loss = loss_sum / batches as f64;

        let (val_loss, val_mae) = if val_samples == 0 {
            (f64::NAN, f64::NAN)
        } else {
            evaluate(&model.valid(), val_loader.as_ref(), &target_scaler)?
        };

        let row = EpochMetrics::new(stage, epoch, train_loss, val_loss, val_mae);
        metrics.log(&row)?;

        let best_loss = best.as_ref().map_or(f64::INFINITY, |(_, loss, _, _)| *loss);
        if row.is_improvement(best_loss) {
            best = Some((epoch, val_loss, val_mae, model.valid()));
        }

        if epoch == 1 || epoch == opts.epochs || epoch % 25 == 0 {
            tracing::info!(
                "{stage} epoch {:>4}/{} | train_loss={:.4} | val_loss={:.4} | val_mae={:.2}",
                epoch, opts.epochs, train_loss, val_loss, val_mae,
            );
        }
    }

    let (best_epoch, best_val_loss, val_mae, kept) = match best {
        Some((epoch, loss, mae, weights)) => (Some(epoch), Some(loss), Some(mae), weights),
        None => (None, None, None, model.valid()),
    };
    if let Some(epoch) = best_epoch {
        tracing::info!("{stage}: keeping weights from epoch {epoch}");
    }

    let manifest = ModelManifest {
        stage,
        config,
        feature_names,
        input_scaler,
        target_scaler,
        summary: TrainingSummary {
            samples: total,
            train_samples,
            val_samples,
            epochs: opts.epochs,
            best_epoch,
            best_val_loss,
            val_mae,
            trained_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        },
    };

    Ok(StageModel::new(manifest, kept))
}

fn scale_samples(samples: &[TabularSample], input: &Standardizer, target: &Standardizer) -> Vec<TabularSample> {
    samples
        .iter()
        .map(|s| TabularSample {
            features: input.transform(&s.features),
            target:   target.scale_value(0, s.target as f64) as f32,
        })
        .collect()
}

/// (MSE on scaled targets, MAE in the label's unit) over every
/// validation batch.
fn evaluate(
    model:         &TabularRegressor<InferBackend>,
    loader:        &dyn DataLoader<InferBackend, TabularBatch<InferBackend>>,
    target_scaler: &Standardizer,
) -> Result<(f64, f64)> {
    let mut sq_err  = 0.0f64;
    let mut abs_err = 0.0f64;
    let mut count   = 0usize;

    for batch in loader.iter() {
        let predictions = read_column(model.forward(batch.inputs))?;
        let targets     = read_column(batch.targets)?;
        for (&p, &t) in predictions.iter().zip(&targets) {
            let (p, t) = (p as f64, t as f64);
            sq_err  += (p - t).powi(2);
            abs_err += (target_scaler.unscale_value(0, p) - target_scaler.unscale_value(0, t)).abs();
        }
        count += targets.len();
    }

    ensure!(count > 0, "validation loader produced no rows");
    Ok((sq_err / count as f64, abs_err / count as f64))
}

fn read_column(tensor: Tensor<InferBackend, 2>) -> Result<Vec<f32>> {
    tensor
        .into_data()
        .to_vec::<f32>()
        .map_err(|e| anyhow!("cannot read validation output: {e:?}"))
}
