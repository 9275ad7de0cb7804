use burn::{
    nn::{
        loss::{MseLoss, Reduction},
        Linear, LinearConfig,
    },
    prelude::*,
};
use serde::{Deserialize, Serialize};

use crate::data::preprocessor::Standardizer;
use crate::domain::features::Stage;

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct TabularRegressorConfig {
    pub input_size:  usize,
    pub hidden_size: usize,
}

impl TabularRegressorConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> TabularRegressor<B> {
        TabularRegressor {
            hidden1: LinearConfig::new(self.input_size, self.hidden_size).init(device),
            hidden2: LinearConfig::new(self.hidden_size, self.hidden_size).init(device),
            output:  LinearConfig::new(self.hidden_size, 1).init(device),
        }
    }
}

/// Two ReLU hidden layers and a scalar head.
#[derive(Module, Debug)]
pub struct TabularRegressor<B: Backend> {
    pub hidden1: Linear<B>,
    pub hidden2: Linear<B>,
    pub output:  Linear<B>,
}

impl<B: Backend> TabularRegressor<B> {
    /// inputs: [batch, features] → [batch, 1]
    pub fn forward(&self, inputs: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = burn::tensor::activation::relu(self.hidden1.forward(inputs));
        let x = burn::tensor::activation::relu(self.hidden2.forward(x));
        self.output.forward(x)
    }

    /// Mean squared error against standardised targets [batch, 1]
    pub fn forward_loss(&self, inputs: Tensor<B, 2>, targets: Tensor<B, 2>) -> Tensor<B, 1> {
        let predictions = self.forward(inputs);
        MseLoss::new().forward(predictions, targets, Reduction::Mean)
    }
}

/// What a training run learned about its data, saved next to the weights.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub samples:        usize,
    pub train_samples:  usize,
    pub val_samples:    usize,
    pub epochs:         usize,
    /// None when there was no validation split
    pub best_epoch:     Option<usize>,
    pub best_val_loss:  Option<f64>,
    /// Validation MAE of the kept weights, in the label's unit
    pub val_mae:        Option<f64>,
    pub trained_at:     String,
}

/// Everything needed to rebuild a stage model around its weights.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelManifest {
    pub stage:         Stage,
    pub config:        TabularRegressorConfig,
    pub feature_names: Vec<String>,
    pub input_scaler:  Standardizer,
    pub target_scaler: Standardizer,
    pub summary:       TrainingSummary,
}
