// ============================================================
// Layer 4 — Tabular Batcher
// ============================================================
// Burn's DataLoader hands a Vec of samples to a Batcher, which
// stacks them into tensors on the loader's device:
//
//   Input:  N samples, each with F features
//   Output: inputs  [N, F]
//           targets [N, 1]
//
// Samples are expected to be standardised already.

use std::marker::PhantomData;

use burn::{data::dataloader::batcher::Batcher, prelude::*, tensor::TensorData};

use crate::data::dataset::TabularSample;

#[derive(Debug, Clone)]
pub struct TabularBatch<B: Backend> {
    /// Feature matrix — shape: [batch_size, num_features]
    pub inputs: Tensor<B, 2>,

    /// Labels — shape: [batch_size, 1]
    pub targets: Tensor<B, 2>,
}

/// Stateless; the device comes from the DataLoader on every call.
#[derive(Clone, Debug)]
pub struct TabularBatcher<B: Backend> {
    _backend: PhantomData<B>,
}

impl<B: Backend> TabularBatcher<B> {
    pub fn new() -> Self {
        Self { _backend: PhantomData }
    }
}

impl<B: Backend> Default for TabularBatcher<B> {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Burn Batcher Trait Implementation ────────────────────────────────────────
impl<B: Backend> Batcher<B, TabularSample, TabularBatch<B>> for TabularBatcher<B> {
    fn batch(&self, items: Vec<TabularSample>, device: &B::Device) -> TabularBatch<B> {
        let batch_size   = items.len();
        let num_features = items.first().map_or(0, |s| s.features.len());

        let inputs_flat: Vec<f32> = items
            .iter()
            .flat_map(|s| s.features.iter().copied())
            .collect();
        let targets_flat: Vec<f32> = items.iter().map(|s| s.target).collect();

        let inputs = Tensor::<B, 2>::from_data(
            TensorData::new(inputs_flat, [batch_size, num_features]),
            device,
        );
        let targets = Tensor::<B, 2>::from_data(
            TensorData::new(targets_flat, [batch_size, 1]),
            device,
        );

        TabularBatch { inputs, targets }
    }
}
