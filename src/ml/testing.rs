//! Stub regressors for tests.

use std::{cell::RefCell, rc::Rc};

use anyhow::Result;

use crate::domain::traits::Regressor;

/// Always predicts the same value.
pub struct ConstantRegressor {
    value:      f64,
    input_size: usize,
}

impl ConstantRegressor {
    pub fn new(value: f64, input_size: usize) -> Self {
        Self { value, input_size }
    }
}

impl Regressor for ConstantRegressor {
    fn input_size(&self) -> usize { self.input_size }

    fn predict(&self, _features: &[f32]) -> Result<f64> { Ok(self.value) }
}

/// Predicts a constant and keeps a copy of every feature vector it saw.
pub struct RecordingRegressor {
    inner: ConstantRegressor,
    seen:  Rc<RefCell<Vec<Vec<f32>>>>,
}

impl RecordingRegressor {
    /// Returns the stub and a handle to its call log.
    pub fn new(value: f64, input_size: usize) -> (Self, Rc<RefCell<Vec<Vec<f32>>>>) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        (Self { inner: ConstantRegressor::new(value, input_size), seen: Rc::clone(&seen) }, seen)
    }
}

impl Regressor for RecordingRegressor {
    fn input_size(&self) -> usize { self.inner.input_size() }

    fn predict(&self, features: &[f32]) -> Result<f64> {
        self.seen.borrow_mut().push(features.to_vec());
        self.inner.predict(features)
    }
}
