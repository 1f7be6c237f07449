//! Batch normalization layer configuration.

use burn::nn::{BatchNorm, BatchNormConfig as BurnBatchNormConfig};
use burn::tensor::backend::Backend;
use serde::Serialize;

/// Configuration for batch normalization over the channel axis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchNormConfig {
    /// Number of normalized features (channels for spatial inputs).
    pub num_features: usize,
    /// Value added to the variance for numerical stability.
    pub epsilon: f64,
    /// Momentum of the running statistics.
    pub momentum: f64,
}

impl BatchNormConfig {
    /// Creates a config with epsilon 1e-5 and momentum 0.1.
    pub fn new(num_features: usize) -> Self {
        Self {
            num_features,
            epsilon: 1e-5,
            momentum: 0.1,
        }
    }

    /// Sets epsilon.
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Sets momentum.
    pub fn with_momentum(mut self, momentum: f64) -> Self {
        self.momentum = momentum;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.num_features == 0 {
            return Err("batch norm needs at least one feature".to_string());
        }
        if self.epsilon <= 0.0 {
            return Err(format!("epsilon must be positive, got {}", self.epsilon));
        }
        if !(0.0..=1.0).contains(&self.momentum) {
            return Err(format!("momentum must be in [0, 1], got {}", self.momentum));
        }
        Ok(())
    }

    /// Instantiates a Burn batch norm over `[batch, channels, height, width]`.
    pub fn init<B: Backend>(&self, device: &B::Device) -> BatchNorm<B> {
        BurnBatchNormConfig::new(self.num_features)
            .with_epsilon(self.epsilon)
            .with_momentum(self.momentum)
            .init(device)
    }
}
