//! Terminal output layers and their loss functions.

use burn::tensor::{Tensor, backend::Backend};
use serde::{Deserialize, Serialize};

use super::{Activation, DenseConfig};

/// Loss attached to an output layer.
///
/// The graph only records which loss an output is trained against; the
/// optimizer that consumes it belongs to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Loss {
    /// Cross entropy against a target distribution; expects probabilities.
    NegativeLogLikelihood,
    /// Mean Squared Error loss.
    Mse,
}

impl Loss {
    /// Computes the loss between predictions and targets, both `[batch, n]`.
    pub fn compute<B: Backend>(
        &self,
        predictions: Tensor<B, 2>,
        targets: Tensor<B, 2>,
    ) -> Tensor<B, 1> {
        match self {
            Loss::NegativeLogLikelihood => {
                // -mean_batch(sum_i t_i * log(p_i)), clipped away from log(0)
                let epsilon = 1e-7;
                let log_p = predictions.clamp(epsilon, 1.0).log();
                (targets * log_p).sum_dim(1).mean().neg()
            }
            Loss::Mse => {
                let diff = predictions - targets;
                let squared = diff.clone() * diff;
                squared.mean()
            }
        }
    }
}

/// Configuration for a terminal output layer: a dense projection, its
/// activation and the loss it is trained against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputConfig {
    pub input_size: usize,
    pub output_size: usize,
    pub activation: Activation,
    pub loss: Loss,
}

impl OutputConfig {
    /// Softmax output trained with negative log likelihood.
    pub fn softmax(input_size: usize, output_size: usize) -> Self {
        Self {
            input_size,
            output_size,
            activation: Activation::Softmax,
            loss: Loss::NegativeLogLikelihood,
        }
    }

    /// Tanh output trained with mean squared error.
    pub fn tanh(input_size: usize, output_size: usize) -> Self {
        Self {
            input_size,
            output_size,
            activation: Activation::Tanh,
            loss: Loss::Mse,
        }
    }

    pub fn with_activation(mut self, activation: Activation) -> Self {
        self.activation = activation;
        self
    }

    pub fn with_loss(mut self, loss: Loss) -> Self {
        self.loss = loss;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        self.as_dense().validate()
    }

    /// The dense projection this output layer compiles to.
    pub fn as_dense(&self) -> DenseConfig {
        DenseConfig::new(self.input_size, self.output_size).with_activation(self.activation)
    }
}
