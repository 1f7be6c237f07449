//! Layer configuration records.
//!
//! Every layer kind the graph can hold is described by a plain, immutable
//! record. Records are validated before they are inserted into a
//! [`GraphContext`](crate::graph::GraphContext), and each one knows how to
//! instantiate the matching Burn module when a graph is compiled.

pub mod activation;
pub mod batch_norm;
pub mod conv;
pub mod dense;
pub mod output;

use serde::Serialize;

pub use activation::Activation;
pub use batch_norm::BatchNormConfig;
pub use conv::{ConvolutionConfig, PaddingMode};
pub use dense::{Dense, DenseConfig};
pub use output::{Loss, OutputConfig};

/// Parameters of a single-producer layer node.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LayerConfig {
    Convolution(ConvolutionConfig),
    BatchNorm(BatchNormConfig),
    Activation { activation: Activation },
    Dense(DenseConfig),
    Output(OutputConfig),
}

impl LayerConfig {
    /// Validates the wrapped record.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Self::Convolution(config) => config.validate(),
            Self::BatchNorm(config) => config.validate(),
            Self::Activation { .. } => Ok(()),
            Self::Dense(config) => config.validate(),
            Self::Output(config) => config.validate(),
        }
    }
}

impl From<ConvolutionConfig> for LayerConfig {
    fn from(config: ConvolutionConfig) -> Self {
        Self::Convolution(config)
    }
}

impl From<BatchNormConfig> for LayerConfig {
    fn from(config: BatchNormConfig) -> Self {
        Self::BatchNorm(config)
    }
}

impl From<Activation> for LayerConfig {
    fn from(activation: Activation) -> Self {
        Self::Activation { activation }
    }
}

impl From<DenseConfig> for LayerConfig {
    fn from(config: DenseConfig) -> Self {
        Self::Dense(config)
    }
}

impl From<OutputConfig> for LayerConfig {
    fn from(config: OutputConfig) -> Self {
        Self::Output(config)
    }
}
