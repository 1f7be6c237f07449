//! Operations carried by graph nodes.
//!
//! Uses a simple enum instead of trait objects for clarity.

use std::fmt;

use serde::Serialize;

use crate::layers::LayerConfig;

/// Coarse kind of a node, used for counting and summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OpKind {
    Input,
    Convolution,
    BatchNorm,
    Activation,
    Merge,
    Dense,
    Output,
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OpKind::Input => "input",
            OpKind::Convolution => "convolution",
            OpKind::BatchNorm => "batch_norm",
            OpKind::Activation => "activation",
            OpKind::Merge => "merge",
            OpKind::Dense => "dense",
            OpKind::Output => "output",
        };
        f.write_str(name)
    }
}

/// How a merge vertex combines its producers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeOp {
    /// Elementwise sum of equally shaped tensors.
    Add,
}

/// Layout adaptation applied to a node's input before the node runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Preprocessor {
    /// Flattens `[batch, channels, height, width]` into
    /// `[batch, channels * height * width]`.
    CnnToFeedForward {
        height: usize,
        width: usize,
        channels: usize,
    },
}

impl Preprocessor {
    pub fn cnn_to_feed_forward(height: usize, width: usize, channels: usize) -> Self {
        Self::CnnToFeedForward {
            height,
            width,
            channels,
        }
    }

    /// Width of the flat vector this preprocessor produces.
    pub fn output_size(&self) -> usize {
        match self {
            Self::CnnToFeedForward {
                height,
                width,
                channels,
            } => height * width * channels,
        }
    }
}

/// Declared tensor type of a graph input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputType {
    /// Spatial input of `channels` planes, each `height x width`.
    Convolutional {
        height: usize,
        width: usize,
        channels: usize,
    },
    /// Flat feature vector.
    FeedForward { size: usize },
}

impl InputType {
    pub fn convolutional(height: usize, width: usize, channels: usize) -> Self {
        Self::Convolutional {
            height,
            width,
            channels,
        }
    }

    pub fn feed_forward(size: usize) -> Self {
        Self::FeedForward { size }
    }
}

/// A computation operation in the graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    /// Graph input; has no producers.
    Input,
    /// Single-producer layer.
    Layer { layer: LayerConfig },
    /// Multi-producer merge vertex.
    Vertex { merge: MergeOp },
}

impl Operation {
    /// Returns the coarse kind of this operation.
    pub fn kind(&self) -> OpKind {
        match self {
            Self::Input => OpKind::Input,
            Self::Vertex { .. } => OpKind::Merge,
            Self::Layer { layer } => match layer {
                LayerConfig::Convolution(_) => OpKind::Convolution,
                LayerConfig::BatchNorm(_) => OpKind::BatchNorm,
                LayerConfig::Activation { .. } => OpKind::Activation,
                LayerConfig::Dense(_) => OpKind::Dense,
                LayerConfig::Output(_) => OpKind::Output,
            },
        }
    }

    /// Returns the layer record, if this is a layer.
    pub fn layer(&self) -> Option<&LayerConfig> {
        match self {
            Self::Layer { layer } => Some(layer),
            _ => None,
        }
    }
}
