//! # zeronet
//!
//! Builds the computation graph of an AlphaGo Zero style policy/value
//! network for 19x19 Go.
//!
//! A board encoded as 11 feature planes passes through a conv-norm stem, a
//! tower of residual (or plain convolutional) blocks, and splits into a
//! policy head (362 move probabilities, pass included) and a value head (a
//! single tanh score).
//!
//! ## Features
//!
//! - **Graph construction**: an append-only [`graph::GraphContext`] that
//!   rejects duplicate labels, unknown producers and malformed layers as soon
//!   as they are added.
//! - **Network builders**: conv-norm blocks, residual blocks, towers and the
//!   two heads, composable on any context.
//! - **Burn Backend**: a finished graph compiles into Burn modules and runs
//!   forward on any backend; WGPU is the default.
//! - **Export**: the topology serializes to JSON for inspection.
//!
//! ## Example
//!
//! ```
//! use zeronet::prelude::*;
//! use burn::backend::NdArray;
//! use burn::tensor::Tensor;
//!
//! type Backend = NdArray;
//!
//! let device = <Backend as burn::tensor::backend::Backend>::Device::default();
//!
//! // A small 5x5 network so the example runs quickly
//! let config = NetworkConfig::new()
//!     .board_size(5)
//!     .channels(4)
//!     .num_blocks(1)
//!     .value_hidden(8);
//! let graph = assemble(&config).expect("Failed to assemble network");
//!
//! let model: CompiledModel<Backend> = graph.compile(&device).unwrap();
//! let board = Tensor::<Backend, 4>::zeros([2, 11, 5, 5], &device);
//! let outputs = model.forward(vec![NodeValue::Spatial(board)]).unwrap();
//!
//! assert_eq!(outputs[0].dims(), [2, 26]);
//! assert_eq!(outputs[1].dims(), [2, 1]);
//! ```

pub mod errors;
pub mod graph;
pub mod layers;
pub mod network;

// Re-exports for convenience
pub use errors::GraphError;
pub use graph::{CompiledModel, Graph, GraphContext};
pub use layers::activation::Activation;
pub use network::{NetworkConfig, assemble};

/// Backend type alias for WGPU with autodiff support.
pub type Backend = burn::backend::Autodiff<burn::backend::Wgpu>;

/// Backend type for inference (no autodiff).
pub type InferenceBackend = burn::backend::Wgpu;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::errors::GraphError;
    pub use crate::graph::{
        CompiledModel, EngineSettings, Graph, GraphContext, InputType, MergeOp, NodeId, NodeValue,
        OpKind, Preprocessor, Shape, Updater, WeightInit,
    };
    pub use crate::layers::{
        Activation, BatchNormConfig, ConvolutionConfig, DenseConfig, Loss, OutputConfig,
        PaddingMode,
    };
    pub use crate::network::{
        ConvBlockConfig, HeadConfig, NetworkConfig, TowerKind, assemble, conv_norm_block,
        convolutional_tower, policy_head, residual_block, residual_tower, value_head,
    };
    pub use crate::{Backend, InferenceBackend};
}
