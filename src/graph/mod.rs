//! Computation graph construction.
//!
//! A [`GraphContext`] is the mutable, append-only side of construction;
//! [`GraphContext::build`] validates it into an immutable [`Graph`], which
//! can be exported as JSON or compiled into Burn modules.
//!
//! # Example
//!
//! ```
//! use zeronet::graph::{GraphContext, InputType, OpKind};
//! use zeronet::layers::{Activation, BatchNormConfig, ConvolutionConfig};
//!
//! let mut ctx = GraphContext::new();
//! let input = ctx.add_input("in").unwrap();
//! ctx.set_input_types(vec![InputType::convolutional(19, 19, 11)]);
//! let conv = ctx
//!     .add_layer("conv", ConvolutionConfig::new(11, 32), &[input])
//!     .unwrap();
//! let bn = ctx.add_layer("bn", BatchNormConfig::new(32), &[conv]).unwrap();
//! let relu = ctx.add_layer("relu", Activation::Relu, &[bn]).unwrap();
//! ctx.set_outputs(&[relu]);
//!
//! let graph = ctx.build().unwrap();
//! assert_eq!(graph.count_kind(OpKind::Convolution), 1);
//! assert_eq!(graph.infer_shapes().unwrap()[relu.index()].numel(), 32 * 19 * 19);
//! ```

mod compile;
mod context;
mod core;
mod model;
mod node;
mod operation;
mod settings;
mod shape;

pub use compile::{GraphExport, NodeExport};
pub use context::GraphContext;
pub use self::core::{Graph, GraphId};
pub use model::{CompiledModel, NodeValue};
pub use node::{Node, NodeId};
pub use operation::{InputType, MergeOp, OpKind, Operation, Preprocessor};
pub use settings::{EngineSettings, Updater, WeightInit};
pub use shape::Shape;
