//! Shape inference over a finished graph.
//!
//! The graph context never checks that chained layers agree on channel
//! counts or feature widths; that is the engine's job at compile time. This
//! pass is what the engine runs before instantiating modules.

use std::fmt;

use serde::Serialize;

use super::core::Graph;
use super::node::Node;
use super::operation::{InputType, Operation, Preprocessor};
use crate::errors::GraphError;
use crate::layers::LayerConfig;

/// Per-example shape of a tensor flowing along an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Shape {
    /// `[channels, height, width]`
    Spatial {
        channels: usize,
        height: usize,
        width: usize,
    },
    /// `[features]`
    Flat { size: usize },
}

impl Shape {
    /// Number of scalars per example.
    pub fn numel(&self) -> usize {
        match self {
            Shape::Spatial {
                channels,
                height,
                width,
            } => channels * height * width,
            Shape::Flat { size } => *size,
        }
    }
}

impl From<InputType> for Shape {
    fn from(input_type: InputType) -> Self {
        match input_type {
            InputType::Convolutional {
                height,
                width,
                channels,
            } => Shape::Spatial {
                channels,
                height,
                width,
            },
            InputType::FeedForward { size } => Shape::Flat { size },
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Spatial {
                channels,
                height,
                width,
            } => write!(f, "[{channels}, {height}, {width}]"),
            Shape::Flat { size } => write!(f, "[{size}]"),
        }
    }
}

fn mismatch(node: &Node, expected: impl ToString, actual: impl ToString) -> GraphError {
    GraphError::ShapeMismatch {
        label: node.label().to_string(),
        expected: expected.to_string(),
        actual: actual.to_string(),
    }
}

/// Infers the output shape of every node, indexed by node index.
pub fn infer_shapes(graph: &Graph) -> Result<Vec<Shape>, GraphError> {
    let mut shapes: Vec<Shape> = Vec::with_capacity(graph.len());
    let mut next_input = 0;

    for node in graph.nodes() {
        let shape = match node.operation() {
            Operation::Input => {
                let input_type = graph.input_types().get(next_input).copied().ok_or_else(|| {
                    GraphError::MissingInputType {
                        label: node.label().to_string(),
                    }
                })?;
                next_input += 1;
                Shape::from(input_type)
            }
            Operation::Vertex { .. } => {
                let first = shapes[node.producers()[0].index()];
                for producer in &node.producers()[1..] {
                    let other = shapes[producer.index()];
                    if other != first {
                        return Err(mismatch(node, first, other));
                    }
                }
                first
            }
            Operation::Layer { layer } => {
                let mut input = shapes[node.producers()[0].index()];
                if let Some(preprocessor) = node.preprocessor() {
                    input = preprocess(node, preprocessor, input)?;
                }
                layer_output(node, layer, input)?
            }
        };
        shapes.push(shape);
    }

    Ok(shapes)
}

fn preprocess(node: &Node, preprocessor: &Preprocessor, input: Shape) -> Result<Shape, GraphError> {
    match *preprocessor {
        Preprocessor::CnnToFeedForward {
            height,
            width,
            channels,
        } => {
            let expected = Shape::Spatial {
                channels,
                height,
                width,
            };
            if input != expected {
                return Err(mismatch(node, expected, input));
            }
            Ok(Shape::Flat {
                size: preprocessor.output_size(),
            })
        }
    }
}

fn layer_output(node: &Node, layer: &LayerConfig, input: Shape) -> Result<Shape, GraphError> {
    match layer {
        LayerConfig::Convolution(config) => {
            let Shape::Spatial {
                channels,
                height,
                width,
            } = input
            else {
                return Err(mismatch(node, "spatial input", input));
            };
            if channels != config.in_channels {
                return Err(mismatch(
                    node,
                    format!("{} input channels", config.in_channels),
                    format!("{channels} channels"),
                ));
            }
            let (height, width) = config.output_size(height, width).ok_or_else(|| {
                mismatch(
                    node,
                    format!("input at least {:?}", config.kernel_size),
                    input,
                )
            })?;
            Ok(Shape::Spatial {
                channels: config.out_channels,
                height,
                width,
            })
        }
        LayerConfig::BatchNorm(config) => match input {
            Shape::Spatial { channels, .. } if channels == config.num_features => Ok(input),
            Shape::Spatial { channels, .. } => Err(mismatch(
                node,
                format!("{} channels", config.num_features),
                format!("{channels} channels"),
            )),
            Shape::Flat { .. } => Err(mismatch(node, "spatial input", input)),
        },
        LayerConfig::Activation { .. } => Ok(input),
        LayerConfig::Dense(config) => dense_output(node, config.input_size, config.output_size, input),
        LayerConfig::Output(config) => dense_output(node, config.input_size, config.output_size, input),
    }
}

fn dense_output(
    node: &Node,
    input_size: usize,
    output_size: usize,
    input: Shape,
) -> Result<Shape, GraphError> {
    match input {
        Shape::Flat { size } if size == input_size => Ok(Shape::Flat { size: output_size }),
        _ => Err(mismatch(node, Shape::Flat { size: input_size }, input)),
    }
}
