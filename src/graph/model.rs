//! CompiledModel - a graph instantiated as Burn modules.

use std::collections::HashMap;

use burn::module::Module;
use burn::nn::BatchNorm;
use burn::nn::conv::Conv2d;
use burn::tensor::{Tensor, backend::Backend};

use crate::errors::GraphError;
use crate::layers::{Activation, Dense, LayerConfig, Loss};

use super::core::Graph;
use super::node::NodeId;
use super::operation::{MergeOp, Operation};
use super::shape::{Shape, infer_shapes};

/// A tensor flowing between nodes: spatial `[batch, c, h, w]` or flat
/// `[batch, n]`.
#[derive(Debug)]
pub enum NodeValue<B: Backend> {
    Spatial(Tensor<B, 4>),
    Flat(Tensor<B, 2>),
}

impl<B: Backend> Clone for NodeValue<B> {
    fn clone(&self) -> Self {
        match self {
            Self::Spatial(tensor) => Self::Spatial(tensor.clone()),
            Self::Flat(tensor) => Self::Flat(tensor.clone()),
        }
    }
}

impl<B: Backend> NodeValue<B> {
    /// Flattens spatial values into `[batch, c * h * w]`.
    pub fn into_flat(self) -> Tensor<B, 2> {
        match self {
            Self::Spatial(tensor) => tensor.flatten(1, 3),
            Self::Flat(tensor) => tensor,
        }
    }

    fn batch_size(&self) -> usize {
        match self {
            Self::Spatial(tensor) => tensor.dims()[0],
            Self::Flat(tensor) => tensor.dims()[0],
        }
    }

    fn matches(&self, shape: &Shape) -> bool {
        match (self, shape) {
            (
                Self::Spatial(tensor),
                Shape::Spatial {
                    channels,
                    height,
                    width,
                },
            ) => {
                let [_, c, h, w] = tensor.dims();
                [c, h, w] == [*channels, *height, *width]
            }
            (Self::Flat(tensor), Shape::Flat { size }) => tensor.dims()[1] == *size,
            _ => false,
        }
    }

    fn activate(self, activation: Activation) -> Self {
        match self {
            Self::Spatial(tensor) => Self::Spatial(activation.apply(tensor)),
            Self::Flat(tensor) => Self::Flat(activation.apply(tensor)),
        }
    }

    fn add(self, other: Self) -> Self {
        match (self, other) {
            (Self::Spatial(a), Self::Spatial(b)) => Self::Spatial(a + b),
            (a, b) => Self::Flat(a.into_flat() + b.into_flat()),
        }
    }

    fn spatial(self) -> Tensor<B, 4> {
        match self {
            Self::Spatial(tensor) => tensor,
            // Shape inference rejects flat inputs to spatial layers.
            Self::Flat(tensor) => {
                let [batch, size] = tensor.dims();
                tensor.reshape([batch, size, 1, 1])
            }
        }
    }
}

impl<B: Backend> From<Tensor<B, 4>> for NodeValue<B> {
    fn from(tensor: Tensor<B, 4>) -> Self {
        Self::Spatial(tensor)
    }
}

impl<B: Backend> From<Tensor<B, 2>> for NodeValue<B> {
    fn from(tensor: Tensor<B, 2>) -> Self {
        Self::Flat(tensor)
    }
}

/// Execution step in the forward pass, one per graph node.
#[derive(Debug, Clone)]
enum Step {
    Input {
        slot: usize,
    },
    Convolution {
        input: usize,
    },
    BatchNorm {
        input: usize,
    },
    Activation {
        input: usize,
        activation: Activation,
    },
    Merge {
        inputs: Vec<usize>,
        merge: MergeOp,
    },
    Dense {
        input: usize,
        flatten: bool,
    },
}

/// A graph with initialized weights, ready for inference.
///
/// # Example
///
/// ```
/// use burn::backend::NdArray;
/// use burn::tensor::{Tensor, backend::Backend};
/// use zeronet::graph::{GraphContext, InputType, Preprocessor};
/// use zeronet::layers::OutputConfig;
///
/// let device = <NdArray as Backend>::Device::default();
/// let mut ctx = GraphContext::new();
/// let input = ctx.add_input("in").unwrap();
/// ctx.set_input_types(vec![InputType::convolutional(3, 3, 2)]);
/// let out = ctx
///     .add_layer_with_preprocessor(
///         "out",
///         OutputConfig::softmax(18, 10),
///         Preprocessor::cnn_to_feed_forward(3, 3, 2),
///         &[input],
///     )
///     .unwrap();
/// ctx.set_outputs(&[out]);
///
/// let model = ctx.build().unwrap().compile::<NdArray>(&device).unwrap();
/// let outputs = model
///     .forward(vec![Tensor::<NdArray, 4>::zeros([4, 2, 3, 3], &device).into()])
///     .unwrap();
/// assert_eq!(outputs[0].dims(), [4, 10]);
/// ```
#[derive(Debug)]
pub struct CompiledModel<B: Backend> {
    labels: Vec<String>,
    steps: Vec<Step>,
    shapes: Vec<Shape>,
    input_count: usize,
    outputs: Vec<usize>,
    output_losses: Vec<Option<Loss>>,
    convolutions: HashMap<usize, Conv2d<B>>,
    batch_norms: HashMap<usize, BatchNorm<B>>,
    dense_layers: HashMap<usize, Dense<B>>,
}

impl<B: Backend> CompiledModel<B> {
    /// Checks shapes and initializes every layer of `graph` on `device`.
    pub fn new(graph: &Graph, device: &B::Device) -> Result<Self, GraphError> {
        let shapes = infer_shapes(graph)?;
        let initializer = graph.settings().weight_init.initializer();

        let mut steps = Vec::with_capacity(graph.len());
        let mut convolutions = HashMap::new();
        let mut batch_norms = HashMap::new();
        let mut dense_layers = HashMap::new();
        let mut input_count = 0;

        for node in graph.nodes() {
            let index = node.id().index();
            let step = match node.operation() {
                Operation::Input => {
                    input_count += 1;
                    Step::Input {
                        slot: input_count - 1,
                    }
                }
                Operation::Vertex { merge } => Step::Merge {
                    inputs: node.producers().iter().map(|p| p.index()).collect(),
                    merge: *merge,
                },
                Operation::Layer { layer } => {
                    let input = node.producers()[0].index();
                    match layer {
                        LayerConfig::Convolution(config) => {
                            convolutions.insert(index, config.init(initializer.clone(), device));
                            Step::Convolution { input }
                        }
                        LayerConfig::BatchNorm(config) => {
                            batch_norms.insert(index, config.init(device));
                            Step::BatchNorm { input }
                        }
                        LayerConfig::Activation { activation } => Step::Activation {
                            input,
                            activation: *activation,
                        },
                        LayerConfig::Dense(config) => {
                            dense_layers.insert(index, config.init(initializer.clone(), device));
                            Step::Dense {
                                input,
                                flatten: node.preprocessor().is_some(),
                            }
                        }
                        LayerConfig::Output(config) => {
                            dense_layers
                                .insert(index, config.as_dense().init(initializer.clone(), device));
                            Step::Dense {
                                input,
                                flatten: node.preprocessor().is_some(),
                            }
                        }
                    }
                }
            };
            steps.push(step);
        }

        let output_losses = graph
            .outputs()
            .iter()
            .map(|id| match graph.node(*id).and_then(|node| node.operation().layer()) {
                Some(LayerConfig::Output(config)) => Some(config.loss),
                _ => None,
            })
            .collect();

        let model = Self {
            labels: graph.nodes().iter().map(|n| n.label().to_string()).collect(),
            steps,
            shapes,
            input_count,
            outputs: graph.outputs().iter().map(|id| id.index()).collect(),
            output_losses,
            convolutions,
            batch_norms,
            dense_layers,
        };
        log::info!(
            "compiled graph {} into {} steps with {} parameters",
            graph.id(),
            model.steps.len(),
            model.num_params()
        );
        Ok(model)
    }

    /// Performs a forward pass, returning one flat tensor per graph output.
    ///
    /// `inputs` must follow the graph's input order and declared types.
    pub fn forward(&self, inputs: Vec<NodeValue<B>>) -> Result<Vec<Tensor<B, 2>>, GraphError> {
        if inputs.len() != self.input_count {
            return Err(GraphError::InputCountMismatch {
                expected: self.input_count,
                actual: inputs.len(),
            });
        }
        let batch = inputs.first().map(|value| value.batch_size()).unwrap_or(0);

        let mut values: Vec<NodeValue<B>> = Vec::with_capacity(self.steps.len());
        for (index, step) in self.steps.iter().enumerate() {
            let value = match step {
                Step::Input { slot } => {
                    let value = inputs[*slot].clone();
                    if !value.matches(&self.shapes[index]) || value.batch_size() != batch {
                        return Err(GraphError::ShapeMismatch {
                            label: self.labels[index].clone(),
                            expected: format!("[{batch}] + {}", self.shapes[index]),
                            actual: describe(&value),
                        });
                    }
                    value
                }
                Step::Convolution { input } => {
                    let x = values[*input].clone().spatial();
                    NodeValue::Spatial(self.convolutions[&index].forward(x))
                }
                Step::BatchNorm { input } => {
                    let x = values[*input].clone().spatial();
                    NodeValue::Spatial(self.batch_norms[&index].forward(x))
                }
                Step::Activation { input, activation } => {
                    values[*input].clone().activate(*activation)
                }
                Step::Merge { inputs, merge } => {
                    let mut merged = values[inputs[0]].clone();
                    for other in &inputs[1..] {
                        merged = match merge {
                            MergeOp::Add => merged.add(values[*other].clone()),
                        };
                    }
                    merged
                }
                Step::Dense { input, flatten } => {
                    let x = match values[*input].clone() {
                        NodeValue::Spatial(tensor) if *flatten => tensor.flatten(1, 3),
                        other => other.into_flat(),
                    };
                    NodeValue::Flat(self.dense_layers[&index].forward(x))
                }
            };
            values.push(value);
        }

        Ok(self
            .outputs
            .iter()
            .map(|index| values[*index].clone().into_flat())
            .collect())
    }

    /// Returns the number of graph inputs.
    pub fn input_count(&self) -> usize {
        self.input_count
    }

    /// Returns the inferred shape of a node.
    pub fn shape(&self, id: NodeId) -> Option<Shape> {
        self.shapes.get(id.index()).copied()
    }

    /// Returns the flat width of each output, in output order.
    pub fn output_sizes(&self) -> Vec<usize> {
        self.outputs
            .iter()
            .map(|index| self.shapes[*index].numel())
            .collect()
    }

    /// Returns the loss configured on each output; `None` for outputs that
    /// are not output layers.
    pub fn output_losses(&self) -> &[Option<Loss>] {
        &self.output_losses
    }

    /// Returns the total number of trainable and running parameters.
    pub fn num_params(&self) -> usize {
        let conv: usize = self.convolutions.values().map(|m| m.num_params()).sum();
        let bn: usize = self.batch_norms.values().map(|m| m.num_params()).sum();
        let dense: usize = self.dense_layers.values().map(|m| m.num_params()).sum();
        conv + bn + dense
    }
}

fn describe<B: Backend>(value: &NodeValue<B>) -> String {
    match value {
        NodeValue::Spatial(tensor) => format!("{:?}", tensor.dims()),
        NodeValue::Flat(tensor) => format!("{:?}", tensor.dims()),
    }
}
