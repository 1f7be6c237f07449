//! GraphContext - the mutable side of graph construction.
//!
//! A context is created once per network definition, mutated through
//! `&mut` by block, tower and head builders, and consumed by
//! [`GraphContext::build`] into an immutable [`Graph`].

use std::collections::HashMap;

use crate::errors::GraphError;
use crate::layers::LayerConfig;

use super::core::{Graph, GraphId, next_graph_id};
use super::node::{Node, NodeId};
use super::operation::{InputType, MergeOp, Operation, Preprocessor};
use super::settings::EngineSettings;

/// Append-only builder for a computation graph.
///
/// Nodes are inserted in topological order: every producer must already be
/// present when a node is added, so the graph cannot contain cycles.
///
/// # Example
///
/// ```
/// use zeronet::graph::{GraphContext, MergeOp};
/// use zeronet::layers::{Activation, BatchNormConfig, ConvolutionConfig};
///
/// let mut ctx = GraphContext::new();
/// let input = ctx.add_input("in").unwrap();
/// let conv = ctx
///     .add_layer("conv", ConvolutionConfig::new(11, 8), &[input])
///     .unwrap();
/// let bn = ctx.add_layer("bn", BatchNormConfig::new(8), &[conv]).unwrap();
/// let relu = ctx.add_layer("relu", Activation::Relu, &[bn]).unwrap();
/// let sum = ctx.add_vertex("add", MergeOp::Add, &[relu, bn]).unwrap();
/// ctx.set_outputs(&[sum]);
///
/// let graph = ctx.build().unwrap();
/// assert_eq!(graph.len(), 5);
/// ```
#[derive(Debug)]
pub struct GraphContext {
    id: GraphId,
    nodes: Vec<Node>,
    labels: HashMap<String, NodeId>,
    inputs: Vec<NodeId>,
    input_types: Vec<InputType>,
    outputs: Vec<NodeId>,
    settings: EngineSettings,
}

impl GraphContext {
    /// Creates an empty context with default engine settings.
    pub fn new() -> Self {
        Self::with_settings(EngineSettings::default())
    }

    /// Creates an empty context with the given engine settings.
    pub fn with_settings(settings: EngineSettings) -> Self {
        Self {
            id: next_graph_id(),
            nodes: Vec::new(),
            labels: HashMap::new(),
            inputs: Vec::new(),
            input_types: Vec::new(),
            outputs: Vec::new(),
            settings,
        }
    }

    /// Returns the id shared by every node this context allocates.
    pub fn id(&self) -> GraphId {
        self.id
    }

    /// Returns the number of nodes inserted so far.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if no node has been inserted.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Resolves a label to its node id.
    pub fn lookup(&self, label: &str) -> Option<NodeId> {
        self.labels.get(label).copied()
    }

    /// Returns a node inserted by this context.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        if id.graph_id() != self.id {
            return None;
        }
        self.nodes.get(id.index())
    }

    /// Registers a graph input. Inputs need no producer.
    pub fn add_input(&mut self, name: impl Into<String>) -> Result<NodeId, GraphError> {
        let id = self.insert(name.into(), Operation::Input, None, Vec::new())?;
        self.inputs.push(id);
        Ok(id)
    }

    /// Inserts a layer fed by exactly one existing producer.
    pub fn add_layer(
        &mut self,
        label: impl Into<String>,
        layer: impl Into<LayerConfig>,
        producers: &[NodeId],
    ) -> Result<NodeId, GraphError> {
        self.insert_layer(label.into(), layer.into(), None, producers)
    }

    /// Inserts a layer whose input is first passed through `preprocessor`.
    pub fn add_layer_with_preprocessor(
        &mut self,
        label: impl Into<String>,
        layer: impl Into<LayerConfig>,
        preprocessor: Preprocessor,
        producers: &[NodeId],
    ) -> Result<NodeId, GraphError> {
        self.insert_layer(label.into(), layer.into(), Some(preprocessor), producers)
    }

    /// Inserts a merge vertex combining at least two existing producers.
    pub fn add_vertex(
        &mut self,
        label: impl Into<String>,
        merge: MergeOp,
        producers: &[NodeId],
    ) -> Result<NodeId, GraphError> {
        let label = label.into();
        if producers.len() < 2 {
            return Err(GraphError::InvalidProducerCount {
                label,
                expected: "at least 2",
                actual: producers.len(),
            });
        }
        self.insert(label, Operation::Vertex { merge }, None, producers.to_vec())
    }

    /// Declares the tensor type of each input, in input order.
    pub fn set_input_types(&mut self, input_types: Vec<InputType>) {
        self.input_types = input_types;
    }

    /// Declares the graph outputs, in order. Replaces any earlier declaration.
    pub fn set_outputs(&mut self, outputs: &[NodeId]) {
        self.outputs = outputs.to_vec();
    }

    /// Validates the graph and freezes it.
    pub fn build(self) -> Result<Graph, GraphError> {
        if self.inputs.is_empty() {
            return Err(GraphError::NoInputs);
        }
        if self.outputs.is_empty() {
            return Err(GraphError::NoOutputs);
        }
        if !self.input_types.is_empty() && self.input_types.len() != self.inputs.len() {
            return Err(GraphError::InputCountMismatch {
                expected: self.inputs.len(),
                actual: self.input_types.len(),
            });
        }
        for output in &self.outputs {
            if self.node(*output).is_none() {
                return Err(GraphError::UndeclaredOutput {
                    output: output.to_string(),
                });
            }
        }

        // Insertion order is topological, so one forward pass settles
        // which nodes have a path back to an input.
        let mut reaches_input = vec![false; self.nodes.len()];
        for node in &self.nodes {
            let index = node.id().index();
            if node.is_input() {
                reaches_input[index] = true;
                continue;
            }
            if node.producers().is_empty() {
                return Err(GraphError::InvalidProducerCount {
                    label: node.label().to_string(),
                    expected: "at least 1",
                    actual: 0,
                });
            }
            reaches_input[index] = node
                .producers()
                .iter()
                .any(|producer| producer.index() < index && reaches_input[producer.index()]);
        }
        for output in &self.outputs {
            if !reaches_input[output.index()] {
                return Err(GraphError::DanglingOutput {
                    label: self.nodes[output.index()].label().to_string(),
                });
            }
        }

        let graph = Graph::new(
            self.id,
            self.nodes,
            self.labels,
            self.inputs,
            self.input_types,
            self.outputs,
            self.settings,
        );

        let orphans = graph.orphans();
        if !orphans.is_empty() {
            let labels: Vec<&str> = orphans
                .iter()
                .filter_map(|id| graph.node(*id))
                .map(|node| node.label())
                .collect();
            log::warn!(
                "graph {} has {} node(s) feeding no output: {:?}",
                graph.id(),
                labels.len(),
                labels
            );
        }
        log::debug!(
            "built graph {} with {} nodes, {} input(s), {} output(s)",
            graph.id(),
            graph.len(),
            graph.inputs().len(),
            graph.outputs().len()
        );

        Ok(graph)
    }

    fn insert_layer(
        &mut self,
        label: String,
        layer: LayerConfig,
        preprocessor: Option<Preprocessor>,
        producers: &[NodeId],
    ) -> Result<NodeId, GraphError> {
        if producers.len() != 1 {
            return Err(GraphError::InvalidProducerCount {
                label,
                expected: "exactly 1",
                actual: producers.len(),
            });
        }
        if let Err(message) = layer.validate() {
            return Err(GraphError::InvalidLayerConfig { label, message });
        }
        self.insert(
            label,
            Operation::Layer { layer },
            preprocessor,
            producers.to_vec(),
        )
    }

    fn insert(
        &mut self,
        label: String,
        operation: Operation,
        preprocessor: Option<Preprocessor>,
        producers: Vec<NodeId>,
    ) -> Result<NodeId, GraphError> {
        if self.labels.contains_key(&label) {
            return Err(GraphError::DuplicateNode { label });
        }
        if let Some(unknown) = producers.iter().find(|p| self.node(**p).is_none()) {
            return Err(GraphError::UnknownProducer {
                label,
                producer: unknown.to_string(),
            });
        }

        let id = NodeId::new(self.id, self.nodes.len());
        log::debug!(
            "graph {}: {} '{}' <- {:?}",
            self.id,
            operation.kind(),
            label,
            producers.iter().map(|p| p.index()).collect::<Vec<_>>()
        );
        self.labels.insert(label.clone(), id);
        self.nodes
            .push(Node::new(id, label, operation, preprocessor, producers));
        Ok(id)
    }
}

impl Default for GraphContext {
    fn default() -> Self {
        Self::new()
    }
}
