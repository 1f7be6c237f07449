//! Graph - the immutable, validated computation graph.
//!
//! A Graph only describes topology and layer parameters. Weights are only
//! created when [`Graph::compile`] is called.

use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;
use std::sync::atomic::{AtomicUsize, Ordering};

use burn::tensor::backend::Backend;

use super::compile::GraphExport;
use super::model::CompiledModel;
use super::node::{Node, NodeId};
use super::operation::{InputType, OpKind};
use super::settings::EngineSettings;
use super::shape::{Shape, infer_shapes};
use crate::errors::GraphError;

/// Global counter for unique graph IDs.
static GRAPH_ID_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Unique identifier for a graph and the context that built it.
pub type GraphId = usize;

pub(crate) fn next_graph_id() -> GraphId {
    GRAPH_ID_COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// The finished computation graph.
///
/// Produced by [`GraphContext::build`](super::GraphContext::build); nodes are
/// stored in insertion order, which is a topological order.
#[derive(Clone, Debug)]
pub struct Graph {
    id: GraphId,
    nodes: Vec<Node>,
    labels: HashMap<String, NodeId>,
    inputs: Vec<NodeId>,
    input_types: Vec<InputType>,
    outputs: Vec<NodeId>,
    settings: EngineSettings,
}

impl Graph {
    pub(crate) fn new(
        id: GraphId,
        nodes: Vec<Node>,
        labels: HashMap<String, NodeId>,
        inputs: Vec<NodeId>,
        input_types: Vec<InputType>,
        outputs: Vec<NodeId>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            id,
            nodes,
            labels,
            inputs,
            input_types,
            outputs,
            settings,
        }
    }

    /// Returns the unique ID of this graph.
    pub fn id(&self) -> GraphId {
        self.id
    }

    /// Returns the number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns all nodes in topological order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Returns the node with the given id, if it belongs to this graph.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        if id.graph_id() != self.id {
            return None;
        }
        self.nodes.get(id.index())
    }

    /// Resolves a label to its node id.
    pub fn lookup(&self, label: &str) -> Option<NodeId> {
        self.labels.get(label).copied()
    }

    /// Returns the node with the given label.
    pub fn node_by_label(&self, label: &str) -> Option<&Node> {
        self.lookup(label).and_then(|id| self.node(id))
    }

    /// Returns the input ids, in declaration order.
    pub fn inputs(&self) -> &[NodeId] {
        &self.inputs
    }

    /// Returns the declared input types, parallel to [`Graph::inputs`].
    /// Empty if none were declared.
    pub fn input_types(&self) -> &[InputType] {
        &self.input_types
    }

    /// Returns the output ids, in declaration order.
    pub fn outputs(&self) -> &[NodeId] {
        &self.outputs
    }

    /// Returns the graph-wide engine settings.
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Returns the producers of a node; empty for inputs and unknown ids.
    pub fn producers(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|node| node.producers()).unwrap_or(&[])
    }

    /// Returns the nodes consuming the given node, in topological order.
    pub fn consumers(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|node| node.producers().contains(&id))
            .map(|node| node.id())
            .collect()
    }

    /// Counts nodes of a given kind.
    pub fn count_kind(&self, kind: OpKind) -> usize {
        self.nodes.iter().filter(|node| node.kind() == kind).count()
    }

    /// Returns the node and all of its transitive producers.
    pub fn ancestors(&self, id: NodeId) -> HashSet<NodeId> {
        let mut seen = HashSet::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if self.node(current).is_none() || !seen.insert(current) {
                continue;
            }
            stack.extend_from_slice(self.producers(current));
        }
        seen
    }

    /// Returns true if following producers backward from `id` reaches an input.
    pub fn reaches_input(&self, id: NodeId) -> bool {
        self.ancestors(id)
            .iter()
            .any(|ancestor| self.inputs.contains(ancestor))
    }

    /// Returns the nodes that contribute to no output, in topological order.
    pub fn orphans(&self) -> Vec<NodeId> {
        let live: HashSet<NodeId> = self
            .outputs
            .iter()
            .flat_map(|output| self.ancestors(*output))
            .collect();
        self.nodes
            .iter()
            .map(|node| node.id())
            .filter(|id| !live.contains(id))
            .collect()
    }

    /// Renders a one-line-per-node table of the graph.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{:<5} {:<28} {:<12} producers", "idx", "label", "kind");
        for node in &self.nodes {
            let producers: Vec<&str> = node
                .producers()
                .iter()
                .filter_map(|id| self.node(*id))
                .map(|producer| producer.label())
                .collect();
            let _ = writeln!(
                out,
                "{:<5} {:<28} {:<12} {}",
                node.id().index(),
                node.label(),
                node.kind().to_string(),
                producers.join(", ")
            );
        }
        let _ = write!(
            out,
            "{} nodes, {} input(s), {} output(s)",
            self.nodes.len(),
            self.inputs.len(),
            self.outputs.len()
        );
        out
    }

    /// Converts the graph into its serializable topology description.
    pub fn to_export(&self) -> GraphExport {
        GraphExport::from_graph(self)
    }

    /// Exports the topology as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, GraphError> {
        Ok(serde_json::to_string_pretty(&self.to_export())?)
    }

    /// Infers the per-example output shape of every node, indexed by node
    /// index. Needs declared input types.
    pub fn infer_shapes(&self) -> Result<Vec<Shape>, GraphError> {
        infer_shapes(self)
    }

    /// Compiles this graph into a CompiledModel with initialized weights.
    ///
    /// This is where shapes are checked and the actual weight tensors are
    /// created on the specified device.
    pub fn compile<B: Backend>(&self, device: &B::Device) -> Result<CompiledModel<B>, GraphError> {
        CompiledModel::new(self, device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphContext, MergeOp};
    use crate::layers::{Activation, BatchNormConfig, ConvolutionConfig};

    fn diamond() -> (Graph, [NodeId; 5]) {
        let mut ctx = GraphContext::new();
        let input = ctx.add_input("in").unwrap();
        let conv = ctx
            .add_layer("conv", ConvolutionConfig::new(1, 2), &[input])
            .unwrap();
        let bn = ctx
            .add_layer("bn", BatchNormConfig::new(2), &[conv])
            .unwrap();
        let relu = ctx.add_layer("relu", Activation::Relu, &[bn]).unwrap();
        let add = ctx.add_vertex("add", MergeOp::Add, &[relu, bn]).unwrap();
        ctx.set_outputs(&[add]);
        (ctx.build().unwrap(), [input, conv, bn, relu, add])
    }

    #[test]
    fn test_graph_lookup() {
        let (graph, [input, _, bn, _, _]) = diamond();
        assert_eq!(graph.lookup("in"), Some(input));
        assert_eq!(graph.node_by_label("bn").unwrap().id(), bn);
        assert!(graph.lookup("missing").is_none());
    }

    #[test]
    fn test_consumers_and_producers() {
        let (graph, [_, _, bn, relu, add]) = diamond();
        assert_eq!(graph.consumers(bn), vec![relu, add]);
        assert_eq!(graph.producers(add), &[relu, bn]);
    }

    #[test]
    fn test_count_kind() {
        let (graph, _) = diamond();
        assert_eq!(graph.count_kind(OpKind::Input), 1);
        assert_eq!(graph.count_kind(OpKind::Convolution), 1);
        assert_eq!(graph.count_kind(OpKind::Merge), 1);
        assert_eq!(graph.count_kind(OpKind::Dense), 0);
    }

    #[test]
    fn test_outputs_reach_inputs() {
        let (graph, [input, ..]) = diamond();
        for output in graph.outputs() {
            assert!(graph.reaches_input(*output));
        }
        assert_eq!(graph.ancestors(input).len(), 1);
        assert!(graph.orphans().is_empty());
    }

    #[test]
    fn test_orphans_detected() {
        let mut ctx = GraphContext::new();
        let input = ctx.add_input("in").unwrap();
        let kept = ctx.add_layer("kept", Activation::Relu, &[input]).unwrap();
        let dropped = ctx.add_layer("dropped", Activation::Tanh, &[input]).unwrap();
        ctx.set_outputs(&[kept]);

        let graph = ctx.build().unwrap();
        assert_eq!(graph.orphans(), vec![dropped]);
    }

    #[test]
    fn test_graph_ids_are_unique() {
        let (first, _) = diamond();
        let (second, _) = diamond();
        assert_ne!(first.id(), second.id());
    }

    #[test]
    fn test_summary_lists_nodes() {
        let (graph, _) = diamond();
        let summary = graph.summary();
        assert!(summary.contains("add"));
        assert!(summary.contains("relu, bn"));
        assert!(summary.ends_with("5 nodes, 1 input(s), 1 output(s)"));
    }
}
