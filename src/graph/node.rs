//! Node identifiers and nodes.

use std::fmt;

use super::core::GraphId;
use super::operation::{OpKind, Operation, Preprocessor};

/// Identifier of a node, allocated by the [`GraphContext`](super::GraphContext)
/// that created it.
///
/// Identifiers carry the id of their graph, so an id handed to a different
/// context is reported as an unknown producer instead of silently aliasing a
/// node there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    graph: GraphId,
    index: usize,
}

impl NodeId {
    pub(crate) fn new(graph: GraphId, index: usize) -> Self {
        Self { graph, index }
    }

    /// Returns the id of the graph this node belongs to.
    pub fn graph_id(&self) -> GraphId {
        self.graph
    }

    /// Returns the insertion index of this node.
    pub fn index(&self) -> usize {
        self.index
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.graph, self.index)
    }
}

/// A node of the computation graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    id: NodeId,
    label: String,
    operation: Operation,
    preprocessor: Option<Preprocessor>,
    producers: Vec<NodeId>,
}

impl Node {
    pub(crate) fn new(
        id: NodeId,
        label: String,
        operation: Operation,
        preprocessor: Option<Preprocessor>,
        producers: Vec<NodeId>,
    ) -> Self {
        Self {
            id,
            label,
            operation,
            preprocessor,
            producers,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Returns the human-readable label, unique within the graph.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn operation(&self) -> &Operation {
        &self.operation
    }

    pub fn kind(&self) -> OpKind {
        self.operation.kind()
    }

    /// Returns the layout adaptation applied to this node's input, if any.
    pub fn preprocessor(&self) -> Option<&Preprocessor> {
        self.preprocessor.as_ref()
    }

    /// Returns the producers feeding this node, in order.
    pub fn producers(&self) -> &[NodeId] {
        &self.producers
    }

    /// Returns true if this is a graph input.
    pub fn is_input(&self) -> bool {
        matches!(self.operation, Operation::Input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_accessors() {
        let id = NodeId::new(3, 7);
        assert_eq!(id.graph_id(), 3);
        assert_eq!(id.index(), 7);
        assert_eq!(id.to_string(), "#3.7");
    }

    #[test]
    fn test_node_ids_order_by_insertion() {
        assert!(NodeId::new(0, 1) < NodeId::new(0, 2));
    }

    #[test]
    fn test_input_node() {
        let node = Node::new(NodeId::new(0, 0), "in".to_string(), Operation::Input, None, vec![]);
        assert!(node.is_input());
        assert_eq!(node.kind(), OpKind::Input);
        assert!(node.producers().is_empty());
        assert!(node.preprocessor().is_none());
    }
}
