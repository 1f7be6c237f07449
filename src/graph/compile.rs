//! Topology export handed to the engine.
//!
//! The export is label based: producers and outputs are referred to by the
//! labels a reader sees in summaries and logs.

use serde::Serialize;

use super::core::Graph;
use super::operation::{InputType, OpKind, Operation, Preprocessor};
use super::settings::EngineSettings;

/// Export format for a single node.
#[derive(Debug, Clone, Serialize)]
pub struct NodeExport {
    pub index: usize,
    pub label: String,
    pub kind: OpKind,
    pub operation: Operation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preprocessor: Option<Preprocessor>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub producers: Vec<String>,
}

/// Export format for the complete graph.
#[derive(Debug, Clone, Serialize)]
pub struct GraphExport {
    pub inputs: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub input_types: Vec<InputType>,
    pub outputs: Vec<String>,
    pub settings: EngineSettings,
    pub nodes: Vec<NodeExport>,
}

impl GraphExport {
    /// Describes `graph` node by node, in topological order.
    pub fn from_graph(graph: &Graph) -> Self {
        let label_of = |id| {
            graph
                .node(id)
                .map(|node| node.label().to_string())
                .unwrap_or_default()
        };

        let nodes = graph
            .nodes()
            .iter()
            .map(|node| NodeExport {
                index: node.id().index(),
                label: node.label().to_string(),
                kind: node.kind(),
                operation: node.operation().clone(),
                preprocessor: node.preprocessor().copied(),
                producers: node.producers().iter().copied().map(label_of).collect(),
            })
            .collect();

        Self {
            inputs: graph.inputs().iter().copied().map(label_of).collect(),
            input_types: graph.input_types().to_vec(),
            outputs: graph.outputs().iter().copied().map(label_of).collect(),
            settings: *graph.settings(),
            nodes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphContext;
    use crate::layers::{Activation, DenseConfig};

    #[test]
    fn test_export_uses_labels() {
        let mut ctx = GraphContext::new();
        let input = ctx.add_input("in").unwrap();
        ctx.set_input_types(vec![InputType::convolutional(2, 2, 1)]);
        let dense = ctx
            .add_layer_with_preprocessor(
                "dense",
                DenseConfig::new(4, 3).with_activation(Activation::Relu),
                Preprocessor::cnn_to_feed_forward(2, 2, 1),
                &[input],
            )
            .unwrap();
        ctx.set_outputs(&[dense]);
        let graph = ctx.build().unwrap();

        let export = graph.to_export();
        assert_eq!(export.inputs, vec!["in"]);
        assert_eq!(export.outputs, vec!["dense"]);
        assert_eq!(export.nodes.len(), 2);
        assert_eq!(export.nodes[1].producers, vec!["in"]);
        assert_eq!(export.nodes[1].kind, OpKind::Dense);
    }

    #[test]
    fn test_export_json_shape() {
        let mut ctx = GraphContext::new();
        let input = ctx.add_input("in").unwrap();
        let relu = ctx.add_layer("relu", Activation::Relu, &[input]).unwrap();
        ctx.set_outputs(&[relu]);
        let graph = ctx.build().unwrap();

        let json = graph.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["outputs"][0], "relu");
        assert_eq!(value["nodes"][0]["operation"]["op"], "input");
        assert!(value["nodes"][0].get("producers").is_none());
        assert_eq!(value["nodes"][1]["operation"]["op"], "layer");
        assert_eq!(value["nodes"][1]["operation"]["layer"]["type"], "activation");
        assert_eq!(
            value["nodes"][1]["operation"]["layer"]["activation"],
            "RELU"
        );
        assert_eq!(value["settings"]["weight_init"], "lecun_normal");
        assert!(value.get("input_types").is_none());
    }
}
