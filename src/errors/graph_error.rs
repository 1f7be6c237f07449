//! Graph construction and compilation errors.

use thiserror::Error;

/// Errors that can occur while assembling, building or compiling a graph.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("Node '{label}' already exists in the graph")]
    DuplicateNode { label: String },

    #[error("Node '{label}' references unknown producer {producer}")]
    UnknownProducer { label: String, producer: String },

    #[error("Node '{label}' expects {expected} producer(s), got {actual}")]
    InvalidProducerCount {
        label: String,
        expected: &'static str,
        actual: usize,
    },

    #[error("Output {output} was never added to the graph")]
    UndeclaredOutput { output: String },

    #[error("Graph has no inputs")]
    NoInputs,

    #[error("Graph has no outputs")]
    NoOutputs,

    #[error("Output '{label}' is not reachable from any input")]
    DanglingOutput { label: String },

    #[error("Invalid layer configuration for '{label}': {message}")]
    InvalidLayerConfig { label: String, message: String },

    #[error("Invalid network configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Shape mismatch at '{label}': expected {expected}, got {actual}")]
    ShapeMismatch {
        label: String,
        expected: String,
        actual: String,
    },

    #[error("Input '{label}' has no declared input type")]
    MissingInputType { label: String },

    #[error("Expected {expected} input tensor(s), got {actual}")]
    InputCountMismatch { expected: usize, actual: usize },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
