//! Error types.

mod graph_error;

pub use graph_error::GraphError;
