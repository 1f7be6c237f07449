//! Policy and value heads.
//!
//! Both heads reduce the tower output to a few channels with a conv-norm
//! block, flatten it, and end in an output layer. The flatten is carried as a
//! [`Preprocessor`] on the first feed-forward node of each head.

use crate::errors::GraphError;
use crate::graph::{GraphContext, NodeId, Preprocessor};
use crate::layers::{Activation, BatchNormConfig, ConvolutionConfig, DenseConfig, OutputConfig, PaddingMode};

use super::{POLICY_CHANNELS, VALUE_CHANNELS, VALUE_HIDDEN};

/// Parameters shared by the two heads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadConfig {
    /// Board side length the tower output is laid out on.
    pub board_size: usize,
    /// Channels produced by the tower.
    pub in_channels: usize,
    pub kernel_size: [usize; 2],
    pub stride: [usize; 2],
    pub padding: PaddingMode,
    pub activation: Activation,
    /// Width of the value head's hidden dense layer.
    pub value_hidden: usize,
}

impl HeadConfig {
    pub fn new(board_size: usize, in_channels: usize) -> Self {
        Self {
            board_size,
            in_channels,
            kernel_size: [3, 3],
            stride: [1, 1],
            padding: PaddingMode::Same,
            activation: Activation::Relu,
            value_hidden: VALUE_HIDDEN,
        }
    }

    pub fn with_kernel_size(mut self, kernel_size: [usize; 2]) -> Self {
        self.kernel_size = kernel_size;
        self
    }

    pub fn with_stride(mut self, stride: [usize; 2]) -> Self {
        self.stride = stride;
        self
    }

    pub fn with_padding(mut self, padding: PaddingMode) -> Self {
        self.padding = padding;
        self
    }

    pub fn with_activation(mut self, activation: Activation) -> Self {
        self.activation = activation;
        self
    }

    pub fn with_value_hidden(mut self, value_hidden: usize) -> Self {
        self.value_hidden = value_hidden;
        self
    }

    /// Number of policy logits: every board point plus pass.
    pub fn policy_size(&self) -> usize {
        self.board_size * self.board_size + 1
    }

    fn convolution(&self, out_channels: usize) -> ConvolutionConfig {
        ConvolutionConfig::new(self.in_channels, out_channels)
            .with_kernel_size(self.kernel_size)
            .with_stride(self.stride)
            .with_padding(self.padding)
    }

    fn flatten(&self, channels: usize) -> Preprocessor {
        Preprocessor::cnn_to_feed_forward(self.board_size, self.board_size, channels)
    }
}

/// Adds the policy head on top of `producer` and returns its output node.
///
/// `policy_head_conv` (2 channels) -> `policy_head_batch_norm` ->
/// `policy_head_relu` -> `policy_head_output`, a softmax over
/// `board_size^2 + 1` moves trained with negative log likelihood.
pub fn policy_head(
    ctx: &mut GraphContext,
    producer: NodeId,
    head: &HeadConfig,
) -> Result<NodeId, GraphError> {
    let conv = ctx.add_layer(
        "policy_head_conv",
        head.convolution(POLICY_CHANNELS),
        &[producer],
    )?;
    let norm = ctx.add_layer(
        "policy_head_batch_norm",
        BatchNormConfig::new(POLICY_CHANNELS),
        &[conv],
    )?;
    let act = ctx.add_layer("policy_head_relu", head.activation, &[norm])?;

    let flatten = head.flatten(POLICY_CHANNELS);
    ctx.add_layer_with_preprocessor(
        "policy_head_output",
        OutputConfig::softmax(flatten.output_size(), head.policy_size()),
        flatten,
        &[act],
    )
}

/// Adds the value head on top of `producer` and returns its output node.
///
/// `value_head_conv` (1 channel) -> `value_head_batch_norm` ->
/// `value_head_relu` -> `value_head_dense` -> `value_head_output`, a single
/// tanh unit trained with mean squared error.
pub fn value_head(
    ctx: &mut GraphContext,
    producer: NodeId,
    head: &HeadConfig,
) -> Result<NodeId, GraphError> {
    let conv = ctx.add_layer(
        "value_head_conv",
        head.convolution(VALUE_CHANNELS),
        &[producer],
    )?;
    let norm = ctx.add_layer(
        "value_head_batch_norm",
        BatchNormConfig::new(VALUE_CHANNELS),
        &[conv],
    )?;
    let act = ctx.add_layer("value_head_relu", head.activation, &[norm])?;

    let flatten = head.flatten(VALUE_CHANNELS);
    let dense = ctx.add_layer_with_preprocessor(
        "value_head_dense",
        DenseConfig::new(flatten.output_size(), head.value_hidden).with_activation(head.activation),
        flatten,
        &[act],
    )?;
    ctx.add_layer(
        "value_head_output",
        OutputConfig::tanh(head.value_hidden, 1),
        &[dense],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{InputType, OpKind};
    use crate::layers::{LayerConfig, Loss};

    fn context_with_tower() -> (GraphContext, NodeId) {
        let mut ctx = GraphContext::new();
        let input = ctx.add_input("in").unwrap();
        ctx.set_input_types(vec![InputType::convolutional(19, 19, 256)]);
        (ctx, input)
    }

    fn layer<'a>(ctx: &'a GraphContext, label: &str) -> &'a LayerConfig {
        ctx.node(ctx.lookup(label).unwrap())
            .unwrap()
            .operation()
            .layer()
            .unwrap()
    }

    #[test]
    fn test_policy_head_structure() {
        let (mut ctx, input) = context_with_tower();
        let out = policy_head(&mut ctx, input, &HeadConfig::new(19, 256)).unwrap();

        let node = ctx.node(out).unwrap();
        assert_eq!(node.label(), "policy_head_output");
        assert_eq!(node.kind(), OpKind::Output);
        assert_eq!(
            node.preprocessor(),
            Some(&Preprocessor::cnn_to_feed_forward(19, 19, 2))
        );
        assert_eq!(ctx.len(), 1 + 4);

        match layer(&ctx, "policy_head_conv") {
            LayerConfig::Convolution(config) => {
                assert_eq!(config.in_channels, 256);
                assert_eq!(config.out_channels, 2);
            }
            other => panic!("unexpected layer {other:?}"),
        }
        match layer(&ctx, "policy_head_output") {
            LayerConfig::Output(config) => {
                assert_eq!(config.input_size, 722);
                assert_eq!(config.output_size, 362);
                assert_eq!(config.activation, Activation::Softmax);
                assert_eq!(config.loss, Loss::NegativeLogLikelihood);
            }
            other => panic!("unexpected layer {other:?}"),
        }
    }

    #[test]
    fn test_value_head_structure() {
        let (mut ctx, input) = context_with_tower();
        let out = value_head(&mut ctx, input, &HeadConfig::new(19, 256)).unwrap();

        assert_eq!(ctx.node(out).unwrap().label(), "value_head_output");
        assert_eq!(ctx.len(), 1 + 5);

        let dense = ctx.lookup("value_head_dense").unwrap();
        assert_eq!(
            ctx.node(dense).unwrap().preprocessor(),
            Some(&Preprocessor::cnn_to_feed_forward(19, 19, 1))
        );
        assert!(ctx.node(out).unwrap().preprocessor().is_none());

        match layer(&ctx, "value_head_dense") {
            LayerConfig::Dense(config) => {
                assert_eq!(config.input_size, 361);
                assert_eq!(config.output_size, 256);
                assert_eq!(config.activation, Activation::Relu);
            }
            other => panic!("unexpected layer {other:?}"),
        }
        match layer(&ctx, "value_head_output") {
            LayerConfig::Output(config) => {
                assert_eq!(config.output_size, 1);
                assert_eq!(config.activation, Activation::Tanh);
                assert_eq!(config.loss, Loss::Mse);
            }
            other => panic!("unexpected layer {other:?}"),
        }
    }

    #[test]
    fn test_heads_share_producer() {
        let (mut ctx, input) = context_with_tower();
        let head = HeadConfig::new(19, 256);
        let policy = policy_head(&mut ctx, input, &head).unwrap();
        let value = value_head(&mut ctx, input, &head).unwrap();
        ctx.set_outputs(&[policy, value]);
        let graph = ctx.build().unwrap();

        assert_eq!(
            graph.consumers(input),
            vec![
                graph.lookup("policy_head_conv").unwrap(),
                graph.lookup("value_head_conv").unwrap()
            ]
        );
        assert!(graph.orphans().is_empty());
    }

    #[test]
    fn test_head_twice_is_duplicate() {
        let (mut ctx, input) = context_with_tower();
        let head = HeadConfig::new(19, 256);
        policy_head(&mut ctx, input, &head).unwrap();

        assert!(matches!(
            policy_head(&mut ctx, input, &head),
            Err(GraphError::DuplicateNode { .. })
        ));
    }

    #[test]
    fn test_small_board_sizes() {
        let head = HeadConfig::new(9, 16).with_value_hidden(8);
        assert_eq!(head.policy_size(), 82);

        let (mut ctx, input) = context_with_tower();
        let out = value_head(&mut ctx, input, &head).unwrap();
        match ctx.node(out).unwrap().operation().layer() {
            Some(LayerConfig::Output(config)) => assert_eq!(config.input_size, 8),
            other => panic!("unexpected layer {other:?}"),
        }
    }
}
