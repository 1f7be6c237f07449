//! Conv-norm blocks, residual blocks and the towers built from them.
//!
//! Each builder inserts its nodes into the context and returns the id of the
//! last node it created, so calls chain by threading that id into the next
//! builder.

use crate::errors::GraphError;
use crate::graph::{GraphContext, MergeOp, NodeId};
use crate::layers::{Activation, BatchNormConfig, ConvolutionConfig, PaddingMode};

use super::TOWER_CHANNELS;

/// Parameters of a convolution -> batch norm -> activation block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvBlockConfig {
    pub in_channels: usize,
    pub out_channels: usize,
    pub kernel_size: [usize; 2],
    pub stride: [usize; 2],
    pub padding: PaddingMode,
    pub activation: Activation,
    /// Whether the block ends with an activation node.
    pub use_activation: bool,
}

impl ConvBlockConfig {
    /// A 3x3, stride 1, same-padded block to 256 channels with a trailing relu.
    pub fn new(in_channels: usize) -> Self {
        Self {
            in_channels,
            out_channels: TOWER_CHANNELS,
            kernel_size: [3, 3],
            stride: [1, 1],
            padding: PaddingMode::Same,
            activation: Activation::Relu,
            use_activation: true,
        }
    }

    pub fn with_in_channels(mut self, in_channels: usize) -> Self {
        self.in_channels = in_channels;
        self
    }

    pub fn with_out_channels(mut self, out_channels: usize) -> Self {
        self.out_channels = out_channels;
        self
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

    pub fn with_use_activation(mut self, use_activation: bool) -> Self {
        self.use_activation = use_activation;
        self
    }

    fn convolution(&self) -> ConvolutionConfig {
        ConvolutionConfig::new(self.in_channels, self.out_channels)
            .with_kernel_size(self.kernel_size)
            .with_stride(self.stride)
            .with_padding(self.padding)
    }
}

/// Adds `conv_<label>`, `batch_norm_<label>` and, if enabled, `relu_<label>`.
///
/// Returns the activation node, or the batch norm node when the block has no
/// activation. Reusing a label fails with [`GraphError::DuplicateNode`].
pub fn conv_norm_block(
    ctx: &mut GraphContext,
    label: &str,
    producer: NodeId,
    block: &ConvBlockConfig,
) -> Result<NodeId, GraphError> {
    let conv = ctx.add_layer(format!("conv_{label}"), block.convolution(), &[producer])?;
    let norm = ctx.add_layer(
        format!("batch_norm_{label}"),
        BatchNormConfig::new(block.out_channels),
        &[conv],
    )?;
    if !block.use_activation {
        return Ok(norm);
    }
    ctx.add_layer(format!("relu_{label}"), block.activation, &[norm])
}

/// Adds residual block `index` on top of `producer`.
///
/// The merge adds the first sub-block's activated output to the second
/// sub-block's batch norm output; the block input is not part of the sum.
/// Nodes: `*_residual_1_<index>`, `*_residual_2_<index>`, `add_<index>`,
/// `relu_<index>`.
pub fn residual_block(
    ctx: &mut GraphContext,
    index: usize,
    producer: NodeId,
    block: &ConvBlockConfig,
) -> Result<NodeId, GraphError> {
    let first = block.clone().with_use_activation(true);
    let first_out = conv_norm_block(ctx, &format!("residual_1_{index}"), producer, &first)?;

    let second = block
        .clone()
        .with_in_channels(block.out_channels)
        .with_use_activation(false);
    let second_out = conv_norm_block(ctx, &format!("residual_2_{index}"), first_out, &second)?;

    let merged = ctx.add_vertex(format!("add_{index}"), MergeOp::Add, &[first_out, second_out])?;
    ctx.add_layer(format!("relu_{index}"), block.activation, &[merged])
}

/// Chains `num_blocks` residual blocks, indices `0..num_blocks`.
///
/// Block 0 consumes `block.in_channels`; later blocks consume the block
/// width. Returns `producer` unchanged when `num_blocks` is zero.
pub fn residual_tower(
    ctx: &mut GraphContext,
    num_blocks: usize,
    producer: NodeId,
    block: &ConvBlockConfig,
) -> Result<NodeId, GraphError> {
    let mut out = producer;
    for index in 0..num_blocks {
        let config = tower_block(block, index);
        out = residual_block(ctx, index, out, &config)?;
    }
    Ok(out)
}

/// Chains `num_blocks` conv-norm-activation blocks labeled by their index.
pub fn convolutional_tower(
    ctx: &mut GraphContext,
    num_blocks: usize,
    producer: NodeId,
    block: &ConvBlockConfig,
) -> Result<NodeId, GraphError> {
    let mut out = producer;
    for index in 0..num_blocks {
        let config = tower_block(block, index).with_use_activation(true);
        out = conv_norm_block(ctx, &index.to_string(), out, &config)?;
    }
    Ok(out)
}

fn tower_block(block: &ConvBlockConfig, index: usize) -> ConvBlockConfig {
    if index == 0 {
        block.clone()
    } else {
        block.clone().with_in_channels(block.out_channels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{InputType, OpKind};

    fn context_with_input() -> (GraphContext, NodeId) {
        let mut ctx = GraphContext::new();
        let input = ctx.add_input("in").unwrap();
        ctx.set_input_types(vec![InputType::convolutional(19, 19, 256)]);
        (ctx, input)
    }

    fn kind_count(ctx: &GraphContext, kind: OpKind) -> usize {
        (0..ctx.len())
            .filter_map(|index| ctx.node(crate::graph::NodeId::new(ctx.id(), index)))
            .filter(|node| node.kind() == kind)
            .count()
    }

    #[test]
    fn test_conv_norm_block_with_activation() {
        let (mut ctx, input) = context_with_input();
        let out = conv_norm_block(&mut ctx, "init", input, &ConvBlockConfig::new(256)).unwrap();

        let node = ctx.node(out).unwrap();
        assert_eq!(node.kind(), OpKind::Activation);
        assert_eq!(node.label(), "relu_init");
        assert!(ctx.lookup("conv_init").is_some());
        assert!(ctx.lookup("batch_norm_init").is_some());
        assert_eq!(ctx.len(), 4);
    }

    #[test]
    fn test_conv_norm_block_without_activation() {
        let (mut ctx, input) = context_with_input();
        let block = ConvBlockConfig::new(256).with_use_activation(false);
        let out = conv_norm_block(&mut ctx, "x", input, &block).unwrap();

        assert_eq!(ctx.node(out).unwrap().kind(), OpKind::BatchNorm);
        assert_eq!(ctx.node(out).unwrap().label(), "batch_norm_x");
        assert!(ctx.lookup("relu_x").is_none());
        assert_eq!(kind_count(&ctx, OpKind::Activation), 0);
    }

    #[test]
    fn test_conv_norm_block_chain_order() {
        let (mut ctx, input) = context_with_input();
        let out = conv_norm_block(&mut ctx, "b", input, &ConvBlockConfig::new(256)).unwrap();

        let conv = ctx.lookup("conv_b").unwrap();
        let norm = ctx.lookup("batch_norm_b").unwrap();
        assert_eq!(ctx.node(conv).unwrap().producers(), &[input]);
        assert_eq!(ctx.node(norm).unwrap().producers(), &[conv]);
        assert_eq!(ctx.node(out).unwrap().producers(), &[norm]);
    }

    #[test]
    fn test_conv_norm_block_label_collision() {
        let (mut ctx, input) = context_with_input();
        let block = ConvBlockConfig::new(256);
        conv_norm_block(&mut ctx, "same", input, &block).unwrap();

        let result = conv_norm_block(&mut ctx, "same", input, &block);
        assert!(matches!(result, Err(GraphError::DuplicateNode { label }) if label == "conv_same"));
    }

    #[test]
    fn test_residual_block_node_counts() {
        for channels in [8, 256] {
            let mut ctx = GraphContext::new();
            let input = ctx.add_input("in").unwrap();
            let block = ConvBlockConfig::new(channels).with_out_channels(channels);
            residual_block(&mut ctx, 0, input, &block).unwrap();

            assert_eq!(kind_count(&ctx, OpKind::Convolution), 2);
            assert_eq!(kind_count(&ctx, OpKind::BatchNorm), 2);
            assert_eq!(kind_count(&ctx, OpKind::Activation), 2);
            assert_eq!(kind_count(&ctx, OpKind::Merge), 1);
            assert_eq!(ctx.len(), 1 + 7);
        }
    }

    #[test]
    fn test_residual_block_wiring() {
        let (mut ctx, input) = context_with_input();
        let out = residual_block(&mut ctx, 3, input, &ConvBlockConfig::new(256)).unwrap();

        let first_act = ctx.lookup("relu_residual_1_3").unwrap();
        let second_conv = ctx.lookup("conv_residual_2_3").unwrap();
        let second_norm = ctx.lookup("batch_norm_residual_2_3").unwrap();
        let merge = ctx.lookup("add_3").unwrap();

        assert_eq!(ctx.node(second_conv).unwrap().producers(), &[first_act]);
        assert_eq!(
            ctx.node(merge).unwrap().producers(),
            &[first_act, second_norm]
        );
        assert!(!ctx.node(merge).unwrap().producers().contains(&input));
        assert_eq!(ctx.node(out).unwrap().label(), "relu_3");
        assert_eq!(ctx.node(out).unwrap().producers(), &[merge]);
        assert!(ctx.lookup("relu_residual_2_3").is_none());
    }

    #[test]
    fn test_residual_tower_threads_blocks() {
        let (mut ctx, input) = context_with_input();
        let out = residual_tower(&mut ctx, 3, input, &ConvBlockConfig::new(256)).unwrap();

        let first_conv = ctx.lookup("conv_residual_1_0").unwrap();
        assert_eq!(ctx.node(first_conv).unwrap().producers(), &[input]);
        for index in 1..3 {
            let conv = ctx.lookup(&format!("conv_residual_1_{index}")).unwrap();
            let previous = ctx.lookup(&format!("relu_{}", index - 1)).unwrap();
            assert_eq!(ctx.node(conv).unwrap().producers(), &[previous]);
        }
        assert_eq!(ctx.lookup("relu_2"), Some(out));
    }

    #[test]
    fn test_empty_towers_return_start() {
        let (mut ctx, input) = context_with_input();
        let block = ConvBlockConfig::new(256);

        assert_eq!(residual_tower(&mut ctx, 0, input, &block).unwrap(), input);
        assert_eq!(convolutional_tower(&mut ctx, 0, input, &block).unwrap(), input);
        assert_eq!(ctx.len(), 1);
    }

    #[test]
    fn test_convolutional_tower_labels() {
        let mut ctx = GraphContext::new();
        let input = ctx.add_input("in").unwrap();
        let block = ConvBlockConfig::new(11).with_out_channels(16);
        let out = convolutional_tower(&mut ctx, 4, input, &block).unwrap();

        assert_eq!(ctx.lookup("relu_3"), Some(out));
        assert_eq!(kind_count(&ctx, OpKind::Merge), 0);
        assert_eq!(ctx.len(), 1 + 4 * 3);

        let first = ctx.lookup("conv_0").unwrap();
        let second = ctx.lookup("conv_1").unwrap();
        assert_eq!(ctx.node(first).unwrap().producers(), &[input]);
        assert_eq!(
            ctx.node(second).unwrap().producers(),
            &[ctx.lookup("relu_0").unwrap()]
        );
    }

    #[test]
    fn test_tower_channel_threading() {
        use crate::layers::LayerConfig;

        let mut ctx = GraphContext::new();
        let input = ctx.add_input("in").unwrap();
        let block = ConvBlockConfig::new(11).with_out_channels(16);
        residual_tower(&mut ctx, 2, input, &block).unwrap();

        let in_channels = |label: &str| {
            match ctx.node(ctx.lookup(label).unwrap()).unwrap().operation().layer() {
                Some(LayerConfig::Convolution(config)) => config.in_channels,
                _ => panic!("{label} is not a convolution"),
            }
        };
        assert_eq!(in_channels("conv_residual_1_0"), 11);
        assert_eq!(in_channels("conv_residual_2_0"), 16);
        assert_eq!(in_channels("conv_residual_1_1"), 16);
    }
}
