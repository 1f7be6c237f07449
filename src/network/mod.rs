//! AlphaGo Zero style policy/value network assembly.
//!
//! [`assemble`] wires the full topology into a fresh [`GraphContext`]:
//!
//! ```text
//! in -> init (conv-norm-relu) -> tower -> policy head -> policy_head_output
//!                                      \-> value head  -> value_head_output
//! ```
//!
//! The builders in [`blocks`] and [`heads`] can also be used on their own to
//! grow custom graphs.

pub mod blocks;
pub mod config;
pub mod heads;

use log::info;

use crate::errors::GraphError;
use crate::graph::{Graph, GraphContext, InputType};

pub use blocks::{ConvBlockConfig, conv_norm_block, convolutional_tower, residual_block, residual_tower};
pub use config::{NetworkConfig, TowerKind};
pub use heads::{HeadConfig, policy_head, value_head};

/// Side length of a standard Go board.
pub const BOARD_SIZE: usize = 19;
/// Feature planes produced by the board encoder.
pub const INPUT_PLANES: usize = 11;
/// Channel width of the stem and tower.
pub const TOWER_CHANNELS: usize = 256;
/// Tower depth.
pub const DEFAULT_BLOCKS: usize = 20;
/// Width of the value head's hidden dense layer.
pub const VALUE_HIDDEN: usize = 256;
pub const POLICY_CHANNELS: usize = 2;
pub const VALUE_CHANNELS: usize = 1;

/// Label of the graph input.
pub const INPUT_LABEL: &str = "in";
/// Label of the conv-norm block between the input and the tower.
pub const STEM_LABEL: &str = "init";

/// Builds the complete network described by `config`.
///
/// The graph has one input, `in`, typed `board_size x board_size x
/// input_planes`, and two outputs in order: the policy and the value.
///
/// # Example
///
/// ```
/// use zeronet::graph::OpKind;
/// use zeronet::network::{NetworkConfig, assemble};
///
/// let graph = assemble(&NetworkConfig::new().num_blocks(2)).unwrap();
/// assert_eq!(graph.outputs().len(), 2);
/// assert_eq!(graph.count_kind(OpKind::Merge), 2);
/// ```
pub fn assemble(config: &NetworkConfig) -> Result<Graph, GraphError> {
    config.validate()?;

    let mut ctx = GraphContext::with_settings(config.engine);
    let input = ctx.add_input(INPUT_LABEL)?;
    ctx.set_input_types(vec![InputType::convolutional(
        config.board_size,
        config.board_size,
        config.input_planes,
    )]);

    let stem = conv_norm_block(
        &mut ctx,
        STEM_LABEL,
        input,
        &config.block_config(config.input_planes),
    )?;

    let block = config.block_config(config.channels);
    let tower = match config.tower {
        TowerKind::Residual => residual_tower(&mut ctx, config.num_blocks, stem, &block)?,
        TowerKind::Convolutional => convolutional_tower(&mut ctx, config.num_blocks, stem, &block)?,
    };

    let head = config.head_config();
    let policy = policy_head(&mut ctx, tower, &head)?;
    let value = value_head(&mut ctx, tower, &head)?;
    ctx.set_outputs(&[policy, value]);

    let graph = ctx.build()?;
    info!(
        "Assembled {:?} network: {} blocks, {} channels, {} nodes",
        config.tower,
        config.num_blocks,
        config.channels,
        graph.len()
    );
    Ok(graph)
}
