//! Network configuration.

use serde::{Deserialize, Serialize};

use super::blocks::ConvBlockConfig;
use super::heads::HeadConfig;
use super::{
    BOARD_SIZE, DEFAULT_BLOCKS, INPUT_PLANES, POLICY_CHANNELS, TOWER_CHANNELS, VALUE_HIDDEN,
};
use crate::errors::GraphError;
use crate::graph::{EngineSettings, Updater, WeightInit};
use crate::layers::{Activation, ConvolutionConfig};

/// Which stack of blocks follows the stem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TowerKind {
    /// Residual blocks with an elementwise-add merge.
    #[default]
    Residual,
    /// Plain conv-norm-activation blocks.
    Convolutional,
}

/// Structural parameters of the network.
///
/// Every field has a default, so a JSON config only needs to name what it
/// changes. Convolutions always use unit stride and same padding: the heads
/// flatten a full `board_size x board_size` plane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Board side length; inputs are `board_size x board_size`.
    pub board_size: usize,
    /// Number of input feature planes produced by the board encoder.
    pub input_planes: usize,
    /// Channel width of the stem and tower.
    pub channels: usize,
    /// Number of tower blocks.
    pub num_blocks: usize,
    pub tower: TowerKind,
    /// Kernel of every convolution; must be odd on both sides.
    pub kernel_size: [usize; 2],
    /// Nonlinearity closing each block and each head's conv stage.
    pub activation: Activation,
    /// Width of the value head's hidden dense layer.
    pub value_hidden: usize,
    pub engine: EngineSettings,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            board_size: BOARD_SIZE,
            input_planes: INPUT_PLANES,
            channels: TOWER_CHANNELS,
            num_blocks: DEFAULT_BLOCKS,
            tower: TowerKind::Residual,
            kernel_size: [3, 3],
            activation: Activation::Relu,
            value_hidden: VALUE_HIDDEN,
            engine: EngineSettings::default(),
        }
    }
}

impl NetworkConfig {
    /// Creates a config with the standard 19x19 layout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a config from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, GraphError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Sets the board size.
    pub fn board_size(mut self, board_size: usize) -> Self {
        self.board_size = board_size;
        self
    }

    /// Sets the number of input planes.
    pub fn input_planes(mut self, input_planes: usize) -> Self {
        self.input_planes = input_planes;
        self
    }

    /// Sets the tower channel width.
    pub fn channels(mut self, channels: usize) -> Self {
        self.channels = channels;
        self
    }

    /// Sets the number of tower blocks.
    pub fn num_blocks(mut self, num_blocks: usize) -> Self {
        self.num_blocks = num_blocks;
        self
    }

    /// Sets the tower kind.
    pub fn tower(mut self, tower: TowerKind) -> Self {
        self.tower = tower;
        self
    }

    /// Sets the convolution kernel size.
    pub fn kernel_size(mut self, kernel_size: [usize; 2]) -> Self {
        self.kernel_size = kernel_size;
        self
    }

    /// Sets the block and head activation.
    pub fn activation(mut self, activation: Activation) -> Self {
        self.activation = activation;
        self
    }

    /// Sets the value head's hidden width.
    pub fn value_hidden(mut self, value_hidden: usize) -> Self {
        self.value_hidden = value_hidden;
        self
    }

    /// Sets the weight initialization scheme.
    pub fn weight_init(mut self, weight_init: WeightInit) -> Self {
        self.engine.weight_init = weight_init;
        self
    }

    /// Sets the updater.
    pub fn updater(mut self, updater: Updater) -> Self {
        self.engine.updater = updater;
        self
    }

    /// Checks the config describes a network whose heads line up with the
    /// board.
    pub fn validate(&self) -> Result<(), GraphError> {
        let invalid = |message: String| Err(GraphError::InvalidConfig { message });

        if self.board_size == 0 {
            return invalid("board size must be positive".to_string());
        }
        if self.input_planes == 0 {
            return invalid("input planes must be positive".to_string());
        }
        if self.channels == 0 {
            return invalid("channel width must be positive".to_string());
        }
        if self.value_hidden == 0 {
            return invalid("value head width must be positive".to_string());
        }
        if self.activation == Activation::Softmax {
            return invalid("softmax normalizes a flat output, not a block".to_string());
        }
        if let Err(message) = ConvolutionConfig::new(self.input_planes, self.channels)
            .with_kernel_size(self.kernel_size)
            .validate()
        {
            return invalid(message);
        }

        let area = self.board_size.checked_mul(self.board_size);
        let widths = area.and_then(|area| {
            area.checked_mul(self.channels.max(self.input_planes).max(POLICY_CHANNELS))?;
            area.checked_add(1)
        });
        if widths.is_none() {
            return invalid(format!(
                "board size {} overflows the flattened head widths",
                self.board_size
            ));
        }
        Ok(())
    }

    /// Block template for the stem and tower, consuming `in_channels`.
    pub fn block_config(&self, in_channels: usize) -> ConvBlockConfig {
        ConvBlockConfig::new(in_channels)
            .with_out_channels(self.channels)
            .with_kernel_size(self.kernel_size)
            .with_activation(self.activation)
    }

    /// Settings shared by the policy and value heads.
    pub fn head_config(&self) -> HeadConfig {
        HeadConfig::new(self.board_size, self.channels)
            .with_kernel_size(self.kernel_size)
            .with_activation(self.activation)
            .with_value_hidden(self.value_hidden)
    }
}
