//! Graph-wide engine settings.
//!
//! Weight initialization and the optimizer are configured once for the whole
//! graph. The graph only records them; Burn applies the initializer when the
//! graph is compiled, and the updater is left to whatever drives training.

use burn::nn::Initializer;
use serde::{Deserialize, Serialize};

/// Weight initialization scheme applied to every convolution and dense layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeightInit {
    /// Normal with variance `1 / fan_in`.
    #[default]
    LecunNormal,
    /// Normal with variance `2 / fan_in`.
    HeNormal,
    /// Glorot uniform.
    XavierUniform,
}

impl WeightInit {
    /// Returns the Burn initializer implementing this scheme.
    pub fn initializer(&self) -> Initializer {
        match self {
            WeightInit::LecunNormal => Initializer::KaimingNormal {
                gain: 1.0,
                fan_out_only: false,
            },
            WeightInit::HeNormal => Initializer::KaimingNormal {
                gain: std::f64::consts::SQRT_2,
                fan_out_only: false,
            },
            WeightInit::XavierUniform => Initializer::XavierUniform { gain: 1.0 },
        }
    }
}

/// Optimizer family and its learning rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Updater {
    Sgd { learning_rate: f64 },
    Adam { learning_rate: f64 },
}

impl Updater {
    pub fn learning_rate(&self) -> f64 {
        match self {
            Updater::Sgd { learning_rate } | Updater::Adam { learning_rate } => *learning_rate,
        }
    }
}

impl Default for Updater {
    fn default() -> Self {
        Updater::Sgd {
            learning_rate: 0.01,
        }
    }
}

/// Settings shared by every node of a graph.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct EngineSettings {
    #[serde(default)]
    pub weight_init: WeightInit,
    #[serde(default)]
    pub updater: Updater,
}

impl EngineSettings {
    pub fn new(weight_init: WeightInit, updater: Updater) -> Self {
        Self {
            weight_init,
            updater,
        }
    }
}
