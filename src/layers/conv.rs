//! 2D convolution layer configuration.

use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::{Initializer, PaddingConfig2d};
use burn::tensor::backend::Backend;
use serde::{Deserialize, Serialize};

/// How a convolution treats the border of its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaddingMode {
    /// Pads so the output keeps the input's spatial size.
    #[default]
    Same,
    /// No padding; the output shrinks by `kernel - 1` along each axis.
    Valid,
}

/// Configuration for a 2D convolution.
///
/// Tensors are laid out channels-first: `[batch, channels, height, width]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConvolutionConfig {
    /// Number of input channels.
    pub in_channels: usize,
    /// Number of output channels (filters).
    pub out_channels: usize,
    /// Kernel height and width.
    pub kernel_size: [usize; 2],
    /// Stride along height and width.
    pub stride: [usize; 2],
    /// Border handling.
    pub padding: PaddingMode,
}

impl ConvolutionConfig {
    /// Creates a 3x3, stride 1, same-padded convolution.
    pub fn new(in_channels: usize, out_channels: usize) -> Self {
        Self {
            in_channels,
            out_channels,
            kernel_size: [3, 3],
            stride: [1, 1],
            padding: PaddingMode::Same,
        }
    }

    /// Sets the kernel size.
    pub fn with_kernel_size(mut self, kernel_size: [usize; 2]) -> Self {
        self.kernel_size = kernel_size;
        self
    }

    /// Sets the stride.
    pub fn with_stride(mut self, stride: [usize; 2]) -> Self {
        self.stride = stride;
        self
    }

    /// Sets the padding mode.
    pub fn with_padding(mut self, padding: PaddingMode) -> Self {
        self.padding = padding;
        self
    }

    /// Checks the record is something the engine can instantiate.
    pub fn validate(&self) -> Result<(), String> {
        if self.in_channels == 0 || self.out_channels == 0 {
            return Err("channel counts must be positive".to_string());
        }
        if self.kernel_size.contains(&0) {
            return Err(format!("kernel size {:?} has a zero side", self.kernel_size));
        }
        if self.stride.contains(&0) {
            return Err(format!("stride {:?} has a zero side", self.stride));
        }
        if self.padding == PaddingMode::Same {
            if self.kernel_size.iter().any(|k| k % 2 == 0) {
                return Err(format!(
                    "same padding needs an odd kernel, got {:?}",
                    self.kernel_size
                ));
            }
            if self.stride != [1, 1] {
                return Err(format!(
                    "same padding needs a unit stride, got {:?}",
                    self.stride
                ));
            }
        }
        Ok(())
    }

    /// Returns the spatial output size for a `height x width` input, or
    /// `None` if the kernel does not fit.
    pub fn output_size(&self, height: usize, width: usize) -> Option<(usize, usize)> {
        match self.padding {
            PaddingMode::Same => Some((height, width)),
            PaddingMode::Valid => {
                let [kh, kw] = self.kernel_size;
                let [sh, sw] = self.stride;
                if height < kh || width < kw {
                    return None;
                }
                Some(((height - kh) / sh + 1, (width - kw) / sw + 1))
            }
        }
    }

    /// Instantiates the Burn convolution module.
    pub fn init<B: Backend>(&self, initializer: Initializer, device: &B::Device) -> Conv2d<B> {
        let padding = match self.padding {
            PaddingMode::Same => PaddingConfig2d::Same,
            PaddingMode::Valid => PaddingConfig2d::Valid,
        };
        Conv2dConfig::new([self.in_channels, self.out_channels], self.kernel_size)
            .with_stride(self.stride)
            .with_padding(padding)
            .with_initializer(initializer)
            .init(device)
    }
}
