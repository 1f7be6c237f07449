//! Fully connected layers used by the value head and the output layers.

use crate::layers::Activation;
use burn::{
    module::Module,
    nn::{Initializer, Linear, LinearConfig},
    tensor::{Tensor, backend::Backend},
};
use serde::Serialize;

/// A fully connected layer record; the value head's hidden layer is one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DenseConfig {
    /// Width of the flat input, after any layout adaptation.
    pub input_size: usize,
    pub output_size: usize,
    pub activation: Activation,
}

impl DenseConfig {
    /// Creates a dense record with no activation.
    pub fn new(input_size: usize, output_size: usize) -> Self {
        Self {
            input_size,
            output_size,
            activation: Activation::None,
        }
    }

    pub fn with_activation(mut self, activation: Activation) -> Self {
        self.activation = activation;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.input_size == 0 || self.output_size == 0 {
            return Err(format!(
                "dense sizes must be positive, got {} -> {}",
                self.input_size, self.output_size
            ));
        }
        Ok(())
    }

    /// Instantiates the layer with the graph's initializer.
    pub fn init<B: Backend>(&self, initializer: Initializer, device: &B::Device) -> Dense<B> {
        let linear = LinearConfig::new(self.input_size, self.output_size)
            .with_initializer(initializer)
            .init(device);

        Dense {
            linear,
            input_size: self.input_size,
            output_size: self.output_size,
            activation_id: self.activation.to_id(),
        }
    }
}

/// `activation(x W + b)` over `[batch, features]`.
///
/// Output layers compile to this module too; their loss stays on the record.
#[derive(Module, Debug)]
pub struct Dense<B: Backend> {
    linear: Linear<B>,
    input_size: usize,
    output_size: usize,
    /// Activation function ID, see [`Activation::to_id`].
    activation_id: u8,
}

impl<B: Backend> Dense<B> {
    pub fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        let output = self.linear.forward(input);
        Activation::from_id(self.activation_id).apply(output)
    }

    pub fn input_size(&self) -> usize {
        self.input_size
    }

    pub fn output_size(&self) -> usize {
        self.output_size
    }

    pub fn activation(&self) -> Activation {
        Activation::from_id(self.activation_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_dense_config_creation() {
        let config = DenseConfig::new(361, 256).with_activation(Activation::Relu);

        assert_eq!(config.input_size, 361);
        assert_eq!(config.output_size, 256);
        assert_eq!(config.activation, Activation::Relu);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_dense_config_rejects_empty() {
        assert!(DenseConfig::new(0, 4).validate().is_err());
        assert!(DenseConfig::new(4, 0).validate().is_err());
    }

    #[test]
    fn test_dense_layer_creation() {
        let device = <TestBackend as Backend>::Device::default();
        let dense: Dense<TestBackend> = DenseConfig::new(4, 2)
            .with_activation(Activation::Tanh)
            .init(Initializer::XavierUniform { gain: 1.0 }, &device);

        assert_eq!(dense.input_size(), 4);
        assert_eq!(dense.output_size(), 2);
        assert_eq!(dense.activation(), Activation::Tanh);
    }

    #[test]
    fn test_dense_forward_shape() {
        let device = <TestBackend as Backend>::Device::default();
        let dense: Dense<TestBackend> =
            DenseConfig::new(4, 2).init(Initializer::XavierUniform { gain: 1.0 }, &device);

        let input = Tensor::<TestBackend, 2>::zeros([3, 4], &device);
        let output = dense.forward(input);

        assert_eq!(output.dims(), [3, 2]);
    }
}
