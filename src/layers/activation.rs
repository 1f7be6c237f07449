//! Activation functions for network layers.

use burn::tensor::{Tensor, backend::Backend};
use serde::{Deserialize, Serialize};

/// Nonlinearity applied by activation nodes, dense layers and output layers.
///
/// Tensors handed to [`Activation::apply`] may be spatial (`[batch, channels,
/// height, width]`) or flat (`[batch, features]`). Softmax normalizes over
/// the last dimension, so it only makes sense on flat tensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Activation {
    /// Identity. [`Activation::from_name`] also accepts `IDENTITY`.
    #[default]
    None,
    /// `max(0, x)`; every block in the tower ends in one.
    Relu,
    Sigmoid,
    /// Squashes the value head into `[-1, 1]`.
    Tanh,
    /// Normalizes the last axis into a distribution; used by the policy head.
    Softmax,
}

impl Activation {
    /// Applies the nonlinearity elementwise (softmax: along the last axis).
    pub fn apply<B: Backend, const D: usize>(&self, tensor: Tensor<B, D>) -> Tensor<B, D> {
        match self {
            Activation::None => tensor,
            Activation::Relu => burn::tensor::activation::relu(tensor),
            Activation::Sigmoid => burn::tensor::activation::sigmoid(tensor),
            Activation::Tanh => burn::tensor::activation::tanh(tensor),
            Activation::Softmax => burn::tensor::activation::softmax(tensor, D - 1),
        }
    }

    /// Returns the upper-case name used in topology exports and summaries.
    pub fn name(&self) -> &'static str {
        match self {
            Activation::None => "NONE",
            Activation::Relu => "RELU",
            Activation::Sigmoid => "SIGMOID",
            Activation::Tanh => "TANH",
            Activation::Softmax => "SOFTMAX",
        }
    }

    /// Parses a case-insensitive name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_uppercase().as_str() {
            "NONE" | "IDENTITY" => Some(Activation::None),
            "RELU" => Some(Activation::Relu),
            "SIGMOID" => Some(Activation::Sigmoid),
            "TANH" => Some(Activation::Tanh),
            "SOFTMAX" => Some(Activation::Softmax),
            _ => None,
        }
    }

    /// Converts activation to a numeric ID for storage in a Module.
    pub fn to_id(&self) -> u8 {
        match self {
            Activation::None => 0,
            Activation::Relu => 1,
            Activation::Sigmoid => 2,
            Activation::Tanh => 3,
            Activation::Softmax => 4,
        }
    }

    /// Inverse of [`Activation::to_id`]; unknown ids map to `None`.
    pub fn from_id(id: u8) -> Self {
        match id {
            1 => Activation::Relu,
            2 => Activation::Sigmoid,
            3 => Activation::Tanh,
            4 => Activation::Softmax,
            _ => Activation::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_activation_names() {
        assert_eq!(Activation::None.name(), "NONE");
        assert_eq!(Activation::Relu.name(), "RELU");
        assert_eq!(Activation::Tanh.name(), "TANH");
        assert_eq!(Activation::Softmax.name(), "SOFTMAX");
    }

    #[test]
    fn test_activation_from_name() {
        assert_eq!(Activation::from_name("relu"), Some(Activation::Relu));
        assert_eq!(Activation::from_name("SIGMOID"), Some(Activation::Sigmoid));
        assert_eq!(Activation::from_name("identity"), Some(Activation::None));
        assert_eq!(Activation::from_name("gelu"), None);
    }

    #[test]
    fn test_activation_id_roundtrip() {
        for act in [
            Activation::None,
            Activation::Relu,
            Activation::Sigmoid,
            Activation::Tanh,
            Activation::Softmax,
        ] {
            assert_eq!(Activation::from_id(act.to_id()), act);
        }
    }

    #[test]
    fn test_relu_on_spatial_tensor() {
        use burn::tensor::backend::Backend;
        let device = <TestBackend as Backend>::Device::default();
        let input =
            Tensor::<TestBackend, 4>::from_floats([[[[-1.0, 2.0], [0.5, -3.0]]]], &device);
        let output = Activation::Relu.apply(input);
        let result: Vec<f32> = output.to_data().to_vec().unwrap();
        assert_eq!(result, vec![0.0, 2.0, 0.5, 0.0]);
    }

    #[test]
    fn test_softmax_sums_to_one() {
        use burn::tensor::backend::Backend;
        let device = <TestBackend as Backend>::Device::default();
        let input = Tensor::<TestBackend, 2>::from_floats([[1.0, 2.0, 3.0]], &device);
        let output = Activation::Softmax.apply(input);
        let result: Vec<f32> = output.to_data().to_vec().unwrap();
        let sum: f32 = result.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_tanh_is_bounded() {
        use burn::tensor::backend::Backend;
        let device = <TestBackend as Backend>::Device::default();
        let input = Tensor::<TestBackend, 2>::from_floats([[-50.0, 0.0, 50.0]], &device);
        let output = Activation::Tanh.apply(input);
        let result: Vec<f32> = output.to_data().to_vec().unwrap();
        assert!((result[0] + 1.0).abs() < 1e-5);
        assert!(result[1].abs() < 1e-5);
        assert!((result[2] - 1.0).abs() < 1e-5);
    }
}
