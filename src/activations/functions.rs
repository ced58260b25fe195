use ndarray::{Array, Dimension};
use serde::{Deserialize, Serialize};

/// An enumeration of the activation functions available to network layers.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, Default)]
pub enum Activation {
    #[default]
    Relu,
    Linear,
}

impl Activation {
    /// Apply the activation function in-place.
    pub fn apply<D: Dimension>(&self, input: &mut Array<f32, D>) {
        match self {
            Activation::Relu => {
                input.mapv_inplace(|v| v.max(0.0));
            }
            Activation::Linear => {}
        }
    }

    /// Derivative of the activation evaluated at the pre-activation values.
    pub fn derivative<D: Dimension>(&self, pre_activation: &Array<f32, D>) -> Array<f32, D> {
        match self {
            Activation::Relu => pre_activation.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 }),
            Activation::Linear => pre_activation.mapv(|_| 1.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_relu() {
        let mut x = array![[-1.0, 0.0, 2.0]];
        Activation::Relu.apply(&mut x);
        assert_eq!(x, array![[0.0, 0.0, 2.0]]);

        let d = Activation::Relu.derivative(&array![-1.0, 0.0, 2.0]);
        assert_eq!(d, array![0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_linear_is_identity() {
        let mut x = array![[[-3.0, 4.0]]];
        Activation::Linear.apply(&mut x);
        assert_eq!(x, array![[[-3.0, 4.0]]]);
        assert_eq!(Activation::Linear.derivative(&x), array![[[1.0, 1.0]]]);
    }
}
