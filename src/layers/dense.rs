use ndarray::{Array1, Array2, ArrayView2, Axis};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::activations::Activation;
use crate::error::{HermesError, Result};
use crate::layers::initialization::WeightInit;

/// A fully connected (dense) layer in a neural network
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct DenseLayer {
    /// Weight matrix `[input_size, output_size]`
    pub weights: Array2<f32>,
    pub biases: Array1<f32>,
    pub activation: Activation,
    #[serde(skip)]
    pre_activation_output: Option<Array2<f32>>,
    #[serde(skip)]
    inputs: Option<Array2<f32>>,
}

impl DenseLayer {
    /// Create a new dense layer with fan-in uniform weights and biases.
    pub fn new<R: Rng + ?Sized>(
        input_size: usize,
        output_size: usize,
        activation: Activation,
        rng: &mut R,
    ) -> Result<Self> {
        let init = WeightInit::FanInUniform;
        let weights = init.initialize_weights((input_size, output_size), input_size, output_size, rng)?;
        let biases = init.initialize_biases(output_size, input_size, rng);
        Ok(DenseLayer {
            weights,
            biases,
            activation,
            pre_activation_output: None,
            inputs: None,
        })
    }

    pub fn input_size(&self) -> usize {
        self.weights.shape()[0]
    }

    pub fn output_size(&self) -> usize {
        self.weights.shape()[1]
    }

    /// Forward pass for a batch `[batch, input_size]`, caching what backward needs.
    pub fn forward_batch(&mut self, inputs: ArrayView2<f32>) -> Result<Array2<f32>> {
        if inputs.ncols() != self.input_size() {
            return Err(HermesError::dimension_mismatch(
                format!("{} input features", self.input_size()),
                format!("{}", inputs.ncols()),
            ));
        }
        self.inputs = Some(inputs.to_owned());
        let mut outputs = inputs.dot(&self.weights) + &self.biases.view().insert_axis(Axis(0));
        self.pre_activation_output = Some(outputs.clone());
        self.activation.apply(&mut outputs);
        Ok(outputs)
    }

    /// Backward pass for the last forward batch.
    ///
    /// Returns `(input_gradients, weight_gradients, bias_gradients)`.
    pub fn backward_batch(
        &self,
        output_errors: ArrayView2<f32>,
    ) -> Result<(Array2<f32>, Array2<f32>, Array1<f32>)> {
        let (inputs, pre_activation_output) = match (&self.inputs, &self.pre_activation_output) {
            (Some(inputs), Some(pre)) => (inputs, pre),
            _ => {
                return Err(HermesError::NumericalError(
                    "forward_batch() must be called before backward_batch()".to_string(),
                ))
            }
        };
        if output_errors.dim() != pre_activation_output.dim() {
            return Err(HermesError::dimension_mismatch(
                format!("{:?}", pre_activation_output.dim()),
                format!("{:?}", output_errors.dim()),
            ));
        }

        let activation_deriv = self.activation.derivative(pre_activation_output);
        let adjusted_error = &output_errors * &activation_deriv;
        let weight_gradients = inputs.t().dot(&adjusted_error);
        let bias_gradients = adjusted_error.sum_axis(Axis(0));
        let input_gradients = adjusted_error.dot(&self.weights.t());

        Ok((input_gradients, weight_gradients, bias_gradients))
    }
}
