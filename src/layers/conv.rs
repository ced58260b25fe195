//! 2D convolution for image-like observations
//!
//! Inputs are laid out `[batch, channels, height, width]`. The convolution is computed
//! directly (no im2col); grid-world observations are small enough for that to be fine.

use ndarray::{s, Array1, Array4, ArrayView4, Axis};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::activations::Activation;
use crate::error::{HermesError, Result};
use crate::layers::initialization::WeightInit;

/// 2D Convolutional Layer
///
/// Applies 2D convolution over an input signal composed of several input planes,
/// followed by an activation.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Conv2DLayer {
    /// Convolution kernels/filters [out_channels, in_channels, kernel_height, kernel_width]
    pub kernels: Array4<f32>,

    /// Bias terms for each output channel
    pub biases: Array1<f32>,

    pub activation: Activation,

    pub stride: (usize, usize),

    /// Zero padding added on each side
    pub padding: (usize, usize),

    pub in_channels: usize,

    pub out_channels: usize,

    pub kernel_size: (usize, usize),

    /// Cached input for backward pass
    #[serde(skip)]
    cached_input: Option<Array4<f32>>,

    /// Cached pre-activation output
    #[serde(skip)]
    cached_pre_activation: Option<Array4<f32>>,
}

impl Conv2DLayer {
    /// Create a new 2D convolutional layer with fan-in uniform kernels and biases
    pub fn new<R: Rng + ?Sized>(
        in_channels: usize,
        out_channels: usize,
        kernel_size: (usize, usize),
        stride: (usize, usize),
        padding: (usize, usize),
        activation: Activation,
        rng: &mut R,
    ) -> Result<Self> {
        if kernel_size.0 == 0 || kernel_size.1 == 0 || stride.0 == 0 || stride.1 == 0 {
            return Err(HermesError::invalid_parameter(
                "kernel_size/stride",
                "must be positive",
            ));
        }

        let init = WeightInit::FanInUniform;
        let fan_in = in_channels * kernel_size.0 * kernel_size.1;
        let fan_out = out_channels * kernel_size.0 * kernel_size.1;

        let kernels = init.initialize_weights(
            (out_channels, in_channels, kernel_size.0, kernel_size.1),
            fan_in,
            fan_out,
            rng,
        )?;
        let biases = init.initialize_biases(out_channels, fan_in, rng);

        Ok(Conv2DLayer {
            kernels,
            biases,
            activation,
            stride,
            padding,
            in_channels,
            out_channels,
            kernel_size,
            cached_input: None,
            cached_pre_activation: None,
        })
    }

    /// Spatial size of the output for an input of `(height, width)`
    pub fn output_dims(&self, height: usize, width: usize) -> Result<(usize, usize)> {
        let padded_h = height + 2 * self.padding.0;
        let padded_w = width + 2 * self.padding.1;
        if padded_h < self.kernel_size.0 || padded_w < self.kernel_size.1 {
            return Err(HermesError::dimension_mismatch(
                format!("input of at least {:?} after padding", self.kernel_size),
                format!("({}, {})", padded_h, padded_w),
            ));
        }
        Ok((
            (padded_h - self.kernel_size.0) / self.stride.0 + 1,
            (padded_w - self.kernel_size.1) / self.stride.1 + 1,
        ))
    }

    /// Pad input with zeros
    fn pad_input(&self, input: &Array4<f32>) -> Array4<f32> {
        if self.padding == (0, 0) {
            return input.clone();
        }
        let (batch_size, channels, height, width) = input.dim();
        let mut padded = Array4::zeros((
            batch_size,
            channels,
            height + 2 * self.padding.0,
            width + 2 * self.padding.1,
        ));
        padded
            .slice_mut(s![
                ..,
                ..,
                self.padding.0..self.padding.0 + height,
                self.padding.1..self.padding.1 + width
            ])
            .assign(input);
        padded
    }

    /// Forward pass for batch of images [batch, channels, height, width]
    pub fn forward_batch(&mut self, input: ArrayView4<f32>) -> Result<Array4<f32>> {
        let (batch_size, channels, in_height, in_width) = input.dim();
        if channels != self.in_channels {
            return Err(HermesError::dimension_mismatch(
                format!("{} input channels", self.in_channels),
                format!("{}", channels),
            ));
        }
        let (out_height, out_width) = self.output_dims(in_height, in_width)?;

        let input = input.to_owned();
        let padded = self.pad_input(&input);
        let mut output = Array4::zeros((batch_size, self.out_channels, out_height, out_width));

        for b in 0..batch_size {
            for oc in 0..self.out_channels {
                for oh in 0..out_height {
                    for ow in 0..out_width {
                        let h_start = oh * self.stride.0;
                        let w_start = ow * self.stride.1;
                        let mut sum = self.biases[oc];
                        for ic in 0..self.in_channels {
                            for kh in 0..self.kernel_size.0 {
                                for kw in 0..self.kernel_size.1 {
                                    sum += padded[[b, ic, h_start + kh, w_start + kw]]
                                        * self.kernels[[oc, ic, kh, kw]];
                                }
                            }
                        }
                        output[[b, oc, oh, ow]] = sum;
                    }
                }
            }
        }

        self.cached_input = Some(input);
        self.cached_pre_activation = Some(output.clone());
        self.activation.apply(&mut output);
        Ok(output)
    }

    /// Backward pass for the last forward batch.
    ///
    /// Returns `(input_gradients, kernel_gradients, bias_gradients)`.
    pub fn backward_batch(
        &self,
        output_gradient: ArrayView4<f32>,
    ) -> Result<(Array4<f32>, Array4<f32>, Array1<f32>)> {
        let (input, pre_activation) = match (&self.cached_input, &self.cached_pre_activation) {
            (Some(input), Some(pre)) => (input, pre),
            _ => {
                return Err(HermesError::NumericalError(
                    "forward_batch() must be called before backward_batch()".to_string(),
                ))
            }
        };
        if output_gradient.dim() != pre_activation.dim() {
            return Err(HermesError::dimension_mismatch(
                format!("{:?}", pre_activation.dim()),
                format!("{:?}", output_gradient.dim()),
            ));
        }

        let grad = &output_gradient * &self.activation.derivative(pre_activation);
        let padded_input = self.pad_input(input);

        let kernel_gradients = self.compute_kernel_gradients(&padded_input, &grad);
        let bias_gradients = grad.sum_axis(Axis(3)).sum_axis(Axis(2)).sum_axis(Axis(0));
        let input_gradients = self.compute_input_gradients(input.dim(), &grad);

        Ok((input_gradients, kernel_gradients, bias_gradients))
    }

    /// Compute gradients for kernels
    fn compute_kernel_gradients(&self, padded_input: &Array4<f32>, grad_output: &Array4<f32>) -> Array4<f32> {
        let mut kernel_grads = Array4::zeros(self.kernels.dim());
        let (batch_size, _, out_height, out_width) = grad_output.dim();

        for oc in 0..self.out_channels {
            for ic in 0..self.in_channels {
                for kh in 0..self.kernel_size.0 {
                    for kw in 0..self.kernel_size.1 {
                        let mut sum = 0.0;
                        for b in 0..batch_size {
                            for oh in 0..out_height {
                                for ow in 0..out_width {
                                    sum += padded_input
                                        [[b, ic, oh * self.stride.0 + kh, ow * self.stride.1 + kw]]
                                        * grad_output[[b, oc, oh, ow]];
                                }
                            }
                        }
                        kernel_grads[[oc, ic, kh, kw]] = sum;
                    }
                }
            }
        }

        kernel_grads
    }

    /// Compute gradients for input (transpose convolution), padding stripped
    fn compute_input_gradients(
        &self,
        input_dim: (usize, usize, usize, usize),
        grad_output: &Array4<f32>,
    ) -> Array4<f32> {
        let (batch_size, _, in_height, in_width) = input_dim;
        let (_, _, out_height, out_width) = grad_output.dim();
        let mut grad_padded = Array4::zeros((
            batch_size,
            self.in_channels,
            in_height + 2 * self.padding.0,
            in_width + 2 * self.padding.1,
        ));

        for b in 0..batch_size {
            for oc in 0..self.out_channels {
                for oh in 0..out_height {
                    for ow in 0..out_width {
                        let g = grad_output[[b, oc, oh, ow]];
                        if g == 0.0 {
                            continue;
                        }
                        for ic in 0..self.in_channels {
                            for kh in 0..self.kernel_size.0 {
                                for kw in 0..self.kernel_size.1 {
                                    grad_padded[[b, ic, oh * self.stride.0 + kh, ow * self.stride.1 + kw]] +=
                                        g * self.kernels[[oc, ic, kh, kw]];
                                }
                            }
                        }
                    }
                }
            }
        }

        grad_padded
            .slice(s![
                ..,
                ..,
                self.padding.0..self.padding.0 + in_height,
                self.padding.1..self.padding.1 + in_width
            ])
            .to_owned()
    }
}
