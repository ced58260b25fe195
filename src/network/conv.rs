use ndarray::{Array2, Array4, ArrayD, ArrayView2, ArrayViewD, ArrayViewMutD, Ix3};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::activations::Activation;
use crate::config::{AgentConfig, ConvNetworkConfig};
use crate::error::{HermesError, Result};
use crate::layers::{Conv2DLayer, DenseLayer};
use crate::network::{check_finite, NetworkBuilder, QNetwork};
use crate::spaces::{Space, Value};

const KERNEL: (usize, usize) = (3, 3);
const STRIDE: (usize, usize) = (1, 1);
const PADDING: (usize, usize) = (1, 1);

/// Convolutional Q-network over `(height, width, channels)` image observations
///
/// Images are moved channel-first before the convolutions, the last feature map is
/// flattened and fed through the fully connected head.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ConvQNetwork {
    /// `(height, width, channels)` of one observation
    image_dims: (usize, usize, usize),
    pub conv_layers: Vec<Conv2DLayer>,
    pub fc_layers: Vec<DenseLayer>,
    /// Shape of the last feature map, kept to un-flatten gradients
    #[serde(skip)]
    feature_dims: Option<(usize, usize, usize, usize)>,
}

impl ConvQNetwork {
    /// Stack observations into a `[batch, channels, height, width]` tensor
    fn batch_images(&self, observations: &[&Value]) -> Result<Array4<f32>> {
        let (height, width, channels) = self.image_dims;
        let mut batch = Array4::zeros((observations.len(), channels, height, width));
        for (mut slot, observation) in batch.outer_iter_mut().zip(observations) {
            let image = observation
                .as_box()
                .filter(|image| image.shape() == &[height, width, channels][..])
                .ok_or_else(|| {
                    HermesError::InvalidObservation(format!(
                        "expected a Box image of shape {:?}, got {:?}",
                        [height, width, channels],
                        observation
                    ))
                })?;
            let image = image.view().into_dimensionality::<Ix3>()?;
            slot.assign(&image.permuted_axes([2, 0, 1]));
        }
        Ok(batch)
    }
}

impl QNetwork for ConvQNetwork {
    fn num_actions(&self) -> usize {
        self.fc_layers.last().map_or(0, DenseLayer::output_size)
    }

    fn forward(&mut self, observations: &[&Value]) -> Result<Array2<f32>> {
        let mut features = self.batch_images(observations)?;
        for layer in &mut self.conv_layers {
            features = layer.forward_batch(features.view())?;
        }
        let dims = features.dim();
        self.feature_dims = Some(dims);

        let mut current = features.into_shape((dims.0, dims.1 * dims.2 * dims.3))?;
        for layer in &mut self.fc_layers {
            current = layer.forward_batch(current.view())?;
        }
        check_finite(&current)?;
        Ok(current)
    }

    fn backward(&mut self, output_gradient: ArrayView2<f32>) -> Result<Vec<ArrayD<f32>>> {
        let dims = self.feature_dims.ok_or_else(|| {
            HermesError::NumericalError("forward() must be called before backward()".to_string())
        })?;
        let mut gradients = Vec::with_capacity(2 * (self.conv_layers.len() + self.fc_layers.len()));

        let mut current = output_gradient.to_owned();
        for layer in self.fc_layers.iter().rev() {
            let (input_grad, weight_grad, bias_grad) = layer.backward_batch(current.view())?;
            gradients.push(bias_grad.into_dyn());
            gradients.push(weight_grad.into_dyn());
            current = input_grad;
        }

        let mut feature_grad = current.into_shape(dims)?;
        for layer in self.conv_layers.iter().rev() {
            let (input_grad, kernel_grad, bias_grad) = layer.backward_batch(feature_grad.view())?;
            gradients.push(bias_grad.into_dyn());
            gradients.push(kernel_grad.into_dyn());
            feature_grad = input_grad;
        }

        gradients.reverse();
        Ok(gradients)
    }

    fn parameters(&self) -> Vec<ArrayViewD<'_, f32>> {
        let conv = self
            .conv_layers
            .iter()
            .flat_map(|layer| [layer.kernels.view().into_dyn(), layer.biases.view().into_dyn()]);
        let fc = self
            .fc_layers
            .iter()
            .flat_map(|layer| [layer.weights.view().into_dyn(), layer.biases.view().into_dyn()]);
        conv.chain(fc).collect()
    }

    fn parameters_mut(&mut self) -> Vec<ArrayViewMutD<'_, f32>> {
        let conv = self.conv_layers.iter_mut().flat_map(|layer| {
            [
                layer.kernels.view_mut().into_dyn(),
                layer.biases.view_mut().into_dyn(),
            ]
        });
        let fc = self.fc_layers.iter_mut().flat_map(|layer| {
            [
                layer.weights.view_mut().into_dyn(),
                layer.biases.view_mut().into_dyn(),
            ]
        });
        conv.chain(fc).collect()
    }
}

/// Builds [`ConvQNetwork`]s from a `Box` observation space of rank 3
#[derive(Clone, Debug)]
pub struct ConvQNetworkBuilder {
    observation_space: Space,
    image_dims: (usize, usize, usize),
    num_actions: usize,
    config: ConvNetworkConfig,
}

impl ConvQNetworkBuilder {
    pub fn new(observation_space: &Space, action_space: &Space, config: ConvNetworkConfig) -> Result<Self> {
        observation_space.validate()?;
        let num_actions = action_space.require_discrete()?;
        config.validate()?;
        let image_dims = match observation_space.box_shape() {
            Some(&[height, width, channels]) => (height, width, channels),
            _ => {
                return Err(HermesError::UnsupportedSpace(format!(
                    "convolutional networks need a Box observation of shape (height, width, channels), got {:?}",
                    observation_space
                )))
            }
        };
        Ok(ConvQNetworkBuilder {
            observation_space: observation_space.clone(),
            image_dims,
            num_actions,
            config,
        })
    }
}

impl NetworkBuilder for ConvQNetworkBuilder {
    type Network = ConvQNetwork;

    fn observation_space(&self) -> &Space {
        &self.observation_space
    }

    fn build(&self, rng: &mut StdRng) -> Result<ConvQNetwork> {
        let (mut height, mut width, mut channels) = self.image_dims;

        let mut conv_layers = Vec::with_capacity(self.config.conv_sizes.len());
        for &out_channels in &self.config.conv_sizes {
            let layer = Conv2DLayer::new(channels, out_channels, KERNEL, STRIDE, PADDING, Activation::Relu, rng)?;
            let (h, w) = layer.output_dims(height, width)?;
            height = h;
            width = w;
            channels = out_channels;
            conv_layers.push(layer);
        }

        let mut sizes = vec![channels * height * width];
        sizes.extend(&self.config.fc_sizes);
        sizes.push(self.num_actions);
        let last = sizes.len() - 2;
        let fc_layers = sizes
            .windows(2)
            .enumerate()
            .map(|(i, window)| {
                let activation = if i == last { Activation::Linear } else { Activation::Relu };
                DenseLayer::new(window[0], window[1], activation, rng)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(ConvQNetwork {
            image_dims: self.image_dims,
            conv_layers,
            fc_layers,
            feature_dims: None,
        })
    }
}
