use ndarray::{Array2, ArrayD, ArrayView2, ArrayViewD, ArrayViewMutD};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::activations::Activation;
use crate::config::{AgentConfig, DenseNetworkConfig};
use crate::error::{HermesError, Result};
use crate::layers::DenseLayer;
use crate::network::{check_finite, NetworkBuilder, QNetwork};
use crate::spaces::{Space, Value};

/// Fully connected Q-network over flattened observations
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct DenseQNetwork {
    observation_space: Space,
    pub layers: Vec<DenseLayer>,
}

impl DenseQNetwork {
    /// Stack the flattened observations into a `[batch, flatdim]` matrix
    fn batch_inputs(&self, observations: &[&Value]) -> Result<Array2<f32>> {
        let width = self.observation_space.flatdim();
        let mut inputs = Array2::zeros((observations.len(), width));
        for (mut row, observation) in inputs.outer_iter_mut().zip(observations) {
            row.assign(&self.observation_space.flatten(observation)?);
        }
        Ok(inputs)
    }
}

impl QNetwork for DenseQNetwork {
    fn num_actions(&self) -> usize {
        self.layers.last().map_or(0, DenseLayer::output_size)
    }

    fn forward(&mut self, observations: &[&Value]) -> Result<Array2<f32>> {
        let mut current = self.batch_inputs(observations)?;
        for layer in &mut self.layers {
            current = layer.forward_batch(current.view())?;
        }
        check_finite(&current)?;
        Ok(current)
    }

    fn backward(&mut self, output_gradient: ArrayView2<f32>) -> Result<Vec<ArrayD<f32>>> {
        let mut gradients = Vec::with_capacity(self.layers.len() * 2);
        let mut current = output_gradient.to_owned();
        for layer in self.layers.iter().rev() {
            let (input_grad, weight_grad, bias_grad) = layer.backward_batch(current.view())?;
            gradients.push(bias_grad.into_dyn());
            gradients.push(weight_grad.into_dyn());
            current = input_grad;
        }
        gradients.reverse();
        Ok(gradients)
    }

    fn parameters(&self) -> Vec<ArrayViewD<'_, f32>> {
        self.layers
            .iter()
            .flat_map(|layer| [layer.weights.view().into_dyn(), layer.biases.view().into_dyn()])
            .collect()
    }

    fn parameters_mut(&mut self) -> Vec<ArrayViewMutD<'_, f32>> {
        self.layers
            .iter_mut()
            .flat_map(|layer| {
                [
                    layer.weights.view_mut().into_dyn(),
                    layer.biases.view_mut().into_dyn(),
                ]
            })
            .collect()
    }
}

/// Builds [`DenseQNetwork`]s: `flatdim -> hidden_sizes (ReLU) -> num_actions (linear)`
#[derive(Clone, Debug)]
pub struct DenseQNetworkBuilder {
    observation_space: Space,
    num_actions: usize,
    config: DenseNetworkConfig,
}

impl DenseQNetworkBuilder {
    pub fn new(observation_space: &Space, action_space: &Space, config: DenseNetworkConfig) -> Result<Self> {
        observation_space.validate()?;
        let num_actions = action_space.require_discrete()?;
        config.validate()?;
        if observation_space.flatdim() == 0 {
            return Err(HermesError::UnsupportedSpace(format!(
                "{:?} flattens to an empty vector",
                observation_space
            )));
        }
        Ok(DenseQNetworkBuilder {
            observation_space: observation_space.clone(),
            num_actions,
            config,
        })
    }
}

impl NetworkBuilder for DenseQNetworkBuilder {
    type Network = DenseQNetwork;

    fn observation_space(&self) -> &Space {
        &self.observation_space
    }

    fn build(&self, rng: &mut StdRng) -> Result<DenseQNetwork> {
        let mut sizes = vec![self.observation_space.flatdim()];
        sizes.extend(&self.config.hidden_sizes);
        sizes.push(self.num_actions);

        let last = sizes.len() - 2;
        let layers = sizes
            .windows(2)
            .enumerate()
            .map(|(i, window)| {
                let activation = if i == last { Activation::Linear } else { Activation::Relu };
                DenseLayer::new(window[0], window[1], activation, rng)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(DenseQNetwork {
            observation_space: self.observation_space.clone(),
            layers,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn builder() -> DenseQNetworkBuilder {
        DenseQNetworkBuilder::new(
            &Space::Discrete(4),
            &Space::Discrete(3),
            DenseNetworkConfig::default().hidden_sizes(vec![8]),
        )
        .unwrap()
    }

    #[test]
    fn test_forward_shape() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut network = builder().build(&mut rng).unwrap();
        let a = Value::Discrete(0);
        let b = Value::Discrete(3);
        let q = network.forward(&[&a, &b]).unwrap();
        assert_eq!(q.dim(), (2, 3));
        assert_eq!(network.num_actions(), 3);
        assert_eq!(network.num_parameters(), 4 * 8 + 8 + 8 * 3 + 3);
    }

    #[test]
    fn test_gradients_match_parameters() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut network = builder().build(&mut rng).unwrap();
        let obs = Value::Discrete(2);
        network.forward(&[&obs]).unwrap();
        let gradients = network.backward(Array2::ones((1, 3)).view()).unwrap();
        let shapes: Vec<_> = network.parameters().iter().map(|p| p.shape().to_vec()).collect();
        let grad_shapes: Vec<_> = gradients.iter().map(|g| g.shape().to_vec()).collect();
        assert_eq!(shapes, grad_shapes);
    }

    #[test]
    fn test_independent_builds() {
        let mut rng = StdRng::seed_from_u64(2);
        let first = builder().build(&mut rng).unwrap();
        let mut second = builder().build(&mut rng).unwrap();
        assert_ne!(first.layers[0].weights, second.layers[0].weights);
        second.copy_parameters_from(&first).unwrap();
        assert_eq!(first.layers[0].weights, second.layers[0].weights);
        assert_eq!(first.layers[1].biases, second.layers[1].biases);
    }

    #[test]
    fn test_rejects_continuous_actions() {
        let action_space = Space::Box { low: -1.0, high: 1.0, shape: vec![2] };
        let err = DenseQNetworkBuilder::new(&Space::Discrete(4), &action_space, DenseNetworkConfig::default())
            .unwrap_err();
        assert!(matches!(err, HermesError::UnsupportedSpace(_)));
    }

    #[test]
    fn test_rejects_foreign_observation() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut network = builder().build(&mut rng).unwrap();
        let obs = Value::Discrete(9);
        assert!(matches!(
            network.forward(&[&obs]),
            Err(HermesError::InvalidObservation(_))
        ));
    }
}
