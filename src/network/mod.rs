//! # Q-Networks
//!
//! Function approximators mapping a batch of observations to one Q-value per action.
//!
//! A [`QNetwork`] owns its layers and the activations cached by the last forward pass, so
//! a training step is `forward` on the batch, `backward` on the loss gradient, then an
//! optimizer step over [`QNetwork::parameters_mut`]. Gradients and parameters are always
//! listed in the same order.
//!
//! Networks are produced by a [`NetworkBuilder`]. The deep agent calls the builder twice
//! per reset, once for the trainable network and once for its target network, so the two
//! start from independent parameters.
//!
//! - [`DenseQNetwork`]: flatten, then fully connected layers with ReLU between them
//! - [`ConvQNetwork`]: 3x3 convolutions over `(height, width, channels)` images, then
//!   fully connected layers

use std::fmt::Debug;

use ndarray::{Array2, ArrayD, ArrayView2, ArrayViewD, ArrayViewMutD};
use rand::rngs::StdRng;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{HermesError, Result};
use crate::spaces::{Space, Value};

mod conv;
mod dense;

pub use conv::{ConvQNetwork, ConvQNetworkBuilder};
pub use dense::{DenseQNetwork, DenseQNetworkBuilder};

/// A differentiable map from observations to action values
pub trait QNetwork: Clone + Debug + Serialize + DeserializeOwned {
    fn num_actions(&self) -> usize;

    /// Q-values of shape `[batch, num_actions]`, caching what `backward` needs
    fn forward(&mut self, observations: &[&Value]) -> Result<Array2<f32>>;

    /// Parameter gradients for the last forward batch, given `d loss / d output`
    fn backward(&mut self, output_gradient: ArrayView2<f32>) -> Result<Vec<ArrayD<f32>>>;

    fn parameters(&self) -> Vec<ArrayViewD<'_, f32>>;

    fn parameters_mut(&mut self) -> Vec<ArrayViewMutD<'_, f32>>;

    /// Hard copy of every parameter of `other` into `self`
    fn copy_parameters_from(&mut self, other: &Self) -> Result<()> {
        let source = other.parameters();
        let mut target = self.parameters_mut();
        if source.len() != target.len() {
            return Err(HermesError::dimension_mismatch(
                format!("{} parameter tensors", target.len()),
                format!("{}", source.len()),
            ));
        }
        for (dst, src) in target.iter_mut().zip(&source) {
            if dst.shape() != src.shape() {
                return Err(HermesError::dimension_mismatch(
                    format!("{:?}", dst.shape()),
                    format!("{:?}", src.shape()),
                ));
            }
            dst.assign(src);
        }
        Ok(())
    }

    /// Total number of scalar parameters
    fn num_parameters(&self) -> usize {
        self.parameters().iter().map(|p| p.len()).sum()
    }
}

/// Constructs freshly initialised networks of a fixed architecture
pub trait NetworkBuilder {
    type Network: QNetwork;

    /// Space the built networks read their observations from
    fn observation_space(&self) -> &Space;

    fn build(&self, rng: &mut StdRng) -> Result<Self::Network>;
}

/// Check a forward pass produced finite values
pub(crate) fn check_finite(outputs: &Array2<f32>) -> Result<()> {
    if outputs.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(HermesError::NumericalError(
            "network produced non-finite Q-values".to_string(),
        ))
    }
}
