use ndarray::{Array, Array1, Dimension, ShapeBuilder};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{HermesError, Result};

/// Weight initialization strategies
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub enum WeightInit {
    /// `U(-1/sqrt(fan_in), 1/sqrt(fan_in))` for weights and biases
    #[default]
    FanInUniform,
}

impl WeightInit {
    /// Initialize a weight tensor of any shape from an explicit generator
    pub fn initialize_weights<Sh, D, R>(
        &self,
        shape: Sh,
        fan_in: usize,
        fan_out: usize,
        rng: &mut R,
    ) -> Result<Array<f32, D>>
    where
        Sh: ShapeBuilder<Dim = D>,
        D: Dimension,
        R: Rng + ?Sized,
    {
        if fan_in == 0 || fan_out == 0 {
            return Err(HermesError::invalid_parameter(
                "fan_in/fan_out",
                "layers must have at least one input and one output",
            ));
        }

        match self {
            WeightInit::FanInUniform => {
                let bound = 1.0 / (fan_in as f32).sqrt();
                Ok(Array::random_using(shape, Uniform::new(-bound, bound), rng))
            }
        }
    }

    /// Initialize biases for a layer
    pub fn initialize_biases<R: Rng + ?Sized>(
        &self,
        size: usize,
        fan_in: usize,
        rng: &mut R,
    ) -> Array1<f32> {
        match self {
            WeightInit::FanInUniform if fan_in > 0 => {
                let bound = 1.0 / (fan_in as f32).sqrt();
                Array1::random_using(size, Uniform::new(-bound, bound), rng)
            }
            _ => Array1::zeros(size),
        }
    }
}
