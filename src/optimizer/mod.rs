//! Gradient-based parameter updates.
//!
//! Optimizers receive the parameters of a network as mutable views, in the same order as
//! the gradients the network's backward pass produced. Per-parameter state (Adam's
//! moment estimates) is indexed by that position.

use ndarray::{ArrayD, ArrayViewMutD, Zip};
use serde::{Deserialize, Serialize};

use crate::error::{HermesError, Result};

pub trait Optimizer {
    /// Apply one update to `parameters` given matching `gradients`
    fn step(&mut self, parameters: Vec<ArrayViewMutD<'_, f32>>, gradients: &[ArrayD<f32>]) -> Result<()>;

    /// Forget all accumulated state
    fn reset(&mut self);
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub enum OptimizerWrapper {
    SGD(SGD),
    Adam(Adam),
}

impl Optimizer for OptimizerWrapper {
    fn step(&mut self, parameters: Vec<ArrayViewMutD<'_, f32>>, gradients: &[ArrayD<f32>]) -> Result<()> {
        match self {
            OptimizerWrapper::SGD(optimizer) => optimizer.step(parameters, gradients),
            OptimizerWrapper::Adam(optimizer) => optimizer.step(parameters, gradients),
        }
    }

    fn reset(&mut self) {
        match self {
            OptimizerWrapper::SGD(optimizer) => optimizer.reset(),
            OptimizerWrapper::Adam(optimizer) => optimizer.reset(),
        }
    }
}

fn check_shapes(parameters: &[ArrayViewMutD<'_, f32>], gradients: &[ArrayD<f32>]) -> Result<()> {
    if parameters.len() != gradients.len() {
        return Err(HermesError::dimension_mismatch(
            format!("{} gradients", parameters.len()),
            format!("{}", gradients.len()),
        ));
    }
    for (param, grad) in parameters.iter().zip(gradients) {
        if param.shape() != grad.shape() {
            return Err(HermesError::dimension_mismatch(
                format!("{:?}", param.shape()),
                format!("{:?}", grad.shape()),
            ));
        }
    }
    Ok(())
}

/// Plain stochastic gradient descent
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SGD {
    pub learning_rate: f32,
}

impl SGD {
    pub fn new(learning_rate: f32) -> SGD {
        SGD { learning_rate }
    }
}

impl Default for SGD {
    fn default() -> Self {
        Self::new(0.01)
    }
}

impl Optimizer for SGD {
    fn step(&mut self, parameters: Vec<ArrayViewMutD<'_, f32>>, gradients: &[ArrayD<f32>]) -> Result<()> {
        check_shapes(&parameters, gradients)?;
        let lr = self.learning_rate;
        for (mut param, grad) in parameters.into_iter().zip(gradients) {
            param.zip_mut_with(grad, |w, &g| *w -= lr * g);
        }
        Ok(())
    }

    fn reset(&mut self) {}
}

/// Adam with bias-corrected moment estimates
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Adam {
    pub learning_rate: f32,
    pub beta1: f32,
    pub beta2: f32,
    pub epsilon: f32,
    m: Vec<ArrayD<f32>>,
    v: Vec<ArrayD<f32>>,
    /// Number of steps taken
    pub t: i32,
}

impl Adam {
    pub fn new(learning_rate: f32, beta1: f32, beta2: f32, epsilon: f32) -> Self {
        Adam {
            learning_rate,
            beta1,
            beta2,
            epsilon,
            m: Vec::new(),
            v: Vec::new(),
            t: 0,
        }
    }
}

impl Default for Adam {
    fn default() -> Self {
        Self::new(1e-3, 0.9, 0.999, 1e-8)
    }
}

impl Optimizer for Adam {
    fn step(&mut self, parameters: Vec<ArrayViewMutD<'_, f32>>, gradients: &[ArrayD<f32>]) -> Result<()> {
        check_shapes(&parameters, gradients)?;

        // Moments are created on the first step, once the parameter shapes are known
        if self.m.len() != gradients.len() {
            self.m = gradients.iter().map(|g| ArrayD::zeros(g.raw_dim())).collect();
            self.v = gradients.iter().map(|g| ArrayD::zeros(g.raw_dim())).collect();
            self.t = 0;
        }

        self.t += 1;
        let (beta1, beta2, eps, lr) = (self.beta1, self.beta2, self.epsilon, self.learning_rate);
        let bias1 = 1.0 - beta1.powi(self.t);
        let bias2 = 1.0 - beta2.powi(self.t);

        for (((mut param, grad), m), v) in parameters
            .into_iter()
            .zip(gradients)
            .zip(self.m.iter_mut())
            .zip(self.v.iter_mut())
        {
            if m.shape() != grad.shape() {
                return Err(HermesError::dimension_mismatch(
                    format!("{:?}", m.shape()),
                    format!("{:?}", grad.shape()),
                ));
            }
            Zip::from(&mut param)
                .and(grad)
                .and(m)
                .and(v)
                .for_each(|p, &g, m, v| {
                    *m = beta1 * *m + (1.0 - beta1) * g;
                    *v = beta2 * *v + (1.0 - beta2) * g * g;
                    let m_hat = *m / bias1;
                    let v_hat = *v / bias2;
                    *p -= lr * m_hat / (v_hat.sqrt() + eps);
                });
        }

        Ok(())
    }

    fn reset(&mut self) {
        self.m.clear();
        self.v.clear();
        self.t = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array1};

    #[test]
    fn test_sgd_step() {
        let mut w = array![1.0, 2.0].into_dyn();
        let grads = vec![array![0.5, -0.5].into_dyn()];
        let mut sgd = SGD::new(0.1);
        sgd.step(vec![w.view_mut()], &grads).unwrap();
        assert_eq!(w, array![0.95, 2.05].into_dyn());
    }

    #[test]
    fn test_adam_first_step_moves_by_learning_rate() {
        let mut w = array![1.0, -1.0].into_dyn();
        let grads = vec![array![3.0, -0.2].into_dyn()];
        let mut adam = Adam::new(0.1, 0.9, 0.999, 1e-8);
        adam.step(vec![w.view_mut()], &grads).unwrap();
        // the first bias-corrected step is lr * sign(g)
        assert!((w[[0]] - 0.9).abs() < 1e-4);
        assert!((w[[1]] + 0.9).abs() < 1e-4);
        assert_eq!(adam.t, 1);
    }

    #[test]
    fn test_adam_minimises_quadratic() {
        let mut w = Array1::from_vec(vec![5.0f32]).into_dyn();
        let mut adam = Adam::new(0.1, 0.9, 0.999, 1e-8);
        for _ in 0..500 {
            let grads = vec![w.mapv(|x| 2.0 * x)];
            adam.step(vec![w.view_mut()], &grads).unwrap();
        }
        assert!(w[[0]].abs() < 0.5);
    }

    #[test]
    fn test_shape_mismatch_and_reset() {
        let mut w = array![1.0, 2.0].into_dyn();
        let mut adam = Adam::default();
        assert!(adam.step(vec![w.view_mut()], &[array![1.0].into_dyn()]).is_err());
        adam.step(vec![w.view_mut()], &[array![1.0, 1.0].into_dyn()]).unwrap();
        adam.reset();
        assert_eq!(adam.t, 0);
    }
}
