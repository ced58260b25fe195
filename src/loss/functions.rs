use ndarray::{Array1, ArrayView1};

use crate::error::{HermesError, Result};

/// Trait defining the interface for loss functions
pub trait Loss {
    /// Mean loss over a batch of predictions and targets
    fn compute(&self, predictions: ArrayView1<f32>, targets: ArrayView1<f32>) -> Result<f32>;

    /// Gradient of the mean loss with respect to every prediction
    fn gradient(&self, predictions: ArrayView1<f32>, targets: ArrayView1<f32>) -> Result<Array1<f32>>;
}

/// Mean Squared Error loss, `mean((prediction - target)^2)`
#[derive(Clone, Copy, Debug, Default)]
pub struct Mse;

fn check_lengths(predictions: &ArrayView1<f32>, targets: &ArrayView1<f32>) -> Result<()> {
    if predictions.len() != targets.len() {
        return Err(HermesError::dimension_mismatch(
            format!("{} targets", predictions.len()),
            format!("{}", targets.len()),
        ));
    }
    if predictions.is_empty() {
        return Err(HermesError::InsufficientData { requested: 1, available: 0 });
    }
    Ok(())
}

impl Loss for Mse {
    fn compute(&self, predictions: ArrayView1<f32>, targets: ArrayView1<f32>) -> Result<f32> {
        check_lengths(&predictions, &targets)?;
        let diff = &predictions - &targets;
        Ok(diff.mapv(|x| x * x).sum() / predictions.len() as f32)
    }

    fn gradient(&self, predictions: ArrayView1<f32>, targets: ArrayView1<f32>) -> Result<Array1<f32>> {
        check_lengths(&predictions, &targets)?;
        Ok((&predictions - &targets) * (2.0 / predictions.len() as f32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_mse() {
        let loss = Mse.compute(array![1.0, 3.0].view(), array![0.0, 1.0].view()).unwrap();
        assert_eq!(loss, 2.5);

        let grad = Mse.gradient(array![1.0, 3.0].view(), array![0.0, 1.0].view()).unwrap();
        assert_eq!(grad, array![1.0, 2.0]);
    }

    #[test]
    fn test_mse_length_mismatch() {
        assert!(Mse.compute(array![1.0].view(), array![0.0, 1.0].view()).is_err());
        assert!(Mse.gradient(Array1::zeros(0).view(), Array1::zeros(0).view()).is_err());
    }
}
