//! # Observation and Action Spaces
//!
//! Environments describe what they emit and accept with a [`Space`]. Concrete
//! observations are [`Value`]s belonging to that space.
//!
//! Every space can be flattened into a fixed-length `f32` vector, which is what
//! tabular agents key their tables on and what the Q-networks consume:
//!
//! - `Discrete(n)` becomes a one-hot vector of length `n`
//! - `MultiDiscrete([n0, n1, ..])` becomes the concatenated one-hots
//! - `Box` is raveled in row-major order
//! - `Tuple` concatenates the flattened components
//!
//! ```rust
//! use hermes::spaces::{Space, Value};
//!
//! let space = Space::Tuple(vec![Space::Discrete(3), Space::Discrete(2)]);
//! let value = Value::Tuple(vec![Value::Discrete(1), Value::Discrete(0)]);
//!
//! let flat = space.flatten(&value).unwrap();
//! assert_eq!(flat.to_vec(), vec![0.0, 1.0, 0.0, 1.0, 0.0]);
//! assert_eq!(space.unflatten(flat.as_slice().unwrap()).unwrap(), value);
//! ```

use ndarray::{Array1, ArrayD, IxDyn};
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use crate::error::{HermesError, Result};

/// Description of a set of valid observations or actions
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Space {
    /// Integers in `0..n`
    Discrete(usize),
    /// A vector of independent discrete components
    MultiDiscrete(Vec<usize>),
    /// A real-valued tensor with element-wise bounds
    Box { low: f32, high: f32, shape: Vec<usize> },
    /// A fixed sequence of sub-spaces
    Tuple(Vec<Space>),
}

/// A concrete member of a [`Space`]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Discrete(usize),
    MultiDiscrete(Vec<usize>),
    Box(ArrayD<f32>),
    Tuple(Vec<Value>),
}

impl Value {
    /// The tensor of a `Box` value
    pub fn as_box(&self) -> Option<&ArrayD<f32>> {
        match self {
            Value::Box(array) => Some(array),
            _ => None,
        }
    }

    /// The index of a `Discrete` value
    pub fn as_discrete(&self) -> Option<usize> {
        match self {
            Value::Discrete(index) => Some(*index),
            _ => None,
        }
    }
}

impl Space {
    /// Check that the space itself is well formed
    pub fn validate(&self) -> Result<()> {
        match self {
            Space::Discrete(0) => Err(HermesError::UnsupportedSpace(
                "Discrete space must have at least one element".to_string(),
            )),
            Space::Discrete(_) => Ok(()),
            Space::MultiDiscrete(nvec) => {
                if nvec.iter().any(|&n| n == 0) {
                    Err(HermesError::UnsupportedSpace(
                        "MultiDiscrete components must have at least one element".to_string(),
                    ))
                } else {
                    Ok(())
                }
            }
            Space::Box { low, high, shape } => {
                if low > high || low.is_nan() || high.is_nan() {
                    return Err(HermesError::UnsupportedSpace(format!(
                        "Box bounds are inverted: low={}, high={}",
                        low, high
                    )));
                }
                if shape.iter().any(|&d| d == 0) {
                    return Err(HermesError::UnsupportedSpace(format!(
                        "Box shape {:?} has an empty dimension",
                        shape
                    )));
                }
                Ok(())
            }
            Space::Tuple(spaces) => spaces.iter().try_for_each(Space::validate),
        }
    }

    /// Number of actions, failing for anything but a non-empty `Discrete` space
    pub fn require_discrete(&self) -> Result<usize> {
        match self {
            Space::Discrete(n) if *n > 0 => Ok(*n),
            other => Err(HermesError::UnsupportedSpace(format!(
                "expected a non-empty Discrete action space, got {:?}",
                other
            ))),
        }
    }

    /// Shape of a `Box` space
    pub fn box_shape(&self) -> Option<&[usize]> {
        match self {
            Space::Box { shape, .. } => Some(shape),
            _ => None,
        }
    }

    /// Length of the flattened representation
    pub fn flatdim(&self) -> usize {
        match self {
            Space::Discrete(n) => *n,
            Space::MultiDiscrete(nvec) => nvec.iter().sum(),
            Space::Box { shape, .. } => shape.iter().product(),
            Space::Tuple(spaces) => spaces.iter().map(Space::flatdim).sum(),
        }
    }

    /// Whether `value` is a member of this space
    pub fn contains(&self, value: &Value) -> bool {
        match (self, value) {
            (Space::Discrete(n), Value::Discrete(v)) => v < n,
            (Space::MultiDiscrete(nvec), Value::MultiDiscrete(vs)) => {
                nvec.len() == vs.len() && nvec.iter().zip(vs).all(|(n, v)| v < n)
            }
            (Space::Box { low, high, shape }, Value::Box(array)) => {
                array.shape() == shape.as_slice()
                    && array.iter().all(|x| x >= low && x <= high)
            }
            (Space::Tuple(spaces), Value::Tuple(values)) => {
                spaces.len() == values.len()
                    && spaces.iter().zip(values).all(|(s, v)| s.contains(v))
            }
            _ => false,
        }
    }

    /// Draw a uniformly random member of the space.
    ///
    /// Unbounded `Box` dimensions are sampled from a standard normal distribution.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Value> {
        self.validate()?;
        Ok(self.sample_unchecked(rng))
    }

    fn sample_unchecked<R: Rng + ?Sized>(&self, rng: &mut R) -> Value {
        match self {
            Space::Discrete(n) => Value::Discrete(rng.gen_range(0..*n)),
            Space::MultiDiscrete(nvec) => {
                Value::MultiDiscrete(nvec.iter().map(|&n| rng.gen_range(0..n)).collect())
            }
            Space::Box { low, high, shape } => {
                let (low, high) = (*low, *high);
                let array = ArrayD::from_shape_simple_fn(IxDyn(shape), || {
                    if low.is_finite() && high.is_finite() {
                        // interpolate so `high - low` is never formed and cannot overflow
                        let u: f32 = rng.gen();
                        (low * (1.0 - u) + high * u).clamp(low, high)
                    } else {
                        let x: f32 = rng.sample(StandardNormal);
                        x.clamp(low, high)
                    }
                });
                Value::Box(array)
            }
            Space::Tuple(spaces) => {
                Value::Tuple(spaces.iter().map(|s| s.sample_unchecked(rng)).collect())
            }
        }
    }

    /// Flatten a member of the space into a vector of length [`Space::flatdim`]
    pub fn flatten(&self, value: &Value) -> Result<Array1<f32>> {
        let mut out = Vec::with_capacity(self.flatdim());
        self.flatten_into(value, &mut out)?;
        Ok(Array1::from_vec(out))
    }

    fn flatten_into(&self, value: &Value, out: &mut Vec<f32>) -> Result<()> {
        match (self, value) {
            (Space::Discrete(n), Value::Discrete(v)) if v < n => {
                push_one_hot(out, *n, *v);
                Ok(())
            }
            (Space::MultiDiscrete(nvec), Value::MultiDiscrete(vs))
                if nvec.len() == vs.len() && nvec.iter().zip(vs).all(|(n, v)| v < n) =>
            {
                for (&n, &v) in nvec.iter().zip(vs) {
                    push_one_hot(out, n, v);
                }
                Ok(())
            }
            (Space::Box { shape, .. }, Value::Box(array)) if array.shape() == shape.as_slice() => {
                out.extend(array.iter().copied());
                Ok(())
            }
            (Space::Tuple(spaces), Value::Tuple(values)) if spaces.len() == values.len() => {
                for (space, value) in spaces.iter().zip(values) {
                    space.flatten_into(value, out)?;
                }
                Ok(())
            }
            (space, value) => Err(HermesError::InvalidObservation(format!(
                "{:?} is not a member of {:?}",
                value, space
            ))),
        }
    }

    /// Rebuild a member of the space from its flattened representation
    pub fn unflatten(&self, flat: &[f32]) -> Result<Value> {
        if flat.len() != self.flatdim() {
            return Err(HermesError::dimension_mismatch(
                format!("{} flattened elements", self.flatdim()),
                format!("{}", flat.len()),
            ));
        }
        let mut offset = 0;
        self.unflatten_from(flat, &mut offset)
    }

    fn unflatten_from(&self, flat: &[f32], offset: &mut usize) -> Result<Value> {
        match self {
            Space::Discrete(n) => {
                let index = read_one_hot(&flat[*offset..*offset + n])?;
                *offset += n;
                Ok(Value::Discrete(index))
            }
            Space::MultiDiscrete(nvec) => {
                let mut values = Vec::with_capacity(nvec.len());
                for &n in nvec {
                    values.push(read_one_hot(&flat[*offset..*offset + n])?);
                    *offset += n;
                }
                Ok(Value::MultiDiscrete(values))
            }
            Space::Box { shape, .. } => {
                let size: usize = shape.iter().product();
                let data = flat[*offset..*offset + size].to_vec();
                *offset += size;
                Ok(Value::Box(ArrayD::from_shape_vec(IxDyn(shape), data)?))
            }
            Space::Tuple(spaces) => spaces
                .iter()
                .map(|space| space.unflatten_from(flat, offset))
                .collect::<Result<Vec<_>>>()
                .map(Value::Tuple),
        }
    }
}

fn push_one_hot(out: &mut Vec<f32>, n: usize, index: usize) {
    out.extend((0..n).map(|i| if i == index { 1.0 } else { 0.0 }));
}

fn read_one_hot(chunk: &[f32]) -> Result<usize> {
    chunk
        .iter()
        .position(|&x| x != 0.0)
        .ok_or_else(|| HermesError::InvalidObservation("one-hot chunk has no set element".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_discrete_flatten_is_one_hot() {
        let space = Space::Discrete(4);
        let flat = space.flatten(&Value::Discrete(2)).unwrap();
        assert_eq!(flat.to_vec(), vec![0.0, 0.0, 1.0, 0.0]);
        assert_eq!(space.flatdim(), 4);
    }

    #[test]
    fn test_box_flatten_row_major() {
        let space = Space::Box { low: 0.0, high: 1.0, shape: vec![2, 2] };
        let value = Value::Box(array![[0.1, 0.2], [0.3, 0.4]].into_dyn());
        let flat = space.flatten(&value).unwrap();
        assert_eq!(flat.to_vec(), vec![0.1, 0.2, 0.3, 0.4]);
        assert_eq!(space.unflatten(flat.as_slice().unwrap()).unwrap(), value);
    }

    #[test]
    fn test_nested_tuple_roundtrip() {
        let space = Space::Tuple(vec![
            Space::MultiDiscrete(vec![2, 3]),
            Space::Tuple(vec![Space::Discrete(2)]),
        ]);
        let value = Value::Tuple(vec![
            Value::MultiDiscrete(vec![1, 2]),
            Value::Tuple(vec![Value::Discrete(0)]),
        ]);
        let flat = space.flatten(&value).unwrap();
        assert_eq!(flat.len(), space.flatdim());
        assert_eq!(space.unflatten(flat.as_slice().unwrap()).unwrap(), value);
    }

    #[test]
    fn test_flatten_rejects_foreign_value() {
        let space = Space::Discrete(3);
        assert!(matches!(
            space.flatten(&Value::Discrete(3)),
            Err(HermesError::InvalidObservation(_))
        ));
        assert!(space.flatten(&Value::MultiDiscrete(vec![0])).is_err());
    }

    #[test]
    fn test_unflatten_length_check() {
        let space = Space::Discrete(3);
        assert!(matches!(
            space.unflatten(&[1.0, 0.0]),
            Err(HermesError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_samples_are_members() {
        let mut rng = StdRng::seed_from_u64(0);
        let space = Space::Tuple(vec![
            Space::Discrete(5),
            Space::Box { low: -1.0, high: 1.0, shape: vec![3] },
            Space::Box { low: f32::NEG_INFINITY, high: f32::INFINITY, shape: vec![2] },
        ]);
        for _ in 0..20 {
            let value = space.sample(&mut rng).unwrap();
            assert!(space.contains(&value));
        }
    }

    #[test]
    fn test_sample_extreme_finite_box() {
        let mut rng = StdRng::seed_from_u64(3);
        let space = Space::Box { low: -3e38, high: 3e38, shape: vec![4] };
        for _ in 0..20 {
            let value = space.sample(&mut rng).unwrap();
            assert!(space.contains(&value));
            assert!(value.as_box().unwrap().iter().all(|x| x.is_finite()));
        }

        let point = Space::Box { low: 2.0, high: 2.0, shape: vec![1] };
        assert_eq!(point.sample(&mut rng).unwrap().as_box().unwrap()[[0]], 2.0);
    }

    #[test]
    fn test_require_discrete() {
        assert_eq!(Space::Discrete(5).require_discrete().unwrap(), 5);
        assert!(Space::Discrete(0).require_discrete().is_err());
        assert!(Space::Box { low: 0.0, high: 1.0, shape: vec![1] }
            .require_discrete()
            .is_err());
    }

    #[test]
    fn test_validate_box() {
        assert!(Space::Box { low: 1.0, high: 0.0, shape: vec![1] }.validate().is_err());
        assert!(Space::Box { low: 0.0, high: 1.0, shape: vec![0] }.validate().is_err());
        assert!(Space::MultiDiscrete(vec![2, 0]).validate().is_err());
    }
}
