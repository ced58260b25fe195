//! Agent and network configuration.
//!
//! Every config derives serde so it can be kept next to an experiment as JSON, has a
//! `Default` matching the usual drone-training settings, chainable setters, and a
//! `validate()` that agent constructors run before building anything.
//!
//! ```rust
//! use hermes::config::{AgentConfig, DqnConfig};
//!
//! let config = DqnConfig::from_json_str(r#"{ "memory_size": 500, "batch_size": 32 }"#).unwrap();
//! assert_eq!(config.batch_size, 32);
//!
//! let bad = DqnConfig::default().memory_size(16).batch_size(16);
//! assert!(bad.validate().is_err());
//! ```

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{HermesError, Result};
use crate::optimizer::{Adam, OptimizerWrapper, SGD};

/// Shared behaviour of the configuration structs
pub trait AgentConfig: DeserializeOwned + Sized {
    /// Reject values that would make the agent misbehave
    fn validate(&self) -> Result<()>;

    /// Parse and validate a JSON document; missing fields take their defaults
    fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}

fn check_range(name: &str, value: f32, low_exclusive: f32, high_inclusive: f32) -> Result<()> {
    if value > low_exclusive && value <= high_inclusive {
        Ok(())
    } else {
        Err(HermesError::invalid_parameter(
            name.to_string(),
            format!("{} is outside ({}, {}]", value, low_exclusive, high_inclusive),
        ))
    }
}

fn check_exploration(epsilon_start: f32, epsilon_decay: f32, epsilon_end: f32) -> Result<()> {
    if !(0.0..=1.0).contains(&epsilon_end) || !(0.0..=1.0).contains(&epsilon_start) {
        return Err(HermesError::invalid_parameter(
            "epsilon_start/epsilon_end",
            "exploration rates must lie in [0, 1]",
        ));
    }
    if epsilon_end > epsilon_start {
        return Err(HermesError::invalid_parameter(
            "epsilon_end".to_string(),
            format!("{} is larger than epsilon_start {}", epsilon_end, epsilon_start),
        ));
    }
    check_range("epsilon_decay", epsilon_decay, 0.0, 1.0)
}

fn check_positive(name: &str, value: usize) -> Result<()> {
    if value == 0 {
        return Err(HermesError::invalid_parameter(name, "must be positive"));
    }
    Ok(())
}

/// Tabular Q-learning settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QLearningConfig {
    /// Discount factor in (0, 1]
    pub gamma: f32,
    /// Learning rate in (0, 1]
    pub alpha: f32,
    pub epsilon_start: f32,
    /// Multiplier applied to epsilon after every episode
    pub epsilon_decay: f32,
    pub epsilon_end: f32,
}

impl Default for QLearningConfig {
    fn default() -> Self {
        QLearningConfig {
            gamma: 0.95,
            alpha: 0.1,
            epsilon_start: 1.0,
            epsilon_decay: 0.99,
            epsilon_end: 0.01,
        }
    }
}

config_setters!(QLearningConfig {
    gamma: f32,
    alpha: f32,
    epsilon_start: f32,
    epsilon_decay: f32,
    epsilon_end: f32,
});

impl AgentConfig for QLearningConfig {
    fn validate(&self) -> Result<()> {
        check_range("gamma", self.gamma, 0.0, 1.0)?;
        check_range("alpha", self.alpha, 0.0, 1.0)?;
        check_exploration(self.epsilon_start, self.epsilon_decay, self.epsilon_end)
    }
}

/// Optimizer used by the deep agents
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OptimizerConfig {
    Adam {
        learning_rate: f32,
        beta1: f32,
        beta2: f32,
        epsilon: f32,
    },
    Sgd {
        learning_rate: f32,
    },
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        OptimizerConfig::Adam {
            learning_rate: 1e-3,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
        }
    }
}

impl OptimizerConfig {
    pub fn validate(&self) -> Result<()> {
        match self {
            OptimizerConfig::Adam { learning_rate, beta1, beta2, epsilon } => {
                check_range("learning_rate", *learning_rate, 0.0, f32::MAX)?;
                if !(0.0..1.0).contains(beta1) || !(0.0..1.0).contains(beta2) {
                    return Err(HermesError::invalid_parameter("beta1/beta2", "must lie in [0, 1)"));
                }
                check_range("epsilon", *epsilon, 0.0, f32::MAX)
            }
            OptimizerConfig::Sgd { learning_rate } => check_range("learning_rate", *learning_rate, 0.0, f32::MAX),
        }
    }

    /// A fresh optimizer with no accumulated state
    pub fn build(&self) -> OptimizerWrapper {
        match self {
            OptimizerConfig::Adam { learning_rate, beta1, beta2, epsilon } => {
                OptimizerWrapper::Adam(Adam::new(*learning_rate, *beta1, *beta2, *epsilon))
            }
            OptimizerConfig::Sgd { learning_rate } => OptimizerWrapper::SGD(SGD::new(*learning_rate)),
        }
    }
}

/// Deep Q-network settings shared by the dense and convolutional variants
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DqnConfig {
    pub gamma: f32,
    pub epsilon_start: f32,
    pub epsilon_decay: f32,
    pub epsilon_end: f32,
    /// Replay buffer capacity
    pub memory_size: usize,
    /// Transitions per optimizer step, must be smaller than `memory_size`
    pub batch_size: usize,
    /// Episodes between two hard target-network syncs
    pub target_update_interval: usize,
    pub optimizer: OptimizerConfig,
}

impl Default for DqnConfig {
    fn default() -> Self {
        DqnConfig {
            gamma: 0.95,
            epsilon_start: 1.0,
            epsilon_decay: 0.99,
            epsilon_end: 0.01,
            memory_size: 10_000,
            batch_size: 64,
            target_update_interval: 5,
            optimizer: OptimizerConfig::default(),
        }
    }
}

config_setters!(DqnConfig {
    gamma: f32,
    epsilon_start: f32,
    epsilon_decay: f32,
    epsilon_end: f32,
    memory_size: usize,
    batch_size: usize,
    target_update_interval: usize,
    optimizer: OptimizerConfig,
});

impl AgentConfig for DqnConfig {
    fn validate(&self) -> Result<()> {
        check_range("gamma", self.gamma, 0.0, 1.0)?;
        check_exploration(self.epsilon_start, self.epsilon_decay, self.epsilon_end)?;
        check_positive("memory_size", self.memory_size)?;
        check_positive("batch_size", self.batch_size)?;
        check_positive("target_update_interval", self.target_update_interval)?;
        if self.batch_size >= self.memory_size {
            // training starts once the buffer holds more than batch_size transitions
            return Err(HermesError::invalid_parameter(
                "batch_size".to_string(),
                format!(
                    "{} must be smaller than memory_size {}, otherwise training never starts",
                    self.batch_size, self.memory_size
                ),
            ));
        }
        self.optimizer.validate()
    }
}

/// Fully connected Q-network layout
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DenseNetworkConfig {
    /// Widths of the hidden layers, each followed by ReLU
    pub hidden_sizes: Vec<usize>,
}

impl Default for DenseNetworkConfig {
    fn default() -> Self {
        DenseNetworkConfig { hidden_sizes: vec![128] }
    }
}

config_setters!(DenseNetworkConfig { hidden_sizes: Vec<usize> });

impl AgentConfig for DenseNetworkConfig {
    fn validate(&self) -> Result<()> {
        self.hidden_sizes
            .iter()
            .try_for_each(|&size| check_positive("hidden_sizes", size))
    }
}

/// Convolutional Q-network layout
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvNetworkConfig {
    /// Output channels of the 3x3 convolutions, in order
    pub conv_sizes: Vec<usize>,
    /// Widths of the hidden fully connected layers after flattening
    pub fc_sizes: Vec<usize>,
}

impl Default for ConvNetworkConfig {
    fn default() -> Self {
        ConvNetworkConfig {
            conv_sizes: vec![32, 64, 64],
            fc_sizes: vec![128],
        }
    }
}

config_setters!(ConvNetworkConfig {
    conv_sizes: Vec<usize>,
    fc_sizes: Vec<usize>,
});

impl AgentConfig for ConvNetworkConfig {
    fn validate(&self) -> Result<()> {
        if self.conv_sizes.is_empty() {
            return Err(HermesError::invalid_parameter(
                "conv_sizes",
                "at least one convolution is required",
            ));
        }
        self.conv_sizes
            .iter()
            .chain(&self.fc_sizes)
            .try_for_each(|&size| check_positive("conv_sizes/fc_sizes", size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        QLearningConfig::default().validate().unwrap();
        DqnConfig::default().validate().unwrap();
        DenseNetworkConfig::default().validate().unwrap();
        ConvNetworkConfig::default().validate().unwrap();
    }

    #[test]
    fn test_qlearning_ranges() {
        assert!(QLearningConfig::default().gamma(0.0).validate().is_err());
        assert!(QLearningConfig::default().gamma(1.0).validate().is_ok());
        assert!(QLearningConfig::default().alpha(1.5).validate().is_err());
        assert!(QLearningConfig::default()
            .epsilon_start(0.1)
            .epsilon_end(0.5)
            .validate()
            .is_err());
        assert!(QLearningConfig::default().epsilon_decay(0.0).validate().is_err());
    }

    #[test]
    fn test_batch_must_be_smaller_than_memory() {
        let err = DqnConfig::default().memory_size(64).batch_size(64).validate().unwrap_err();
        assert!(matches!(err, HermesError::InvalidParameter { .. }));
        assert!(DqnConfig::default().target_update_interval(0).validate().is_err());
    }

    #[test]
    fn test_json_partial_document() {
        let config = QLearningConfig::from_json_str(r#"{"gamma": 0.9, "alpha": 0.5}"#).unwrap();
        assert_eq!(config.gamma, 0.9);
        assert_eq!(config.alpha, 0.5);
        assert_eq!(config.epsilon_end, QLearningConfig::default().epsilon_end);
    }

    #[test]
    fn test_json_optimizer() {
        let config = DqnConfig::from_json_str(
            r#"{"optimizer": {"kind": "sgd", "learning_rate": 0.05}}"#,
        )
        .unwrap();
        assert_eq!(config.optimizer, OptimizerConfig::Sgd { learning_rate: 0.05 });
        assert!(matches!(config.optimizer.build(), OptimizerWrapper::SGD(_)));
    }

    #[test]
    fn test_json_rejects_invalid_values() {
        assert!(DqnConfig::from_json_str(r#"{"gamma": 2.0}"#).is_err());
        assert!(matches!(
            DqnConfig::from_json_str("not json"),
            Err(HermesError::Json(_))
        ));
    }

    #[test]
    fn test_conv_config_requires_convolutions() {
        assert!(ConvNetworkConfig::default().conv_sizes(vec![]).validate().is_err());
        assert!(ConvNetworkConfig::default().fc_sizes(vec![]).validate().is_ok());
    }
}
