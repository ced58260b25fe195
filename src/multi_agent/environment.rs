use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{HermesError, Result};
use crate::spaces::{Space, Value};

/// Identifier of an agent inside a multi-agent environment
pub type AgentId = usize;

/// Result of one simultaneous step of every agent
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StepOutcome {
    pub observations: BTreeMap<AgentId, Value>,
    pub rewards: BTreeMap<AgentId, f32>,
    pub dones: BTreeMap<AgentId, bool>,
    /// Free-form diagnostics reported by the environment
    pub info: serde_json::Value,
}

impl StepOutcome {
    /// The `(observation, reward, done)` slice of one agent
    pub fn agent_slice(&self, agent: AgentId) -> Result<(&Value, f32, bool)> {
        let observation = self
            .observations
            .get(&agent)
            .ok_or(HermesError::MissingAgentData { agent, field: "observation" })?;
        let reward = *self
            .rewards
            .get(&agent)
            .ok_or(HermesError::MissingAgentData { agent, field: "reward" })?;
        let done = *self
            .dones
            .get(&agent)
            .ok_or(HermesError::MissingAgentData { agent, field: "done" })?;
        Ok((observation, reward, done))
    }
}

/// Simultaneous-move environment where every agent shares the same spaces
///
/// Adapters translate a concrete simulator into this interface. Errors raised by the
/// simulator should be reported as [`HermesError::Environment`].
pub trait MultiAgentEnvironment {
    fn observation_space(&self) -> &Space;

    /// Must be a `Discrete` space for the bundled agents
    fn action_space(&self) -> &Space;

    /// Start a new episode and return every agent's first observation
    fn reset(&mut self) -> Result<BTreeMap<AgentId, Value>>;

    /// Apply one action per agent
    fn step(&mut self, actions: &BTreeMap<AgentId, usize>) -> Result<StepOutcome>;

    /// Reseed the environment's generator
    fn seed(&mut self, seed: u64);

    /// Human readable rendering of an observation, if the environment has one
    fn format_state(&self, _state: &Value) -> Option<String> {
        None
    }

    fn format_action(&self, action: usize) -> String {
        format!("action {}", action)
    }
}
