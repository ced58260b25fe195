use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{HermesError, Result};
use crate::multi_agent::AgentId;

/// Per-step rewards of every agent, in step order
pub type RewardLog = BTreeMap<AgentId, Vec<f32>>;

/// Reward of a successful delivery pickup
pub const PICKUP_REWARD: f32 = 1.0;

/// Rewards signalling a crash
pub const CRASH_REWARDS: [f32; 2] = [-1.0, -2.0];

pub fn is_pickup(reward: f32) -> bool {
    reward == PICKUP_REWARD
}

pub fn is_crash(reward: f32) -> bool {
    CRASH_REWARDS.contains(&reward)
}

/// Summary of one agent's rewards
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardSummary {
    pub steps: usize,
    pub total: f32,
    pub mean: f32,
    /// Population standard deviation
    pub std: f32,
    pub pickups: usize,
    pub crashes: usize,
    /// Fraction of steps with a pickup
    pub pickup_rate: f32,
    /// Fraction of steps with a crash
    pub crash_rate: f32,
}

impl RewardSummary {
    pub fn from_rewards(rewards: &[f32]) -> Self {
        if rewards.is_empty() {
            return RewardSummary {
                steps: 0,
                total: 0.0,
                mean: 0.0,
                std: 0.0,
                pickups: 0,
                crashes: 0,
                pickup_rate: 0.0,
                crash_rate: 0.0,
            };
        }

        let steps = rewards.len();
        let total: f32 = rewards.iter().sum();
        let mean = total / steps as f32;
        let variance = rewards.iter().map(|&r| (r - mean).powi(2)).sum::<f32>() / steps as f32;
        let pickups = rewards.iter().filter(|&&r| is_pickup(r)).count();
        let crashes = rewards.iter().filter(|&&r| is_crash(r)).count();

        RewardSummary {
            steps,
            total,
            mean,
            std: variance.sqrt(),
            pickups,
            crashes,
            pickup_rate: pickups as f32 / steps as f32,
            crash_rate: crashes as f32 / steps as f32,
        }
    }
}

/// Summaries of every agent in a log
pub fn summarize(log: &RewardLog) -> BTreeMap<AgentId, RewardSummary> {
    log.iter()
        .map(|(&agent, rewards)| (agent, RewardSummary::from_rewards(rewards)))
        .collect()
}

/// Running total after each step
pub fn cumulative_sum(rewards: &[f32]) -> Vec<f32> {
    rewards
        .iter()
        .scan(0.0, |total, &r| {
            *total += r;
            Some(*total)
        })
        .collect()
}

/// Trailing mean over `window` steps, undefined until `window` values are available
pub fn rolling_mean(values: &[f32], window: usize) -> Result<Vec<Option<f32>>> {
    if window == 0 {
        return Err(HermesError::invalid_parameter("window", "must be positive"));
    }
    let mut means = Vec::with_capacity(values.len());
    let mut sum = 0.0;
    for (i, &value) in values.iter().enumerate() {
        sum += value;
        if i >= window {
            sum -= values[i - window];
        }
        means.push(if i + 1 >= window { Some(sum / window as f32) } else { None });
    }
    Ok(means)
}

/// A tenth of the run, at least one step
pub fn default_window(len: usize) -> usize {
    (len / 10).max(1)
}
