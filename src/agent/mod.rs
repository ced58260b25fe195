//! # Reinforcement Learning Agents Module
//!
//! Agents implement the [`Agent`] trait and are driven step by step by the
//! multi-agent trainer: `act` on the current observation, then `learn` from the resulting
//! transition.
//!
//! ## Available Agents
//!
//! - **RandomAgent**: uniform random baseline, never learns
//! - **QLearningAgent**: tabular Q-learning keyed on flattened observations
//! - **DqnAgent**: Deep Q-Network over flattened observations
//!   - Replay buffer with FIFO eviction
//!   - Target network hard-synced every `target_update_interval` episodes
//! - **ConvDqnAgent**: the same agent with convolutional features for image observations
//!
//! ## Exploration
//!
//! Learning agents explore epsilon-greedily. Epsilon decays once per finished episode and
//! is pinned to [`GREEDY_EPSILON`] while the agent is in greedy (evaluation) mode.

pub mod exploration;
pub mod qlearning;
pub mod random;
pub mod traits;

mod dqn;

pub use dqn::{ConvDqnAgent, DeepQAgent, DqnAgent};
pub use exploration::{EpsilonSchedule, GREEDY_EPSILON};
pub use qlearning::{QLearningAgent, StateKey};
pub use random::RandomAgent;
pub use traits::Agent;
