//! # Hermes - Multi-Agent Reinforcement Learning Helpers
//!
//! Hermes trains and evaluates reinforcement-learning agents that act simultaneously in a
//! multi-agent environment, such as a grid-world delivery-drone simulation. It provides
//! the interaction loop, a set of reference agents and text-based reward reporting.
//!
//! ## Key Features
//!
//! - **Training loop**: `act` / `step` / `learn` for every agent, every step, with per-agent
//!   reward logs
//! - **Agents**: random baseline, tabular Q-learning, DQN and DQN with convolutional features
//! - **Q-Networks**: dense and convolutional networks with exact backward passes, Adam and SGD
//! - **Replay**: fixed-capacity FIFO buffer with uniform sampling
//! - **Reproducibility**: one seed fanned out to the environment and every agent
//! - **Reporting**: cumulative and rolling reward plots, CSV and JSON export
//!
//! ## Quick Start
//!
//! ```rust
//! use hermes::agent::{Agent, QLearningAgent};
//! use hermes::config::QLearningConfig;
//! use hermes::multi_agent::{AgentMap, LineWorld, MultiAgentEnvironment, MultiAgentTrainer, ObservationMode};
//! use hermes::visualization::plot_cumulative_rewards;
//!
//! let env = LineWorld::new(2, 6, ObservationMode::Position).unwrap();
//! let mut agents = AgentMap::new();
//! for id in 0..2 {
//!     let agent = QLearningAgent::new(env.observation_space(), env.action_space(), QLearningConfig::default()).unwrap();
//!     agents.insert(id, Box::new(agent) as Box<dyn Agent>);
//! }
//!
//! let mut trainer = MultiAgentTrainer::new(env, agents, Some(0)).unwrap();
//! trainer.train(500).unwrap();
//!
//! let plot = plot_cumulative_rewards(trainer.rewards_log(), None, 60, 12);
//! assert!(plot.contains("Drone 1"));
//! ```
//!
//! ## Module Organization
//!
//! - [`activations`] - Activation functions (ReLU, Linear)
//! - [`agent`] - The `Agent` trait and the reference agents
//! - [`config`] - Serializable agent and network configuration
//! - [`error`] - Error types and result handling
//! - [`layers`] - Dense and 2D convolution layers
//! - [`loss`] - Loss functions for value regression
//! - [`metrics`] - Reward logs and summaries
//! - [`multi_agent`] - Environment interface, trainer and evaluation
//! - [`network`] - Q-networks and their builders
//! - [`optimizer`] - Optimization algorithms
//! - [`replay_buffer`] - Experience replay
//! - [`seeding`] - Deterministic seed fan-out
//! - [`spaces`] - Observation and action spaces
//! - [`visualization`] - Text plots and export

#[macro_use]
mod macros;

pub mod activations;
pub mod agent;
pub mod config;
pub mod error;
pub mod layers;
pub mod loss;
pub mod metrics;
pub mod multi_agent;
pub mod network;
pub mod optimizer;
pub mod replay_buffer;
pub mod seeding;
pub mod spaces;
pub mod visualization;
