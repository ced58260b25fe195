//! # Multi-Agent Training
//!
//! Simultaneous-move environments and the loop that trains and evaluates agents in them.
//!
//! - [`MultiAgentEnvironment`]: the adapter interface a simulator implements
//! - [`MultiAgentTrainer`]: owns an environment and agents, runs `act`/`step`/`learn`
//! - [`test_agents`]: greedy evaluation without learning
//! - [`LineWorld`]: a tiny delivery corridor for tests and demos
//!
//! ```rust
//! use hermes::agent::{Agent, RandomAgent};
//! use hermes::multi_agent::{AgentMap, LineWorld, MultiAgentEnvironment, MultiAgentTrainer, ObservationMode};
//!
//! let env = LineWorld::new(2, 8, ObservationMode::Position).unwrap();
//! let mut agents = AgentMap::new();
//! for id in 0..2 {
//!     agents.insert(id, Box::new(RandomAgent::new(env.action_space()).unwrap()) as Box<dyn Agent>);
//! }
//!
//! let mut trainer = MultiAgentTrainer::new(env, agents, Some(42)).unwrap();
//! trainer.train(100).unwrap();
//! assert_eq!(trainer.rewards_log()[&0].len(), 100);
//! ```

pub mod environment;
pub mod line_world;
pub mod trainer;

pub use environment::{AgentId, MultiAgentEnvironment, StepOutcome};
pub use line_world::{LineWorld, ObservationMode};
pub use trainer::{test_agents, AgentMap, MultiAgentTrainer};
