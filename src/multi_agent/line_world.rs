//! A tiny delivery corridor used for smoke tests, demos and benchmarks.
//!
//! Drones live on a line of `length` cells and move left, stay or move right. The last
//! cell is the pickup point. Two drones ending a step on the same cell crash. Drones that
//! picked up or crashed finish their episode and respawn on a random cell.

use std::collections::BTreeMap;

use ndarray::{ArrayD, IxDyn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{HermesError, Result};
use crate::multi_agent::environment::{AgentId, MultiAgentEnvironment, StepOutcome};
use crate::seeding::entropy_rng;
use crate::spaces::{Space, Value};

pub const LEFT: usize = 0;
pub const STAY: usize = 1;
pub const RIGHT: usize = 2;

const ACTION_NAMES: [&str; 3] = ["left", "stay", "right"];

/// What each drone observes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObservationMode {
    /// Its own cell, `Discrete(length)`
    Position,
    /// A `(1, length, 2)` image: own cell in channel 0, other drones in channel 1
    Image,
}

/// Multi-drone delivery corridor
#[derive(Clone, Debug)]
pub struct LineWorld {
    length: usize,
    num_agents: usize,
    mode: ObservationMode,
    positions: Vec<usize>,
    observation_space: Space,
    action_space: Space,
    rng: StdRng,
}

impl LineWorld {
    pub fn new(num_agents: usize, length: usize, mode: ObservationMode) -> Result<Self> {
        if num_agents == 0 {
            return Err(HermesError::invalid_parameter("num_agents", "must be positive"));
        }
        if length < num_agents + 1 {
            return Err(HermesError::invalid_parameter(
                "length".to_string(),
                format!("{} cells cannot hold {} drones and a pickup cell", length, num_agents),
            ));
        }
        let observation_space = match mode {
            ObservationMode::Position => Space::Discrete(length),
            ObservationMode::Image => Space::Box {
                low: 0.0,
                high: num_agents as f32,
                shape: vec![1, length, 2],
            },
        };
        Ok(LineWorld {
            length,
            num_agents,
            mode,
            positions: Vec::new(),
            observation_space,
            action_space: Space::Discrete(ACTION_NAMES.len()),
            rng: entropy_rng(),
        })
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn num_agents(&self) -> usize {
        self.num_agents
    }

    /// Current cell of every drone
    pub fn positions(&self) -> &[usize] {
        &self.positions
    }

    fn pickup_cell(&self) -> usize {
        self.length - 1
    }

    fn spawn_cell(&mut self) -> usize {
        self.rng.gen_range(0..self.pickup_cell())
    }

    fn observe(&self, agent: AgentId) -> Value {
        match self.mode {
            ObservationMode::Position => Value::Discrete(self.positions[agent]),
            ObservationMode::Image => {
                let mut image = ArrayD::zeros(IxDyn(&[1, self.length, 2]));
                for (other, &cell) in self.positions.iter().enumerate() {
                    let channel = if other == agent { 0 } else { 1 };
                    image[[0, cell, channel]] += 1.0;
                }
                Value::Box(image)
            }
        }
    }

    fn observations(&self) -> BTreeMap<AgentId, Value> {
        (0..self.num_agents).map(|agent| (agent, self.observe(agent))).collect()
    }
}

impl MultiAgentEnvironment for LineWorld {
    fn observation_space(&self) -> &Space {
        &self.observation_space
    }

    fn action_space(&self) -> &Space {
        &self.action_space
    }

    fn reset(&mut self) -> Result<BTreeMap<AgentId, Value>> {
        // distinct starting cells so nobody crashes on the first step by standing still
        let pickup = self.pickup_cell();
        let cells = rand::seq::index::sample(&mut self.rng, pickup, self.num_agents);
        self.positions = cells.into_vec();
        Ok(self.observations())
    }

    fn step(&mut self, actions: &BTreeMap<AgentId, usize>) -> Result<StepOutcome> {
        if self.positions.len() != self.num_agents {
            return Err(HermesError::Environment("step() called before reset()".to_string()));
        }

        let mut moved = Vec::with_capacity(self.num_agents);
        for (agent, &cell) in self.positions.iter().enumerate() {
            let action = *actions
                .get(&agent)
                .ok_or(HermesError::MissingAgentData { agent, field: "action" })?;
            moved.push(match action {
                LEFT => cell.saturating_sub(1),
                STAY => cell,
                RIGHT => (cell + 1).min(self.pickup_cell()),
                _ => {
                    return Err(HermesError::InvalidAction {
                        action,
                        num_actions: ACTION_NAMES.len(),
                    })
                }
            });
        }
        self.positions = moved;

        let mut rewards = BTreeMap::new();
        let mut dones = BTreeMap::new();
        let (mut pickups, mut crashes) = (0, 0);
        for agent in 0..self.num_agents {
            let cell = self.positions[agent];
            let crashed = self
                .positions
                .iter()
                .enumerate()
                .any(|(other, &other_cell)| other != agent && other_cell == cell);
            let reward = if crashed {
                crashes += 1;
                -1.0
            } else if cell == self.pickup_cell() {
                pickups += 1;
                1.0
            } else {
                0.0
            };
            rewards.insert(agent, reward);
            dones.insert(agent, reward != 0.0);
        }

        for agent in 0..self.num_agents {
            if dones[&agent] {
                self.positions[agent] = self.spawn_cell();
            }
        }

        Ok(StepOutcome {
            observations: self.observations(),
            rewards,
            dones,
            info: json!({ "pickups": pickups, "crashes": crashes }),
        })
    }

    fn seed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    fn format_state(&self, state: &Value) -> Option<String> {
        match state {
            Value::Discrete(cell) => Some(format!("cell {}", cell)),
            Value::Box(image) if image.shape() == &[1, self.length, 2][..] => Some(
                (0..self.length)
                    .map(|cell| match (image[[0, cell, 0]] > 0.0, image[[0, cell, 1]] > 0.0) {
                        (true, _) => 'D',
                        (false, true) => 'x',
                        _ if cell == self.pickup_cell() => 'P',
                        _ => '.',
                    })
                    .collect(),
            ),
            _ => None,
        }
    }

    fn format_action(&self, action: usize) -> String {
        ACTION_NAMES
            .get(action)
            .map_or_else(|| format!("action {}", action), |name| name.to_string())
    }
}
