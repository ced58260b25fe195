//! Tabular Q-learning.
//!
//! The table is keyed on the bit patterns of flattened observations, so two observations
//! share a row exactly when they flatten to the same vector. Rows are created lazily with
//! uniform `[0, 1)` values the first time a state is looked up.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use log::{debug, trace};
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::agent::exploration::{argmax, should_explore, EpsilonSchedule};
use crate::agent::Agent;
use crate::config::{AgentConfig, QLearningConfig};
use crate::error::{HermesError, Result};
use crate::multi_agent::MultiAgentEnvironment;
use crate::seeding::{entropy_rng, SeedFanout};
use crate::spaces::{Space, Value};

/// Exact, ordered key of a flattened observation
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StateKey(Vec<u32>);

impl StateKey {
    pub fn from_values<I: IntoIterator<Item = f32>>(values: I) -> Self {
        // -0.0 and 0.0 flatten from the same observations
        StateKey(
            values
                .into_iter()
                .map(|v| if v == 0.0 { 0.0f32.to_bits() } else { v.to_bits() })
                .collect(),
        )
    }

    /// The flattened observation this key was built from
    pub fn values(&self) -> Vec<f32> {
        self.0.iter().map(|&bits| f32::from_bits(bits)).collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Q-learning agent with a lazily populated table and epsilon-greedy exploration
#[derive(Clone, Debug)]
pub struct QLearningAgent {
    observation_space: Space,
    num_actions: usize,
    config: QLearningConfig,
    q_table: BTreeMap<StateKey, Vec<f32>>,
    schedule: EpsilonSchedule,
    greedy: bool,
    /// Exploration coin flips and random actions
    explore_rng: StdRng,
    /// Initial values of new table rows
    table_rng: StdRng,
}

impl QLearningAgent {
    pub fn new(observation_space: &Space, action_space: &Space, config: QLearningConfig) -> Result<Self> {
        config.validate()?;
        observation_space.validate()?;
        let num_actions = action_space.require_discrete()?;
        let schedule = EpsilonSchedule::new(config.epsilon_start, config.epsilon_decay, config.epsilon_end);
        Ok(QLearningAgent {
            observation_space: observation_space.clone(),
            num_actions,
            config,
            q_table: BTreeMap::new(),
            schedule,
            greedy: false,
            explore_rng: entropy_rng(),
            table_rng: entropy_rng(),
        })
    }

    pub fn config(&self) -> &QLearningConfig {
        &self.config
    }

    pub fn schedule(&self) -> &EpsilonSchedule {
        &self.schedule
    }

    pub fn q_table(&self) -> &BTreeMap<StateKey, Vec<f32>> {
        &self.q_table
    }

    pub fn q_table_len(&self) -> usize {
        self.q_table.len()
    }

    pub fn state_key(&self, state: &Value) -> Result<StateKey> {
        Ok(StateKey::from_values(
            self.observation_space.flatten(state)?.iter().copied(),
        ))
    }

    fn row(&mut self, state: &Value) -> Result<&mut Vec<f32>> {
        let key = self.state_key(state)?;
        let num_actions = self.num_actions;
        let rng = &mut self.table_rng;
        Ok(self
            .q_table
            .entry(key)
            .or_insert_with(|| (0..num_actions).map(|_| rng.gen::<f32>()).collect()))
    }

    /// Action values of `state`, creating its row if needed
    pub fn q_values(&mut self, state: &Value) -> Result<&[f32]> {
        Ok(self.row(state)?.as_slice())
    }

    /// Render the table with one line per state and one column per action
    pub fn q_table_report<E>(&self, env: &E, precision: usize) -> Result<String>
    where
        E: MultiAgentEnvironment + ?Sized,
    {
        let mut header = vec![String::new()];
        header.extend((0..self.num_actions).map(|action| env.format_action(action)));

        let mut rows = vec![header];
        for (i, (key, values)) in self.q_table.iter().enumerate() {
            let state = self.observation_space.unflatten(&key.values())?;
            let label = env.format_state(&state).unwrap_or_else(|| format!("state {}", i));
            let mut row = vec![label];
            row.extend(values.iter().map(|v| format!("{:.*}", precision, v)));
            rows.push(row);
        }

        let widths: Vec<usize> = (0..=self.num_actions)
            .map(|col| rows.iter().map(|row| row[col].chars().count()).max().unwrap_or(0))
            .collect();

        let mut report = String::new();
        for row in &rows {
            let cells: Vec<String> = row
                .iter()
                .zip(&widths)
                .enumerate()
                .map(|(col, (cell, &width))| {
                    if col == 0 {
                        format!("{:<width$}", cell, width = width)
                    } else {
                        format!("{:>width$}", cell, width = width)
                    }
                })
                .collect();
            report.push_str(cells.join("  ").trim_end());
            report.push('\n');
        }
        Ok(report)
    }

    /// Write the table and exploration schedule to `path`
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = bincode::serialize(&(&self.q_table, &self.schedule))?;
        fs::write(path, bytes)?;
        Ok(())
    }

    /// Restore a table and schedule written by [`QLearningAgent::save`]
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let bytes = fs::read(path)?;
        let (q_table, schedule): (BTreeMap<StateKey, Vec<f32>>, EpsilonSchedule) = bincode::deserialize(&bytes)?;

        let flatdim = self.observation_space.flatdim();
        for (key, values) in &q_table {
            if key.len() != flatdim || values.len() != self.num_actions {
                return Err(HermesError::dimension_mismatch(
                    format!("rows of {} actions keyed by {} values", self.num_actions, flatdim),
                    format!("a row of {} actions keyed by {} values", values.len(), key.len()),
                ));
            }
        }
        self.q_table = q_table;
        self.schedule = schedule;
        Ok(())
    }

    fn check_action(&self, action: usize) -> Result<()> {
        if action >= self.num_actions {
            return Err(HermesError::InvalidAction {
                action,
                num_actions: self.num_actions,
            });
        }
        Ok(())
    }
}

impl Agent for QLearningAgent {
    fn seed(&mut self, seed: u64) {
        let mut fanout = SeedFanout::new(seed);
        self.explore_rng = fanout.next_rng();
        self.table_rng = fanout.next_rng();
    }

    fn reset(&mut self) -> Result<()> {
        debug!("resetting q-table of {} states", self.q_table.len());
        self.q_table.clear();
        self.schedule.reset();
        Ok(())
    }

    fn act(&mut self, state: &Value) -> Result<usize> {
        let epsilon = self.schedule.value(self.greedy);
        if should_explore(&mut self.explore_rng, epsilon) {
            Ok(self.explore_rng.gen_range(0..self.num_actions))
        } else {
            Ok(argmax(self.q_values(state)?))
        }
    }

    fn learn(&mut self, state: &Value, action: usize, reward: f32, next_state: &Value, done: bool) -> Result<()> {
        self.check_action(action)?;
        // both observations must map to a table key before anything is updated
        self.state_key(state)?;
        self.state_key(next_state)?;

        let td_target = if done {
            reward
        } else {
            let next_max = self
                .q_values(next_state)?
                .iter()
                .fold(f32::NEG_INFINITY, |a, &b| a.max(b));
            reward + self.config.gamma * next_max
        };

        if done {
            self.schedule.on_episode_end();
            trace!("episode finished, epsilon now {}", self.schedule.current());
        }

        let alpha = self.config.alpha;
        let row = self.row(state)?;
        row[action] = (1.0 - alpha) * row[action] + alpha * td_target;
        Ok(())
    }

    fn set_greedy(&mut self, greedy: bool) {
        self.greedy = greedy;
    }

    fn is_greedy(&self) -> bool {
        self.greedy
    }

    fn epsilon(&self) -> Option<f32> {
        Some(self.schedule.current())
    }
}
