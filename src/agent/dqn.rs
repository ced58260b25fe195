use std::fs;
use std::path::Path;

use log::{debug, trace};
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::Rng;

use crate::agent::exploration::{argmax, should_explore, EpsilonSchedule};
use crate::agent::Agent;
use crate::config::{AgentConfig, ConvNetworkConfig, DenseNetworkConfig, DqnConfig};
use crate::error::{HermesError, Result};
use crate::loss::{Loss, Mse};
use crate::network::{ConvQNetworkBuilder, DenseQNetworkBuilder, NetworkBuilder, QNetwork};
use crate::optimizer::{Optimizer, OptimizerWrapper};
use crate::replay_buffer::{ReplayBuffer, Transition};
use crate::seeding::{entropy_rng, SeedFanout};
use crate::spaces::{Space, Value};

/// Deep Q-Network agent with experience replay and a target network
///
/// The network architecture is injected through a [`NetworkBuilder`]; everything else
/// (replay, target sync, loss, optimizer) is shared by every variant.
///
/// - Every transition is stored in a fixed-size replay buffer
/// - Once the buffer holds more than `batch_size` transitions, every `learn` call takes one
///   optimizer step on a uniformly sampled batch
/// - The target network is hard-synced whenever the episode counter is a multiple of
///   `target_update_interval`, including episode 0
///
/// # Example
///
/// ```rust
/// use hermes::agent::{Agent, DqnAgent};
/// use hermes::config::{DenseNetworkConfig, DqnConfig};
/// use hermes::spaces::{Space, Value};
///
/// let config = DqnConfig::default().memory_size(100).batch_size(4);
/// let mut agent = DqnAgent::dense(
///     &Space::Discrete(6),
///     &Space::Discrete(3),
///     config,
///     DenseNetworkConfig::default().hidden_sizes(vec![16]),
/// )
/// .unwrap();
/// agent.seed(7);
/// agent.reset().unwrap();
///
/// let state = Value::Discrete(0);
/// let action = agent.act(&state).unwrap();
/// agent.learn(&state, action, 0.0, &Value::Discrete(1), false).unwrap();
/// assert_eq!(agent.memory_len(), 1);
/// ```
#[derive(Clone, Debug)]
pub struct DeepQAgent<B: NetworkBuilder> {
    builder: B,
    config: DqnConfig,
    num_actions: usize,
    network: B::Network,
    target_network: B::Network,
    optimizer: OptimizerWrapper,
    memory: ReplayBuffer<Transition>,
    num_episode: usize,
    schedule: EpsilonSchedule,
    greedy: bool,
    last_loss: Option<f32>,
    /// Network initialisation
    init_rng: StdRng,
    /// Exploration coin flips and random actions
    explore_rng: StdRng,
    /// Replay sampling
    sample_rng: StdRng,
}

/// DQN over flattened observations
pub type DqnAgent = DeepQAgent<DenseQNetworkBuilder>;

/// DQN with convolutional features over image observations
pub type ConvDqnAgent = DeepQAgent<ConvQNetworkBuilder>;

impl DqnAgent {
    pub fn dense(
        observation_space: &Space,
        action_space: &Space,
        config: DqnConfig,
        network: DenseNetworkConfig,
    ) -> Result<Self> {
        let builder = DenseQNetworkBuilder::new(observation_space, action_space, network)?;
        DeepQAgent::new(builder, action_space, config)
    }
}

impl ConvDqnAgent {
    pub fn conv(
        observation_space: &Space,
        action_space: &Space,
        config: DqnConfig,
        network: ConvNetworkConfig,
    ) -> Result<Self> {
        let builder = ConvQNetworkBuilder::new(observation_space, action_space, network)?;
        DeepQAgent::new(builder, action_space, config)
    }
}

impl<B: NetworkBuilder> DeepQAgent<B> {
    pub fn new(builder: B, action_space: &Space, config: DqnConfig) -> Result<Self> {
        config.validate()?;
        let num_actions = action_space.require_discrete()?;

        let mut init_rng = entropy_rng();
        let network = builder.build(&mut init_rng)?;
        let target_network = builder.build(&mut init_rng)?;
        if network.num_actions() != num_actions {
            return Err(HermesError::dimension_mismatch(
                format!("{} network outputs", num_actions),
                format!("{}", network.num_actions()),
            ));
        }

        Ok(DeepQAgent {
            optimizer: config.optimizer.build(),
            memory: ReplayBuffer::new(config.memory_size)?,
            schedule: EpsilonSchedule::new(config.epsilon_start, config.epsilon_decay, config.epsilon_end),
            builder,
            config,
            num_actions,
            network,
            target_network,
            num_episode: 0,
            greedy: false,
            last_loss: None,
            init_rng,
            explore_rng: entropy_rng(),
            sample_rng: entropy_rng(),
        })
    }

    pub fn config(&self) -> &DqnConfig {
        &self.config
    }

    /// The trainable network
    pub fn network(&self) -> &B::Network {
        &self.network
    }

    pub fn target_network(&self) -> &B::Network {
        &self.target_network
    }

    pub fn schedule(&self) -> &EpsilonSchedule {
        &self.schedule
    }

    /// Episodes finished since the last reset
    pub fn num_episode(&self) -> usize {
        self.num_episode
    }

    pub fn memory_len(&self) -> usize {
        self.memory.len()
    }

    /// Loss of the most recent optimizer step
    pub fn last_loss(&self) -> Option<f32> {
        self.last_loss
    }

    /// Action values of the trainable network for one observation
    pub fn q_values(&mut self, state: &Value) -> Result<Array1<f32>> {
        let outputs = self.network.forward(&[state])?;
        Ok(outputs.row(0).to_owned())
    }

    /// Hard copy of the trainable parameters into the target network
    pub fn sync_target(&mut self) -> Result<()> {
        self.target_network.copy_parameters_from(&self.network)
    }

    /// One gradient step on a sampled batch, returning the loss before the step
    fn train_step(&mut self) -> Result<f32> {
        let batch = self.memory.sample(self.config.batch_size, &mut self.sample_rng)?;
        let states: Vec<&Value> = batch.iter().map(|t| &t.state).collect();
        let next_states: Vec<&Value> = batch.iter().map(|t| &t.next_state).collect();

        let q_values = self.network.forward(&states)?;
        let next_q_values = self.target_network.forward(&next_states)?;

        let mut taken = Array1::zeros(batch.len());
        let mut td_targets = Array1::zeros(batch.len());
        for (i, transition) in batch.iter().enumerate() {
            taken[i] = q_values[[i, transition.action]];
            let next_max = next_q_values.row(i).fold(f32::NEG_INFINITY, |a, &b| a.max(b));
            let not_done = if transition.done { 0.0 } else { 1.0 };
            td_targets[i] = transition.reward + self.config.gamma * next_max * not_done;
        }

        let loss = Mse.compute(taken.view(), td_targets.view())?;
        let loss_gradient = Mse.gradient(taken.view(), td_targets.view())?;

        // only the taken action's output receives gradient
        let mut output_gradient = Array2::zeros(q_values.dim());
        for (i, transition) in batch.iter().enumerate() {
            output_gradient[[i, transition.action]] = loss_gradient[i];
        }

        let gradients = self.network.backward(output_gradient.view())?;
        self.optimizer.step(self.network.parameters_mut(), &gradients)?;
        Ok(loss)
    }

    /// Write the trainable network's parameters to `path`
    pub fn save_parameters<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = bincode::serialize(&self.network)?;
        fs::write(path, bytes)?;
        Ok(())
    }

    /// Load parameters written by [`DeepQAgent::save_parameters`] into the trainable network
    pub fn load_parameters<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let bytes = fs::read(path)?;
        let loaded: B::Network = bincode::deserialize(&bytes)?;
        self.network.copy_parameters_from(&loaded)
    }

    /// Reject observations the networks cannot read before they reach the replay buffer
    fn check_observation(&self, observation: &Value) -> Result<()> {
        self.builder.observation_space().flatten(observation).map(|_| ())
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

impl<B: NetworkBuilder> Agent for DeepQAgent<B> {
    fn seed(&mut self, seed: u64) {
        let mut fanout = SeedFanout::new(seed);
        self.init_rng = fanout.next_rng();
        self.explore_rng = fanout.next_rng();
        self.sample_rng = fanout.next_rng();
    }

    fn reset(&mut self) -> Result<()> {
        self.network = self.builder.build(&mut self.init_rng)?;
        self.target_network = self.builder.build(&mut self.init_rng)?;
        self.optimizer.reset();
        self.memory.clear();
        self.num_episode = 0;
        self.schedule.reset();
        self.last_loss = None;
        debug!(
            "built q-networks with {} parameters each",
            self.network.num_parameters()
        );
        Ok(())
    }

    fn act(&mut self, state: &Value) -> Result<usize> {
        let epsilon = self.schedule.value(self.greedy);
        if should_explore(&mut self.explore_rng, epsilon) {
            Ok(self.explore_rng.gen_range(0..self.num_actions))
        } else {
            let q_values = self.q_values(state)?;
            Ok(argmax(&q_values.to_vec()))
        }
    }

    fn learn(&mut self, state: &Value, action: usize, reward: f32, next_state: &Value, done: bool) -> Result<()> {
        self.check_action(action)?;
        self.check_observation(state)?;
        self.check_observation(next_state)?;
        self.memory.push(Transition {
            state: state.clone(),
            action,
            reward,
            next_state: next_state.clone(),
            done,
        });

        if done {
            self.num_episode += 1;
            self.schedule.on_episode_end();
            trace!(
                "episode {} finished, epsilon now {}",
                self.num_episode,
                self.schedule.current()
            );
        }

        if self.num_episode % self.config.target_update_interval == 0 {
            self.sync_target()?;
        }

        if self.memory.len() > self.config.batch_size {
            let loss = self.train_step()?;
            trace!("train step loss {}", loss);
            self.last_loss = Some(loss);
        }
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
