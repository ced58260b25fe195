use std::collections::BTreeMap;

use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};

use crate::agent::Agent;
use crate::error::{HermesError, Result};
use crate::metrics::rewards::RewardLog;
use crate::multi_agent::environment::{AgentId, MultiAgentEnvironment};
use crate::seeding::SeedFanout;
use crate::spaces::Value;

/// Agents keyed by the id the environment knows them by
pub type AgentMap = BTreeMap<AgentId, Box<dyn Agent>>;

/// Trains a set of agents that act simultaneously in one environment
///
/// Every step, each agent acts on its own observation, the joint action is applied, and
/// each agent learns from its own slice of the outcome. Rewards are logged per agent.
pub struct MultiAgentTrainer<E: MultiAgentEnvironment> {
    env: E,
    agents: AgentMap,
    seed: Option<u64>,
    rewards_log: RewardLog,
}

impl<E: MultiAgentEnvironment> MultiAgentTrainer<E> {
    /// Take ownership of the environment and agents, then reset everything
    pub fn new(env: E, agents: AgentMap, seed: Option<u64>) -> Result<Self> {
        if agents.is_empty() {
            return Err(HermesError::invalid_parameter("agents", "at least one agent is required"));
        }
        let rewards_log = agents.keys().map(|&id| (id, Vec::new())).collect();
        let mut trainer = MultiAgentTrainer {
            env,
            agents,
            seed,
            rewards_log,
        };
        trainer.reset()?;
        Ok(trainer)
    }

    /// Reseed (when a seed was given), reset every agent and clear the reward log
    pub fn reset(&mut self) -> Result<()> {
        if let Some(seed) = self.seed {
            seed_all(&mut self.env, &mut self.agents, seed);
        }
        for agent in self.agents.values_mut() {
            agent.reset()?;
        }
        for rewards in self.rewards_log.values_mut() {
            rewards.clear();
        }
        Ok(())
    }

    /// Run exactly `n_steps` interaction steps with learning
    ///
    /// Rewards of a step are logged only once every agent has learned from it, so the
    /// per-agent logs always have the same length, also when a step fails.
    pub fn train(&mut self, n_steps: usize) -> Result<()> {
        info!("training {} agents for {} steps", self.agents.len(), n_steps);
        let progress = progress_bar(n_steps);

        let mut states = self.env.reset()?;
        let mut step_rewards = Vec::with_capacity(self.agents.len());
        for _ in 0..n_steps {
            let actions = select_actions(&mut self.agents, &states)?;
            let outcome = self.env.step(&actions)?;

            step_rewards.clear();
            for (&id, agent) in self.agents.iter_mut() {
                let state = observation_of(&states, id)?;
                let (next_state, reward, done) = outcome.agent_slice(id)?;
                agent.learn(state, actions[&id], reward, next_state, done)?;
                step_rewards.push((id, reward));
            }
            for &(id, reward) in &step_rewards {
                self.rewards_log.entry(id).or_default().push(reward);
            }
            states = outcome.observations;
            progress.inc(1);
        }

        progress.finish_and_clear();
        info!("training finished after {} steps", n_steps);
        Ok(())
    }

    /// Evaluate the agents greedily without learning, see [`test_agents`]
    pub fn test(&mut self, n_steps: usize, seed: Option<u64>) -> Result<RewardLog> {
        test_agents(&mut self.env, &mut self.agents, n_steps, seed)
    }

    pub fn rewards_log(&self) -> &RewardLog {
        &self.rewards_log
    }

    pub fn env(&self) -> &E {
        &self.env
    }

    pub fn agents(&self) -> &AgentMap {
        &self.agents
    }

    /// Give back the environment and agents
    pub fn into_parts(self) -> (E, AgentMap) {
        (self.env, self.agents)
    }
}

/// Run agents greedily for `n_steps` without learning and return the rewards received
///
/// Agents are switched to greedy mode for the run and restored to their previous mode
/// afterwards, also when the run fails. The returned log holds every reward the
/// environment reported.
pub fn test_agents<E>(env: &mut E, agents: &mut AgentMap, n_steps: usize, seed: Option<u64>) -> Result<RewardLog>
where
    E: MultiAgentEnvironment + ?Sized,
{
    if let Some(seed) = seed {
        seed_all(env, agents, seed);
    }

    let previous_modes: Vec<(AgentId, bool)> = agents
        .iter_mut()
        .map(|(&id, agent)| {
            let was_greedy = agent.is_greedy();
            agent.set_greedy(true);
            (id, was_greedy)
        })
        .collect();

    let result = run_greedy(env, agents, n_steps);

    for (id, was_greedy) in previous_modes {
        if let Some(agent) = agents.get_mut(&id) {
            agent.set_greedy(was_greedy);
        }
    }
    result
}

fn run_greedy<E>(env: &mut E, agents: &mut AgentMap, n_steps: usize) -> Result<RewardLog>
where
    E: MultiAgentEnvironment + ?Sized,
{
    info!("testing {} agents for {} steps", agents.len(), n_steps);
    let mut rewards_log: RewardLog = agents.keys().map(|&id| (id, Vec::new())).collect();

    let mut states = env.reset()?;
    for _ in 0..n_steps {
        let actions = select_actions(agents, &states)?;
        let outcome = env.step(&actions)?;
        for (&id, &reward) in &outcome.rewards {
            rewards_log.entry(id).or_default().push(reward);
        }
        states = outcome.observations;
    }

    for id in rewards_log.keys().filter(|id| !agents.contains_key(id)) {
        warn!("environment reported rewards for agent {} which has no registered agent", id);
    }
    Ok(rewards_log)
}

/// Step counter drawn on stderr, hidden when stderr is not a terminal
fn progress_bar(n_steps: usize) -> ProgressBar {
    let bar = ProgressBar::new(n_steps as u64);
    let style = ProgressStyle::with_template("[{elapsed_precise}] [{bar:40}] {pos}/{len} steps ({eta})")
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    bar.set_style(style.progress_chars("#>-"));
    bar
}

/// One seed for the environment, then one per agent in id order
fn seed_all<E>(env: &mut E, agents: &mut AgentMap, seed: u64)
where
    E: MultiAgentEnvironment + ?Sized,
{
    debug!("seeding environment and {} agents from {}", agents.len(), seed);
    let mut fanout = SeedFanout::new(seed);
    env.seed(fanout.next_seed());
    for agent in agents.values_mut() {
        agent.seed(fanout.next_seed());
    }
}

fn select_actions(agents: &mut AgentMap, states: &BTreeMap<AgentId, Value>) -> Result<BTreeMap<AgentId, usize>> {
    agents
        .iter_mut()
        .map(|(&id, agent)| Ok((id, agent.act(observation_of(states, id)?)?)))
        .collect()
}

fn observation_of(states: &BTreeMap<AgentId, Value>, agent: AgentId) -> Result<&Value> {
    states
        .get(&agent)
        .ok_or(HermesError::MissingAgentData { agent, field: "observation" })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{QLearningAgent, RandomAgent};
    use crate::config::QLearningConfig;
    use crate::multi_agent::environment::StepOutcome;
    use crate::multi_agent::line_world::{LineWorld, ObservationMode};
    use crate::spaces::Space;

    fn corridor() -> LineWorld {
        LineWorld::new(2, 6, ObservationMode::Position).unwrap()
    }

    fn q_agents(env: &LineWorld) -> AgentMap {
        (0..2)
            .map(|id| {
                let agent = QLearningAgent::new(env.observation_space(), env.action_space(), QLearningConfig::default())
                    .unwrap();
                (id, Box::new(agent) as Box<dyn Agent>)
            })
            .collect()
    }

    #[test]
    fn test_train_zero_steps() {
        let env = corridor();
        let agents = q_agents(&env);
        let mut trainer = MultiAgentTrainer::new(env, agents, Some(0)).unwrap();
        trainer.train(0).unwrap();
        assert!(trainer.rewards_log().values().all(Vec::is_empty));
        assert_eq!(trainer.rewards_log().len(), 2);
        assert!(trainer.agents().values().all(|a| a.epsilon() == Some(1.0)));
    }

    #[test]
    fn test_train_logs_every_step() {
        let env = corridor();
        let agents = q_agents(&env);
        let mut trainer = MultiAgentTrainer::new(env, agents, Some(5)).unwrap();
        trainer.train(50).unwrap();
        assert!(trainer.rewards_log().values().all(|r| r.len() == 50));

        trainer.reset().unwrap();
        assert!(trainer.rewards_log().values().all(Vec::is_empty));
    }

    #[test]
    fn test_seeded_training_is_reproducible() {
        let run = || {
            let env = corridor();
            let agents = q_agents(&env);
            let mut trainer = MultiAgentTrainer::new(env, agents, Some(17)).unwrap();
            trainer.train(200).unwrap();
            trainer.rewards_log().clone()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_requires_agents() {
        assert!(MultiAgentTrainer::new(corridor(), AgentMap::new(), None).is_err());
    }

    #[test]
    fn test_agents_without_observation() {
        let env = corridor();
        let mut agents = q_agents(&env);
        let extra = RandomAgent::new(env.action_space()).unwrap();
        agents.insert(9, Box::new(extra));
        let mut trainer = MultiAgentTrainer::new(env, agents, None).unwrap();
        assert!(matches!(
            trainer.train(1),
            Err(HermesError::MissingAgentData { agent: 9, field: "observation" })
        ));
    }

    #[test]
    fn test_test_agents_is_greedy_and_does_not_learn() {
        let mut env = corridor();
        let mut agents = q_agents(&env);
        let log = test_agents(&mut env, &mut agents, 30, Some(2)).unwrap();
        assert!(log.values().all(|r| r.len() == 30));
        // no learn calls, so exploration never decayed
        assert!(agents.values().all(|a| a.epsilon() == Some(1.0) && !a.is_greedy()));
    }

    /// Acts like a random agent but fails its `fail_at`-th learn call
    struct FailsToLearn {
        inner: RandomAgent,
        calls: usize,
        fail_at: usize,
    }

    impl Agent for FailsToLearn {
        fn seed(&mut self, seed: u64) {
            self.inner.seed(seed);
        }
        fn reset(&mut self) -> Result<()> {
            self.calls = 0;
            self.inner.reset()
        }
        fn act(&mut self, state: &Value) -> Result<usize> {
            self.inner.act(state)
        }
        fn learn(&mut self, _: &Value, _: usize, _: f32, _: &Value, _: bool) -> Result<()> {
            self.calls += 1;
            if self.calls == self.fail_at {
                return Err(HermesError::NumericalError("diverged".to_string()));
            }
            Ok(())
        }
        fn set_greedy(&mut self, greedy: bool) {
            self.inner.set_greedy(greedy);
        }
        fn is_greedy(&self) -> bool {
            self.inner.is_greedy()
        }
    }

    #[test]
    fn test_failed_step_keeps_logs_aligned() {
        let env = corridor();
        let mut agents = AgentMap::new();
        agents.insert(0, Box::new(RandomAgent::new(env.action_space()).unwrap()) as Box<dyn Agent>);
        let failing = FailsToLearn {
            inner: RandomAgent::new(env.action_space()).unwrap(),
            calls: 0,
            fail_at: 3,
        };
        agents.insert(1, Box::new(failing));

        let mut trainer = MultiAgentTrainer::new(env, agents, Some(4)).unwrap();
        assert!(matches!(trainer.train(10), Err(HermesError::NumericalError(_))));
        // agent 0 learned from step 3 before agent 1 failed, but neither logged it
        assert_eq!(trainer.rewards_log()[&0].len(), 2);
        assert_eq!(trainer.rewards_log()[&1].len(), 2);
    }

    struct Broken {
        space: Space,
    }

    impl MultiAgentEnvironment for Broken {
        fn observation_space(&self) -> &Space {
            &self.space
        }
        fn action_space(&self) -> &Space {
            &self.space
        }
        fn reset(&mut self) -> Result<BTreeMap<AgentId, Value>> {
            Ok([(0, Value::Discrete(0))].into_iter().collect())
        }
        fn step(&mut self, _actions: &BTreeMap<AgentId, usize>) -> Result<StepOutcome> {
            Err(HermesError::Environment("simulator crashed".to_string()))
        }
        fn seed(&mut self, _seed: u64) {}
    }

    #[test]
    fn test_greedy_mode_restored_on_error() {
        let mut env = Broken { space: Space::Discrete(2) };
        let mut agents = AgentMap::new();
        let mut agent = RandomAgent::new(&Space::Discrete(2)).unwrap();
        agent.set_greedy(false);
        agents.insert(0, Box::new(agent));
        assert!(matches!(
            test_agents(&mut env, &mut agents, 3, None),
            Err(HermesError::Environment(_))
        ));
        assert!(!agents[&0].is_greedy());
    }
}
