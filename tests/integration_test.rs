use hermes::agent::{Agent, DqnAgent, QLearningAgent, RandomAgent};
use hermes::config::{DenseNetworkConfig, DqnConfig, OptimizerConfig, QLearningConfig};
use hermes::metrics::rewards::summarize;
use hermes::multi_agent::{test_agents, AgentMap, LineWorld, MultiAgentEnvironment, MultiAgentTrainer, ObservationMode};
use hermes::network::QNetwork;
use hermes::spaces::Value;
use hermes::visualization::{export_rewards_csv, plot_cumulative_rewards, plot_rolling_rewards};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn random_agents(env: &LineWorld) -> AgentMap {
    let mut agents = AgentMap::new();
    for id in 0..env.num_agents() {
        agents.insert(id, Box::new(RandomAgent::new(env.action_space()).unwrap()) as Box<dyn Agent>);
    }
    agents
}

fn qlearning_agents(env: &LineWorld) -> AgentMap {
    let mut agents = AgentMap::new();
    for id in 0..env.num_agents() {
        let agent = QLearningAgent::new(env.observation_space(), env.action_space(), QLearningConfig::default()).unwrap();
        agents.insert(id, Box::new(agent) as Box<dyn Agent>);
    }
    agents
}

#[test]
fn test_seeded_random_runs_are_reproducible() {
    init_logging();
    let run = |seed| {
        let env = LineWorld::new(3, 8, ObservationMode::Position).unwrap();
        let agents = random_agents(&env);
        let mut trainer = MultiAgentTrainer::new(env, agents, Some(seed)).unwrap();
        trainer.train(200).unwrap();
        (trainer.rewards_log().clone(), trainer.env().positions().to_vec())
    };

    let (log_a, positions_a) = run(11);
    let (log_b, positions_b) = run(11);
    assert_eq!(log_a, log_b);
    assert_eq!(positions_a, positions_b);
    assert_eq!(log_a.len(), 3);
    assert!(log_a.values().all(|rewards| rewards.len() == 200));
}

#[test]
fn test_zero_steps_leaves_agents_untouched() {
    let env = LineWorld::new(2, 5, ObservationMode::Position).unwrap();
    let agents = qlearning_agents(&env);
    let mut trainer = MultiAgentTrainer::new(env, agents, Some(0)).unwrap();
    trainer.train(0).unwrap();

    assert!(trainer.rewards_log().values().all(Vec::is_empty));
    for agent in trainer.agents().values() {
        assert_eq!(agent.epsilon(), Some(1.0));
        assert!(!agent.is_greedy());
    }
}

#[test]
fn test_qlearning_on_line_world() {
    init_logging();
    let env = LineWorld::new(2, 6, ObservationMode::Position).unwrap();
    let agents = qlearning_agents(&env);
    let mut trainer = MultiAgentTrainer::new(env, agents, Some(5)).unwrap();
    trainer.train(2_000).unwrap();

    let summaries = summarize(trainer.rewards_log());
    assert!(summaries.values().all(|summary| summary.steps == 2_000));
    // every drone reaches the pickup cell at least once in 2000 steps
    assert!(summaries.values().all(|summary| summary.pickups > 0));
    for agent in trainer.agents().values() {
        assert!(agent.epsilon().unwrap() < 1.0);
    }

    let test_log = trainer.test(100, Some(9)).unwrap();
    assert_eq!(test_log.len(), 2);
    assert!(test_log.values().all(|rewards| rewards.len() == 100));
    assert!(trainer.agents().values().all(|agent| !agent.is_greedy()));
}

#[test]
fn test_dqn_on_line_world() {
    let env = LineWorld::new(2, 5, ObservationMode::Position).unwrap();
    let mut agents = AgentMap::new();
    for id in 0..2 {
        let agent = DqnAgent::dense(
            env.observation_space(),
            env.action_space(),
            DqnConfig::default()
                .memory_size(256)
                .batch_size(16)
                .optimizer(OptimizerConfig::Sgd { learning_rate: 0.01 }),
            DenseNetworkConfig::default().hidden_sizes(vec![16]),
        )
        .unwrap();
        agents.insert(id, Box::new(agent) as Box<dyn Agent>);
    }
    let mut trainer = MultiAgentTrainer::new(env, agents, Some(3)).unwrap();
    trainer.train(300).unwrap();
    assert!(trainer.rewards_log().values().all(|rewards| rewards.len() == 300));

    let (mut env, mut agents) = trainer.into_parts();
    let log = test_agents(&mut env, &mut agents, 50, None).unwrap();
    assert!(log.values().all(|rewards| rewards.len() == 50));
}

#[test]
fn test_target_matches_trainable_after_episode_boundary() {
    let env = LineWorld::new(1, 4, ObservationMode::Position).unwrap();
    let mut agent = DqnAgent::dense(
        env.observation_space(),
        env.action_space(),
        DqnConfig::default().target_update_interval(1).memory_size(64).batch_size(32),
        DenseNetworkConfig::default().hidden_sizes(vec![8]),
    )
    .unwrap();
    agent.seed(21);
    agent.reset().unwrap();

    let state = Value::Discrete(1);
    let next_state = Value::Discrete(2);
    agent.learn(&state, 2, 0.0, &next_state, false).unwrap();
    agent.learn(&next_state, 2, 1.0, &state, true).unwrap();
    assert_eq!(agent.num_episode(), 1);

    let trainable = agent.network().parameters();
    let target = agent.target_network().parameters();
    assert_eq!(trainable.len(), target.len());
    for (a, b) in trainable.iter().zip(&target) {
        assert_eq!(a, b);
    }
}

#[test]
fn test_reports_from_training_log() {
    let env = LineWorld::new(2, 5, ObservationMode::Position).unwrap();
    let agents = random_agents(&env);
    let mut trainer = MultiAgentTrainer::new(env, agents, Some(1)).unwrap();
    trainer.train(120).unwrap();
    let log = trainer.rewards_log();

    let cumulative = plot_cumulative_rewards(log, None, 60, 12);
    assert!(cumulative.contains("Drone 0"));
    assert!(cumulative.contains("Drone 1"));

    let rolling = plot_rolling_rewards(log, None, Some(0.0), Some(&[1]), 60, 12).unwrap();
    assert!(rolling.contains("Drone 1"));
    assert!(!rolling.contains("Drone 0"));

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rewards.csv");
    export_rewards_csv(log, &path).unwrap();
    let csv = std::fs::read_to_string(&path).unwrap();
    assert_eq!(csv.lines().count(), 121);
}

#[test]
fn test_image_observations_reach_agents() {
    let mut env = LineWorld::new(2, 5, ObservationMode::Image).unwrap();
    env.seed(2);
    let observations = env.reset().unwrap();
    for observation in observations.values() {
        assert!(env.observation_space().contains(observation));
    }
}
