use crate::error::Result;
use crate::spaces::Value;

/// An agent driven by the multi-agent trainer
///
/// The trainer owns agents as `Box<dyn Agent>`. Each agent exclusively owns its learning
/// state and random generators, so two agents never share anything.
pub trait Agent {
    /// Reseed every generator the agent owns
    fn seed(&mut self, seed: u64);

    /// Forget everything learned (before training)
    fn reset(&mut self) -> Result<()>;

    /// Choose an action in `0..num_actions` for `state`
    fn act(&mut self, state: &Value) -> Result<usize>;

    /// Learn from one transition
    fn learn(&mut self, state: &Value, action: usize, reward: f32, next_state: &Value, done: bool) -> Result<()>;

    /// Switch greedy (evaluation) mode on or off
    fn set_greedy(&mut self, greedy: bool);

    fn is_greedy(&self) -> bool;

    /// Current exploration rate, for agents that explore
    fn epsilon(&self) -> Option<f32> {
        None
    }
}
