use rand::rngs::StdRng;
use rand::Rng;

use crate::agent::Agent;
use crate::error::Result;
use crate::seeding::{entropy_rng, SeedFanout};
use crate::spaces::{Space, Value};

/// Acts uniformly at random and never learns
#[derive(Clone, Debug)]
pub struct RandomAgent {
    num_actions: usize,
    greedy: bool,
    rng: StdRng,
}

impl RandomAgent {
    pub fn new(action_space: &Space) -> Result<Self> {
        Ok(RandomAgent {
            num_actions: action_space.require_discrete()?,
            greedy: false,
            rng: entropy_rng(),
        })
    }
}

impl Agent for RandomAgent {
    fn seed(&mut self, seed: u64) {
        self.rng = SeedFanout::new(seed).next_rng();
    }

    fn reset(&mut self) -> Result<()> {
        Ok(())
    }

    fn act(&mut self, _state: &Value) -> Result<usize> {
        Ok(self.rng.gen_range(0..self.num_actions))
    }

    fn learn(&mut self, _state: &Value, _action: usize, _reward: f32, _next_state: &Value, _done: bool) -> Result<()> {
        Ok(())
    }

    fn set_greedy(&mut self, greedy: bool) {
        self.greedy = greedy;
    }

    fn is_greedy(&self) -> bool {
        self.greedy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_sequences_repeat() {
        let state = Value::Discrete(0);
        let mut a = RandomAgent::new(&Space::Discrete(5)).unwrap();
        let mut b = RandomAgent::new(&Space::Discrete(5)).unwrap();
        a.seed(11);
        b.seed(11);
        let xs: Vec<usize> = (0..20).map(|_| a.act(&state).unwrap()).collect();
        let ys: Vec<usize> = (0..20).map(|_| b.act(&state).unwrap()).collect();
        assert_eq!(xs, ys);
        assert!(xs.iter().all(|&x| x < 5));
    }

    #[test]
    fn test_requires_discrete_actions() {
        assert!(RandomAgent::new(&Space::MultiDiscrete(vec![2, 2])).is_err());
    }
}
