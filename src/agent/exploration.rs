//! Epsilon-greedy exploration.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Exploration rate used by every agent in greedy mode
pub const GREEDY_EPSILON: f32 = 0.01;

/// Exponentially decaying exploration rate, floored at `end`
///
/// The rate decays once per finished episode. Every pre-decay value is kept in
/// `history` so exploration can be plotted after training.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EpsilonSchedule {
    start: f32,
    decay: f32,
    end: f32,
    current: f32,
    history: Vec<f32>,
}

impl EpsilonSchedule {
    pub fn new(start: f32, decay: f32, end: f32) -> Self {
        EpsilonSchedule {
            start,
            decay,
            end,
            current: start,
            history: Vec::new(),
        }
    }

    pub fn current(&self) -> f32 {
        self.current
    }

    /// Rate to use when acting
    pub fn value(&self, greedy: bool) -> f32 {
        if greedy {
            GREEDY_EPSILON
        } else {
            self.current
        }
    }

    /// Record the current rate then decay it
    pub fn on_episode_end(&mut self) {
        self.history.push(self.current);
        self.current = (self.current * self.decay).max(self.end);
    }

    pub fn reset(&mut self) {
        self.current = self.start;
        self.history.clear();
    }

    /// Rates in effect during each finished episode
    pub fn history(&self) -> &[f32] {
        &self.history
    }
}

/// Coin flip deciding whether to explore
pub fn should_explore<R: Rng + ?Sized>(rng: &mut R, epsilon: f32) -> bool {
    rng.gen::<f32>() < epsilon
}

/// Index of the largest value, lowest index on ties
pub fn argmax(values: &[f32]) -> usize {
    let mut best = 0;
    for (i, &value) in values.iter().enumerate().skip(1) {
        if value > values[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_decay_is_floored() {
        let mut schedule = EpsilonSchedule::new(1.0, 0.5, 0.2);
        schedule.on_episode_end();
        assert_eq!(schedule.current(), 0.5);
        schedule.on_episode_end();
        schedule.on_episode_end();
        assert_eq!(schedule.current(), 0.2);
        assert_eq!(schedule.history(), &[1.0, 0.5, 0.25]);
    }

    #[test]
    fn test_greedy_value() {
        let schedule = EpsilonSchedule::new(0.8, 0.9, 0.1);
        assert_eq!(schedule.value(true), GREEDY_EPSILON);
        assert_eq!(schedule.value(false), 0.8);
    }

    #[test]
    fn test_reset() {
        let mut schedule = EpsilonSchedule::new(1.0, 0.9, 0.1);
        schedule.on_episode_end();
        schedule.reset();
        assert_eq!(schedule.current(), 1.0);
        assert!(schedule.history().is_empty());
    }

    #[test]
    fn test_argmax_ties_go_low() {
        assert_eq!(argmax(&[1.0, 3.0, 3.0, 2.0]), 1);
        assert_eq!(argmax(&[0.5]), 0);
        assert_eq!(argmax(&[-1.0, -1.0]), 0);
    }

    #[test]
    fn test_should_explore_extremes() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!((0..100).all(|_| should_explore(&mut rng, 1.0)));
        assert!((0..100).all(|_| !should_explore(&mut rng, 0.0)));
    }
}
