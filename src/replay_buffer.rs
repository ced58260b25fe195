//! Bounded experience replay.
//!
//! The buffer is a circular array with a write cursor: it fills up to `capacity`, after
//! which every push overwrites the oldest entry. It is a sliding window over the most
//! recent experience, not a random-eviction cache.

use rand::seq::index;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{HermesError, Result};
use crate::spaces::Value;

/// One step of experience, owned by the buffer once pushed
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub state: Value,
    pub action: usize,
    pub reward: f32,
    pub next_state: Value,
    pub done: bool,
}

/// Fixed-capacity FIFO store with uniform sampling without replacement
#[derive(Clone, Debug)]
pub struct ReplayBuffer<T = Transition> {
    slots: Vec<T>,
    capacity: usize,
    /// Next slot to overwrite once the buffer is full
    cursor: usize,
}

impl<T> ReplayBuffer<T> {
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(HermesError::invalid_parameter(
                "memory_size",
                "replay capacity must be positive",
            ));
        }
        Ok(ReplayBuffer {
            slots: Vec::with_capacity(capacity),
            capacity,
            cursor: 0,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.slots.len() == self.capacity
    }

    /// Append an item, evicting the oldest one when full
    pub fn push(&mut self, item: T) {
        if self.slots.len() < self.capacity {
            self.slots.push(item);
        } else {
            self.slots[self.cursor] = item;
            self.cursor = (self.cursor + 1) % self.capacity;
        }
    }

    /// Item at `position` counted from the oldest stored item
    pub fn get(&self, position: usize) -> Option<&T> {
        if position >= self.slots.len() {
            return None;
        }
        let start = if self.is_full() { self.cursor } else { 0 };
        self.slots.get((start + position) % self.capacity)
    }

    /// Items from oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        (0..self.slots.len()).filter_map(move |i| self.get(i))
    }

    /// Draw `batch_size` distinct items uniformly at random
    pub fn sample<R: Rng + ?Sized>(&self, batch_size: usize, rng: &mut R) -> Result<Vec<&T>> {
        if batch_size > self.slots.len() {
            return Err(HermesError::InsufficientData {
                requested: batch_size,
                available: self.slots.len(),
            });
        }
        Ok(index::sample(rng, self.slots.len(), batch_size)
            .into_iter()
            .map(|i| &self.slots[i])
            .collect())
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.cursor = 0;
    }
}
