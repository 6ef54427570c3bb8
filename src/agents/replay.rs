// src/agents/replay.rs

use super::state_key::StateKey;
use crate::types::Action;
use rand::Rng;
use rand::seq::index;
use std::collections::VecDeque;

/// One observed transition (s, a, r, s').
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Experience {
    pub state: StateKey,
    pub action: Action,
    pub reward: f64,
    pub next_state: StateKey,
}

/// Bounded ring of past transitions; the oldest is dropped when full.
#[derive(Debug, Clone)]
pub struct ExperienceBuffer {
    buffer: VecDeque<Experience>,
    capacity: usize,
}

impl ExperienceBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, experience: Experience) {
        if self.capacity == 0 {
            return;
        }
        if self.buffer.len() >= self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(experience);
    }

    /// Up to `batch_size` distinct transitions, uniformly at random.
    pub fn sample<R: Rng + ?Sized>(&self, batch_size: usize, rng: &mut R) -> Vec<Experience> {
        let amount = batch_size.min(self.buffer.len());
        index::sample(rng, self.buffer.len(), amount)
            .into_iter()
            .map(|i| self.buffer[i])
            .collect()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MarketParams;
    use crate::market::Market;
    use crate::market::cycle::CyclePhase;
    use crate::types::Portfolio;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn experience(reward: f64) -> Experience {
        let market = Market::new(MarketParams::default(), 0);
        let s = StateKey::encode(&market, &Portfolio::new(10.0, []), CyclePhase::Peak, 10.0)
            .unwrap();
        Experience {
            state: s,
            action: Action::Hold,
            reward,
            next_state: s,
        }
    }

    #[test]
    fn oldest_entries_are_evicted() {
        let mut buffer = ExperienceBuffer::new(3);
        for r in 0..5 {
            buffer.push(experience(f64::from(r)));
        }

        let mut rng = StdRng::seed_from_u64(0);
        let mut rewards: Vec<f64> = buffer.sample(10, &mut rng).iter().map(|e| e.reward).collect();
        rewards.sort_by(f64::total_cmp);

        assert_eq!(buffer.len(), 3);
        assert_eq!(rewards, vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn sampling_an_empty_buffer_yields_nothing() {
        let buffer = ExperienceBuffer::new(8);
        let mut rng = StdRng::seed_from_u64(0);
        assert!(buffer.sample(4, &mut rng).is_empty());
    }
}
