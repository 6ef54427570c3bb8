// src/agents/value_table.rs

use super::state_key::StateKey;
use crate::types::Action;
use std::collections::HashMap;

/// Q(s, a) estimates keyed by a structured `(StateKey, Action)` pair.
/// Missing entries read as 0.0. Owned by exactly one agent.
#[derive(Debug, Clone, Default)]
pub struct ValueTable {
    values: HashMap<(StateKey, Action), f64>,
}

impl ValueTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, state: &StateKey, action: &Action) -> f64 {
        self.values.get(&(*state, *action)).copied().unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Highest-valued action among `candidates`; ties go to the earliest.
    pub fn best_action(&self, state: &StateKey, candidates: &[Action]) -> Option<Action> {
        let mut best: Option<(Action, f64)> = None;
        for action in candidates {
            let value = self.get(state, action);
            if best.is_none_or(|(_, v)| value > v) {
                best = Some((*action, value));
            }
        }
        best.map(|(a, _)| a)
    }

    /// max over `candidates` of Q(state, a); 0.0 for an empty slice.
    pub fn max_value(&self, state: &StateKey, candidates: &[Action]) -> f64 {
        candidates
            .iter()
            .map(|a| self.get(state, a))
            .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |m| m.max(v))))
            .unwrap_or(0.0)
    }

    /// Q(s,a) ← Q(s,a) + α·(r + γ·next_max − Q(s,a)). Returns the change.
    pub fn update(
        &mut self,
        state: StateKey,
        action: Action,
        reward: f64,
        next_max: f64,
        learning_rate: f64,
        discount: f64,
    ) -> f64 {
        let q = self.values.entry((state, action)).or_insert(0.0);
        let delta = learning_rate * (reward + discount * next_max - *q);
        *q += delta;
        delta
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MarketParams;
    use crate::market::Market;
    use crate::market::cycle::CyclePhase;
    use crate::types::{Portfolio, Resource};

    fn state() -> StateKey {
        let market = Market::new(MarketParams::default(), 0);
        StateKey::encode(
            &market,
            &Portfolio::new(1_000.0, []),
            CyclePhase::Expansion,
            1_000.0,
        )
        .unwrap()
    }

    #[test]
    fn ties_go_to_the_first_candidate() {
        let table = ValueTable::new();
        let candidates = [Action::buy(Resource::Food, 5), Action::Hold];
        assert_eq!(
            table.best_action(&state(), &candidates),
            Some(Action::buy(Resource::Food, 5))
        );
    }

    #[test]
    fn best_action_prefers_higher_value() {
        let mut table = ValueTable::new();
        let s = state();
        table.update(s, Action::Hold, 1.0, 0.0, 1.0, 0.9);
        let candidates = [Action::buy(Resource::Food, 5), Action::Hold];
        assert_eq!(table.best_action(&s, &candidates), Some(Action::Hold));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn max_value_of_nothing_is_zero() {
        assert_eq!(ValueTable::new().max_value(&state(), &[]), 0.0);
    }

    #[test]
    fn repeated_fixed_reward_converges_monotonically() {
        // Arrange: self-loop on one state-action pair with a constant reward.
        let mut table = ValueTable::new();
        let s = state();
        let a = Action::Hold;
        let (alpha, gamma, reward) = (0.1, 0.95, 1.0);
        let mut last_q = 0.0;
        let mut last_delta = f64::INFINITY;

        // Act / Assert
        for _ in 0..3_000 {
            let next_max = table.max_value(&s, &[a]);
            let delta = table.update(s, a, reward, next_max, alpha, gamma);
            let q = table.get(&s, &a);
            assert!(q >= last_q, "Q must not decrease");
            assert!(delta.abs() <= last_delta + 1e-12, "steps must shrink");
            last_q = q;
            last_delta = delta.abs();
        }

        let fixed_point = reward / (1.0 - gamma);
        assert!((last_q - fixed_point).abs() < 1e-3, "q = {last_q}");
        assert!(last_delta < 1e-4);
    }
}
