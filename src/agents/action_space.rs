// src/agents/action_space.rs

use super::config::ACTION_QUANTITIES;
use crate::config::MIN_SUPPLY;
use crate::market::Market;
use crate::types::{Action, Portfolio, Resource};
use rand::Rng;
use rand::seq::SliceRandom;

/// The fixed discrete action space: every buy, then every sell, then `Hold`.
#[derive(Debug, Clone)]
pub struct ActionSpace {
    actions: Vec<Action>,
}

impl ActionSpace {
    pub fn new() -> Self {
        let buys = Resource::ALL
            .into_iter()
            .flat_map(|r| ACTION_QUANTITIES.map(|q| Action::buy(r, q)));
        let sells = Resource::ALL
            .into_iter()
            .flat_map(|r| ACTION_QUANTITIES.map(|q| Action::sell(r, q)));
        Self {
            actions: buys.chain(sells).chain([Action::Hold]).collect(),
        }
    }

    pub fn all(&self) -> &[Action] {
        &self.actions
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Actions the agent could execute right now, in enumeration order.
    /// `Hold` is always present.
    pub fn legal(&self, market: &Market, portfolio: &Portfolio) -> Vec<Action> {
        self.actions
            .iter()
            .copied()
            .filter(|a| is_legal(a, market, portfolio))
            .collect()
    }

    /// Up to `limit` actions drawn without replacement; the whole space when
    /// it is small enough.
    pub fn sample<R: Rng + ?Sized>(&self, limit: usize, rng: &mut R) -> Vec<Action> {
        if limit == 0 || self.actions.len() <= limit {
            return self.actions.clone();
        }
        self.actions.choose_multiple(rng, limit).copied().collect()
    }
}

impl Default for ActionSpace {
    fn default() -> Self {
        Self::new()
    }
}

/// Mirrors the checks in [`Market::apply_trade`].
pub fn is_legal(action: &Action, market: &Market, portfolio: &Portfolio) -> bool {
    match *action {
        Action::Hold => true,
        Action::Buy { resource, quantity } => market.entry(resource).is_some_and(|e| {
            quantity > 0
                && portfolio.cash() >= e.price * f64::from(quantity)
                && e.supply.saturating_sub(MIN_SUPPLY) >= quantity
        }),
        Action::Sell { resource, quantity } => {
            quantity > 0
                && market.entry(resource).is_some()
                && portfolio.holding(resource) >= quantity
        }
    }
}
