// src/types/portfolio.rs

use super::resource::Resource;
use crate::market::Market;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Cash plus per-resource holdings owned by exactly one agent.
///
/// Mutation is crate-private: only [`Market::apply_trade`] moves cash and
/// stock, and only for the agent that owns this portfolio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    cash: f64,
    holdings: BTreeMap<Resource, u32>,
}

impl Portfolio {
    pub fn new(cash: f64, holdings: impl IntoIterator<Item = (Resource, u32)>) -> Self {
        Self {
            cash: cash.max(0.0),
            holdings: holdings.into_iter().collect(),
        }
    }

    /// Same quantity of every resource.
    pub fn with_uniform_holdings(cash: f64, quantity: u32) -> Self {
        Self::new(cash, Resource::ALL.into_iter().map(|r| (r, quantity)))
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn holding(&self, resource: Resource) -> u32 {
        self.holdings.get(&resource).copied().unwrap_or(0)
    }

    pub fn holdings(&self) -> &BTreeMap<Resource, u32> {
        &self.holdings
    }

    /// cash + Σ holdings[r] × price[r]. Resources missing from the market
    /// contribute nothing.
    pub fn net_worth(&self, market: &Market) -> f64 {
        self.cash
            + self
                .holdings
                .iter()
                .map(|(r, qty)| market.price(*r).map_or(0.0, |p| p * f64::from(*qty)))
                .sum::<f64>()
    }

    pub(crate) fn debit(&mut self, amount: f64) {
        debug_assert!(amount <= self.cash + 1e-9, "debit beyond available cash");
        self.cash = (self.cash - amount).max(0.0);
    }

    pub(crate) fn credit(&mut self, amount: f64) {
        self.cash += amount;
    }

    pub(crate) fn add_holding(&mut self, resource: Resource, quantity: u32) {
        *self.holdings.entry(resource).or_insert(0) += quantity;
    }

    pub(crate) fn remove_holding(&mut self, resource: Resource, quantity: u32) {
        let held = self.holdings.entry(resource).or_insert(0);
        debug_assert!(*held >= quantity, "removing more stock than held");
        *held = held.saturating_sub(quantity);
    }
}
