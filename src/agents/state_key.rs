// src/agents/state_key.rs

//! Discretized view of market + portfolio + cycle used as the state half of
//! a value-table key. Pure function of its inputs, so identical situations
//! always land on the same key.

use super::config::{
    CASH_RATIO_THRESHOLDS, DEMAND_THRESHOLDS, HOLDING_THRESHOLDS, PRICE_RATIO_THRESHOLDS,
    SUPPLY_THRESHOLDS,
};
use crate::error::EncodingError;
use crate::market::Market;
use crate::market::cycle::CyclePhase;
use crate::types::{Portfolio, Resource};
use serde::{Deserialize, Serialize};

/// One of five ordered buckets, 0 (lowest) to 4 (highest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Level(u8);

impl Level {
    pub const COUNT: u8 = 5;

    /// Number of thresholds `value` reaches.
    pub fn bucket(value: f64, thresholds: &[f64; 4]) -> Self {
        Level(thresholds.iter().take_while(|t| value >= **t).count() as u8)
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceLevels {
    pub price: Level,
    pub supply: Level,
    pub demand: Level,
    pub holding: Level,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StateKey {
    /// Indexed by [`Resource::index`].
    pub resources: [ResourceLevels; Resource::COUNT],
    pub phase: CyclePhase,
    pub cash: Level,
}

impl StateKey {
    /// `reference_cash` is what "normal" cash looks like for this agent
    /// (its starting cash).
    pub fn encode(
        market: &Market,
        portfolio: &Portfolio,
        phase: CyclePhase,
        reference_cash: f64,
    ) -> Result<Self, EncodingError> {
        let mut resources = [ResourceLevels {
            price: Level(0),
            supply: Level(0),
            demand: Level(0),
            holding: Level(0),
        }; Resource::COUNT];

        for resource in Resource::ALL {
            let entry = market
                .entry(resource)
                .ok_or(EncodingError::MissingResource(resource))?;
            if !entry.price.is_finite() {
                return Err(EncodingError::NonFinitePrice(resource));
            }
            if entry.price <= 0.0 {
                return Err(EncodingError::NonPositivePrice {
                    resource,
                    price: entry.price,
                });
            }

            resources[resource.index()] = ResourceLevels {
                price: Level::bucket(entry.price / resource.base_price(), &PRICE_RATIO_THRESHOLDS),
                supply: Level::bucket(f64::from(entry.supply), &SUPPLY_THRESHOLDS),
                demand: Level::bucket(f64::from(entry.demand), &DEMAND_THRESHOLDS),
                holding: Level::bucket(
                    f64::from(portfolio.holding(resource)),
                    &HOLDING_THRESHOLDS,
                ),
            };
        }

        let cash_ratio = portfolio.cash() / reference_cash.max(1.0);
        Ok(Self {
            resources,
            phase,
            cash: Level::bucket(cash_ratio, &CASH_RATIO_THRESHOLDS),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MarketParams;
    use crate::market::MarketEntry;

    #[test]
    fn buckets_cover_five_levels() {
        let t = [1.0, 2.0, 3.0, 4.0];
        let levels: Vec<u8> = [0.5, 1.0, 2.5, 3.0, 99.0]
            .iter()
            .map(|v| Level::bucket(*v, &t).get())
            .collect();
        assert_eq!(levels, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn same_inputs_give_the_same_key() {
        let market = Market::new(MarketParams::default(), 3);
        let portfolio = Portfolio::with_uniform_holdings(5_000.0, 12);

        let a = StateKey::encode(&market, &portfolio, CyclePhase::Peak, 10_000.0).unwrap();
        let b = StateKey::encode(&market, &portfolio, CyclePhase::Peak, 10_000.0).unwrap();

        assert_eq!(a, b);
        assert_eq!(a.cash.get(), 1);
        assert_eq!(a.resources[Resource::Food.index()].holding.get(), 2);
    }

    #[test]
    fn phase_is_part_of_the_key() {
        let market = Market::new(MarketParams::default(), 3);
        let portfolio = Portfolio::with_uniform_holdings(5_000.0, 0);

        let a = StateKey::encode(&market, &portfolio, CyclePhase::Peak, 10_000.0).unwrap();
        let b = StateKey::encode(&market, &portfolio, CyclePhase::Trough, 10_000.0).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn malformed_snapshots_are_rejected() {
        let portfolio = Portfolio::new(100.0, []);

        let missing = Market::with_entries(
            [(Resource::Water, MarketEntry::new(10.0, 100, 100))],
            MarketParams::default(),
            0,
        );
        assert_eq!(
            StateKey::encode(&missing, &portfolio, CyclePhase::Expansion, 100.0),
            Err(EncodingError::MissingResource(Resource::Food))
        );

        let nan = Market::with_entries(
            Resource::ALL.map(|r| (r, MarketEntry::new(f64::NAN, 100, 100))),
            MarketParams::default(),
            0,
        );
        assert_eq!(
            StateKey::encode(&nan, &portfolio, CyclePhase::Expansion, 100.0),
            Err(EncodingError::NonFinitePrice(Resource::Water))
        );
    }
}
