// src/market/mod.rs

pub mod cycle;

use crate::config::{
    DEMAND_IMPACT_RATIO, MAX_DEMAND, MAX_PRICE, MAX_SUPPLY, MIN_DEMAND, MIN_PRICE, MIN_SUPPLY,
    MarketParams,
};
use crate::error::{TickError, TradeError};
use crate::types::{Action, Portfolio, Resource, Side};
use cycle::CycleMultipliers;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Price, supply and demand for one resource.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketEntry {
    pub price: f64,
    pub supply: u32,
    pub demand: u32,
}

impl MarketEntry {
    pub fn new(price: f64, supply: u32, demand: u32) -> Self {
        Self {
            price,
            supply,
            demand,
        }
    }

    /// demand / supply. Supply never drops below `MIN_SUPPLY`, so this is
    /// always finite for entries that went through the market.
    pub fn demand_supply_ratio(&self) -> f64 {
        f64::from(self.demand) / f64::from(self.supply.max(1))
    }
}

/// A completed trade.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub resource: Resource,
    pub side: Side,
    pub quantity: u32,
    pub price: f64,
    /// Positive for sells, negative for buys.
    pub cash_delta: f64,
}

/// The shared commodity market: one [`MarketEntry`] per resource, mutated by
/// trades, per-tick drift, progressive events and cycle shocks.
#[derive(Debug, Clone)]
pub struct Market {
    entries: BTreeMap<Resource, MarketEntry>,
    params: MarketParams,
    rng: StdRng,
}

impl Market {
    /// The standard four-resource opening book.
    pub fn new(params: MarketParams, seed: u64) -> Self {
        Self::with_entries(default_entries(), params, seed)
    }

    /// Entries are taken as-is; call [`Market::check_invariants`] if they come
    /// from an untrusted source.
    pub fn with_entries(
        entries: impl IntoIterator<Item = (Resource, MarketEntry)>,
        params: MarketParams,
        seed: u64,
    ) -> Self {
        Self {
            entries: entries.into_iter().collect(),
            params,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn entry(&self, resource: Resource) -> Option<&MarketEntry> {
        self.entries.get(&resource)
    }

    pub fn price(&self, resource: Resource) -> Option<f64> {
        self.entries.get(&resource).map(|e| e.price)
    }

    pub fn entries(&self) -> &BTreeMap<Resource, MarketEntry> {
        &self.entries
    }

    pub fn snapshot(&self) -> BTreeMap<Resource, MarketEntry> {
        self.entries.clone()
    }

    pub fn params(&self) -> &MarketParams {
        &self.params
    }

    /// Demand/supply ratio averaged over every resource.
    pub fn aggregate_ratio(&self) -> f64 {
        if self.entries.is_empty() {
            return 1.0;
        }
        self.entries
            .values()
            .map(MarketEntry::demand_supply_ratio)
            .sum::<f64>()
            / self.entries.len() as f64
    }

    /// Executes `action` for the owner of `portfolio`. All-or-nothing: on
    /// error neither the market nor the portfolio has changed. `Hold` always
    /// succeeds with no fill.
    pub fn apply_trade(
        &mut self,
        portfolio: &mut Portfolio,
        action: &Action,
    ) -> Result<Option<Fill>, TradeError> {
        match *action {
            Action::Hold => Ok(None),
            Action::Buy { resource, quantity } => {
                if quantity == 0 {
                    return Err(TradeError::NonPositiveQuantity);
                }
                let entry = self
                    .entries
                    .get_mut(&resource)
                    .ok_or(TradeError::UnknownResource(resource))?;

                let cost = entry.price * f64::from(quantity);
                if portfolio.cash() < cost {
                    return Err(TradeError::InsufficientCash {
                        needed: cost,
                        available: portfolio.cash(),
                    });
                }
                let available = entry.supply.saturating_sub(MIN_SUPPLY);
                if quantity > available {
                    return Err(TradeError::InsufficientSupply {
                        resource,
                        requested: quantity,
                        available,
                    });
                }

                entry.supply -= quantity;
                entry.demand = entry
                    .demand
                    .saturating_add(demand_impact(quantity))
                    .min(MAX_DEMAND);
                portfolio.debit(cost);
                portfolio.add_holding(resource, quantity);

                Ok(Some(Fill {
                    resource,
                    side: Side::Buy,
                    quantity,
                    price: entry.price,
                    cash_delta: -cost,
                }))
            }
            Action::Sell { resource, quantity } => {
                if quantity == 0 {
                    return Err(TradeError::NonPositiveQuantity);
                }
                let entry = self
                    .entries
                    .get_mut(&resource)
                    .ok_or(TradeError::UnknownResource(resource))?;

                let held = portfolio.holding(resource);
                if held < quantity {
                    return Err(TradeError::InsufficientHoldings {
                        resource,
                        requested: quantity,
                        held,
                    });
                }

                let proceeds = entry.price * f64::from(quantity);
                entry.supply = entry.supply.saturating_add(quantity).min(MAX_SUPPLY);
                entry.demand = entry
                    .demand
                    .saturating_sub(demand_impact(quantity))
                    .max(MIN_DEMAND);
                portfolio.credit(proceeds);
                portfolio.remove_holding(resource, quantity);

                Ok(Some(Fill {
                    resource,
                    side: Side::Sell,
                    quantity,
                    price: entry.price,
                    cash_delta: proceeds,
                }))
            }
        }
    }

    /// One tick of natural dynamics. Must run after every trade of the tick.
    ///
    /// Price first, from the current imbalance:
    /// `change = (demand/supply − 1) × sensitivity × volatility + noise`,
    /// `price = clamp(round(price × (1 + change), price_decimals))`.
    /// Prices are rounded to `MarketParams::price_decimals` places rather
    /// than to whole units; set it to `0` for whole-unit rounding.
    /// Then supply and demand get bounded random jitter scaled by the phase
    /// multiplier plus the phase's deterministic pull.
    pub fn advance_tick(&mut self, multipliers: CycleMultipliers) {
        let params = self.params;
        let jitter = if params.drift_amplitude > 0.0 {
            Normal::new(0.0, params.drift_amplitude / 2.0).ok()
        } else {
            None
        };

        for entry in self.entries.values_mut() {
            let noise = if params.noise_amplitude > 0.0 {
                self.rng
                    .gen_range(-params.noise_amplitude..=params.noise_amplitude)
            } else {
                0.0
            };
            let change = (entry.demand_supply_ratio() - 1.0)
                * params.base_sensitivity
                * multipliers.price_volatility
                + noise;
            entry.price = clamp_price(round_price(
                entry.price * (1.0 + change),
                params.price_decimals,
            ));

            let mut draw = || {
                jitter.as_ref().map_or(0.0, |dist| {
                    dist.sample(&mut self.rng)
                        .clamp(-params.drift_amplitude, params.drift_amplitude)
                })
            };
            let supply_jitter = draw();
            let demand_jitter = draw();

            entry.supply = drift_level(
                entry.supply,
                supply_jitter,
                multipliers.supply,
                params.cycle_drift_rate,
                MIN_SUPPLY,
                MAX_SUPPLY,
            );
            entry.demand = drift_level(
                entry.demand,
                demand_jitter,
                multipliers.demand,
                params.cycle_drift_rate,
                MIN_DEMAND,
                MAX_DEMAND,
            );
        }
    }

    /// One-off step effect applied when the economic cycle changes phase.
    pub fn apply_phase_shock(&mut self, multipliers: CycleMultipliers) {
        for entry in self.entries.values_mut() {
            entry.supply = scale_level(entry.supply, multipliers.supply, MIN_SUPPLY, MAX_SUPPLY);
            entry.demand = scale_level(entry.demand, multipliers.demand, MIN_DEMAND, MAX_DEMAND);
        }
    }

    /// Multiplies supply by `1 + supply_delta` and demand by `1 + demand_delta`
    /// for one resource, clamped to the global bounds. Used by progressive
    /// events; unknown resources are ignored.
    pub fn scale_levels(&mut self, resource: Resource, supply_delta: f64, demand_delta: f64) {
        if let Some(entry) = self.entries.get_mut(&resource) {
            entry.supply = scale_level(entry.supply, 1.0 + supply_delta, MIN_SUPPLY, MAX_SUPPLY);
            entry.demand = scale_level(entry.demand, 1.0 + demand_delta, MIN_DEMAND, MAX_DEMAND);
        }
    }

    /// Verifies the price/supply/demand bounds for every resource.
    pub fn check_invariants(&self) -> Result<(), TickError> {
        for (resource, entry) in &self.entries {
            let violation = |detail: String| TickError::InvariantViolation {
                resource: *resource,
                detail,
            };
            if !entry.price.is_finite() || !(MIN_PRICE..=MAX_PRICE).contains(&entry.price) {
                return Err(violation(format!("price {} out of bounds", entry.price)));
            }
            if !(MIN_SUPPLY..=MAX_SUPPLY).contains(&entry.supply) {
                return Err(violation(format!("supply {} out of bounds", entry.supply)));
            }
            if !(MIN_DEMAND..=MAX_DEMAND).contains(&entry.demand) {
                return Err(violation(format!("demand {} out of bounds", entry.demand)));
            }
        }
        Ok(())
    }

    /// Test hook for exercising the rollback path.
    #[cfg(test)]
    pub(crate) fn entry_mut(&mut self, resource: Resource) -> Option<&mut MarketEntry> {
        self.entries.get_mut(&resource)
    }
}

fn default_entries() -> [(Resource, MarketEntry); Resource::COUNT] {
    [
        (Resource::Water, MarketEntry::new(10.0, 1000, 800)),
        (Resource::Food, MarketEntry::new(15.0, 900, 850)),
        (Resource::Energy, MarketEntry::new(25.0, 700, 750)),
        (Resource::Materials, MarketEntry::new(20.0, 800, 700)),
    ]
}

#[inline]
fn demand_impact(quantity: u32) -> u32 {
    (f64::from(quantity) * DEMAND_IMPACT_RATIO).floor() as u32
}

#[inline]
fn round_price(price: f64, decimals: u32) -> f64 {
    let scale = 10_f64.powi(decimals.min(9) as i32);
    (price * scale).round() / scale
}

#[inline]
fn clamp_price(price: f64) -> f64 {
    if price.is_finite() {
        price.clamp(MIN_PRICE, MAX_PRICE)
    } else {
        MIN_PRICE
    }
}

#[inline]
fn clamp_level(level: f64, min: u32, max: u32) -> u32 {
    level.round().clamp(f64::from(min), f64::from(max)) as u32
}

fn scale_level(level: u32, factor: f64, min: u32, max: u32) -> u32 {
    clamp_level(f64::from(level) * factor, min, max)
}

fn drift_level(level: u32, jitter: f64, multiplier: f64, rate: f64, min: u32, max: u32) -> u32 {
    let pull = f64::from(level) * (multiplier - 1.0) * rate;
    clamp_level(
        f64::from(level) + (jitter * multiplier).round() + pull.round(),
        min,
        max,
    )
}
