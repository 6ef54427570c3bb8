// src/events/progressive.rs

use super::easing::EasingKind;
use super::template::EventTemplate;
use crate::market::{Market, MarketEntry};
use crate::types::Resource;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub u64);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "event-{}", self.0)
    }
}

/// The increments one step applied, as fractions of the current levels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepDelta {
    pub step: u32,
    pub supply: f64,
    pub demand: f64,
}

/// A shock being spread over `total_steps` steps.
///
/// Each step applies only the difference between where the easing curve says
/// the event should be and what has already been applied, so the deltas of
/// a full run always sum to `peak_intensity × effect`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressiveEvent {
    id: EventId,
    template_id: String,
    target_resources: Vec<Resource>,
    total_steps: u32,
    step_duration_ms: u64,
    easing: EasingKind,
    peak_intensity: f64,
    supply_effect: f64,
    demand_effect: f64,
    current_step: u32,
    accumulated_supply: f64,
    accumulated_demand: f64,
    started_at_ms: u64,
    last_step_at_ms: u64,
}

impl ProgressiveEvent {
    pub fn from_template(id: EventId, template: &EventTemplate, now_ms: u64) -> Self {
        Self {
            id,
            template_id: template.id.clone(),
            target_resources: template.target_resources.clone(),
            total_steps: template.total_steps.max(1),
            step_duration_ms: template.step_duration_ms,
            easing: template.easing,
            peak_intensity: template.peak_intensity,
            supply_effect: template.supply_effect,
            demand_effect: template.demand_effect,
            current_step: 0,
            accumulated_supply: 0.0,
            accumulated_demand: 0.0,
            started_at_ms: now_ms,
            last_step_at_ms: now_ms,
        }
    }

    pub fn id(&self) -> EventId {
        self.id
    }

    pub fn template_id(&self) -> &str {
        &self.template_id
    }

    pub fn current_step(&self) -> u32 {
        self.current_step
    }

    pub fn total_steps(&self) -> u32 {
        self.total_steps
    }

    pub fn accumulated_supply_effect(&self) -> f64 {
        self.accumulated_supply
    }

    pub fn accumulated_demand_effect(&self) -> f64 {
        self.accumulated_demand
    }

    pub fn is_due(&self, now_ms: u64) -> bool {
        !self.is_complete() && now_ms.saturating_sub(self.last_step_at_ms) >= self.step_duration_ms
    }

    pub fn is_complete(&self) -> bool {
        self.current_step >= self.total_steps
    }

    /// Applies the next step to `market`.
    pub fn step(&mut self, market: &mut Market, now_ms: u64) -> StepDelta {
        let next = self.current_step + 1;
        let intensity = self.easing.progress(next, self.total_steps) * self.peak_intensity;
        let supply = self.supply_effect * intensity - self.accumulated_supply;
        let demand = self.demand_effect * intensity - self.accumulated_demand;

        for resource in &self.target_resources {
            market.scale_levels(*resource, supply, demand);
        }

        self.accumulated_supply += supply;
        self.accumulated_demand += demand;
        self.current_step = next;
        self.last_step_at_ms = now_ms;

        debug!(
            event = %self.id,
            template = %self.template_id,
            step = next,
            total = self.total_steps,
            supply,
            demand,
            "event step applied"
        );
        StepDelta {
            step: next,
            supply,
            demand,
        }
    }

    pub fn progress(&self) -> EventProgress {
        EventProgress {
            id: self.id,
            template_id: self.template_id.clone(),
            current_step: self.current_step,
            total_steps: self.total_steps,
            progress: self.easing.progress(self.current_step, self.total_steps),
            accumulated_supply_effect: self.accumulated_supply,
            accumulated_demand_effect: self.accumulated_demand,
            started_at_ms: self.started_at_ms,
            next_step_at_ms: self.last_step_at_ms + self.step_duration_ms,
        }
    }

    pub fn finalize(self, market: &Market, now_ms: u64) -> FinalizedEvent {
        FinalizedEvent {
            id: self.id,
            template_id: self.template_id,
            target_resources: self.target_resources,
            total_steps: self.total_steps,
            accumulated_supply_effect: self.accumulated_supply,
            accumulated_demand_effect: self.accumulated_demand,
            started_at_ms: self.started_at_ms,
            finished_at_ms: now_ms,
            duration_ms: now_ms.saturating_sub(self.started_at_ms),
            market: market.snapshot(),
        }
    }
}

/// Snapshot of an in-flight event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventProgress {
    pub id: EventId,
    pub template_id: String,
    pub current_step: u32,
    pub total_steps: u32,
    /// Eased progress in `[0, 1]`.
    pub progress: f64,
    pub accumulated_supply_effect: f64,
    pub accumulated_demand_effect: f64,
    pub started_at_ms: u64,
    pub next_step_at_ms: u64,
}

/// The durable record emitted once an event has run every step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalizedEvent {
    pub id: EventId,
    pub template_id: String,
    pub target_resources: Vec<Resource>,
    pub total_steps: u32,
    pub accumulated_supply_effect: f64,
    pub accumulated_demand_effect: f64,
    pub started_at_ms: u64,
    pub finished_at_ms: u64,
    pub duration_ms: u64,
    pub market: BTreeMap<Resource, MarketEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MarketParams;
    use crate::events::template::template;

    fn crash() -> ProgressiveEvent {
        ProgressiveEvent::from_template(EventId(1), template("market_crash").unwrap(), 0)
    }

    #[test]
    fn first_step_waits_a_full_duration() {
        let event = crash();
        assert!(!event.is_due(14_999));
        assert!(event.is_due(15_000));
    }

    #[test]
    fn steps_sum_to_the_full_effect() {
        // Arrange
        let mut market = Market::new(MarketParams::deterministic(), 0);
        let mut event = crash();
        let mut applied = 0.0;

        // Act
        for n in 1..=20 {
            let now = n * 15_000;
            assert!(event.is_due(now));
            applied += event.step(&mut market, now).supply;
        }

        // Assert
        assert!(event.is_complete());
        assert!(!event.is_due(u64::MAX));
        assert!((applied - -0.32).abs() < 1e-9);
        assert!((event.accumulated_supply_effect() - -0.32).abs() < 1e-9);
        assert!((event.accumulated_demand_effect() - -0.2).abs() < 1e-9);
    }

    #[test]
    fn steps_lower_target_supply() {
        let mut market = Market::new(MarketParams::deterministic(), 0);
        let before = market.entry(Resource::Energy).unwrap().supply;
        let mut event = crash();

        for n in 1..=10 {
            event.step(&mut market, n * 15_000);
        }

        assert!(market.entry(Resource::Energy).unwrap().supply < before);
        assert_eq!(event.progress().current_step, 10);
    }

    #[test]
    fn finalized_record_carries_the_totals() {
        let mut market = Market::new(MarketParams::deterministic(), 0);
        let mut event = crash();
        for n in 1..=20 {
            event.step(&mut market, n * 15_000);
        }

        let record = event.finalize(&market, 300_000);

        assert_eq!(record.duration_ms, 300_000);
        assert_eq!(record.market, market.snapshot());
        assert!((record.accumulated_supply_effect - -0.32).abs() < 1e-9);
    }
}
