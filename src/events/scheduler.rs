// src/events/scheduler.rs

use super::progressive::{EventId, EventProgress, FinalizedEvent, ProgressiveEvent};
use super::template::{EventTemplate, catalog};
use crate::config::EventConfig;
use crate::error::TriggerRejected;
use crate::market::Market;
use std::collections::BTreeMap;
use tracing::info;

/// A trigger that went through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerAccepted {
    pub event_id: EventId,
    /// Time until the event finalizes if the tick loop keeps up.
    pub eta_ms: u64,
}

/// Owns the in-flight events and the admin cooldown.
#[derive(Debug, Clone)]
pub struct EventScheduler {
    templates: BTreeMap<String, EventTemplate>,
    cooldown_ms: u64,
    last_trigger_at_ms: Option<u64>,
    next_id: u64,
    active: Vec<ProgressiveEvent>,
}

impl EventScheduler {
    /// Scheduler over the built-in catalog.
    pub fn new(config: EventConfig) -> Self {
        Self::with_templates(catalog().values().cloned(), config)
    }

    pub fn with_templates(
        templates: impl IntoIterator<Item = EventTemplate>,
        config: EventConfig,
    ) -> Self {
        Self {
            templates: templates.into_iter().map(|t| (t.id.clone(), t)).collect(),
            cooldown_ms: config.cooldown_ms,
            last_trigger_at_ms: None,
            next_id: 1,
            active: Vec::new(),
        }
    }

    /// Adds or replaces a template.
    pub fn register_template(&mut self, template: EventTemplate) {
        self.templates.insert(template.id.clone(), template);
    }

    pub fn templates(&self) -> impl Iterator<Item = &EventTemplate> {
        self.templates.values()
    }

    /// Milliseconds until a new trigger is accepted; 0 when none is pending.
    pub fn cooldown_remaining(&self, now_ms: u64) -> u64 {
        self.last_trigger_at_ms.map_or(0, |at| {
            (at + self.cooldown_ms).saturating_sub(now_ms)
        })
    }

    /// Starts a new event from `template_id`. Rejections never queue.
    pub fn trigger(&mut self, template_id: &str, now_ms: u64) -> Result<TriggerAccepted, TriggerRejected> {
        let template = self
            .templates
            .get(template_id)
            .ok_or_else(|| TriggerRejected::UnknownTemplate(template_id.to_owned()))?;

        let remaining_ms = self.cooldown_remaining(now_ms);
        if remaining_ms > 0 {
            return Err(TriggerRejected::Cooldown { remaining_ms });
        }

        let event_id = EventId(self.next_id);
        self.next_id += 1;
        let eta_ms = template.expected_duration_ms();
        self.active
            .push(ProgressiveEvent::from_template(event_id, template, now_ms));
        self.last_trigger_at_ms = Some(now_ms);

        info!(event = %event_id, template = template_id, eta_ms, "event triggered");
        Ok(TriggerAccepted { event_id, eta_ms })
    }

    /// Steps every due event once and returns the ones that just finished,
    /// in trigger order.
    pub fn advance(&mut self, now_ms: u64, market: &mut Market) -> Vec<FinalizedEvent> {
        for event in self.active.iter_mut().filter(|e| e.is_due(now_ms)) {
            event.step(market, now_ms);
        }

        let (done, running): (Vec<_>, Vec<_>) = std::mem::take(&mut self.active)
            .into_iter()
            .partition(ProgressiveEvent::is_complete);
        self.active = running;

        done.into_iter()
            .map(|event| {
                let record = event.finalize(market, now_ms);
                info!(
                    event = %record.id,
                    template = %record.template_id,
                    supply = record.accumulated_supply_effect,
                    demand = record.accumulated_demand_effect,
                    duration_ms = record.duration_ms,
                    "event finalized"
                );
                record
            })
            .collect()
    }

    pub fn active(&self) -> &[ProgressiveEvent] {
        &self.active
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn progress(&self) -> Vec<EventProgress> {
        self.active.iter().map(ProgressiveEvent::progress).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MarketParams;
    use crate::events::easing::EasingKind;
    use crate::types::Resource;

    fn scheduler() -> EventScheduler {
        EventScheduler::new(EventConfig::default())
    }

    #[test]
    fn second_trigger_inside_cooldown_is_rejected() {
        // Arrange
        let mut events = scheduler();

        // Act
        let first = events.trigger("drought", 1_000);
        let second = events.trigger("harvest_boom", 11_000);
        let third = events.trigger("harvest_boom", 31_000);

        // Assert
        assert_eq!(first.unwrap().eta_ms, 120_000);
        assert_eq!(
            second,
            Err(TriggerRejected::Cooldown {
                remaining_ms: 20_000
            })
        );
        assert!(third.is_ok());
        assert_eq!(events.active_count(), 2);
    }

    #[test]
    fn unknown_template_is_rejected_without_starting_cooldown() {
        let mut events = scheduler();

        let rejected = events.trigger("alien_invasion", 0);

        assert_eq!(
            rejected,
            Err(TriggerRejected::UnknownTemplate("alien_invasion".into()))
        );
        assert_eq!(events.cooldown_remaining(0), 0);
        assert!(events.trigger("drought", 0).is_ok());
    }

    #[test]
    fn events_step_at_most_once_per_advance() {
        let mut events = scheduler();
        let mut market = Market::new(MarketParams::deterministic(), 0);
        events.trigger("market_crash", 0).unwrap();

        // Far past several step durations: still a single step.
        assert!(events.advance(100_000, &mut market).is_empty());
        assert_eq!(events.active()[0].current_step(), 1);

        // Not due again yet.
        events.advance(110_000, &mut market);
        assert_eq!(events.active()[0].current_step(), 1);
    }

    #[test]
    fn finished_events_leave_the_active_set() {
        let mut events = EventScheduler::with_templates(
            [EventTemplate {
                id: "blip".into(),
                target_resources: vec![Resource::Water],
                total_steps: 3,
                step_duration_ms: 100,
                peak_intensity: 1.0,
                supply_effect: 0.3,
                demand_effect: 0.0,
                easing: EasingKind::Linear,
            }],
            EventConfig { cooldown_ms: 0 },
        );
        let mut market = Market::new(MarketParams::deterministic(), 0);
        events.trigger("blip", 0).unwrap();

        let mut finalized = Vec::new();
        for n in 1..=3 {
            finalized.extend(events.advance(n * 100, &mut market));
        }

        assert_eq!(events.active_count(), 0);
        assert_eq!(finalized.len(), 1);
        assert_eq!(finalized[0].template_id, "blip");
        assert!((finalized[0].accumulated_supply_effect - 0.3).abs() < 1e-12);
    }
}
