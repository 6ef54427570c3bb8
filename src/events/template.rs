// src/events/template.rs

use super::easing::EasingKind;
use crate::types::Resource;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A named shock an admin can trigger. Effects are fractional: `-0.4` means
/// "remove 40% of supply at full intensity".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventTemplate {
    pub id: String,
    pub target_resources: Vec<Resource>,
    pub total_steps: u32,
    pub step_duration_ms: u64,
    pub peak_intensity: f64,
    pub supply_effect: f64,
    pub demand_effect: f64,
    pub easing: EasingKind,
}

impl EventTemplate {
    /// Wall-clock time from trigger to finalization.
    pub fn expected_duration_ms(&self) -> u64 {
        u64::from(self.total_steps) * self.step_duration_ms
    }
}

static CATALOG: Lazy<BTreeMap<String, EventTemplate>> = Lazy::new(|| {
    let all = Resource::ALL.to_vec();
    [
        EventTemplate {
            id: "market_crash".into(),
            target_resources: all,
            total_steps: 20,
            step_duration_ms: 15_000,
            peak_intensity: 0.8,
            supply_effect: -0.4,
            demand_effect: -0.25,
            easing: EasingKind::Logistic { steepness: 10.0 },
        },
        EventTemplate {
            id: "drought".into(),
            target_resources: vec![Resource::Water, Resource::Food],
            total_steps: 12,
            step_duration_ms: 10_000,
            peak_intensity: 0.9,
            supply_effect: -0.35,
            demand_effect: 0.1,
            easing: EasingKind::LogSaturating { rate: 9.0 },
        },
        EventTemplate {
            id: "energy_crisis".into(),
            target_resources: vec![Resource::Energy, Resource::Materials],
            total_steps: 15,
            step_duration_ms: 12_000,
            peak_intensity: 0.7,
            supply_effect: -0.3,
            demand_effect: 0.15,
            easing: EasingKind::Exponential { rate: 3.0 },
        },
        EventTemplate {
            id: "harvest_boom".into(),
            target_resources: vec![Resource::Food, Resource::Water],
            total_steps: 10,
            step_duration_ms: 10_000,
            peak_intensity: 0.6,
            supply_effect: 0.4,
            demand_effect: 0.0,
            easing: EasingKind::Linear,
        },
        EventTemplate {
            id: "tech_breakthrough".into(),
            target_resources: vec![Resource::Energy, Resource::Materials],
            total_steps: 24,
            step_duration_ms: 10_000,
            peak_intensity: 1.0,
            supply_effect: 0.3,
            demand_effect: 0.1,
            easing: EasingKind::Piecewise,
        },
    ]
    .into_iter()
    .map(|t| (t.id.clone(), t))
    .collect()
});

/// The built-in templates keyed by id.
pub fn catalog() -> &'static BTreeMap<String, EventTemplate> {
    &CATALOG
}

pub fn template(id: &str) -> Option<&'static EventTemplate> {
    CATALOG.get(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_has_the_documented_crash() {
        let crash = template("market_crash").unwrap();
        assert_eq!(crash.total_steps, 20);
        assert_eq!(crash.step_duration_ms, 15_000);
        assert_eq!(crash.expected_duration_ms(), 300_000);
        assert!((crash.peak_intensity * crash.supply_effect - -0.32).abs() < 1e-12);
    }

    #[test]
    fn every_template_is_usable() {
        assert_eq!(catalog().len(), 5);
        for (id, t) in catalog() {
            assert_eq!(id, &t.id);
            assert!(t.total_steps > 0);
            assert!(!t.target_resources.is_empty());
            assert!(t.peak_intensity > 0.0 && t.peak_intensity <= 1.0);
        }
    }
}
