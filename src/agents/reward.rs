// src/agents/reward.rs

//! Reward for one completed decision cycle.

use super::config::NET_WORTH_EPSILON;
use super::strategy::RewardShaping;
use crate::config::RewardConfig;
use crate::types::Action;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RewardInputs {
    pub action: Action,
    /// False when the market rejected the action.
    pub executed: bool,
    pub net_worth_before: f64,
    pub net_worth_after: f64,
    /// Demand/supply ratio of the traded resource when the decision was made.
    pub demand_supply_ratio: Option<f64>,
}

/// `Δnet_worth × scale`, then:
/// - rejected actions earn exactly 0,
/// - `Hold` pays `hold_penalty` on top,
/// - a trade that moved net worth by nothing is a wasted action,
/// - otherwise the strategy's shaping terms apply.
pub fn compute_reward(inputs: &RewardInputs, shaping: &RewardShaping, cfg: &RewardConfig) -> f64 {
    if !inputs.executed {
        return 0.0;
    }

    let delta = inputs.net_worth_after - inputs.net_worth_before;
    let base = delta * cfg.scale;

    if inputs.action.is_hold() {
        return base + cfg.hold_penalty;
    }
    if delta.abs() < NET_WORTH_EPSILON {
        return cfg.wasted_action_penalty;
    }

    let mut reward = if base < 0.0 {
        base * shaping.loss_multiplier
    } else {
        match shaping.large_trade_quantity {
            Some(large) if inputs.action.quantity() >= large => base * shaping.large_win_multiplier,
            _ => base,
        }
    };

    if matches!(inputs.action, Action::Buy { .. })
        && delta > 0.0
        && inputs
            .demand_supply_ratio
            .is_some_and(|ratio| ratio < shaping.contrarian_ratio)
    {
        reward += shaping.contrarian_bonus;
    }

    reward
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::strategy::StrategyVariant;
    use crate::types::Resource;

    fn inputs(action: Action, before: f64, after: f64) -> RewardInputs {
        RewardInputs {
            action,
            executed: true,
            net_worth_before: before,
            net_worth_after: after,
            demand_supply_ratio: Some(1.0),
        }
    }

    fn shaping(v: StrategyVariant) -> RewardShaping {
        v.config().shaping
    }

    #[test]
    fn hold_is_penalized() {
        let r = compute_reward(
            &inputs(Action::Hold, 100.0, 100.0),
            &shaping(StrategyVariant::Adaptive),
            &RewardConfig::default(),
        );
        assert!((r - -0.1).abs() < 1e-12);
    }

    #[test]
    fn trade_with_no_effect_is_wasted() {
        let r = compute_reward(
            &inputs(Action::buy(Resource::Water, 5), 100.0, 100.0),
            &shaping(StrategyVariant::Adaptive),
            &RewardConfig::default(),
        );
        assert_eq!(r, -1.0);
    }

    #[test]
    fn rejected_action_earns_nothing() {
        let mut i = inputs(Action::buy(Resource::Water, 5), 100.0, 50.0);
        i.executed = false;
        let r = compute_reward(&i, &shaping(StrategyVariant::Adaptive), &RewardConfig::default());
        assert_eq!(r, 0.0);
    }

    #[test]
    fn conservative_losses_outweigh_equal_gains() {
        let cfg = RewardConfig::default();
        let s = shaping(StrategyVariant::Conservative);
        let gain = compute_reward(&inputs(Action::buy(Resource::Food, 5), 100.0, 150.0), &s, &cfg);
        let loss = compute_reward(&inputs(Action::buy(Resource::Food, 5), 100.0, 50.0), &s, &cfg);
        assert!(loss.abs() > gain.abs());
    }

    #[test]
    fn aggressive_large_wins_are_amplified() {
        let cfg = RewardConfig::default();
        let s = shaping(StrategyVariant::Aggressive);
        let small = compute_reward(&inputs(Action::buy(Resource::Food, 5), 0.0, 100.0), &s, &cfg);
        let large = compute_reward(&inputs(Action::buy(Resource::Food, 20), 0.0, 100.0), &s, &cfg);
        assert!((small - 1.0).abs() < 1e-12);
        assert!((large - 1.5).abs() < 1e-12);
    }

    #[test]
    fn contrarian_buying_into_weak_demand_earns_bonus() {
        let cfg = RewardConfig::default();
        let s = shaping(StrategyVariant::Contrarian);
        let mut i = inputs(Action::buy(Resource::Energy, 5), 0.0, 100.0);
        i.demand_supply_ratio = Some(0.7);
        let r = compute_reward(&i, &s, &cfg);
        assert!((r - 1.5).abs() < 1e-12);
    }
}
