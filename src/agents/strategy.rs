// src/agents/strategy.rs

//! Strategy variants expressed as data: one row of learning rate, discount,
//! exploration and reward shaping per variant.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyVariant {
    Aggressive,
    Conservative,
    Adaptive,
    Contrarian,
}

impl StrategyVariant {
    pub const ALL: [StrategyVariant; 4] = [
        StrategyVariant::Aggressive,
        StrategyVariant::Conservative,
        StrategyVariant::Adaptive,
        StrategyVariant::Contrarian,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StrategyVariant::Aggressive => "aggressive",
            StrategyVariant::Conservative => "conservative",
            StrategyVariant::Adaptive => "adaptive",
            StrategyVariant::Contrarian => "contrarian",
        }
    }

    pub fn config(self) -> StrategyConfig {
        StrategyConfig::for_variant(self)
    }
}

impl fmt::Display for StrategyVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown strategy `{0}`")]
pub struct UnknownStrategy(pub String);

impl FromStr for StrategyVariant {
    type Err = UnknownStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StrategyVariant::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownStrategy(s.to_string()))
    }
}

/// Variant-specific adjustments on top of the base `Δnet_worth × scale`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RewardShaping {
    /// Trades at least this large that made money are multiplied by
    /// `large_win_multiplier`.
    pub large_trade_quantity: Option<u32>,
    pub large_win_multiplier: f64,
    /// Applied to negative rewards; > 1 makes losses hurt more than equal gains help.
    pub loss_multiplier: f64,
    /// Buying below this demand/supply ratio and gaining earns `contrarian_bonus`.
    pub contrarian_ratio: f64,
    pub contrarian_bonus: f64,
}

impl RewardShaping {
    pub const NEUTRAL: RewardShaping = RewardShaping {
        large_trade_quantity: None,
        large_win_multiplier: 1.0,
        loss_multiplier: 1.0,
        contrarian_ratio: 0.8,
        contrarian_bonus: 0.0,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// α
    pub learning_rate: f64,
    /// γ
    pub discount: f64,
    pub epsilon_start: f64,
    pub shaping: RewardShaping,
}

impl StrategyConfig {
    pub fn for_variant(variant: StrategyVariant) -> Self {
        match variant {
            StrategyVariant::Aggressive => Self {
                learning_rate: 0.15,
                discount: 0.9,
                epsilon_start: 0.4,
                shaping: RewardShaping {
                    large_trade_quantity: Some(15),
                    large_win_multiplier: 1.5,
                    ..RewardShaping::NEUTRAL
                },
            },
            StrategyVariant::Conservative => Self {
                learning_rate: 0.05,
                discount: 0.98,
                epsilon_start: 0.2,
                shaping: RewardShaping {
                    loss_multiplier: 2.0,
                    ..RewardShaping::NEUTRAL
                },
            },
            StrategyVariant::Adaptive => Self {
                learning_rate: 0.1,
                discount: 0.95,
                epsilon_start: 0.3,
                shaping: RewardShaping::NEUTRAL,
            },
            StrategyVariant::Contrarian => Self {
                learning_rate: 0.08,
                discount: 0.92,
                epsilon_start: 0.25,
                shaping: RewardShaping {
                    contrarian_ratio: 0.8,
                    contrarian_bonus: 0.5,
                    ..RewardShaping::NEUTRAL
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variant_table_matches_published_rates() {
        let rates: Vec<(f64, f64)> = StrategyVariant::ALL
            .iter()
            .map(|v| (v.config().learning_rate, v.config().discount))
            .collect();
        assert_eq!(rates, vec![(0.15, 0.9), (0.05, 0.98), (0.1, 0.95), (0.08, 0.92)]);
    }

    #[test]
    fn parses_variant_names() {
        assert_eq!("Contrarian".parse(), Ok(StrategyVariant::Contrarian));
        assert!("yolo".parse::<StrategyVariant>().is_err());
    }
}
