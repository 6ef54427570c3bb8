// src/config.rs

//! Market-wide bounds, tuning constants and the serde-loadable
//! [`SimulationConfig`].
//!
//! The constants are the defaults; every one of them that callers may want to
//! tune is also a field on one of the config structs below.

use crate::agents::config::{
    EPSILON_DECAY, EPSILON_MIN, HEURISTIC_ACTION_THRESHOLD, HEURISTIC_MEMORY_WINDOW,
    HEURISTIC_QUANTITY_SCALE, HEURISTIC_SENTIMENT_WEIGHT, HOLD_PENALTY, MAX_SAMPLED_ACTIONS,
    REPLAY_BATCH_SIZE, REPLAY_CAPACITY, REPLAY_INTERVAL, REWARD_SCALE, WASTED_ACTION_PENALTY,
};
use crate::agents::latency::{HEURISTIC_PATIENCE_MAX_MS, HEURISTIC_PATIENCE_MIN_MS};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

// --- Market bounds ---
pub const MIN_PRICE: f64 = 1.0;
pub const MAX_PRICE: f64 = 1_000.0;
pub const MIN_SUPPLY: u32 = 10;
pub const MAX_SUPPLY: u32 = 10_000;
pub const MIN_DEMAND: u32 = MIN_SUPPLY;
pub const MAX_DEMAND: u32 = MAX_SUPPLY;

// --- Market dynamics ---
/// How strongly the demand/supply imbalance moves price each tick.
pub const BASE_SENSITIVITY: f64 = 0.1;
/// Half-width of the uniform price noise term (±4%).
pub const PRICE_NOISE_AMPLITUDE: f64 = 0.04;
/// Bound on the random per-tick supply/demand jitter, in units.
pub const DRIFT_AMPLITUDE: f64 = 5.0;
/// Fraction of `level × (multiplier − 1)` applied every tick by the cycle.
pub const CYCLE_DRIFT_RATE: f64 = 0.01;
/// A trade of `q` units moves demand by `floor(q × DEMAND_IMPACT_RATIO)`.
pub const DEMAND_IMPACT_RATIO: f64 = 0.1;
/// Decimal places kept when a new price is rounded. `0` rounds to whole
/// units, which freezes any price whose relative move is below `0.5 / price`.
pub const PRICE_DECIMALS: u32 = 2;

// --- Economic cycle ---
pub const PHASE_MIN_TICKS: u32 = 30;
pub const PHASE_MAX_TICKS: u32 = 60;

// --- Events ---
pub const EVENT_COOLDOWN_MS: u64 = 30_000;

// --- Driver ---
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 2_000;
pub const DEFAULT_STARTING_CASH: f64 = 10_000.0;
pub const DEFAULT_STARTING_HOLDINGS: u32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketParams {
    pub base_sensitivity: f64,
    pub noise_amplitude: f64,
    pub drift_amplitude: f64,
    pub cycle_drift_rate: f64,
    pub price_decimals: u32,
}

impl Default for MarketParams {
    fn default() -> Self {
        Self {
            base_sensitivity: BASE_SENSITIVITY,
            noise_amplitude: PRICE_NOISE_AMPLITUDE,
            drift_amplitude: DRIFT_AMPLITUDE,
            cycle_drift_rate: CYCLE_DRIFT_RATE,
            price_decimals: PRICE_DECIMALS,
        }
    }
}

impl MarketParams {
    /// No random terms at all; only the deterministic formula parts remain.
    pub fn deterministic() -> Self {
        Self {
            noise_amplitude: 0.0,
            drift_amplitude: 0.0,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PhaseDuration {
    Fixed { ticks: u32 },
    Range { min: u32, max: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseOrder {
    /// expansion → peak → contraction → trough → expansion …
    Sequential,
    /// Uniform choice among the three other phases.
    Random,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CycleConfig {
    pub duration: PhaseDuration,
    pub order: PhaseOrder,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            duration: PhaseDuration::Range {
                min: PHASE_MIN_TICKS,
                max: PHASE_MAX_TICKS,
            },
            order: PhaseOrder::Sequential,
        }
    }
}

/// Reward constants shared by every learning strategy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    pub scale: f64,
    pub hold_penalty: f64,
    pub wasted_action_penalty: f64,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            scale: REWARD_SCALE,
            hold_penalty: HOLD_PENALTY,
            wasted_action_penalty: WASTED_ACTION_PENALTY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeuristicConfig {
    pub action_threshold: f64,
    pub memory_window: usize,
    pub patience_min_ms: u64,
    pub patience_max_ms: u64,
    pub quantity_scale: f64,
    pub sentiment_weight: f64,
}

impl Default for HeuristicConfig {
    fn default() -> Self {
        Self {
            action_threshold: HEURISTIC_ACTION_THRESHOLD,
            memory_window: HEURISTIC_MEMORY_WINDOW,
            patience_min_ms: HEURISTIC_PATIENCE_MIN_MS,
            patience_max_ms: HEURISTIC_PATIENCE_MAX_MS,
            quantity_scale: HEURISTIC_QUANTITY_SCALE,
            sentiment_weight: HEURISTIC_SENTIMENT_WEIGHT,
        }
    }
}

/// Bookkeeping knobs for the learning agents. Per-strategy α/γ/ε live in
/// [`crate::agents::StrategyConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningConfig {
    pub epsilon_decay: f64,
    pub epsilon_min: f64,
    pub max_sampled_actions: usize,
    pub replay_capacity: usize,
    pub replay_batch_size: usize,
    /// Replay every N decisions; 0 disables replay.
    pub replay_interval: u64,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            epsilon_decay: EPSILON_DECAY,
            epsilon_min: EPSILON_MIN,
            max_sampled_actions: MAX_SAMPLED_ACTIONS,
            replay_capacity: REPLAY_CAPACITY,
            replay_batch_size: REPLAY_BATCH_SIZE,
            replay_interval: REPLAY_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventConfig {
    pub cooldown_ms: u64,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: EVENT_COOLDOWN_MS,
        }
    }
}

/// Everything needed to build a [`crate::SimulationContext`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Master seed; `None` draws one from the OS.
    pub seed: Option<u64>,
    pub tick_interval_ms: u64,
    pub starting_cash: f64,
    pub starting_holdings: u32,
    pub market: MarketParams,
    pub cycle: CycleConfig,
    pub reward: RewardConfig,
    pub heuristic: HeuristicConfig,
    pub learning: LearningConfig,
    pub events: EventConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: None,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            starting_cash: DEFAULT_STARTING_CASH,
            starting_holdings: DEFAULT_STARTING_HOLDINGS,
            market: MarketParams::default(),
            cycle: CycleConfig::default(),
            reward: RewardConfig::default(),
            heuristic: HeuristicConfig::default(),
            learning: LearningConfig::default(),
            events: EventConfig::default(),
        }
    }
}

impl SimulationConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}
