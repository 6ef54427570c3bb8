// src/agents/config.rs

//! A centralized place for tuning agent behavior parameters.
//! These are empirically tuned; override them through `SimulationConfig`
//! rather than editing them here.

// --- HeuristicAgent ---
// Below this |score| the bot holds.
pub const HEURISTIC_ACTION_THRESHOLD: f64 = 0.15;
// Rolling price memory per resource, in observations.
pub const HEURISTIC_MEMORY_WINDOW: usize = 20;
// |score| of 1.0 maps to roughly this many units before personality scaling.
pub const HEURISTIC_QUANTITY_SCALE: f64 = 40.0;
pub const HEURISTIC_SENTIMENT_WEIGHT: f64 = 0.1;
// Aggregate demand/supply ratio needed to flip sentiment, and the band that
// brings it back to neutral.
pub const SENTIMENT_BULLISH_RATIO: f64 = 1.1;
pub const SENTIMENT_BEARISH_RATIO: f64 = 0.9;
pub const SENTIMENT_NEUTRAL_BAND: f64 = 0.03;

// --- LearningAgent: action space ---
pub const ACTION_QUANTITIES: [u32; 6] = [1, 5, 10, 15, 20, 25];
// max_a' Q(s', a') is taken over at most this many sampled actions.
pub const MAX_SAMPLED_ACTIONS: usize = 16;

// --- LearningAgent: exploration ---
pub const EPSILON_DECAY: f64 = 0.995;
pub const EPSILON_MIN: f64 = 0.05;

// --- LearningAgent: reward ---
pub const REWARD_SCALE: f64 = 0.01;
pub const HOLD_PENALTY: f64 = -0.1;
pub const WASTED_ACTION_PENALTY: f64 = -1.0;
// Net-worth changes smaller than this count as "nothing happened".
pub const NET_WORTH_EPSILON: f64 = 1e-6;

// --- LearningAgent: experience replay ---
pub const REPLAY_CAPACITY: usize = 1_000;
pub const REPLAY_BATCH_SIZE: usize = 16;
pub const REPLAY_INTERVAL: u64 = 10;

// --- StateKey discretization (5 buckets each) ---
pub const PRICE_RATIO_THRESHOLDS: [f64; 4] = [0.6, 0.9, 1.1, 1.5];
pub const SUPPLY_THRESHOLDS: [f64; 4] = [250.0, 600.0, 1_000.0, 2_000.0];
pub const DEMAND_THRESHOLDS: [f64; 4] = [250.0, 600.0, 1_000.0, 2_000.0];
pub const HOLDING_THRESHOLDS: [f64; 4] = [1.0, 10.0, 30.0, 60.0];
// Cash relative to the agent's starting cash.
pub const CASH_RATIO_THRESHOLDS: [f64; 4] = [0.25, 0.75, 1.25, 2.0];
