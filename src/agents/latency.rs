// src/agents/latency.rs

//! Agent reaction windows (in milliseconds of clock time).
//! This models throttled reaction time, not synchronization: a heuristic bot
//! that acted recently simply holds until its window has passed.

/// The quickest a heuristic bot will act again after a decision.
pub const HEURISTIC_PATIENCE_MIN_MS: u64 = 10_000;

/// The slowest.
pub const HEURISTIC_PATIENCE_MAX_MS: u64 = 40_000;
