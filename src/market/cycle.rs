// src/market/cycle.rs

//! The four-phase macro cycle. Each phase scales supply/demand drift and
//! price volatility; a phase change also hits the market once with the new
//! phase's multipliers.

use crate::config::{CycleConfig, PhaseDuration, PhaseOrder};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CyclePhase {
    Expansion,
    Peak,
    Contraction,
    Trough,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CycleMultipliers {
    pub supply: f64,
    pub demand: f64,
    pub price_volatility: f64,
}

impl CycleMultipliers {
    pub const NEUTRAL: CycleMultipliers = CycleMultipliers {
        supply: 1.0,
        demand: 1.0,
        price_volatility: 1.0,
    };
}

impl CyclePhase {
    pub const ALL: [CyclePhase; 4] = [
        CyclePhase::Expansion,
        CyclePhase::Peak,
        CyclePhase::Contraction,
        CyclePhase::Trough,
    ];

    pub fn next(self) -> CyclePhase {
        match self {
            CyclePhase::Expansion => CyclePhase::Peak,
            CyclePhase::Peak => CyclePhase::Contraction,
            CyclePhase::Contraction => CyclePhase::Trough,
            CyclePhase::Trough => CyclePhase::Expansion,
        }
    }

    pub fn multipliers(self) -> CycleMultipliers {
        match self {
            CyclePhase::Expansion => CycleMultipliers {
                supply: 1.08,
                demand: 1.12,
                price_volatility: 1.0,
            },
            CyclePhase::Peak => CycleMultipliers {
                supply: 1.02,
                demand: 1.05,
                price_volatility: 1.3,
            },
            CyclePhase::Contraction => CycleMultipliers {
                supply: 0.95,
                demand: 0.88,
                price_volatility: 1.2,
            },
            CyclePhase::Trough => CycleMultipliers {
                supply: 0.92,
                demand: 0.95,
                price_volatility: 0.8,
            },
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CyclePhase::Expansion => "expansion",
            CyclePhase::Peak => "peak",
            CyclePhase::Contraction => "contraction",
            CyclePhase::Trough => "trough",
        }
    }
}

impl fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseTransition {
    pub from: CyclePhase,
    pub to: CyclePhase,
}

#[derive(Debug, Clone)]
pub struct EconomicCycle {
    phase: CyclePhase,
    ticks_in_phase: u32,
    phase_length: u32,
    config: CycleConfig,
    rng: StdRng,
}

impl EconomicCycle {
    pub fn new(config: CycleConfig, seed: u64) -> Self {
        Self::starting_at(CyclePhase::Expansion, config, seed)
    }

    pub fn starting_at(phase: CyclePhase, config: CycleConfig, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let phase_length = draw_length(&config, &mut rng);
        Self {
            phase,
            ticks_in_phase: 0,
            phase_length,
            config,
            rng,
        }
    }

    pub fn phase(&self) -> CyclePhase {
        self.phase
    }

    pub fn multipliers(&self) -> CycleMultipliers {
        self.phase.multipliers()
    }

    pub fn ticks_in_phase(&self) -> u32 {
        self.ticks_in_phase
    }

    pub fn phase_length(&self) -> u32 {
        self.phase_length
    }

    /// Counts one tick in the current phase and moves on once the phase has
    /// run its length. The caller applies the new phase's step shock.
    pub fn advance(&mut self) -> Option<PhaseTransition> {
        self.ticks_in_phase += 1;
        if self.ticks_in_phase < self.phase_length {
            return None;
        }

        let from = self.phase;
        let to = match self.config.order {
            PhaseOrder::Sequential => from.next(),
            PhaseOrder::Random => {
                let others: Vec<CyclePhase> =
                    CyclePhase::ALL.into_iter().filter(|p| *p != from).collect();
                others.choose(&mut self.rng).copied().unwrap_or_else(|| from.next())
            }
        };

        self.phase = to;
        self.ticks_in_phase = 0;
        self.phase_length = draw_length(&self.config, &mut self.rng);
        info!(%from, %to, length = self.phase_length, "economic cycle transition");
        Some(PhaseTransition { from, to })
    }
}

fn draw_length(config: &CycleConfig, rng: &mut StdRng) -> u32 {
    match config.duration {
        PhaseDuration::Fixed { ticks } => ticks.max(1),
        PhaseDuration::Range { min, max } => {
            let lo = min.max(1);
            let hi = max.max(lo);
            rng.gen_range(lo..=hi)
        }
    }
}
