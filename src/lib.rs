// src/lib.rs

// === 1. Declare all the top-level modules ===
pub mod agents;
pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod market;
pub mod simulation;
pub mod types;

// === 2. Re-export the public-facing components to create a clean API ===

// --- From `agents` ---
pub use agents::{
    Agent, AgentId, AgentKind, Decision, DecisionTrace, HeuristicAgent, LearningAgent, MarketView,
    Observable, StrategyConfig, StrategyVariant,
};

// --- From our `market` engine ---
pub use market::cycle::{CycleMultipliers, CyclePhase, EconomicCycle, PhaseTransition};
pub use market::{Fill, Market, MarketEntry};

// --- From `events` ---
pub use events::{EasingKind, EventId, EventScheduler, EventTemplate, FinalizedEvent};

// --- From `simulation` ---
pub use simulation::{
    ActionRecord, SimulationContext, SimulationHandle, TickSummary, TriggerResponse,
};

// --- Plumbing ---
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::SimulationConfig;
pub use error::{TickError, TradeError, TriggerRejected};
pub use types::{Action, Portfolio, Resource, Side};
