// src/simulation/summary.rs

//! Plain data handed to publishers, persistence and admin callers.

use crate::agents::{AgentId, AgentKind, DecisionTrace, StrategyVariant};
use crate::error::TriggerRejected;
use crate::events::{EventId, FinalizedEvent, TriggerAccepted};
use crate::market::cycle::{CyclePhase, PhaseTransition};
use crate::market::{Fill, MarketEntry};
use crate::types::{Action, Portfolio, Resource};
use serde::Serialize;
use std::collections::BTreeMap;

/// What one agent did during a tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionRecord {
    pub tick: u64,
    pub agent_id: AgentId,
    pub agent_name: String,
    pub kind: AgentKind,
    pub action: Action,
    pub executed: bool,
    pub fill: Option<Fill>,
    /// Price of the traded resource right after the action.
    pub resulting_price: Option<f64>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickSummary {
    pub tick: u64,
    pub now_ms: u64,
    pub market: BTreeMap<Resource, MarketEntry>,
    pub active_event_count: usize,
    pub cycle_phase: CyclePhase,
    pub phase_transition: Option<PhaseTransition>,
    pub agent_actions: Vec<ActionRecord>,
    pub finalized_events: Vec<EventId>,
}

/// `SaveTransaction(agentId, action, resultingPrice, tick)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionRecord {
    pub tick: u64,
    pub agent_id: AgentId,
    pub action: Action,
    pub resulting_price: f64,
}

/// `SavePriceSnapshot(market, tick, cyclePhase)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSnapshot {
    pub tick: u64,
    pub cycle_phase: CyclePhase,
    pub market: BTreeMap<Resource, MarketEntry>,
}

/// Read-only view of one agent for dashboards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentInspection {
    pub id: AgentId,
    pub name: String,
    pub kind: AgentKind,
    pub strategy: StrategyVariant,
    pub portfolio: Portfolio,
    pub net_worth: f64,
    pub epsilon: Option<f64>,
    pub value_table_size: Option<usize>,
    pub last_action: Option<Action>,
    pub last_reward: Option<f64>,
    pub trace: DecisionTrace,
}

/// Transport-friendly result of an admin trigger. On success `eta_ms` is the
/// time until the event completes; on a cooldown rejection it is the time
/// until a retry would be accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TriggerResponse {
    pub ok: bool,
    pub eta_ms: Option<u64>,
    pub reason: Option<String>,
    pub event_id: Option<EventId>,
}

impl From<Result<TriggerAccepted, TriggerRejected>> for TriggerResponse {
    fn from(result: Result<TriggerAccepted, TriggerRejected>) -> Self {
        match result {
            Ok(accepted) => TriggerResponse {
                ok: true,
                eta_ms: Some(accepted.eta_ms),
                reason: None,
                event_id: Some(accepted.event_id),
            },
            Err(rejected) => TriggerResponse {
                ok: false,
                eta_ms: match rejected {
                    TriggerRejected::Cooldown { remaining_ms } => Some(remaining_ms),
                    TriggerRejected::UnknownTemplate(_) => None,
                },
                reason: Some(rejected.to_string()),
                event_id: None,
            },
        }
    }
}

/// Everything a successful tick hands to the collaborators, held back until
/// the tick commits.
#[derive(Debug, Clone)]
pub(crate) struct StagedTick {
    pub summary: TickSummary,
    pub transactions: Vec<TransactionRecord>,
    pub snapshot: PriceSnapshot,
    pub finalized: Vec<FinalizedEvent>,
    pub agent_errors: Vec<(AgentId, crate::error::AgentError)>,
}
