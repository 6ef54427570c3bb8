// src/agents/agent_trait.rs

use super::agent_type::{AgentId, AgentKind};
use super::strategy::StrategyVariant;
use crate::error::{AgentError, TradeError};
use crate::market::cycle::CyclePhase;
use crate::market::{Fill, Market, MarketEntry};
use crate::types::{Action, Portfolio, Resource};
use serde::Serialize;
use std::any::Any;

/// A read-only snapshot of the world given to an agent for decision-making.
pub struct MarketView<'a> {
    pub market: &'a Market,
    pub phase: CyclePhase,
    pub tick: u64,
    pub now_ms: u64,
}

impl MarketView<'_> {
    pub fn entry(&self, resource: Resource) -> Option<&MarketEntry> {
        self.market.entry(resource)
    }
}

/// What an agent wants to do this tick. `error` is set when the agent fell
/// back to `Hold` because it could not make sense of the market.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub action: Action,
    pub error: Option<AgentError>,
}

impl Decision {
    pub fn act(action: Action) -> Self {
        Self {
            action,
            error: None,
        }
    }

    pub fn fallback(error: AgentError) -> Self {
        Self {
            action: Action::Hold,
            error: Some(error),
        }
    }
}

pub type TradeOutcome = Result<Option<Fill>, TradeError>;

/// The last decision an agent made, for dashboards and debugging.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DecisionTrace {
    pub tick: u64,
    pub last_action: Option<Action>,
    pub last_reward: Option<f64>,
    /// Heuristic opportunity score of the chosen resource.
    pub last_score: Option<f64>,
    /// Learning agents only: whether the action came from exploration.
    pub explored: Option<bool>,
    pub executed: Option<bool>,
    pub last_error: Option<String>,
}

/// Exposes the last-decision trace.
pub trait Observable {
    fn decision_trace(&self) -> DecisionTrace;
}

/// The core trait that all our participant types will implement.
pub trait Agent: Observable + Send {
    // === Core Decision-Making ===
    /// Called exactly once per tick. Never fails: internal problems come back
    /// as a `Hold` decision carrying the error.
    fn decide(&mut self, view: &MarketView) -> Decision;

    /// The market's verdict on the action returned by `decide`.
    fn record_outcome(&mut self, action: &Action, outcome: &TradeOutcome);

    // === Portfolio ===
    fn portfolio(&self) -> &Portfolio;
    /// Handed to the market only to execute this agent's own action.
    fn portfolio_mut(&mut self) -> &mut Portfolio;

    // === Getters & Housekeeping ===
    fn id(&self) -> AgentId;
    fn name(&self) -> &str;
    fn kind(&self) -> AgentKind;
    fn strategy(&self) -> StrategyVariant;

    fn epsilon(&self) -> Option<f64> {
        None
    }

    fn value_table_size(&self) -> Option<usize> {
        None
    }

    // === Rollback ===
    /// Saves everything `decide` and `record_outcome` can change so that a
    /// failed tick can be undone with [`Agent::restore`]. The default saves
    /// the portfolio only.
    fn checkpoint(&self) -> Box<dyn Any + Send> {
        Box::new(self.portfolio().clone())
    }

    /// Puts back a value produced by this agent's own `checkpoint`.
    fn restore(&mut self, saved: Box<dyn Any + Send>) {
        if let Ok(portfolio) = saved.downcast::<Portfolio>() {
            *self.portfolio_mut() = *portfolio;
        }
    }
}
