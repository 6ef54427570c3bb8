// src/error.rs

//! Error taxonomy for the simulation core. None of these are fatal: each one
//! is handled at the boundary named in its docs.

use crate::types::Resource;

/// A trade that could not be executed. Returned by
/// [`crate::Market::apply_trade`]; the market and portfolio are untouched.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TradeError {
    #[error("quantity must be positive")]
    NonPositiveQuantity,
    #[error("{0} is not traded on this market")]
    UnknownResource(Resource),
    #[error("insufficient cash: need {needed:.2}, have {available:.2}")]
    InsufficientCash { needed: f64, available: f64 },
    #[error("insufficient {resource} supply: requested {requested}, available {available}")]
    InsufficientSupply {
        resource: Resource,
        requested: u32,
        available: u32,
    },
    #[error("insufficient {resource} holdings: requested {requested}, held {held}")]
    InsufficientHoldings {
        resource: Resource,
        requested: u32,
        held: u32,
    },
}

/// The market snapshot handed to an agent could not be discretized.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EncodingError {
    #[error("{0} is missing from the market snapshot")]
    MissingResource(Resource),
    #[error("{0} price is not finite")]
    NonFinitePrice(Resource),
    #[error("{resource} price {price} is not positive")]
    NonPositivePrice { resource: Resource, price: f64 },
}

/// Caught at the agent boundary; the agent holds instead of acting.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AgentError {
    #[error("state encoding failed: {0}")]
    Encoding(#[from] EncodingError),
}

/// An admin trigger that was refused. This is an expected outcome, not a
/// failure of the simulation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TriggerRejected {
    #[error("event cooldown active, retry in {remaining_ms} ms")]
    Cooldown { remaining_ms: u64 },
    #[error("unknown event template `{0}`")]
    UnknownTemplate(String),
}

/// Anything that aborts one tick. The orchestrator rolls the tick back and
/// keeps going.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TickError {
    #[error("market invariant violated for {resource}: {detail}")]
    InvariantViolation { resource: Resource, detail: String },
    #[error("tick panicked: {0}")]
    Panicked(String),
}

/// Raised by persistence/publishing collaborators. Always swallowed and logged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SinkError {
    #[error("sink unavailable: {0}")]
    Unavailable(String),
    #[error("sink rejected record: {0}")]
    Rejected(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}
