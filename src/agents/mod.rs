// src/agents/mod.rs

pub mod action_space;
pub mod agent_trait;
pub mod agent_type;
pub mod config;
pub mod heuristic_agent;
pub mod latency;
pub mod learning_agent;
pub mod replay;
pub mod reward;
pub mod state_key;
pub mod strategy;
pub mod value_table;

pub use agent_trait::{Agent, Decision, DecisionTrace, MarketView, Observable, TradeOutcome};
pub use agent_type::{AgentId, AgentKind};
pub use heuristic_agent::{HeuristicAgent, Personality, Sentiment};
pub use learning_agent::LearningAgent;
pub use strategy::{RewardShaping, StrategyConfig, StrategyVariant, UnknownStrategy};
