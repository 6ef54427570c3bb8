// src/simulation/collaborators.rs

//! Seams to the outside world. The orchestrator calls these after a tick has
//! committed and only logs what they return.

use super::summary::{ActionRecord, PriceSnapshot, TickSummary, TransactionRecord};
use crate::agents::AgentId;
use crate::error::{AgentError, SinkError, TickError};
use crate::events::FinalizedEvent;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::warn;

/// Durable storage for trades, prices and finished events.
pub trait PersistenceSink: Send {
    fn save_transaction(&self, record: &TransactionRecord) -> Result<(), SinkError>;
    fn save_price_snapshot(&self, snapshot: &PriceSnapshot) -> Result<(), SinkError>;
    fn save_event_record(&self, event: &FinalizedEvent) -> Result<(), SinkError>;
}

/// Fan-out to whoever is listening (websocket, log shipper, ...).
pub trait TickPublisher: Send {
    fn publish_tick(&self, summary: &TickSummary) -> Result<(), SinkError>;
    fn publish_action(&self, record: &ActionRecord) -> Result<(), SinkError>;
}

/// Diagnostics hooks. All default to no-ops.
pub trait SimulationObserver: Send {
    fn on_agent_error(&self, _agent: AgentId, _error: &AgentError) {}
    fn on_tick_failed(&self, _tick: u64, _error: &TickError) {}
    fn on_event_finalized(&self, _event: &FinalizedEvent) {}
}

/// Drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl PersistenceSink for NullSink {
    fn save_transaction(&self, _record: &TransactionRecord) -> Result<(), SinkError> {
        Ok(())
    }

    fn save_price_snapshot(&self, _snapshot: &PriceSnapshot) -> Result<(), SinkError> {
        Ok(())
    }

    fn save_event_record(&self, _event: &FinalizedEvent) -> Result<(), SinkError> {
        Ok(())
    }
}

impl TickPublisher for NullSink {
    fn publish_tick(&self, _summary: &TickSummary) -> Result<(), SinkError> {
        Ok(())
    }

    fn publish_action(&self, _record: &ActionRecord) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Reports problems through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl SimulationObserver for TracingObserver {
    fn on_agent_error(&self, agent: AgentId, error: &AgentError) {
        warn!(%agent, %error, "agent fell back to hold");
    }
}

#[derive(Debug, Clone, Default)]
pub struct Recorded {
    pub transactions: Vec<TransactionRecord>,
    pub snapshots: Vec<PriceSnapshot>,
    pub events: Vec<FinalizedEvent>,
    pub ticks: Vec<TickSummary>,
    pub actions: Vec<ActionRecord>,
    pub agent_errors: Vec<(AgentId, String)>,
    pub tick_failures: Vec<(u64, String)>,
}

/// Keeps everything in memory. Clones share the same log, so one clone can
/// be handed to the simulation and another kept for reading.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    inner: Arc<Mutex<Recorded>>,
    failing: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that rejects every write. Observer hooks still record.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn recorded(&self) -> Recorded {
        self.inner.lock().clone()
    }

    pub fn ticks(&self) -> Vec<TickSummary> {
        self.inner.lock().ticks.clone()
    }

    pub fn events(&self) -> Vec<FinalizedEvent> {
        self.inner.lock().events.clone()
    }

    pub fn clear(&self) {
        *self.inner.lock() = Recorded::default();
    }

    fn write(&self, f: impl FnOnce(&mut Recorded)) -> Result<(), SinkError> {
        if self.failing {
            return Err(SinkError::Unavailable("recording sink is failing".into()));
        }
        f(&mut self.inner.lock());
        Ok(())
    }
}

impl PersistenceSink for RecordingSink {
    fn save_transaction(&self, record: &TransactionRecord) -> Result<(), SinkError> {
        self.write(|r| r.transactions.push(record.clone()))
    }

    fn save_price_snapshot(&self, snapshot: &PriceSnapshot) -> Result<(), SinkError> {
        self.write(|r| r.snapshots.push(snapshot.clone()))
    }

    fn save_event_record(&self, event: &FinalizedEvent) -> Result<(), SinkError> {
        self.write(|r| r.events.push(event.clone()))
    }
}

impl TickPublisher for RecordingSink {
    fn publish_tick(&self, summary: &TickSummary) -> Result<(), SinkError> {
        self.write(|r| r.ticks.push(summary.clone()))
    }

    fn publish_action(&self, record: &ActionRecord) -> Result<(), SinkError> {
        self.write(|r| r.actions.push(record.clone()))
    }
}

impl SimulationObserver for RecordingSink {
    fn on_agent_error(&self, agent: AgentId, error: &AgentError) {
        self.inner.lock().agent_errors.push((agent, error.to_string()));
    }

    fn on_tick_failed(&self, tick: u64, error: &TickError) {
        self.inner.lock().tick_failures.push((tick, error.to_string()));
    }
}
