// src/simulation/mod.rs

pub mod collaborators;
pub mod context;
pub mod handle;
pub mod summary;

pub use collaborators::{
    NullSink, PersistenceSink, Recorded, RecordingSink, SimulationObserver, TickPublisher,
    TracingObserver,
};
pub use context::SimulationContext;
pub use handle::{SimulationHandle, Ticker};
pub use summary::{
    ActionRecord, AgentInspection, PriceSnapshot, TickSummary, TransactionRecord, TriggerResponse,
};
