// src/events/mod.rs

pub mod easing;
pub mod progressive;
pub mod scheduler;
pub mod template;

pub use easing::EasingKind;
pub use progressive::{EventId, EventProgress, FinalizedEvent, ProgressiveEvent, StepDelta};
pub use scheduler::{EventScheduler, TriggerAccepted};
pub use template::EventTemplate;
