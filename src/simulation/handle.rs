// src/simulation/handle.rs

use super::context::SimulationContext;
use super::summary::{AgentInspection, TickSummary, TriggerResponse};
use crate::agents::AgentId;
use crate::error::TickError;
use crate::events::EventProgress;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info};

/// Shared access to one [`SimulationContext`]. Admin calls and the ticker
/// take the same lock, so a trigger never lands in the middle of a tick.
#[derive(Clone)]
pub struct SimulationHandle {
    inner: Arc<Mutex<SimulationContext>>,
}

impl SimulationHandle {
    pub fn new(context: SimulationContext) -> Self {
        Self {
            inner: Arc::new(Mutex::new(context)),
        }
    }

    pub fn tick(&self) -> Result<Option<TickSummary>, TickError> {
        self.inner.lock().tick()
    }

    /// Runs `f` with exclusive access to the context.
    pub fn with<R>(&self, f: impl FnOnce(&mut SimulationContext) -> R) -> R {
        f(&mut self.inner.lock())
    }

    pub fn trigger_event(&self, template_id: &str) -> TriggerResponse {
        self.inner.lock().trigger_event(template_id)
    }

    pub fn inspect(&self, id: AgentId) -> Option<AgentInspection> {
        self.inner.lock().inspect(id)
    }

    pub fn active_events(&self) -> Vec<EventProgress> {
        self.inner.lock().active_events()
    }

    pub fn pause(&self) {
        self.inner.lock().pause();
    }

    pub fn resume(&self) {
        self.inner.lock().resume();
    }

    pub fn tick_count(&self) -> u64 {
        self.inner.lock().tick_count()
    }

    /// Starts a background thread that ticks once per `interval` until the
    /// returned [`Ticker`] is stopped or dropped. Failed ticks are already
    /// rolled back and reported by the context; the loop keeps going.
    pub fn spawn_ticker(&self, interval: Duration) -> Ticker {
        let (stop, stopped) = mpsc::channel::<()>();
        let handle = self.clone();
        let thread = thread::spawn(move || {
            info!(interval_ms = interval.as_millis() as u64, "ticker started");
            loop {
                match stopped.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        if let Err(err) = handle.tick() {
                            debug!(%err, "ticker continuing after failed tick");
                        }
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            info!("ticker stopped");
        });
        Ticker {
            stop: Some(stop),
            thread: Some(thread),
        }
    }
}

/// The external timer driving [`SimulationHandle::tick`].
pub struct Ticker {
    stop: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl Ticker {
    /// Stops the loop and waits for the in-flight tick, if any.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.shutdown();
    }
}
