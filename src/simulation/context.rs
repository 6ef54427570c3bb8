// src/simulation/context.rs

use super::collaborators::{
    NullSink, PersistenceSink, SimulationObserver, TickPublisher, TracingObserver,
};
use super::summary::{
    ActionRecord, AgentInspection, PriceSnapshot, StagedTick, TickSummary, TransactionRecord,
    TriggerResponse,
};
use crate::agents::{
    Agent, AgentId, AgentKind, HeuristicAgent, LearningAgent, MarketView, StrategyVariant,
};
use crate::clock::Clock;
use crate::config::SimulationConfig;
use crate::error::{TickError, TriggerRejected};
use crate::events::{EventProgress, EventScheduler, TriggerAccepted};
use crate::market::Market;
use crate::market::cycle::{CyclePhase, EconomicCycle};
use crate::types::Portfolio;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Orchestrator-owned state captured before a tick so a failed tick can be
/// undone.
struct Checkpoint {
    market: Market,
    cycle: EconomicCycle,
    events: EventScheduler,
    agents: Vec<Box<dyn Any + Send>>,
}

/// One simulation run: the market, the cycle, in-flight events, the agent
/// registry and the admin cooldown. Nothing here is global; build one per
/// run and drive it with [`SimulationContext::tick`].
pub struct SimulationContext {
    config: SimulationConfig,
    clock: Arc<dyn Clock>,
    market: Market,
    cycle: EconomicCycle,
    events: EventScheduler,
    /// Registration order is decision order.
    agents: Vec<Box<dyn Agent>>,
    next_agent_id: u64,
    tick: u64,
    paused: bool,
    last_summary: Option<TickSummary>,
    seeder: StdRng,
    persistence: Box<dyn PersistenceSink>,
    publisher: Box<dyn TickPublisher>,
    observer: Box<dyn SimulationObserver>,
}

impl SimulationContext {
    pub fn new(config: SimulationConfig, clock: Arc<dyn Clock>) -> Self {
        let master_seed = config.seed.unwrap_or_else(rand::random);
        let mut seeder = StdRng::seed_from_u64(master_seed);
        let market = Market::new(config.market, seeder.next_u64());
        let cycle = EconomicCycle::new(config.cycle, seeder.next_u64());
        let events = EventScheduler::new(config.events);
        info!(seed = master_seed, "simulation context created");

        Self {
            config,
            clock,
            market,
            cycle,
            events,
            agents: Vec::new(),
            next_agent_id: 1,
            tick: 0,
            paused: false,
            last_summary: None,
            seeder,
            persistence: Box::new(NullSink),
            publisher: Box::new(NullSink),
            observer: Box::new(TracingObserver),
        }
    }

    pub fn with_persistence(mut self, sink: impl PersistenceSink + 'static) -> Self {
        self.persistence = Box::new(sink);
        self
    }

    pub fn with_publisher(mut self, publisher: impl TickPublisher + 'static) -> Self {
        self.publisher = Box::new(publisher);
        self
    }

    pub fn with_observer(mut self, observer: impl SimulationObserver + 'static) -> Self {
        self.observer = Box::new(observer);
        self
    }

    /// Replaces the opening market. Mostly for tests and replays.
    pub fn with_market(mut self, market: Market) -> Self {
        self.market = market;
        self
    }

    pub fn with_cycle(mut self, cycle: EconomicCycle) -> Self {
        self.cycle = cycle;
        self
    }

    pub fn with_scheduler(mut self, events: EventScheduler) -> Self {
        self.events = events;
        self
    }

    // === Accessors ===

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn market(&self) -> &Market {
        &self.market
    }

    pub fn cycle_phase(&self) -> CyclePhase {
        self.cycle.phase()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    pub fn agent_ids(&self) -> Vec<AgentId> {
        self.agents.iter().map(|a| a.id()).collect()
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    // === Agent registry ===

    /// Registers a standard agent with the configured starting portfolio.
    pub fn add_agent(
        &mut self,
        kind: AgentKind,
        name: impl Into<String>,
        variant: StrategyVariant,
    ) -> AgentId {
        let name = name.into();
        let portfolio =
            Portfolio::with_uniform_holdings(self.config.starting_cash, self.config.starting_holdings);
        let heuristic = self.config.heuristic;
        let learning = self.config.learning;
        let reward = self.config.reward;

        self.insert_agent(|id, seed| -> Box<dyn Agent> {
            match kind {
                AgentKind::Heuristic => Box::new(HeuristicAgent::new(
                    id, name, variant, portfolio, heuristic, seed,
                )),
                AgentKind::Learning => Box::new(LearningAgent::new(
                    id, name, variant, portfolio, learning, reward, seed,
                )),
            }
        })
    }

    /// Registers an agent built by `build` from a fresh id and a seed derived
    /// from the master seed.
    pub fn insert_agent(&mut self, build: impl FnOnce(AgentId, u64) -> Box<dyn Agent>) -> AgentId {
        let id = AgentId(self.next_agent_id);
        self.next_agent_id += 1;
        let agent = build(id, self.seeder.next_u64());
        info!(
            agent = %id,
            name = agent.name(),
            kind = ?agent.kind(),
            strategy = %agent.strategy(),
            "agent added"
        );
        self.agents.push(agent);
        id
    }

    /// Returns false when no such agent is registered.
    pub fn remove_agent(&mut self, id: AgentId) -> bool {
        let Some(index) = self.agents.iter().position(|a| a.id() == id) else {
            return false;
        };
        let agent = self.agents.remove(index);
        info!(agent = %id, name = agent.name(), "agent removed");
        true
    }

    pub fn inspect(&self, id: AgentId) -> Option<AgentInspection> {
        let agent = self.agents.iter().find(|a| a.id() == id)?;
        let trace = agent.decision_trace();
        Some(AgentInspection {
            id,
            name: agent.name().to_owned(),
            kind: agent.kind(),
            strategy: agent.strategy(),
            portfolio: agent.portfolio().clone(),
            net_worth: agent.portfolio().net_worth(&self.market),
            epsilon: agent.epsilon(),
            value_table_size: agent.value_table_size(),
            last_action: trace.last_action,
            last_reward: trace.last_reward,
            trace,
        })
    }

    // === Admin ===

    pub fn try_trigger_event(&mut self, template_id: &str) -> Result<TriggerAccepted, TriggerRejected> {
        let now = self.clock.now_ms();
        self.events.trigger(template_id, now).inspect_err(|rejected| {
            warn!(template = template_id, %rejected, "event trigger rejected");
        })
    }

    pub fn trigger_event(&mut self, template_id: &str) -> TriggerResponse {
        self.try_trigger_event(template_id).into()
    }

    pub fn active_events(&self) -> Vec<EventProgress> {
        self.events.progress()
    }

    pub fn pause(&mut self) {
        if !self.paused {
            info!(tick = self.tick, "simulation paused");
        }
        self.paused = true;
    }

    pub fn resume(&mut self) {
        if self.paused {
            info!(tick = self.tick, "simulation resumed");
        }
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    // === The tick ===

    /// Runs one tick: due event steps, then every agent once in registration
    /// order, then drift, then the cycle.
    ///
    /// While paused nothing changes: the last committed summary is published
    /// again and returned as is. `Ok(None)` only when paused before the first
    /// tick.
    ///
    /// On failure the market, cycle, scheduler and every agent are restored
    /// to their pre-tick state, the tick number is not consumed and nothing
    /// reaches the collaborators.
    pub fn tick(&mut self) -> Result<Option<TickSummary>, TickError> {
        if self.paused {
            debug!(tick = self.tick, "paused, re-emitting last summary");
            let Some(last) = self.last_summary.clone() else {
                return Ok(None);
            };
            if let Err(err) = self.publisher.publish_tick(&last) {
                warn!(tick = last.tick, %err, "failed to publish tick summary");
            }
            return Ok(Some(last));
        }

        let tick = self.tick + 1;
        let now = self.clock.now_ms();
        let checkpoint = self.checkpoint();

        let result = panic::catch_unwind(AssertUnwindSafe(|| self.run_tick(tick, now)))
            .unwrap_or_else(|payload| Err(TickError::Panicked(panic_message(payload))));

        match result {
            Ok(staged) => {
                self.tick = tick;
                let summary = staged.summary.clone();
                self.flush(staged);
                self.last_summary = Some(summary.clone());
                Ok(Some(summary))
            }
            Err(err) => {
                self.restore(checkpoint);
                error!(tick, %err, "tick failed, state rolled back");
                self.observer.on_tick_failed(tick, &err);
                Err(err)
            }
        }
    }

    fn run_tick(&mut self, tick: u64, now: u64) -> Result<StagedTick, TickError> {
        let finalized = self.events.advance(now, &mut self.market);

        let mut actions = Vec::with_capacity(self.agents.len());
        let mut transactions = Vec::new();
        let mut agent_errors = Vec::new();
        let phase = self.cycle.phase();

        for agent in self.agents.iter_mut() {
            let decision = {
                let view = MarketView {
                    market: &self.market,
                    phase,
                    tick,
                    now_ms: now,
                };
                agent.decide(&view)
            };
            let outcome = self.market.apply_trade(agent.portfolio_mut(), &decision.action);
            agent.record_outcome(&decision.action, &outcome);

            let resulting_price = decision.action.resource().and_then(|r| self.market.price(r));
            if let Err(err) = &outcome {
                debug!(agent = %agent.id(), action = %decision.action, %err, "trade rejected");
            }
            if let (Ok(Some(_)), Some(price)) = (&outcome, resulting_price) {
                transactions.push(TransactionRecord {
                    tick,
                    agent_id: agent.id(),
                    action: decision.action,
                    resulting_price: price,
                });
            }
            if let Some(err) = decision.error.clone() {
                agent_errors.push((agent.id(), err));
            }

            actions.push(ActionRecord {
                tick,
                agent_id: agent.id(),
                agent_name: agent.name().to_owned(),
                kind: agent.kind(),
                action: decision.action,
                executed: outcome.is_ok(),
                fill: outcome.as_ref().ok().copied().flatten(),
                resulting_price,
                error: outcome.as_ref().err().map(ToString::to_string),
            });
        }

        self.market.advance_tick(self.cycle.multipliers());
        let phase_transition = self.cycle.advance();
        if phase_transition.is_some() {
            self.market.apply_phase_shock(self.cycle.multipliers());
        }

        self.market.check_invariants()?;

        let market = self.market.snapshot();
        let summary = TickSummary {
            tick,
            now_ms: now,
            market: market.clone(),
            active_event_count: self.events.active_count(),
            cycle_phase: self.cycle.phase(),
            phase_transition,
            agent_actions: actions,
            finalized_events: finalized.iter().map(|e| e.id).collect(),
        };
        debug!(
            tick,
            phase = %summary.cycle_phase,
            actions = summary.agent_actions.len(),
            events = summary.active_event_count,
            "tick complete"
        );

        Ok(StagedTick {
            snapshot: PriceSnapshot {
                tick,
                cycle_phase: summary.cycle_phase,
                market,
            },
            summary,
            transactions,
            finalized,
            agent_errors,
        })
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            market: self.market.clone(),
            cycle: self.cycle.clone(),
            events: self.events.clone(),
            agents: self.agents.iter().map(|a| a.checkpoint()).collect(),
        }
    }

    fn restore(&mut self, checkpoint: Checkpoint) {
        self.market = checkpoint.market;
        self.cycle = checkpoint.cycle;
        self.events = checkpoint.events;
        for (agent, saved) in self.agents.iter_mut().zip(checkpoint.agents) {
            agent.restore(saved);
        }
    }

    /// Hands a committed tick to the collaborators. Failures are logged and
    /// dropped.
    fn flush(&self, staged: StagedTick) {
        for (agent, err) in &staged.agent_errors {
            self.observer.on_agent_error(*agent, err);
        }
        for record in &staged.transactions {
            if let Err(err) = self.persistence.save_transaction(record) {
                warn!(tick = record.tick, agent = %record.agent_id, %err, "failed to save transaction");
            }
        }
        if let Err(err) = self.persistence.save_price_snapshot(&staged.snapshot) {
            warn!(tick = staged.snapshot.tick, %err, "failed to save price snapshot");
        }
        for event in &staged.finalized {
            self.observer.on_event_finalized(event);
            if let Err(err) = self.persistence.save_event_record(event) {
                warn!(event = %event.id, %err, "failed to save event record");
            }
        }
        for record in &staged.summary.agent_actions {
            if let Err(err) = self.publisher.publish_action(record) {
                warn!(tick = record.tick, agent = %record.agent_id, %err, "failed to publish action");
            }
        }
        if let Err(err) = self.publisher.publish_tick(&staged.summary) {
            warn!(tick = staged.summary.tick, %err, "failed to publish tick summary");
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{Decision, DecisionTrace, Observable, TradeOutcome};
    use crate::clock::ManualClock;
    use crate::config::{CycleConfig, MarketParams, PhaseDuration};
    use crate::error::{AgentError, EncodingError};
    use crate::simulation::collaborators::RecordingSink;
    use crate::types::{Action, Resource};

    fn config() -> SimulationConfig {
        SimulationConfig {
            market: MarketParams::deterministic(),
            ..SimulationConfig::default()
        }
        .with_seed(42)
    }

    fn context() -> (SimulationContext, ManualClock, RecordingSink) {
        let clock = ManualClock::new(0);
        let sink = RecordingSink::new();
        let ctx = SimulationContext::new(config(), Arc::new(clock.clone()))
            .with_persistence(sink.clone())
            .with_publisher(sink.clone())
            .with_observer(sink.clone());
        (ctx, clock, sink)
    }

    /// Buys one unit of water every tick, or panics once on a chosen tick,
    /// or always falls back to hold with `fault`.
    struct Scripted {
        id: AgentId,
        portfolio: Portfolio,
        panic_on: Option<u64>,
        fault: Option<AgentError>,
    }

    impl Observable for Scripted {
        fn decision_trace(&self) -> DecisionTrace {
            DecisionTrace::default()
        }
    }

    impl Agent for Scripted {
        fn decide(&mut self, view: &MarketView) -> Decision {
            if self.panic_on == Some(view.tick) {
                self.panic_on = None;
                panic!("scripted failure");
            }
            if let Some(err) = &self.fault {
                return Decision::fallback(err.clone());
            }
            Decision::act(Action::buy(Resource::Water, 1))
        }
        fn record_outcome(&mut self, _action: &Action, _outcome: &TradeOutcome) {}
        fn portfolio(&self) -> &Portfolio {
            &self.portfolio
        }
        fn portfolio_mut(&mut self) -> &mut Portfolio {
            &mut self.portfolio
        }
        fn id(&self) -> AgentId {
            self.id
        }
        fn name(&self) -> &str {
            "scripted"
        }
        fn kind(&self) -> AgentKind {
            AgentKind::Heuristic
        }
        fn strategy(&self) -> StrategyVariant {
            StrategyVariant::Adaptive
        }
    }

    fn scripted(panic_on: Option<u64>) -> impl FnOnce(AgentId, u64) -> Box<dyn Agent> {
        move |id, _| {
            Box::new(Scripted {
                id,
                portfolio: Portfolio::new(1_000.0, []),
                panic_on,
                fault: None,
            })
        }
    }

    fn faulty(err: AgentError) -> impl FnOnce(AgentId, u64) -> Box<dyn Agent> {
        move |id, _| {
            Box::new(Scripted {
                id,
                portfolio: Portfolio::new(1_000.0, []),
                panic_on: None,
                fault: Some(err),
            })
        }
    }

    #[test]
    fn agents_run_in_registration_order() {
        // Arrange
        let (mut ctx, _, _) = context();
        let a = ctx.add_agent(AgentKind::Learning, "a", StrategyVariant::Aggressive);
        let b = ctx.add_agent(AgentKind::Heuristic, "b", StrategyVariant::Conservative);
        let c = ctx.add_agent(AgentKind::Learning, "c", StrategyVariant::Contrarian);

        // Act
        let summary = ctx.tick().unwrap().unwrap();

        // Assert
        let order: Vec<AgentId> = summary.agent_actions.iter().map(|r| r.agent_id).collect();
        assert_eq!(order, vec![a, b, c]);
        assert_eq!(summary.tick, 1);
        assert_eq!(ctx.tick_count(), 1);
    }

    #[test]
    fn committed_ticks_reach_every_collaborator() {
        let (mut ctx, _, sink) = context();
        ctx.insert_agent(scripted(None));

        ctx.tick().unwrap();

        let recorded = sink.recorded();
        assert_eq!(recorded.ticks.len(), 1);
        assert_eq!(recorded.actions.len(), 1);
        assert_eq!(recorded.transactions.len(), 1);
        assert_eq!(recorded.snapshots.len(), 1);
        assert_eq!(recorded.transactions[0].action, Action::buy(Resource::Water, 1));
    }

    #[test]
    fn paused_context_re_emits_the_last_summary() {
        // Arrange
        let (mut ctx, _, sink) = context();
        ctx.insert_agent(scripted(None));
        ctx.pause();
        assert_eq!(ctx.tick(), Ok(None));
        assert!(sink.ticks().is_empty());
        ctx.resume();
        let committed = ctx.tick().unwrap().unwrap();
        let market = ctx.market().snapshot();

        // Act
        ctx.pause();
        let first = ctx.tick().unwrap();
        let second = ctx.tick().unwrap();

        // Assert
        assert_eq!(first.as_ref(), Some(&committed));
        assert_eq!(second.as_ref(), Some(&committed));
        assert_eq!(ctx.tick_count(), 1);
        assert_eq!(ctx.market().snapshot(), market);
        let recorded = sink.recorded();
        assert_eq!(recorded.ticks, vec![committed.clone(), committed.clone(), committed]);
        assert_eq!(recorded.actions.len(), 1);
        assert_eq!(recorded.transactions.len(), 1);
        assert_eq!(recorded.snapshots.len(), 1);

        ctx.resume();
        assert_eq!(ctx.tick().unwrap().unwrap().tick, 2);
    }

    #[test]
    fn panicking_agent_rolls_the_tick_back() {
        // Arrange
        let (mut ctx, _, sink) = context();
        let buyer = ctx.insert_agent(scripted(None));
        ctx.insert_agent(scripted(Some(2)));
        ctx.tick().unwrap();
        let market_before = ctx.market().snapshot();
        let cash_before = ctx.inspect(buyer).unwrap().portfolio.cash();

        // Act
        let failed = ctx.tick();

        // Assert
        assert!(matches!(failed, Err(TickError::Panicked(ref m)) if m.contains("scripted")));
        assert_eq!(ctx.tick_count(), 1);
        assert_eq!(ctx.market().snapshot(), market_before);
        assert_eq!(ctx.inspect(buyer).unwrap().portfolio.cash(), cash_before);
        let recorded = sink.recorded();
        assert_eq!(recorded.ticks.len(), 1);
        assert_eq!(recorded.tick_failures.len(), 1);

        // The loop carries on.
        assert_eq!(ctx.tick().unwrap().unwrap().tick, 2);
    }

    #[test]
    fn failed_tick_leaves_learning_agents_untouched() {
        // Arrange: the learner decides, then the scripted agent panics.
        let (mut ctx, _, _) = context();
        let learner = ctx.add_agent(AgentKind::Learning, "q", StrategyVariant::Adaptive);
        ctx.insert_agent(scripted(Some(1)));
        let before = ctx.inspect(learner).unwrap();

        // Act
        assert!(ctx.tick().is_err());

        // Assert
        let after = ctx.inspect(learner).unwrap();
        assert_eq!(after.epsilon, before.epsilon);
        assert_eq!(after.last_action, None);
        assert_eq!(after.trace, before.trace);
        assert_eq!(after.value_table_size, Some(0));
        assert_eq!(after.portfolio, before.portfolio);
    }

    #[test]
    fn retried_tick_matches_a_clean_run() {
        let run = |panic_on: Option<u64>, attempts: usize| {
            let (mut ctx, _, _) = context();
            let learner = ctx.add_agent(AgentKind::Learning, "q", StrategyVariant::Aggressive);
            ctx.add_agent(AgentKind::Heuristic, "h", StrategyVariant::Adaptive);
            ctx.insert_agent(scripted(panic_on));
            let summaries: Vec<TickSummary> =
                (0..attempts).filter_map(|_| ctx.tick().ok().flatten()).collect();
            let learner = ctx.inspect(learner).unwrap();
            (summaries, learner.epsilon, learner.trace, learner.value_table_size)
        };

        let with_failure = run(Some(2), 4);
        let clean = run(None, 3);

        assert_eq!(with_failure.0.len(), 3);
        assert_eq!(with_failure, clean);
    }

    #[test]
    fn agent_fallbacks_reach_the_observer() {
        let (mut ctx, _, sink) = context();
        let id = ctx.insert_agent(faulty(AgentError::Encoding(
            EncodingError::NonFinitePrice(Resource::Water),
        )));

        let summary = ctx.tick().unwrap().unwrap();

        assert_eq!(summary.tick, 1);
        assert_eq!(summary.agent_actions[0].action, Action::Hold);
        assert!(summary.agent_actions[0].executed);
        let recorded = sink.recorded();
        assert_eq!(recorded.agent_errors.len(), 1);
        assert_eq!(recorded.agent_errors[0].0, id);
        assert!(recorded.agent_errors[0].1.contains("not finite"));
        assert!(recorded.transactions.is_empty());
    }

    #[test]
    fn failing_sinks_never_fail_the_tick() {
        let clock = ManualClock::new(0);
        let mut ctx = SimulationContext::new(config(), Arc::new(clock))
            .with_persistence(RecordingSink::failing())
            .with_publisher(RecordingSink::failing());
        ctx.insert_agent(scripted(None));

        assert!(ctx.tick().unwrap().is_some());
    }

    #[test]
    fn phase_transition_shocks_the_market() {
        let cfg = SimulationConfig {
            cycle: CycleConfig {
                duration: PhaseDuration::Fixed { ticks: 1 },
                ..CycleConfig::default()
            },
            ..config()
        };
        let mut ctx = SimulationContext::new(cfg, Arc::new(ManualClock::new(0)));

        let summary = ctx.tick().unwrap().unwrap();

        let transition = summary.phase_transition.unwrap();
        assert_eq!(transition.from, CyclePhase::Expansion);
        assert_eq!(transition.to, CyclePhase::Peak);
        assert_eq!(summary.cycle_phase, CyclePhase::Peak);
    }

    #[test]
    fn registry_add_remove_inspect() {
        let (mut ctx, _, _) = context();
        let id = ctx.add_agent(AgentKind::Learning, "q", StrategyVariant::Adaptive);

        let inspection = ctx.inspect(id).unwrap();
        assert_eq!(inspection.name, "q");
        assert_eq!(inspection.epsilon, Some(0.3));
        assert_eq!(inspection.value_table_size, Some(0));
        assert_eq!(inspection.portfolio.cash(), ctx.config().starting_cash);

        assert!(ctx.remove_agent(id));
        assert!(!ctx.remove_agent(id));
        assert!(ctx.inspect(id).is_none());
        let next = ctx.add_agent(AgentKind::Heuristic, "h", StrategyVariant::Adaptive);
        assert_ne!(next, id);
    }

    #[test]
    fn same_seed_same_run() {
        let run = || {
            let (mut ctx, clock, _) = context();
            ctx.add_agent(AgentKind::Learning, "a", StrategyVariant::Aggressive);
            ctx.add_agent(AgentKind::Heuristic, "b", StrategyVariant::Adaptive);
            (0..50)
                .map(|_| {
                    clock.advance(2_000);
                    ctx.tick().unwrap().unwrap()
                })
                .collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }
}
