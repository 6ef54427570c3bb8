// src/agents/learning_agent.rs

//! Tabular Q-learning bot.
//!
//! Each decision runs encode → learn from the previous step → enumerate legal
//! actions → ε-greedy select → decay ε. The reward for a decision is only
//! known one cycle later, once the market has moved, so the update for
//! (s, a) happens at the start of the *next* decision with s' = the freshly
//! encoded state.

use super::action_space::ActionSpace;
use super::agent_trait::{Agent, Decision, DecisionTrace, MarketView, Observable, TradeOutcome};
use super::agent_type::{AgentId, AgentKind};
use super::replay::{Experience, ExperienceBuffer};
use super::reward::{RewardInputs, compute_reward};
use super::state_key::StateKey;
use super::strategy::{StrategyConfig, StrategyVariant};
use super::value_table::ValueTable;
use crate::config::{LearningConfig, RewardConfig};
use crate::error::AgentError;
use crate::types::{Action, Portfolio};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::any::Any;
use tracing::{debug, warn};

/// The decision awaiting its reward.
#[derive(Debug, Clone, Copy)]
struct PendingStep {
    state: StateKey,
    action: Action,
    net_worth_before: f64,
    demand_supply_ratio: Option<f64>,
    executed: bool,
}

#[derive(Clone)]
pub struct LearningAgent {
    id: AgentId,
    name: String,
    variant: StrategyVariant,
    strategy: StrategyConfig,
    reward_cfg: RewardConfig,
    learning: LearningConfig,
    portfolio: Portfolio,
    reference_cash: f64,
    epsilon: f64,
    decisions: u64,
    table: ValueTable,
    replay: ExperienceBuffer,
    action_space: ActionSpace,
    pending: Option<PendingStep>,
    trace: DecisionTrace,
    rng: StdRng,
}

impl LearningAgent {
    pub fn new(
        id: AgentId,
        name: impl Into<String>,
        variant: StrategyVariant,
        portfolio: Portfolio,
        learning: LearningConfig,
        reward_cfg: RewardConfig,
        seed: u64,
    ) -> Self {
        Self::with_strategy(
            id,
            name,
            variant,
            variant.config(),
            portfolio,
            learning,
            reward_cfg,
            seed,
        )
    }

    /// Like [`LearningAgent::new`] with an explicit strategy row instead of
    /// the variant's default.
    #[allow(clippy::too_many_arguments)]
    pub fn with_strategy(
        id: AgentId,
        name: impl Into<String>,
        variant: StrategyVariant,
        strategy: StrategyConfig,
        portfolio: Portfolio,
        learning: LearningConfig,
        reward_cfg: RewardConfig,
        seed: u64,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            variant,
            reference_cash: portfolio.cash(),
            epsilon: strategy.epsilon_start,
            strategy,
            reward_cfg,
            learning,
            portfolio,
            decisions: 0,
            table: ValueTable::new(),
            replay: ExperienceBuffer::new(learning.replay_capacity),
            action_space: ActionSpace::new(),
            pending: None,
            trace: DecisionTrace::default(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn value_table(&self) -> &ValueTable {
        &self.table
    }

    pub fn strategy_config(&self) -> &StrategyConfig {
        &self.strategy
    }

    pub fn decisions(&self) -> u64 {
        self.decisions
    }

    pub fn replay_len(&self) -> usize {
        self.replay.len()
    }

    fn learn_from(&mut self, pending: PendingStep, next_state: StateKey, net_worth_now: f64) -> f64 {
        let reward = compute_reward(
            &RewardInputs {
                action: pending.action,
                executed: pending.executed,
                net_worth_before: pending.net_worth_before,
                net_worth_after: net_worth_now,
                demand_supply_ratio: pending.demand_supply_ratio,
            },
            &self.strategy.shaping,
            &self.reward_cfg,
        );

        let experience = Experience {
            state: pending.state,
            action: pending.action,
            reward,
            next_state,
        };
        self.apply_update(&experience);
        self.replay.push(experience);
        reward
    }

    fn apply_update(&mut self, experience: &Experience) {
        let candidates = self
            .action_space
            .sample(self.learning.max_sampled_actions, &mut self.rng);
        let next_max = self.table.max_value(&experience.next_state, &candidates);
        self.table.update(
            experience.state,
            experience.action,
            experience.reward,
            next_max,
            self.strategy.learning_rate,
            self.strategy.discount,
        );
    }

    fn replay_batch(&mut self) {
        let batch = self
            .replay
            .sample(self.learning.replay_batch_size, &mut self.rng);
        for experience in &batch {
            self.apply_update(experience);
        }
    }

    /// ε-greedy over `legal`. Returns the action and whether it was explored.
    fn select(&mut self, state: &StateKey, legal: &[Action]) -> (Action, bool) {
        if self.rng.gen_bool(self.epsilon.clamp(0.0, 1.0)) {
            let action = legal.choose(&mut self.rng).copied().unwrap_or(Action::Hold);
            return (action, true);
        }
        let action = self.table.best_action(state, legal).unwrap_or(Action::Hold);
        (action, false)
    }

    fn decay_epsilon(&mut self) {
        self.epsilon = (self.epsilon * self.learning.epsilon_decay).max(self.learning.epsilon_min);
    }
}

impl Observable for LearningAgent {
    fn decision_trace(&self) -> DecisionTrace {
        self.trace.clone()
    }
}

impl Agent for LearningAgent {
    fn decide(&mut self, view: &MarketView) -> Decision {
        let state = match StateKey::encode(
            view.market,
            &self.portfolio,
            view.phase,
            self.reference_cash,
        ) {
            Ok(state) => state,
            Err(err) => {
                warn!(agent = %self.id, tick = view.tick, %err, "state encoding failed, holding");
                // The pending step can't be scored against an unreadable market.
                self.pending = None;
                self.trace = DecisionTrace {
                    tick: view.tick,
                    last_action: Some(Action::Hold),
                    last_reward: Some(0.0),
                    last_error: Some(err.to_string()),
                    ..DecisionTrace::default()
                };
                return Decision::fallback(AgentError::Encoding(err));
            }
        };

        let net_worth = self.portfolio.net_worth(view.market);
        let reward = self
            .pending
            .take()
            .map(|pending| self.learn_from(pending, state, net_worth));

        let legal = self.action_space.legal(view.market, &self.portfolio);
        let (action, explored) = self.select(&state, &legal);
        self.decay_epsilon();
        self.decisions += 1;

        if self.learning.replay_interval > 0 && self.decisions % self.learning.replay_interval == 0
        {
            self.replay_batch();
        }

        self.pending = Some(PendingStep {
            state,
            action,
            net_worth_before: net_worth,
            demand_supply_ratio: action
                .resource()
                .and_then(|r| view.entry(r))
                .map(|e| e.demand_supply_ratio()),
            executed: true,
        });

        debug!(
            agent = %self.id,
            tick = view.tick,
            %action,
            explored,
            epsilon = self.epsilon,
            reward = reward.unwrap_or_default(),
            "learning agent decided"
        );

        self.trace = DecisionTrace {
            tick: view.tick,
            last_action: Some(action),
            last_reward: reward.or(self.trace.last_reward),
            explored: Some(explored),
            ..DecisionTrace::default()
        };
        Decision::act(action)
    }

    fn record_outcome(&mut self, action: &Action, outcome: &TradeOutcome) {
        let executed = outcome.is_ok();
        if let Some(pending) = self.pending.as_mut() {
            if pending.action == *action {
                pending.executed = executed;
            }
        }
        self.trace.executed = Some(executed);
        if let Err(err) = outcome {
            self.trace.last_error = Some(err.to_string());
        }
    }

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
        &self.name
    }

    fn kind(&self) -> AgentKind {
        AgentKind::Learning
    }

    fn strategy(&self) -> StrategyVariant {
        self.variant
    }

    fn epsilon(&self) -> Option<f64> {
        Some(self.epsilon)
    }

    fn value_table_size(&self) -> Option<usize> {
        Some(self.table.len())
    }

    /// The whole learner: ε, the decision count, the pending step, the
    /// table, the replay buffer and the RNG all move during a decision.
    fn checkpoint(&self) -> Box<dyn Any + Send> {
        Box::new(self.clone())
    }

    fn restore(&mut self, saved: Box<dyn Any + Send>) {
        match saved.downcast::<Self>() {
            Ok(saved) => *self = *saved,
            Err(_) => warn!(agent = %self.id, "ignoring checkpoint of another agent type"),
        }
    }
}
