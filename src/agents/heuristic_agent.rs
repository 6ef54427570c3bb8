// src/agents/heuristic_agent.rs

use super::agent_trait::{Agent, Decision, DecisionTrace, MarketView, Observable, TradeOutcome};
use super::agent_type::{AgentId, AgentKind};
use super::config::{SENTIMENT_BEARISH_RATIO, SENTIMENT_BULLISH_RATIO, SENTIMENT_NEUTRAL_BAND};
use super::strategy::StrategyVariant;
use crate::config::{HeuristicConfig, MIN_SUPPLY};
use crate::market::MarketEntry;
use crate::types::{Action, Portfolio, Resource};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use statrs::statistics::Statistics;
use std::any::Any;
use std::collections::{BTreeMap, VecDeque};
use tracing::{debug, trace, warn};

/// Fixed traits drawn once at construction, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Personality {
    pub risk_tolerance: f64,
    pub greed: f64,
    pub patience: f64,
    pub confidence: f64,
}

impl Personality {
    pub fn generate<R: Rng + ?Sized>(variant: StrategyVariant, rng: &mut R) -> Self {
        let risk_tolerance = match variant {
            StrategyVariant::Aggressive => rng.gen_range(0.6..=1.0),
            StrategyVariant::Conservative => rng.gen_range(0.0..=0.4),
            StrategyVariant::Adaptive | StrategyVariant::Contrarian => rng.gen_range(0.2..=0.8),
        };
        Self {
            risk_tolerance,
            greed: rng.gen_range(0.0..=1.0),
            patience: rng.gen_range(0.0..=1.0),
            confidence: rng.gen_range(0.0..=1.0),
        }
    }
}

/// Market-wide mood derived from the aggregate demand/supply ratio. Sticky:
/// leaving a mood needs the ratio to cross back past its threshold by
/// [`SENTIMENT_NEUTRAL_BAND`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Sentiment {
    Bullish,
    Neutral,
    Bearish,
}

impl Sentiment {
    pub fn next(self, ratio: f64) -> Self {
        if ratio >= SENTIMENT_BULLISH_RATIO {
            return Sentiment::Bullish;
        }
        if ratio <= SENTIMENT_BEARISH_RATIO {
            return Sentiment::Bearish;
        }
        match self {
            Sentiment::Bullish if ratio > SENTIMENT_BULLISH_RATIO - SENTIMENT_NEUTRAL_BAND => {
                Sentiment::Bullish
            }
            Sentiment::Bearish if ratio < SENTIMENT_BEARISH_RATIO + SENTIMENT_NEUTRAL_BAND => {
                Sentiment::Bearish
            }
            _ => Sentiment::Neutral,
        }
    }

    fn bias(self) -> f64 {
        match self {
            Sentiment::Bullish => 1.0,
            Sentiment::Neutral => 0.0,
            Sentiment::Bearish => -1.0,
        }
    }
}

/// Rule-based trader. Buys what looks cheap against its own price memory,
/// sells what looks dear, and reacts no faster than its patience allows.
#[derive(Clone)]
pub struct HeuristicAgent {
    id: AgentId,
    name: String,
    variant: StrategyVariant,
    personality: Personality,
    portfolio: Portfolio,
    config: HeuristicConfig,
    price_memory: BTreeMap<Resource, VecDeque<f64>>,
    sentiment: Sentiment,
    next_action_at_ms: u64,
    trace: DecisionTrace,
    rng: StdRng,
}

impl HeuristicAgent {
    pub fn new(
        id: AgentId,
        name: impl Into<String>,
        variant: StrategyVariant,
        portfolio: Portfolio,
        config: HeuristicConfig,
        seed: u64,
    ) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let personality = Personality::generate(variant, &mut rng);
        Self::build(id, name.into(), variant, personality, portfolio, config, rng)
    }

    pub fn with_personality(
        id: AgentId,
        name: impl Into<String>,
        variant: StrategyVariant,
        personality: Personality,
        portfolio: Portfolio,
        config: HeuristicConfig,
        seed: u64,
    ) -> Self {
        let rng = StdRng::seed_from_u64(seed);
        Self::build(id, name.into(), variant, personality, portfolio, config, rng)
    }

    fn build(
        id: AgentId,
        name: String,
        variant: StrategyVariant,
        personality: Personality,
        portfolio: Portfolio,
        config: HeuristicConfig,
        rng: StdRng,
    ) -> Self {
        Self {
            id,
            name,
            variant,
            personality,
            portfolio,
            config,
            price_memory: BTreeMap::new(),
            sentiment: Sentiment::Neutral,
            next_action_at_ms: 0,
            trace: DecisionTrace::default(),
            rng,
        }
    }

    pub fn personality(&self) -> &Personality {
        &self.personality
    }

    pub fn sentiment(&self) -> Sentiment {
        self.sentiment
    }

    pub fn next_action_at_ms(&self) -> u64 {
        self.next_action_at_ms
    }

    fn remember(&mut self, resource: Resource, price: f64) {
        let window = self.config.memory_window.max(1);
        let memory = self.price_memory.entry(resource).or_default();
        memory.push_back(price);
        while memory.len() > window {
            memory.pop_front();
        }
    }

    /// Positive means "buy", negative "sell".
    fn score(&self, resource: Resource, entry: &MarketEntry) -> f64 {
        let Some(memory) = self.price_memory.get(&resource) else {
            return 0.0;
        };
        let average = memory.iter().mean();
        if !average.is_finite() || average <= 0.0 {
            return 0.0;
        }

        let p = &self.personality;
        let deviation = (average - entry.price) / average;
        let pressure = entry.demand_supply_ratio() - 1.0;
        let mood = self.sentiment.bias() * p.confidence * self.config.sentiment_weight;

        let raw = deviation * (0.5 + p.greed) + pressure * (0.5 + p.risk_tolerance) + mood;

        // Noisy history makes the timid less sure of their read.
        let spread = memory.iter().std_dev();
        let variation = if spread.is_finite() { spread / average } else { 0.0 };
        raw / (1.0 + variation * (1.0 - p.risk_tolerance))
    }

    fn size_order(&self, score: f64, resource: Resource, entry: &MarketEntry) -> Action {
        let p = &self.personality;
        let wanted = (score.abs() * self.config.quantity_scale * (0.5 + p.greed)).ceil() as u32;
        let wanted = wanted.max(1);

        if score > 0.0 {
            let budget = self.portfolio.cash() * (0.1 + 0.4 * p.risk_tolerance);
            let affordable = (budget / entry.price).floor() as u32;
            let available = entry.supply.saturating_sub(MIN_SUPPLY);
            let quantity = wanted.min(affordable).min(available);
            if quantity == 0 {
                return Action::Hold;
            }
            Action::buy(resource, quantity)
        } else {
            let quantity = wanted.min(self.portfolio.holding(resource));
            if quantity == 0 {
                return Action::Hold;
            }
            Action::sell(resource, quantity)
        }
    }

    fn schedule_next(&mut self, now_ms: u64) {
        let min = self.config.patience_min_ms;
        let max = self.config.patience_max_ms.max(min);
        let base = self.rng.gen_range(min..=max) as f64;
        let delay = (base * (0.75 + 0.5 * self.personality.patience)).round() as u64;
        self.next_action_at_ms = now_ms + delay.clamp(min, max);
    }
}

impl Observable for HeuristicAgent {
    fn decision_trace(&self) -> DecisionTrace {
        self.trace.clone()
    }
}

impl Agent for HeuristicAgent {
    fn decide(&mut self, view: &MarketView) -> Decision {
        for (resource, entry) in view.market.entries() {
            if entry.price.is_finite() && entry.price > 0.0 {
                self.remember(*resource, entry.price);
            }
        }
        self.sentiment = self.sentiment.next(view.market.aggregate_ratio());

        if view.now_ms < self.next_action_at_ms {
            trace!(agent = %self.id, wait_ms = self.next_action_at_ms - view.now_ms, "waiting");
            self.trace = DecisionTrace {
                tick: view.tick,
                last_action: Some(Action::Hold),
                ..DecisionTrace::default()
            };
            return Decision::act(Action::Hold);
        }

        let best = view
            .market
            .entries()
            .iter()
            .map(|(resource, entry)| (*resource, entry, self.score(*resource, entry)))
            .filter(|(_, _, score)| score.is_finite())
            .reduce(|best, candidate| {
                if candidate.2.abs() > best.2.abs() {
                    candidate
                } else {
                    best
                }
            });

        let (action, score) = match best {
            Some((resource, entry, score)) if score.abs() >= self.config.action_threshold => {
                (self.size_order(score, resource, entry), Some(score))
            }
            Some((_, _, score)) => (Action::Hold, Some(score)),
            None => (Action::Hold, None),
        };

        if !action.is_hold() {
            self.schedule_next(view.now_ms);
        }

        debug!(
            agent = %self.id,
            tick = view.tick,
            %action,
            score = score.unwrap_or_default(),
            sentiment = ?self.sentiment,
            "heuristic agent decided"
        );

        self.trace = DecisionTrace {
            tick: view.tick,
            last_action: Some(action),
            last_score: score,
            ..DecisionTrace::default()
        };
        Decision::act(action)
    }

    fn record_outcome(&mut self, _action: &Action, outcome: &TradeOutcome) {
        self.trace.executed = Some(outcome.is_ok());
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
        AgentKind::Heuristic
    }

    fn strategy(&self) -> StrategyVariant {
        self.variant
    }

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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MarketParams;
    use crate::market::Market;
    use crate::market::cycle::CyclePhase;

    const CALM: Personality = Personality {
        risk_tolerance: 0.5,
        greed: 0.5,
        patience: 0.5,
        confidence: 0.5,
    };

    fn balanced_market(price: f64) -> Market {
        Market::with_entries(
            Resource::ALL.map(|r| (r, MarketEntry::new(price, 1_000, 1_000))),
            MarketParams::deterministic(),
            0,
        )
    }

    fn bot(portfolio: Portfolio) -> HeuristicAgent {
        HeuristicAgent::with_personality(
            AgentId(9),
            "heuristic",
            StrategyVariant::Adaptive,
            CALM,
            portfolio,
            HeuristicConfig::default(),
            5,
        )
    }

    fn view(market: &Market, tick: u64, now_ms: u64) -> MarketView<'_> {
        MarketView {
            market,
            phase: CyclePhase::Expansion,
            tick,
            now_ms,
        }
    }

    fn warm_up(agent: &mut HeuristicAgent, market: &Market, ticks: u64) {
        for tick in 0..ticks {
            let decision = agent.decide(&view(market, tick, 0));
            assert_eq!(decision.action, Action::Hold);
        }
    }

    #[test]
    fn quiet_market_means_hold() {
        let mut agent = bot(Portfolio::with_uniform_holdings(1_000.0, 10));
        let market = balanced_market(20.0);
        warm_up(&mut agent, &market, 10);
        assert_eq!(agent.decision_trace().last_score, Some(0.0));
    }

    #[test]
    fn buys_a_resource_that_got_cheap() {
        // Arrange
        let mut agent = bot(Portfolio::new(1_000.0, []));
        let mut market = balanced_market(20.0);
        warm_up(&mut agent, &market, 5);
        market.entry_mut(Resource::Water).unwrap().price = 10.0;

        // Act
        let decision = agent.decide(&view(&market, 5, 0));

        // Assert
        match decision.action {
            Action::Buy { resource, quantity } => {
                assert_eq!(resource, Resource::Water);
                // Budget is 1000 × 0.3, so at most 30 units.
                assert!((1..=30).contains(&quantity), "quantity = {quantity}");
            }
            other => panic!("expected a buy, got {other:?}"),
        }
    }

    #[test]
    fn sells_a_resource_that_got_dear_but_only_what_it_holds() {
        let mut agent = bot(Portfolio::new(0.0, [(Resource::Energy, 2)]));
        let mut market = balanced_market(20.0);
        warm_up(&mut agent, &market, 5);
        market.entry_mut(Resource::Energy).unwrap().price = 40.0;

        let decision = agent.decide(&view(&market, 5, 0));

        assert_eq!(decision.action, Action::sell(Resource::Energy, 2));
    }

    #[test]
    fn signal_without_means_is_a_hold() {
        let mut agent = bot(Portfolio::new(0.0, []));
        let mut market = balanced_market(20.0);
        warm_up(&mut agent, &market, 5);
        market.entry_mut(Resource::Food).unwrap().price = 10.0;

        assert_eq!(agent.decide(&view(&market, 5, 0)).action, Action::Hold);
    }

    #[test]
    fn patience_gates_the_next_trade() {
        // Arrange
        let mut agent = bot(Portfolio::new(1_000.0, []));
        let mut market = balanced_market(20.0);
        warm_up(&mut agent, &market, 5);
        market.entry_mut(Resource::Water).unwrap().price = 10.0;
        let cfg = HeuristicConfig::default();

        // Act
        let first = agent.decide(&view(&market, 5, 1_000));
        let next_at = agent.next_action_at_ms();
        let second = agent.decide(&view(&market, 6, next_at - 1));
        let third = agent.decide(&view(&market, 7, next_at));

        // Assert
        assert!(!first.action.is_hold());
        assert!(next_at >= 1_000 + cfg.patience_min_ms);
        assert!(next_at <= 1_000 + cfg.patience_max_ms);
        assert_eq!(second.action, Action::Hold);
        assert!(!third.action.is_hold());
    }

    #[test]
    fn sentiment_is_sticky_inside_the_band() {
        let s = Sentiment::Neutral.next(1.2);
        assert_eq!(s, Sentiment::Bullish);
        assert_eq!(s.next(1.09), Sentiment::Bullish);
        assert_eq!(s.next(1.0), Sentiment::Neutral);
        assert_eq!(Sentiment::Neutral.next(1.09), Sentiment::Neutral);

        let s = Sentiment::Neutral.next(0.85);
        assert_eq!(s, Sentiment::Bearish);
        assert_eq!(s.next(0.91), Sentiment::Bearish);
        assert_eq!(s.next(1.0), Sentiment::Neutral);
    }

    #[test]
    fn personalities_follow_the_variant() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..50 {
            let bold = Personality::generate(StrategyVariant::Aggressive, &mut rng);
            let timid = Personality::generate(StrategyVariant::Conservative, &mut rng);
            assert!(bold.risk_tolerance >= 0.6);
            assert!(timid.risk_tolerance <= 0.4);
        }
    }
}
