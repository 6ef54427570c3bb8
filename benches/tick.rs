//! benches/tick.rs
//! Run with:  cargo bench --bench tick
//! HTML:      target/criterion/report/index.html

use commodity_market::{
    AgentKind, ManualClock, Market, SimulationConfig, SimulationContext, StrategyVariant,
    config::MarketParams, market::cycle::CyclePhase,
};
use criterion::{BatchSize, BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use std::sync::Arc;

// ────────────────────────────────────────────────────────────────────────────
//  Parameter grids
// ────────────────────────────────────────────────────────────────────────────
const AGENT_COUNTS: &[usize] = &[4, 16, 64];
const TICKS_PER_ITER: u64 = 50;

/// A context with `n` agents split evenly between heuristic and learning,
/// strategies cycling through every variant.
fn setup_context(n: usize) -> (SimulationContext, ManualClock) {
    let clock = ManualClock::new(0);
    let mut ctx = SimulationContext::new(
        SimulationConfig::default().with_seed(42),
        Arc::new(clock.clone()),
    );
    for i in 0..n {
        let kind = if i % 2 == 0 { AgentKind::Learning } else { AgentKind::Heuristic };
        let variant = StrategyVariant::ALL[i % StrategyVariant::ALL.len()];
        ctx.add_agent(kind, format!("bench-{i}"), variant);
    }
    ctx.try_trigger_event("market_crash").ok();
    (ctx, clock)
}

pub fn bench_ticks(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick_scaling");

    for &n in AGENT_COUNTS {
        // throughput in "elements" = agent decisions
        group.throughput(Throughput::Elements(n as u64 * TICKS_PER_ITER));
        group.bench_function(BenchmarkId::from_parameter(format!("agents_{n}")), |b| {
            b.iter_batched(
                || setup_context(n),
                |(mut ctx, clock)| {
                    for _ in 0..TICKS_PER_ITER {
                        clock.advance(2_000);
                        black_box(ctx.tick().ok());
                    }
                },
                BatchSize::LargeInput,
            )
        });
    }

    group.finish();
}

pub fn bench_market_drift(c: &mut Criterion) {
    let mut market = Market::new(MarketParams::default(), 7);
    let multipliers = CyclePhase::Expansion.multipliers();
    c.bench_function("market_advance_tick", |b| {
        b.iter(|| market.advance_tick(black_box(multipliers)))
    });
}

criterion_group!(benches, bench_ticks, bench_market_drift);
criterion_main!(benches);
