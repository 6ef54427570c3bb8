// src/bin/simulate.rs

use clap::Parser;
use commodity_market::error::SinkError;
use commodity_market::simulation::{ActionRecord, TickPublisher};
use commodity_market::{
    AgentKind, ManualClock, SimulationConfig, SimulationContext, SimulationHandle, StrategyVariant,
    SystemClock, TickSummary,
};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Headless commodity market run that prints one JSON tick summary per line.
#[derive(Parser, Debug)]
#[command(name = "simulate")]
#[command(version)]
struct Args {
    /// JSON config file; missing fields take their defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Master seed (overrides the config file)
    #[arg(long)]
    seed: Option<u64>,

    /// Number of ticks to run
    #[arg(long, default_value_t = 200)]
    ticks: u64,

    /// Heuristic agents to register
    #[arg(long, default_value_t = 4)]
    heuristic: usize,

    /// Learning agents to register; strategies rotate through every variant
    #[arg(long, default_value_t = 4)]
    learning: usize,

    /// Trigger an event at a tick, as `template@tick` (repeatable)
    #[arg(long = "trigger", value_parser = parse_trigger)]
    triggers: Vec<(String, u64)>,

    /// Tick on the wall clock at the configured interval instead of
    /// fast-forwarding simulated time
    #[arg(long)]
    realtime: bool,

    /// Also print every action record
    #[arg(long)]
    actions: bool,
}

fn parse_trigger(raw: &str) -> Result<(String, u64), String> {
    let (template, tick) = raw
        .split_once('@')
        .ok_or_else(|| format!("expected `template@tick`, got `{raw}`"))?;
    let tick = tick
        .parse()
        .map_err(|e| format!("bad tick in `{raw}`: {e}"))?;
    Ok((template.to_owned(), tick))
}

/// Writes summaries to stdout as JSON lines.
struct JsonLines {
    actions: bool,
}

impl JsonLines {
    fn emit<T: serde::Serialize>(&self, value: &T) -> Result<(), SinkError> {
        let line = serde_json::to_string(value).map_err(|e| SinkError::Rejected(e.to_string()))?;
        let mut out = std::io::stdout().lock();
        writeln!(out, "{line}").map_err(|e| SinkError::Unavailable(e.to_string()))
    }
}

impl TickPublisher for JsonLines {
    fn publish_tick(&self, summary: &TickSummary) -> Result<(), SinkError> {
        self.emit(summary)
    }

    fn publish_action(&self, record: &ActionRecord) -> Result<(), SinkError> {
        if self.actions { self.emit(record) } else { Ok(()) }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .try_init()
        .ok();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => SimulationConfig::from_path(path)?,
        None => SimulationConfig::default(),
    };
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }
    let interval_ms = config.tick_interval_ms;

    let manual = ManualClock::new(0);
    let clock: Arc<dyn commodity_market::Clock> = if args.realtime {
        Arc::new(SystemClock::new())
    } else {
        Arc::new(manual.clone())
    };

    let mut ctx = SimulationContext::new(config, clock).with_publisher(JsonLines {
        actions: args.actions,
    });
    for n in 0..args.heuristic {
        let variant = StrategyVariant::ALL[n % StrategyVariant::ALL.len()];
        ctx.add_agent(AgentKind::Heuristic, format!("heuristic-{n}"), variant);
    }
    for n in 0..args.learning {
        let variant = StrategyVariant::ALL[n % StrategyVariant::ALL.len()];
        ctx.add_agent(AgentKind::Learning, format!("learner-{variant}-{n}"), variant);
    }

    let sim = SimulationHandle::new(ctx);
    info!(ticks = args.ticks, realtime = args.realtime, "starting run");

    if args.realtime {
        let ticker = sim.spawn_ticker(Duration::from_millis(interval_ms));
        let mut fired = vec![false; args.triggers.len()];
        while sim.tick_count() < args.ticks {
            let now = sim.tick_count();
            for (i, (template, at)) in args.triggers.iter().enumerate() {
                if !fired[i] && now >= *at {
                    fired[i] = true;
                    report_trigger(&sim, template);
                }
            }
            std::thread::sleep(Duration::from_millis(interval_ms.min(50)));
        }
        ticker.stop();
    } else {
        for tick in 0..args.ticks {
            for (template, _) in args.triggers.iter().filter(|(_, at)| *at == tick) {
                report_trigger(&sim, template);
            }
            manual.advance(interval_ms);
            // Failures are rolled back and logged by the context.
            let _ = sim.tick();
        }
    }

    sim.with(|ctx| {
        for id in ctx.agent_ids() {
            if let Some(agent) = ctx.inspect(id) {
                info!(
                    agent = %agent.id,
                    name = %agent.name,
                    net_worth = agent.net_worth,
                    epsilon = agent.epsilon.unwrap_or_default(),
                    table = agent.value_table_size.unwrap_or_default(),
                    "final standing"
                );
            }
        }
    });
    Ok(())
}

fn report_trigger(sim: &SimulationHandle, template: &str) {
    let response = sim.trigger_event(template);
    if response.ok {
        info!(template, eta_ms = response.eta_ms.unwrap_or_default(), "event triggered");
    } else {
        warn!(template, reason = response.reason.as_deref().unwrap_or(""), "trigger refused");
    }
}
