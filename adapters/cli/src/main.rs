#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs a Breach Defence simulation headlessly.

use std::{fmt::Display, fs, path::PathBuf, sync::mpsc, time::Duration};

use anyhow::{Context, Result};
use breach_defence_core::{
    GameSnapshot, LevelNumber, LossPolicy, PlacementError, Ruleset, SimulationConfig, TickOutcome,
    WorldPoint,
};
use breach_defence_runtime::{Clock, Simulation, SimulationObserver};
use breach_defence_world::query;
use clap::Parser;
use log::{info, warn};

/// Headless Breach Defence simulation.
#[derive(Debug, Parser)]
#[command(name = "breach-defence", version, about)]
struct Cli {
    /// TOML file overriding the built-in balance.
    #[arg(long, value_name = "TOML")]
    config: Option<PathBuf>,

    /// Number of ticks to simulate.
    #[arg(long, default_value_t = 600)]
    ticks: u32,

    /// Escalate on the first breach instead of counting lives.
    #[arg(long)]
    hard_mode: bool,

    /// Place a defender at X,Y before the first tick. Repeatable.
    #[arg(long = "place", value_name = "X,Y", value_parser = parse_point)]
    place: Vec<WorldPoint>,

    /// Fill every affordable slot at the start of each level.
    #[arg(long)]
    auto_place: bool,

    /// Print one JSON snapshot per line instead of text summaries.
    #[arg(long)]
    json: bool,

    /// Print a text summary every N ticks.
    #[arg(long, value_name = "N", default_value_t = 50)]
    report_every: u64,

    /// Drive the simulation through the real-time clock.
    #[arg(long)]
    realtime: bool,
}

/// Entry point for the Breach Defence command-line interface.
fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let rules = load_rules(&cli)?;
    if cli.realtime {
        run_realtime(&cli, rules)
    } else {
        run_stepped(&cli, rules);
        Ok(())
    }
}

fn load_rules(cli: &Cli) -> Result<Ruleset> {
    let config = match &cli.config {
        Some(path) => {
            let source = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            SimulationConfig::from_toml_str(&source)
                .with_context(|| format!("failed to parse {}", path.display()))?
        }
        None => SimulationConfig::default(),
    };

    let rules = config.validate().context("invalid simulation config")?;
    if cli.hard_mode {
        Ok(rules.with_loss_policy(LossPolicy::ImmediateEscalation))
    } else {
        Ok(rules)
    }
}

fn run_stepped(cli: &Cli, rules: Ruleset) {
    let mut printer = Printer::new(cli.json, cli.report_every, None);
    let mut simulation = Simulation::new(rules);
    for slot in &cli.place {
        report_placement(*slot, simulation.place_defender(*slot));
    }
    if cli.auto_place {
        auto_place(&mut simulation);
    }

    for _ in 0..cli.ticks {
        let Some(report) = simulation.step() else {
            break;
        };
        printer.on_snapshot(&report.snapshot);

        match report.outcome {
            TickOutcome::Continuing => {}
            TickOutcome::LevelUp(_) => {
                if cli.auto_place {
                    auto_place(&mut simulation);
                }
            }
            TickOutcome::Escalate => {
                printer.on_escalate(report.snapshot.level);
                break;
            }
        }
    }

    simulation.halt();
    print_summary(&simulation.snapshot(), cli.json);
}

fn run_realtime(cli: &Cli, rules: Ruleset) -> Result<()> {
    let clock = Clock::from_rules(&rules);
    let slots = rules.slots().to_vec();
    let (escalated, escalation) = mpsc::channel();
    let printer = Printer::new(cli.json, cli.report_every, Some(escalated));

    let mut handle = clock
        .start(Simulation::new(rules), printer)
        .context("failed to start the simulation clock")?;

    for slot in &cli.place {
        report_placement(*slot, handle.place_defender(*slot));
    }
    if cli.auto_place {
        for slot in slots {
            if let Err(error) = handle.place_defender(slot) {
                info!("auto placement stopped: {error}");
                break;
            }
        }
    }

    let budget = clock.interval().saturating_mul(cli.ticks);
    match escalation.recv_timeout(budget.saturating_add(Duration::from_millis(100))) {
        Ok(level) => info!("simulation escalated on level {}", level.get()),
        Err(_) => info!("tick budget elapsed"),
    }

    let simulation = handle
        .stop()
        .context("the simulation clock terminated abnormally")?;
    print_summary(&simulation.snapshot(), cli.json);
    Ok(())
}

fn auto_place(simulation: &mut Simulation) {
    let free: Vec<WorldPoint> = query::slots(simulation.world())
        .into_iter()
        .filter(|slot| slot.occupant.is_none())
        .map(|slot| slot.point)
        .collect();

    for slot in free {
        match simulation.place_defender(slot) {
            Ok(_) => {}
            Err(PlacementError::InsufficientFunds) => break,
            Err(error) => report_placement(slot, Err::<(), _>(error)),
        }
    }
}

fn report_placement<T, E: Display>(slot: WorldPoint, result: Result<T, E>) {
    match result {
        Ok(_) => info!("defender placed at ({}, {})", slot.x(), slot.y()),
        Err(error) => warn!(
            "could not place a defender at ({}, {}): {error}",
            slot.x(),
            slot.y()
        ),
    }
}

fn parse_point(value: &str) -> Result<WorldPoint, String> {
    let (x, y) = value
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y but got `{value}`"))?;
    let x: f32 = x
        .trim()
        .parse()
        .map_err(|error| format!("invalid X coordinate `{x}`: {error}"))?;
    let y: f32 = y
        .trim()
        .parse()
        .map_err(|error| format!("invalid Y coordinate `{y}`: {error}"))?;

    let point = WorldPoint::new(x, y);
    if point.is_finite() {
        Ok(point)
    } else {
        Err(format!("coordinates must be finite, got `{value}`"))
    }
}

/// Writes snapshots to stdout either as JSON lines or periodic summaries.
struct Printer {
    json: bool,
    report_every: u64,
    escalations: Option<mpsc::Sender<LevelNumber>>,
}

impl Printer {
    fn new(json: bool, report_every: u64, escalations: Option<mpsc::Sender<LevelNumber>>) -> Self {
        Self {
            json,
            report_every: report_every.max(1),
            escalations,
        }
    }
}

impl SimulationObserver for Printer {
    fn on_snapshot(&mut self, snapshot: &GameSnapshot) {
        if self.json {
            match serde_json::to_string(snapshot) {
                Ok(line) => println!("{line}"),
                Err(error) => warn!("failed to encode snapshot: {error}"),
            }
        } else if snapshot.tick % self.report_every == 0 {
            println!("{}", describe(snapshot));
        }
    }

    fn on_escalate(&mut self, level: LevelNumber) {
        if !self.json {
            println!("escalation triggered on level {}", level.get());
        }
        if let Some(escalations) = &self.escalations {
            let _ = escalations.send(level);
        }
    }
}

fn print_summary(snapshot: &GameSnapshot, json: bool) {
    if json {
        return;
    }
    println!("final: {}", describe(snapshot));
}

fn describe(snapshot: &GameSnapshot) -> String {
    format!(
        "tick {} | level {} {:?} | lives {} | credits {} | wave {} | enemies {} | defenders {}",
        snapshot.tick,
        snapshot.level.get(),
        snapshot.phase,
        snapshot.lives,
        snapshot.currency.get(),
        snapshot.wave.get(),
        snapshot.enemies.len(),
        snapshot.defenders.len()
    )
}
