use breach_defence_core::{
    Command, DefenderId, Event, GameSnapshot, LevelNumber, PlacementError, Ruleset, TickOutcome,
    WaveNumber, WaveStartError, WorldPoint,
};
use breach_defence_system_level::{Config as LevelConfig, LevelController};
use breach_defence_system_targeting::Targeting;
use breach_defence_system_waves::{Config as WaveConfig, WaveDirector};
use breach_defence_world::{self as world, query, World};
use log::{debug, info};

/// Everything a single tick produced.
#[derive(Clone, Debug, PartialEq)]
pub struct TickReport {
    /// Index of the executed tick, starting at one.
    pub tick: u64,
    /// Coarse result of the tick.
    pub outcome: TickOutcome,
    /// State captured after every sub-step ran.
    pub snapshot: GameSnapshot,
    /// Events emitted by the world during the tick, in order.
    pub events: Vec<Event>,
}

/// Receives the outbound notifications of a running simulation.
pub trait SimulationObserver: Send {
    /// Called with the snapshot captured at the end of every tick.
    fn on_snapshot(&mut self, _snapshot: &GameSnapshot) {}

    /// Called once when the simulation escalates.
    fn on_escalate(&mut self, level: LevelNumber);
}

/// Owns the world and the systems and advances them one tick at a time.
#[derive(Debug)]
pub struct Simulation {
    world: World,
    targeting: Targeting,
    waves: WaveDirector,
    level: LevelController,
    commands: Vec<Command>,
    halted: bool,
}

impl Simulation {
    /// Creates a simulation positioned before the first tick of level one.
    #[must_use]
    pub fn new(rules: Ruleset) -> Self {
        let waves = WaveDirector::new(WaveConfig::new(rules.wave_interval_ticks()));
        let level = LevelController::new(LevelConfig::new(
            rules.loss_policy(),
            rules.escalation_delay_ticks(),
        ));

        Self {
            world: World::new(rules),
            targeting: Targeting::new(),
            waves,
            level,
            commands: Vec::new(),
            halted: false,
        }
    }

    /// Read-only access to the authoritative world.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Reports whether [`Simulation::halt`] was called.
    #[must_use]
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Reports whether the simulation escalated.
    #[must_use]
    pub fn is_escalated(&self) -> bool {
        query::phase(&self.world).is_terminal()
    }

    /// Captures the current state without advancing time.
    #[must_use]
    pub fn snapshot(&self) -> GameSnapshot {
        query::game_snapshot(&self.world)
    }

    /// Executes exactly one tick.
    ///
    /// Sub-steps run in a fixed order: movement and cooldowns, targeting,
    /// damage and rewards, wave director, level controller. Returns `None`
    /// once the simulation is halted or escalated.
    pub fn step(&mut self) -> Option<TickReport> {
        if self.halted || self.is_escalated() {
            return None;
        }

        let mut events = Vec::new();
        world::apply(&mut self.world, Command::Tick, &mut events);

        self.commands.clear();
        self.targeting.handle(
            query::phase(&self.world),
            &query::defender_view(&self.world),
            &query::enemy_view(&self.world),
            &mut self.commands,
        );
        self.flush_commands(&mut events);

        let profile = query::level_profile(&self.world).map(|profile| profile.wave);
        self.waves.handle(
            &events,
            query::phase(&self.world),
            query::wave_status(&self.world),
            profile.as_ref(),
            &mut self.commands,
        );
        self.flush_commands(&mut events);

        self.level.handle(
            &events,
            query::phase(&self.world),
            query::lives(&self.world),
            &mut self.commands,
        );
        self.flush_commands(&mut events);

        let outcome = if self.is_escalated() {
            TickOutcome::Escalate
        } else if let Some(level) = events.iter().find_map(|event| match event {
            Event::LevelStarted { level } => Some(*level),
            _ => None,
        }) {
            TickOutcome::LevelUp(level)
        } else {
            TickOutcome::Continuing
        };

        let snapshot = query::game_snapshot(&self.world);
        Some(TickReport {
            tick: snapshot.tick,
            outcome,
            snapshot,
            events,
        })
    }

    /// Places a defender at the slot matching the coordinate.
    pub fn place_defender(&mut self, slot: WorldPoint) -> Result<DefenderId, PlacementError> {
        if self.halted {
            return Err(PlacementError::LevelInactive);
        }

        let mut events = Vec::new();
        world::apply(&mut self.world, Command::PlaceDefender { slot }, &mut events);
        events
            .into_iter()
            .find_map(|event| match event {
                Event::DefenderPlaced { defender, .. } => Some(Ok(defender)),
                Event::DefenderPlacementRejected { reason, .. } => Some(Err(reason)),
                _ => None,
            })
            .unwrap_or(Err(PlacementError::LevelInactive))
    }

    /// Spawns the current level's wave immediately, skipping the breather.
    ///
    /// Fails without side effects while a wave is in progress or enemies remain.
    pub fn start_wave(&mut self) -> Result<WaveNumber, WaveStartError> {
        if self.halted {
            return Err(WaveStartError::LevelInactive);
        }
        let profile = query::level_profile(&self.world)
            .map(|profile| profile.wave)
            .ok_or(WaveStartError::LevelInactive)?;

        let mut events = Vec::new();
        world::apply(&mut self.world, Command::SpawnWave { profile }, &mut events);
        events
            .into_iter()
            .find_map(|event| match event {
                Event::WaveSpawned { wave, .. } => Some(Ok(wave)),
                Event::WaveRejected { reason } => Some(Err(reason)),
                _ => None,
            })
            .unwrap_or(Err(WaveStartError::LevelInactive))
    }

    /// Stops the simulation for good and cancels any pending escalation.
    pub fn halt(&mut self) {
        if self.halted {
            return;
        }
        self.halted = true;
        self.level.cancel();
        info!(
            "simulation halted after {} ticks",
            query::tick_index(&self.world)
        );
    }

    fn flush_commands(&mut self, events: &mut Vec<Event>) {
        for command in self.commands.drain(..) {
            debug!("applying {command:?}");
            world::apply(&mut self.world, command, events);
        }
    }
}
