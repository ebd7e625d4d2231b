#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative game state management for Breach Defence.
//!
//! The [`World`] is the single mutable aggregate of the simulation. It is only
//! mutated through [`apply`], which funnels every command into a named
//! transition so the invariants on health, currency, slot occupancy and wave
//! overlap are enforced in exactly one place.

mod defenders;
mod enemies;
mod path;

pub use path::{PathModel, PathSample};

use breach_defence_core::{
    Command, Credits, DefenderId, EnemyId, Event, Health, LevelNumber, LevelPhase, LevelProfile,
    PlacementError, Ruleset, WaveNumber, WaveProfile, WaveStartError, WorldPoint,
};
use log::{debug, info};

use defenders::DefenderRoster;
use enemies::{DamageOutcome, EnemyPool};

/// Represents the authoritative Breach Defence game state.
#[derive(Debug)]
pub struct World {
    rules: Ruleset,
    path: PathModel,
    phase: LevelPhase,
    level: LevelNumber,
    lives: u32,
    currency: Credits,
    wave: WaveNumber,
    wave_in_progress: bool,
    enemies: EnemyPool,
    defenders: DefenderRoster,
    tick_index: u64,
}

impl World {
    /// Creates a world at the start of the first level.
    #[must_use]
    pub fn new(rules: Ruleset) -> Self {
        let path = PathModel::new(rules.path());
        let defenders = DefenderRoster::new(rules.slots());
        let mut world = Self {
            rules,
            path,
            phase: LevelPhase::Active(LevelNumber::FIRST),
            level: LevelNumber::FIRST,
            lives: 0,
            currency: Credits::default(),
            wave: WaveNumber::default(),
            wave_in_progress: false,
            enemies: EnemyPool::new(),
            defenders,
            tick_index: 0,
        };
        world.reset_level(LevelNumber::FIRST);
        world
    }

    fn level_profile(&self) -> Option<&LevelProfile> {
        self.rules.level(self.level)
    }

    fn reset_level(&mut self, level: LevelNumber) {
        let profile = self.rules.level(level).copied();
        self.level = level;
        self.phase = LevelPhase::Active(level);
        self.lives = profile.map_or(0, |profile| profile.starting_lives);
        self.currency = Credits::new(profile.map_or(0, |profile| profile.starting_currency));
        self.wave = WaveNumber::default();
        self.wave_in_progress = false;
        self.enemies.clear();
        self.defenders.clear();
    }

    fn advance(&mut self, out_events: &mut Vec<Event>) {
        self.defenders.tick_cooldowns();

        let breached = self.enemies.advance(&self.path, self.rules.tick_scale());
        for enemy in breached {
            self.lives = self.lives.saturating_sub(1);
            debug!(
                "enemy {} breached, {} lives remaining",
                enemy.get(),
                self.lives
            );
            out_events.push(Event::EnemyBreached {
                enemy,
                lives_remaining: self.lives,
            });
        }
    }

    fn try_place(
        &mut self,
        requested: WorldPoint,
    ) -> Result<(DefenderId, WorldPoint, Credits), PlacementError> {
        if !self.phase.is_active() {
            return Err(PlacementError::LevelInactive);
        }
        let profile = self
            .level_profile()
            .map(|profile| profile.defender)
            .ok_or(PlacementError::LevelInactive)?;

        let (defender, slot) = self
            .defenders
            .try_place(requested, &profile, &mut self.currency)?;
        Ok((defender, slot, Credits::new(profile.cost)))
    }

    fn try_spawn_wave(&mut self, profile: &WaveProfile) -> Result<WaveNumber, WaveStartError> {
        if !self.phase.is_active() {
            return Err(WaveStartError::LevelInactive);
        }
        if self.wave_in_progress {
            return Err(WaveStartError::WaveInProgress);
        }
        if !self.enemies.is_empty() {
            return Err(WaveStartError::EnemiesRemaining);
        }

        self.wave = self.wave.next();
        self.wave_in_progress = true;
        let _ = self.enemies.spawn_wave(profile);
        Ok(self.wave)
    }

    fn apply_damage(
        &mut self,
        defender_id: DefenderId,
        enemy: EnemyId,
        out_events: &mut Vec<Event>,
    ) {
        if !self.phase.is_active() {
            return;
        }
        let reward = Credits::new(self.level_profile().map_or(0, |profile| profile.kill_reward));

        let Some(defender) = self.defenders.get_mut(defender_id) else {
            return;
        };
        if defender.cooldown_remaining > 0 {
            return;
        }
        let Some(outcome) = self.enemies.apply_damage(enemy, defender.damage) else {
            return;
        };
        defender.cooldown_remaining = defender.cooldown_ticks;

        match outcome {
            DamageOutcome::Wounded(health) => out_events.push(Event::EnemyDamaged {
                enemy,
                defender: defender_id,
                health,
            }),
            DamageOutcome::Killed => {
                self.currency = self.currency.saturating_add(reward);
                out_events.push(Event::EnemyDamaged {
                    enemy,
                    defender: defender_id,
                    health: Health::new(0),
                });
                out_events.push(Event::EnemyKilled {
                    enemy,
                    defender: defender_id,
                    reward,
                });
            }
        }
    }

    fn conclude_level(&mut self, out_events: &mut Vec<Event>) {
        let LevelPhase::Active(level) = self.phase else {
            return;
        };
        if self.lives > 0 {
            debug!("ignoring level conclusion with {} lives left", self.lives);
            return;
        }

        if self.rules.level(level.next()).is_some() {
            info!("level {} lost, advancing", level.get());
            self.phase = LevelPhase::LevelClear(level);
            out_events.push(Event::LevelCleared { level });
        } else {
            info!("final level {} lost, escalation pending", level.get());
            self.phase = LevelPhase::Defeated(level);
            out_events.push(Event::DefeatStarted { level });
        }
    }

    fn start_level(&mut self, level: LevelNumber, out_events: &mut Vec<Event>) {
        let LevelPhase::LevelClear(previous) = self.phase else {
            return;
        };
        if level != previous.next() || self.rules.level(level).is_none() {
            debug!("ignoring request to start level {}", level.get());
            return;
        }

        self.reset_level(level);
        info!("level {} started", level.get());
        out_events.push(Event::LevelStarted { level });
    }
}

/// Applies the provided command to the world, mutating state deterministically.
///
/// Once the world escalated, every command is ignored.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    if world.phase.is_terminal() {
        return;
    }

    match command {
        Command::Tick => {
            world.tick_index = world.tick_index.saturating_add(1);
            out_events.push(Event::TimeAdvanced {
                tick: world.tick_index,
            });
            if world.phase.is_active() {
                world.advance(out_events);
            }
        }
        Command::PlaceDefender { slot } => match world.try_place(slot) {
            Ok((defender, slot, cost)) => {
                debug!(
                    "defender {} placed at ({}, {})",
                    defender.get(),
                    slot.x(),
                    slot.y()
                );
                out_events.push(Event::DefenderPlaced {
                    defender,
                    slot,
                    cost,
                });
            }
            Err(reason) => {
                debug!("placement at ({}, {}) rejected: {reason}", slot.x(), slot.y());
                out_events.push(Event::DefenderPlacementRejected { slot, reason });
            }
        },
        Command::SpawnWave { profile } => match world.try_spawn_wave(&profile) {
            Ok(wave) => {
                debug!("wave {} spawned with {} enemies", wave.get(), profile.size);
                out_events.push(Event::WaveSpawned {
                    wave,
                    enemies: profile.size,
                });
            }
            Err(reason) => {
                debug!("wave spawn rejected: {reason}");
                out_events.push(Event::WaveRejected { reason });
            }
        },
        Command::CompleteWave => {
            if world.phase.is_active() && world.wave_in_progress && world.enemies.is_empty() {
                world.wave_in_progress = false;
                out_events.push(Event::WaveCleared { wave: world.wave });
            }
        }
        Command::FireAt { defender, enemy } => world.apply_damage(defender, enemy, out_events),
        Command::ConcludeLevel => world.conclude_level(out_events),
        Command::StartLevel { level } => world.start_level(level, out_events),
        Command::Escalate => {
            let level = world.level;
            world.phase = LevelPhase::Escalated;
            info!("escalating from level {}", level.get());
            out_events.push(Event::Escalated { level });
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use breach_defence_core::{
        Credits, DefenderFrame, DefenderId, DefenderSnapshot, DefenderView, EnemyFrame,
        EnemySnapshot, EnemyView, GameSnapshot, LevelNumber, LevelPhase, LevelProfile, Ruleset,
        WaveStatus, WorldPoint,
    };

    use super::{PathModel, World};

    /// Provides read-only access to the validated rules the world runs on.
    #[must_use]
    pub fn rules(world: &World) -> &Ruleset {
        &world.rules
    }

    /// Provides read-only access to the path enemies follow.
    #[must_use]
    pub fn path(world: &World) -> &PathModel {
        &world.path
    }

    /// Current level phase.
    #[must_use]
    pub fn phase(world: &World) -> LevelPhase {
        world.phase
    }

    /// Current level, or the last played level once escalated.
    #[must_use]
    pub fn level(world: &World) -> LevelNumber {
        world.level
    }

    /// Balance profile of the current level.
    #[must_use]
    pub fn level_profile(world: &World) -> Option<&LevelProfile> {
        world.level_profile()
    }

    /// Lives remaining in the current level.
    #[must_use]
    pub fn lives(world: &World) -> u32 {
        world.lives
    }

    /// Currency balance.
    #[must_use]
    pub fn currency(world: &World) -> Credits {
        world.currency
    }

    /// Number of ticks applied so far.
    #[must_use]
    pub fn tick_index(world: &World) -> u64 {
        world.tick_index
    }

    /// Wave bookkeeping for the current level.
    #[must_use]
    pub fn wave_status(world: &World) -> WaveStatus {
        WaveStatus {
            wave: world.wave,
            in_progress: world.wave_in_progress,
            enemies_alive: world.enemies.len(),
        }
    }

    /// Captures a read-only view of the enemies on the path.
    #[must_use]
    pub fn enemy_view(world: &World) -> EnemyView {
        let snapshots = world
            .enemies
            .iter()
            .map(|enemy| {
                let sample = world.path.sample(enemy.position);
                EnemySnapshot {
                    id: enemy.id,
                    position: enemy.position,
                    point: sample.point,
                    heading: sample.heading,
                    health: enemy.health,
                    max_health: enemy.max_health,
                }
            })
            .collect();
        EnemyView::from_snapshots(snapshots)
    }

    /// Captures a read-only view of the placed defenders.
    #[must_use]
    pub fn defender_view(world: &World) -> DefenderView {
        let snapshots = world
            .defenders
            .iter()
            .map(|defender| DefenderSnapshot {
                id: defender.id,
                slot: defender.slot,
                damage: defender.damage,
                range: defender.range,
                cooldown_remaining: defender.cooldown_remaining,
            })
            .collect();
        DefenderView::from_snapshots(snapshots)
    }

    /// Placement slot and the defender occupying it, if any.
    #[derive(Clone, Copy, Debug, PartialEq)]
    pub struct SlotSnapshot {
        /// Coordinate of the slot.
        pub point: WorldPoint,
        /// Defender occupying the slot.
        pub occupant: Option<DefenderId>,
    }

    /// Enumerates the placement slots in authoring order.
    #[must_use]
    pub fn slots(world: &World) -> Vec<SlotSnapshot> {
        world
            .defenders
            .slots()
            .map(|(point, occupant)| SlotSnapshot { point, occupant })
            .collect()
    }

    /// Builds the immutable per-tick snapshot handed to renderers.
    #[must_use]
    pub fn game_snapshot(world: &World) -> GameSnapshot {
        let enemies = enemy_view(world)
            .iter()
            .map(|enemy| EnemyFrame {
                id: enemy.id,
                x: enemy.point.x(),
                y: enemy.point.y(),
                health_fraction: enemy.health.fraction_of(enemy.max_health),
            })
            .collect();
        let defenders = defender_view(world)
            .iter()
            .map(|defender| DefenderFrame {
                id: defender.id,
                x: defender.slot.x(),
                y: defender.slot.y(),
            })
            .collect();

        GameSnapshot {
            tick: world.tick_index,
            level: world.level,
            phase: world.phase,
            lives: world.lives,
            currency: world.currency,
            wave: world.wave,
            enemies,
            defenders,
            terminal: world.phase.is_terminal(),
        }
    }
}
