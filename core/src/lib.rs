#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Breach Defence simulation.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters and systems submit
//! [`Command`] values describing desired mutations, the world executes those
//! commands via its `apply` entry point, and then broadcasts [`Event`] values
//! for systems to react to deterministically. Systems consume event streams,
//! query immutable views, and respond exclusively with new command batches.

mod balance;

pub use balance::{
    ConfigError, DefenderProfile, LevelProfile, Ruleset, SimulationConfig, WaveProfile,
    DEFAULT_TICK_INTERVAL_MS, DEFAULT_TICK_SCALE, SLOT_MATCH_TOLERANCE,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Advances the simulation by one fixed tick.
    ///
    /// Moves every enemy along the path, resolves breaches and ticks defender
    /// cooldowns down before any other command of the same tick is applied.
    Tick,
    /// Requests placement of a defender on the slot at the provided coordinate.
    PlaceDefender {
        /// Coordinate of the placement slot chosen by the player.
        slot: WorldPoint,
    },
    /// Requests that a new wave be spawned using the provided profile.
    SpawnWave {
        /// Size, speed and health of the enemies composing the wave.
        profile: WaveProfile,
    },
    /// Requests that the wave in progress be marked as finished.
    CompleteWave,
    /// Requests that a defender fire a single shot at an enemy.
    FireAt {
        /// Defender firing the shot.
        defender: DefenderId,
        /// Enemy receiving the damage.
        enemy: EnemyId,
    },
    /// Requests that the active level be concluded after its lives ran out.
    ConcludeLevel,
    /// Requests that the provided level begin with fresh resources.
    StartLevel {
        /// Level that should become active.
        level: LevelNumber,
    },
    /// Requests the one-shot hand-off to the external escalation collaborator.
    Escalate,
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Index of the tick that just started.
        tick: u64,
    },
    /// Reports that an enemy reached the end of the path without being killed.
    EnemyBreached {
        /// Identifier of the enemy that breached.
        enemy: EnemyId,
        /// Lives remaining after the breach was accounted for.
        lives_remaining: u32,
    },
    /// Reports that a defender shot damaged an enemy.
    EnemyDamaged {
        /// Identifier of the enemy that was hit.
        enemy: EnemyId,
        /// Defender responsible for the shot.
        defender: DefenderId,
        /// Health remaining after the shot landed.
        health: Health,
    },
    /// Reports that an enemy was killed and removed from the pool.
    EnemyKilled {
        /// Identifier of the enemy that died.
        enemy: EnemyId,
        /// Defender that landed the final shot.
        defender: DefenderId,
        /// Currency credited for the kill.
        reward: Credits,
    },
    /// Confirms that a defender was placed into the world.
    DefenderPlaced {
        /// Identifier assigned to the defender by the world.
        defender: DefenderId,
        /// Coordinate of the slot the defender occupies.
        slot: WorldPoint,
        /// Currency debited for the placement.
        cost: Credits,
    },
    /// Reports that a defender placement request was rejected.
    DefenderPlacementRejected {
        /// Coordinate provided in the placement request.
        slot: WorldPoint,
        /// Specific reason the placement failed.
        reason: PlacementError,
    },
    /// Confirms that a new wave entered the path.
    WaveSpawned {
        /// Number of the wave that started.
        wave: WaveNumber,
        /// Number of enemies spawned for the wave.
        enemies: u32,
    },
    /// Reports that a wave spawn request was rejected.
    WaveRejected {
        /// Specific reason the spawn failed.
        reason: WaveStartError,
    },
    /// Announces that the wave in progress has no enemies left.
    WaveCleared {
        /// Number of the wave that finished.
        wave: WaveNumber,
    },
    /// Announces that a level was lost while a further level remains.
    LevelCleared {
        /// Level that was concluded.
        level: LevelNumber,
    },
    /// Announces that the final level was lost and escalation is pending.
    DefeatStarted {
        /// Level that was lost.
        level: LevelNumber,
    },
    /// Announces that a level started with fresh lives and currency.
    LevelStarted {
        /// Level that became active.
        level: LevelNumber,
    },
    /// Announces the terminal hand-off to the escalation collaborator.
    Escalated {
        /// Level that was active when escalation fired.
        level: LevelNumber,
    },
}

/// Top-level state of the level state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LevelPhase {
    /// The level is being played.
    Active(LevelNumber),
    /// The level ended with a further level queued to start on the next tick.
    LevelClear(LevelNumber),
    /// The final level ended; escalation fires once the defeat window elapses.
    Defeated(LevelNumber),
    /// Control has been handed to the escalation collaborator.
    Escalated,
}

impl LevelPhase {
    /// Reports whether the phase accepts gameplay commands.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Active(_))
    }

    /// Reports whether the phase is the terminal escalated state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Escalated)
    }

    /// Level associated with the phase, if any.
    #[must_use]
    pub const fn level(&self) -> Option<LevelNumber> {
        match self {
            Self::Active(level) | Self::LevelClear(level) | Self::Defeated(level) => Some(*level),
            Self::Escalated => None,
        }
    }
}

/// Decides how breaches translate into level loss.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossPolicy {
    /// Breaches cost lives; running out advances the level or escalates on the last one.
    #[default]
    LivesBased,
    /// Any breach escalates immediately.
    ImmediateEscalation,
}

/// Unique identifier assigned to an enemy.
///
/// Identifiers grow monotonically, so ordering by identifier is spawn order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EnemyId(u32);

impl EnemyId {
    /// Creates a new enemy identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a defender.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DefenderId(u32);

impl DefenderId {
    /// Creates a new defender identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the defender identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// One-based level index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LevelNumber(u32);

impl LevelNumber {
    /// The level every simulation starts in.
    pub const FIRST: Self = Self(1);

    /// Creates a level number, treating zero as the first level.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        if value == 0 {
            Self::FIRST
        } else {
            Self(value)
        }
    }

    /// Retrieves the one-based level index.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Level that follows this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

/// Counter of waves spawned within the current level. Zero before the first wave.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct WaveNumber(u32);

impl WaveNumber {
    /// Creates a new wave number.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric wave counter.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Wave number that follows this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

/// Point in the Cartesian plane the path and slots are authored in.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorldPoint {
    x: f32,
    y: f32,
}

impl WorldPoint {
    /// Creates a new point from its coordinates.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Horizontal coordinate.
    #[must_use]
    pub const fn x(&self) -> f32 {
        self.x
    }

    /// Vertical coordinate.
    #[must_use]
    pub const fn y(&self) -> f32 {
        self.y
    }

    /// Euclidean distance between two points.
    #[must_use]
    pub fn distance_to(self, other: WorldPoint) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Reports whether both coordinates are finite numbers.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Relative tolerance for snapping travelled distance onto a segment boundary.
const BOUNDARY_SNAP: f64 = 1e-5;

/// Continuous progress along the path.
///
/// The integer part selects the segment, the fractional part is the
/// interpolation progress within that segment. Values are never negative.
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct PathPosition(f32);

impl PathPosition {
    /// Start of the path.
    pub const START: Self = Self(0.0);

    /// Creates a path position, clamping negative and non-finite values to the start.
    #[must_use]
    pub fn new(value: f32) -> Self {
        if value.is_finite() && value > 0.0 {
            Self(value)
        } else {
            Self::START
        }
    }

    /// Raw path position.
    #[must_use]
    pub const fn get(&self) -> f32 {
        self.0
    }

    /// Index of the segment containing the position.
    #[must_use]
    pub fn segment(&self) -> usize {
        self.0.floor() as usize
    }

    /// Progress within the current segment in `[0, 1)`.
    #[must_use]
    pub fn fraction(&self) -> f32 {
        self.0 - self.0.floor()
    }

    /// Position reached after `ticks` steps of `step` path units from the start.
    ///
    /// The distance is a product rather than a running sum, and values within
    /// rounding distance of a segment boundary are snapped onto it. The result
    /// never decreases as `ticks` grows.
    #[must_use]
    pub fn after_ticks(step: f64, ticks: u64) -> Self {
        if !step.is_finite() || step <= 0.0 {
            return Self::START;
        }
        let travelled = step * ticks as f64;
        let boundary = travelled.round();
        if (travelled - boundary).abs() <= BOUNDARY_SNAP * boundary.max(1.0) {
            Self::new(boundary as f32)
        } else {
            Self::new(travelled as f32)
        }
    }
}

/// Hit points carried by an enemy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Health(u32);

impl Health {
    /// Creates a new health value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric health value.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Reports whether no health remains.
    #[must_use]
    pub const fn is_depleted(&self) -> bool {
        self.0 == 0
    }

    /// Health remaining after applying `damage`, floored at zero.
    #[must_use]
    pub const fn after(self, damage: Damage) -> Self {
        Self(self.0.saturating_sub(damage.get()))
    }

    /// Ratio of this health to `max`, in `[0, 1]`.
    #[must_use]
    pub fn fraction_of(self, max: Health) -> f32 {
        if max.0 == 0 {
            return 0.0;
        }
        (self.0.min(max.0) as f32) / (max.0 as f32)
    }
}

/// Damage dealt by a single defender shot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Damage(u32);

impl Damage {
    /// Creates a new damage value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric damage value.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Currency balance. Unsigned, so it can never go negative.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Credits(u32);

impl Credits {
    /// Creates a new currency amount.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric amount.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Subtracts `cost`, returning `None` when the balance cannot cover it.
    #[must_use]
    pub const fn checked_sub(self, cost: Credits) -> Option<Self> {
        match self.0.checked_sub(cost.0) {
            Some(value) => Some(Self(value)),
            None => None,
        }
    }

    /// Adds `amount`, saturating at the numeric maximum.
    #[must_use]
    pub const fn saturating_add(self, amount: Credits) -> Self {
        Self(self.0.saturating_add(amount.0))
    }
}

/// Reasons a defender placement request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
pub enum PlacementError {
    /// The level is not being played, so placement is disabled.
    #[error("placement is only possible while a level is active")]
    LevelInactive,
    /// No placement slot exists at the requested coordinate.
    #[error("no placement slot at the requested coordinate")]
    UnknownSlot,
    /// The slot already holds a defender.
    #[error("the placement slot is already occupied")]
    Occupied,
    /// The currency balance does not cover the defender cost.
    #[error("not enough currency to place a defender")]
    InsufficientFunds,
}

/// Reasons a wave spawn request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
pub enum WaveStartError {
    /// The level is not being played, so waves cannot start.
    #[error("waves can only start while a level is active")]
    LevelInactive,
    /// A wave is already in progress.
    #[error("a wave is already in progress")]
    WaveInProgress,
    /// Enemies from a previous wave are still on the path.
    #[error("enemies remain on the path")]
    EnemiesRemaining,
}

/// Immutable representation of a single enemy's state used for queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnemySnapshot {
    /// Unique identifier assigned to the enemy.
    pub id: EnemyId,
    /// Progress along the path.
    pub position: PathPosition,
    /// Cartesian location derived from the path position.
    pub point: WorldPoint,
    /// Heading of the segment the enemy travels on, in radians.
    pub heading: f32,
    /// Health remaining.
    pub health: Health,
    /// Health the enemy spawned with.
    pub max_health: Health,
}

/// Read-only snapshot describing all enemies on the path.
#[derive(Clone, Debug, Default)]
pub struct EnemyView {
    snapshots: Vec<EnemySnapshot>,
}

impl EnemyView {
    /// Creates a new enemy view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<EnemySnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured enemy snapshots in spawn order.
    pub fn iter(&self) -> impl Iterator<Item = &EnemySnapshot> {
        self.snapshots.iter()
    }

    /// Number of enemies captured by the view.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether the view holds no enemies.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

/// Immutable representation of a single defender's state used for queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DefenderSnapshot {
    /// Identifier allocated to the defender by the world.
    pub id: DefenderId,
    /// Coordinate of the slot the defender occupies.
    pub slot: WorldPoint,
    /// Damage dealt per shot.
    pub damage: Damage,
    /// Targeting range measured as Cartesian distance.
    pub range: f32,
    /// Ticks left before the defender may fire again.
    pub cooldown_remaining: u32,
}

/// Read-only snapshot describing all placed defenders.
#[derive(Clone, Debug, Default)]
pub struct DefenderView {
    snapshots: Vec<DefenderSnapshot>,
}

impl DefenderView {
    /// Creates a new defender view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<DefenderSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured defender snapshots in placement order.
    pub fn iter(&self) -> impl Iterator<Item = &DefenderSnapshot> {
        self.snapshots.iter()
    }

    /// Number of defenders captured by the view.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether the view holds no defenders.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

/// Wave bookkeeping exposed to the wave director.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WaveStatus {
    /// Number of waves spawned in the current level.
    pub wave: WaveNumber,
    /// Indicates whether the latest wave still has to be cleared.
    pub in_progress: bool,
    /// Number of enemies currently on the path.
    pub enemies_alive: usize,
}

/// Renderable enemy entry of a [`GameSnapshot`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnemyFrame {
    /// Identifier of the enemy.
    pub id: EnemyId,
    /// Horizontal coordinate.
    pub x: f32,
    /// Vertical coordinate.
    pub y: f32,
    /// Remaining health as a fraction of maximum health.
    pub health_fraction: f32,
}

/// Renderable defender entry of a [`GameSnapshot`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DefenderFrame {
    /// Identifier of the defender.
    pub id: DefenderId,
    /// Horizontal coordinate.
    pub x: f32,
    /// Vertical coordinate.
    pub y: f32,
}

/// Immutable per-tick snapshot handed to rendering collaborators.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameSnapshot {
    /// Index of the tick the snapshot was captured after.
    pub tick: u64,
    /// Current level; the last played level once escalated.
    pub level: LevelNumber,
    /// Current level phase.
    pub phase: LevelPhase,
    /// Lives (core integrity) remaining.
    pub lives: u32,
    /// Currency balance.
    pub currency: Credits,
    /// Number of waves spawned in the current level.
    pub wave: WaveNumber,
    /// Enemies on the path, in spawn order.
    pub enemies: Vec<EnemyFrame>,
    /// Placed defenders, in placement order.
    pub defenders: Vec<DefenderFrame>,
    /// Set once the simulation escalated and stopped mutating.
    pub terminal: bool,
}

/// Result of a single simulation tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// Play continues in the same level.
    Continuing,
    /// A new level started during the tick.
    LevelUp(LevelNumber),
    /// The simulation escalated during the tick.
    Escalate,
}
