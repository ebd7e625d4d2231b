//! Level-indexed balance configuration and its validated [`Ruleset`] form.
//!
//! Every tunable number of the simulation lives here. Authors describe a
//! [`SimulationConfig`] (usually through TOML), and [`SimulationConfig::validate`]
//! turns it into an immutable [`Ruleset`]. Hard authoring mistakes are reported
//! as [`ConfigError`] values; numeric edge cases such as zero-length path
//! segments or negative ranges are clamped once at this point so the tick loop
//! never has to re-check them.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{LevelNumber, LossPolicy, WorldPoint};

/// Interval between ticks used when the configuration leaves it unset.
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 100;

/// Factor converting enemy speed into path units advanced per tick.
pub const DEFAULT_TICK_SCALE: f32 = 0.1;

/// Maximum distance between a requested coordinate and the slot it selects.
pub const SLOT_MATCH_TOLERANCE: f32 = 0.5;

/// Author-facing simulation configuration.
///
/// Missing fields fall back to the built-in table returned by
/// [`SimulationConfig::default`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Wall-clock interval between ticks, in milliseconds.
    pub tick_interval_ms: u64,
    /// Factor converting enemy speed into path units per tick.
    pub tick_scale: f32,
    /// Breather ticks between a cleared wave and the next natural spawn.
    pub wave_interval_ticks: u32,
    /// Ticks between losing the final level and escalating.
    pub escalation_delay_ticks: u32,
    /// How breaches translate into level loss.
    pub loss_policy: LossPolicy,
    /// Waypoints of the path enemies follow.
    pub path: Vec<WorldPoint>,
    /// Coordinates eligible for defender placement.
    pub slots: Vec<WorldPoint>,
    /// Balance profile of every level, first level first.
    pub levels: Vec<LevelProfile>,
}

/// Balance numbers of a single level.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LevelProfile {
    /// Lives granted when the level starts.
    pub starting_lives: u32,
    /// Currency granted when the level starts.
    pub starting_currency: u32,
    /// Currency credited for every kill.
    pub kill_reward: u32,
    /// Defender statistics for the level.
    pub defender: DefenderProfile,
    /// Wave composition for the level.
    pub wave: WaveProfile,
}

/// Statistics shared by every defender placed during a level.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DefenderProfile {
    /// Currency debited on placement.
    pub cost: u32,
    /// Damage dealt per shot.
    pub damage: u32,
    /// Targeting range as Cartesian distance.
    pub range: f32,
    /// Ticks a defender waits after firing.
    pub cooldown_ticks: u32,
}

/// Composition of a single wave.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WaveProfile {
    /// Number of enemies spawned.
    pub size: u32,
    /// Base speed of every enemy, before tick scaling.
    pub speed: f32,
    /// Health every enemy spawns with.
    pub max_health: u32,
    /// Speed multiplier applied to the first enemy of the wave.
    pub leader_speed_multiplier: f32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            tick_scale: DEFAULT_TICK_SCALE,
            wave_interval_ticks: 30,
            escalation_delay_ticks: 20,
            loss_policy: LossPolicy::LivesBased,
            path: vec![
                WorldPoint::new(0.0, 200.0),
                WorldPoint::new(100.0, 200.0),
                WorldPoint::new(100.0, 60.0),
                WorldPoint::new(300.0, 60.0),
                WorldPoint::new(300.0, 300.0),
                WorldPoint::new(400.0, 300.0),
            ],
            slots: vec![
                WorldPoint::new(50.0, 150.0),
                WorldPoint::new(160.0, 130.0),
                WorldPoint::new(200.0, 110.0),
                WorldPoint::new(250.0, 120.0),
                WorldPoint::new(240.0, 240.0),
                WorldPoint::new(350.0, 250.0),
            ],
            levels: vec![
                LevelProfile {
                    starting_lives: 5,
                    starting_currency: 100,
                    kill_reward: 10,
                    defender: DefenderProfile {
                        cost: 50,
                        damage: 25,
                        range: 110.0,
                        cooldown_ticks: 5,
                    },
                    wave: WaveProfile {
                        size: 5,
                        speed: 0.4,
                        max_health: 50,
                        leader_speed_multiplier: 1.5,
                    },
                },
                LevelProfile {
                    starting_lives: 5,
                    starting_currency: 150,
                    kill_reward: 12,
                    defender: DefenderProfile {
                        cost: 60,
                        damage: 30,
                        range: 110.0,
                        cooldown_ticks: 4,
                    },
                    wave: WaveProfile {
                        size: 10,
                        speed: 0.7,
                        max_health: 100,
                        leader_speed_multiplier: 1.8,
                    },
                },
            ],
        }
    }
}

impl SimulationConfig {
    /// Parses a configuration from TOML, filling omitted fields with defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    /// Validates the configuration and clamps numeric edge cases.
    pub fn validate(self) -> Result<Ruleset, ConfigError> {
        if self.levels.is_empty() {
            return Err(ConfigError::MissingLevels);
        }

        for (index, profile) in self.levels.iter().enumerate() {
            let speed = profile.wave.speed;
            if !(speed.is_finite() && speed > 0.0) {
                return Err(ConfigError::StationaryWave { level: index + 1 });
            }
        }

        let path = normalize_path(&self.path)?;
        let slots = normalize_slots(&self.slots)?;
        let levels = self.levels.into_iter().map(LevelProfile::clamped).collect();

        let tick_scale = if self.tick_scale.is_finite() && self.tick_scale > 0.0 {
            self.tick_scale
        } else {
            DEFAULT_TICK_SCALE
        };

        Ok(Ruleset {
            tick_interval: Duration::from_millis(self.tick_interval_ms.max(1)),
            tick_scale,
            wave_interval_ticks: self.wave_interval_ticks,
            escalation_delay_ticks: self.escalation_delay_ticks,
            loss_policy: self.loss_policy,
            path,
            slots,
            levels,
        })
    }
}

impl LevelProfile {
    fn clamped(self) -> Self {
        Self {
            defender: DefenderProfile {
                range: non_negative(self.defender.range),
                ..self.defender
            },
            wave: WaveProfile {
                leader_speed_multiplier: if self.wave.leader_speed_multiplier.is_finite()
                    && self.wave.leader_speed_multiplier > 0.0
                {
                    self.wave.leader_speed_multiplier
                } else {
                    1.0
                },
                ..self.wave
            },
            ..self
        }
    }
}

/// Validated, immutable balance rules consumed by the world and systems.
#[derive(Clone, Debug, PartialEq)]
pub struct Ruleset {
    tick_interval: Duration,
    tick_scale: f32,
    wave_interval_ticks: u32,
    escalation_delay_ticks: u32,
    loss_policy: LossPolicy,
    path: Vec<WorldPoint>,
    slots: Vec<WorldPoint>,
    levels: Vec<LevelProfile>,
}

impl Ruleset {
    /// Wall-clock interval between ticks.
    #[must_use]
    pub const fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    /// Factor converting enemy speed into path units per tick.
    #[must_use]
    pub const fn tick_scale(&self) -> f32 {
        self.tick_scale
    }

    /// Breather ticks between waves.
    #[must_use]
    pub const fn wave_interval_ticks(&self) -> u32 {
        self.wave_interval_ticks
    }

    /// Ticks between losing the final level and escalating.
    #[must_use]
    pub const fn escalation_delay_ticks(&self) -> u32 {
        self.escalation_delay_ticks
    }

    /// Active loss policy.
    #[must_use]
    pub const fn loss_policy(&self) -> LossPolicy {
        self.loss_policy
    }

    /// Waypoints of the path, free of zero-length segments.
    #[must_use]
    pub fn path(&self) -> &[WorldPoint] {
        &self.path
    }

    /// Placement slot coordinates.
    #[must_use]
    pub fn slots(&self) -> &[WorldPoint] {
        &self.slots
    }

    /// Balance profile of the provided level, if configured.
    #[must_use]
    pub fn level(&self, level: LevelNumber) -> Option<&LevelProfile> {
        let index = usize::try_from(level.get()).ok()?.checked_sub(1)?;
        self.levels.get(index)
    }

    /// Number of configured levels.
    #[must_use]
    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    /// Returns a copy of the rules using a different loss policy.
    #[must_use]
    pub fn with_loss_policy(mut self, loss_policy: LossPolicy) -> Self {
        self.loss_policy = loss_policy;
        self
    }
}

/// Errors raised while loading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The TOML source could not be parsed.
    #[error("failed to parse configuration")]
    Parse(#[from] toml::de::Error),
    /// No level profiles were configured.
    #[error("configuration must define at least one level")]
    MissingLevels,
    /// A level's enemies would never move.
    #[error("level {level} needs a positive, finite enemy speed")]
    StationaryWave {
        /// One-based index of the offending level.
        level: usize,
    },
    /// The path collapses to fewer than two distinct waypoints.
    #[error("path needs at least two distinct waypoints, found {distinct}")]
    DegeneratePath {
        /// Number of distinct waypoints left after normalization.
        distinct: usize,
    },
    /// A waypoint has a non-finite coordinate.
    #[error("waypoint {index} has a non-finite coordinate")]
    NonFiniteWaypoint {
        /// Index of the offending waypoint.
        index: usize,
    },
    /// A slot has a non-finite coordinate.
    #[error("slot {index} has a non-finite coordinate")]
    NonFiniteSlot {
        /// Index of the offending slot.
        index: usize,
    },
    /// Two slots are too close to be told apart.
    #[error("slot {index} overlaps an earlier slot")]
    DuplicateSlot {
        /// Index of the later of the two slots.
        index: usize,
    },
}

fn normalize_path(points: &[WorldPoint]) -> Result<Vec<WorldPoint>, ConfigError> {
    let mut path: Vec<WorldPoint> = Vec::with_capacity(points.len());
    for (index, point) in points.iter().enumerate() {
        if !point.is_finite() {
            return Err(ConfigError::NonFiniteWaypoint { index });
        }
        if path.last() == Some(point) {
            continue;
        }
        path.push(*point);
    }

    if path.len() < 2 {
        return Err(ConfigError::DegeneratePath {
            distinct: path.len(),
        });
    }
    Ok(path)
}

fn normalize_slots(points: &[WorldPoint]) -> Result<Vec<WorldPoint>, ConfigError> {
    let mut slots: Vec<WorldPoint> = Vec::with_capacity(points.len());
    for (index, point) in points.iter().enumerate() {
        if !point.is_finite() {
            return Err(ConfigError::NonFiniteSlot { index });
        }
        if slots
            .iter()
            .any(|existing| existing.distance_to(*point) <= SLOT_MATCH_TOLERANCE)
        {
            return Err(ConfigError::DuplicateSlot { index });
        }
        slots.push(*point);
    }
    Ok(slots)
}

fn non_negative(value: f32) -> f32 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_validates() {
        let rules = SimulationConfig::default()
            .validate()
            .expect("default config");
        assert_eq!(rules.level_count(), 2);
        assert_eq!(rules.tick_interval(), Duration::from_millis(100));

        let first = rules.level(LevelNumber::FIRST).expect("level 1");
        let second = rules.level(LevelNumber::new(2)).expect("level 2");
        assert!(second.wave.size > first.wave.size);
        assert!(second.wave.speed > first.wave.speed);
        assert!(second.wave.max_health > first.wave.max_health);
        assert!(rules.level(LevelNumber::new(3)).is_none());
    }

    #[test]
    fn consecutive_duplicate_waypoints_are_dropped() {
        let config = SimulationConfig {
            path: vec![
                WorldPoint::new(0.0, 0.0),
                WorldPoint::new(0.0, 0.0),
                WorldPoint::new(10.0, 0.0),
                WorldPoint::new(10.0, 0.0),
                WorldPoint::new(10.0, 10.0),
            ],
            ..SimulationConfig::default()
        };

        let rules = config.validate().expect("valid config");
        assert_eq!(rules.path().len(), 3);
    }

    #[test]
    fn path_collapsing_to_one_point_is_rejected() {
        let config = SimulationConfig {
            path: vec![WorldPoint::new(5.0, 5.0), WorldPoint::new(5.0, 5.0)],
            ..SimulationConfig::default()
        };

        assert!(matches!(
            config.validate(),
            Err(ConfigError::DegeneratePath { distinct: 1 })
        ));
    }

    #[test]
    fn non_finite_waypoint_is_rejected() {
        let config = SimulationConfig {
            path: vec![WorldPoint::new(0.0, 0.0), WorldPoint::new(f32::NAN, 1.0)],
            ..SimulationConfig::default()
        };

        assert!(matches!(
            config.validate(),
            Err(ConfigError::NonFiniteWaypoint { index: 1 })
        ));
    }

    #[test]
    fn overlapping_slots_are_rejected() {
        let config = SimulationConfig {
            slots: vec![WorldPoint::new(1.0, 1.0), WorldPoint::new(1.2, 1.0)],
            ..SimulationConfig::default()
        };

        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicateSlot { index: 1 })
        ));
    }

    #[test]
    fn stationary_waves_are_rejected() {
        for speed in [0.0, -1.0, f32::NAN] {
            let mut config = SimulationConfig::default();
            config.levels[1].wave.speed = speed;

            assert!(matches!(
                config.validate(),
                Err(ConfigError::StationaryWave { level: 2 })
            ));
        }
    }

    #[test]
    fn missing_levels_are_rejected() {
        let config = SimulationConfig {
            levels: Vec::new(),
            ..SimulationConfig::default()
        };

        assert!(matches!(config.validate(), Err(ConfigError::MissingLevels)));
    }

    #[test]
    fn numeric_edge_cases_are_clamped() {
        let mut config = SimulationConfig {
            tick_interval_ms: 0,
            tick_scale: -2.0,
            ..SimulationConfig::default()
        };
        config.levels[0].wave.leader_speed_multiplier = 0.0;
        config.levels[0].defender.range = f32::NAN;

        let rules = config.validate().expect("valid config");
        let level = rules.level(LevelNumber::FIRST).expect("level 1");
        assert_eq!(rules.tick_interval(), Duration::from_millis(1));
        assert_eq!(rules.tick_scale(), DEFAULT_TICK_SCALE);
        assert_eq!(level.wave.leader_speed_multiplier, 1.0);
        assert_eq!(level.defender.range, 0.0);
    }

    #[test]
    fn toml_overrides_keep_remaining_defaults() {
        let config = SimulationConfig::from_toml_str(
            r#"
            tick_interval_ms = 50
            loss_policy = "immediate_escalation"
            path = [{ x = 0.0, y = 0.0 }, { x = 10.0, y = 0.0 }]
            "#,
        )
        .expect("parse");

        assert_eq!(config.tick_interval_ms, 50);
        assert_eq!(config.loss_policy, LossPolicy::ImmediateEscalation);
        assert_eq!(config.path.len(), 2);
        assert_eq!(config.levels, SimulationConfig::default().levels);
    }

    #[test]
    fn malformed_toml_reports_parse_error() {
        let result = SimulationConfig::from_toml_str("tick_scale = \"fast\"");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
