#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic wave director responsible for spawning and closing waves.

use breach_defence_core::{Command, Event, LevelPhase, WaveProfile, WaveStatus};
use log::debug;

/// Configuration parameters required to construct the wave director.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    interval_ticks: u32,
}

impl Config {
    /// Creates a new configuration using the provided breather between waves.
    #[must_use]
    pub const fn new(interval_ticks: u32) -> Self {
        Self { interval_ticks }
    }
}

/// Pure system that emits wave spawn and completion commands.
#[derive(Debug)]
pub struct WaveDirector {
    interval_ticks: u32,
    countdown: u32,
}

impl WaveDirector {
    /// Creates a new wave director using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            interval_ticks: config.interval_ticks,
            countdown: config.interval_ticks,
        }
    }

    /// Consumes the tick's events and the wave status to emit wave commands.
    ///
    /// A finished wave is closed first; the next wave only spawns after the
    /// breather elapsed on later ticks with an empty path.
    pub fn handle(
        &mut self,
        events: &[Event],
        phase: LevelPhase,
        status: WaveStatus,
        profile: Option<&WaveProfile>,
        out: &mut Vec<Command>,
    ) {
        if !phase.is_active() {
            self.countdown = self.interval_ticks;
            return;
        }

        if status.in_progress {
            self.countdown = self.interval_ticks;
            if status.enemies_alive == 0 {
                debug!("wave {} cleared", status.wave.get());
                out.push(Command::CompleteWave);
            }
            return;
        }

        if status.enemies_alive > 0 {
            return;
        }

        let ticked = events
            .iter()
            .any(|event| matches!(event, Event::TimeAdvanced { .. }));
        if ticked {
            self.countdown = self.countdown.saturating_sub(1);
        }
        if self.countdown > 0 {
            return;
        }

        let Some(profile) = profile else {
            return;
        };
        debug!(
            "spawning wave {} with {} enemies",
            status.wave.next().get(),
            profile.size
        );
        out.push(Command::SpawnWave { profile: *profile });
        self.countdown = self.interval_ticks;
    }
}
