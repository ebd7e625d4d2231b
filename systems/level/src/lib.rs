#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that drives level progression, defeat and escalation.

use breach_defence_core::{Command, Event, LevelPhase, LossPolicy};
use log::{debug, info};

/// Configuration parameters required to construct the level controller.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    policy: LossPolicy,
    escalation_delay_ticks: u32,
}

impl Config {
    /// Creates a new configuration from the loss policy and defeat window.
    #[must_use]
    pub const fn new(policy: LossPolicy, escalation_delay_ticks: u32) -> Self {
        Self {
            policy,
            escalation_delay_ticks,
        }
    }
}

/// Level controller that turns world phases into progression commands.
#[derive(Debug)]
pub struct LevelController {
    policy: LossPolicy,
    escalation_delay_ticks: u32,
    pending_escalation: Option<u32>,
}

impl LevelController {
    /// Creates a new level controller using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            policy: config.policy,
            escalation_delay_ticks: config.escalation_delay_ticks,
            pending_escalation: None,
        }
    }

    /// Ticks left before a pending escalation fires.
    #[must_use]
    pub fn pending_escalation(&self) -> Option<u32> {
        self.pending_escalation
    }

    /// Drops any pending escalation.
    pub fn cancel(&mut self) {
        if self.pending_escalation.take().is_some() {
            info!("pending escalation cancelled");
        }
    }

    /// Consumes the tick's events and the world phase to emit level commands.
    ///
    /// Expected to run once per tick after every other system.
    pub fn handle(&mut self, events: &[Event], phase: LevelPhase, lives: u32, out: &mut Vec<Command>) {
        match phase {
            LevelPhase::Active(level) => {
                self.pending_escalation = None;
                match self.policy {
                    LossPolicy::ImmediateEscalation => {
                        let breached = events
                            .iter()
                            .any(|event| matches!(event, Event::EnemyBreached { .. }));
                        if breached {
                            info!("breach on level {}, escalating immediately", level.get());
                            out.push(Command::Escalate);
                        }
                    }
                    LossPolicy::LivesBased => {
                        if lives == 0 {
                            debug!("level {} out of lives", level.get());
                            out.push(Command::ConcludeLevel);
                        }
                    }
                }
            }
            LevelPhase::LevelClear(level) => {
                out.push(Command::StartLevel {
                    level: level.next(),
                });
            }
            LevelPhase::Defeated(level) => {
                let remaining = self
                    .pending_escalation
                    .get_or_insert(self.escalation_delay_ticks);
                if *remaining == 0 {
                    info!("defeat window on level {} elapsed", level.get());
                    out.push(Command::Escalate);
                } else {
                    *remaining -= 1;
                }
            }
            LevelPhase::Escalated => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use breach_defence_core::LevelNumber;

    #[test]
    fn cancel_clears_pending_escalation() {
        let mut controller = LevelController::new(Config::new(LossPolicy::LivesBased, 5));
        let mut out = Vec::new();
        controller.handle(&[], LevelPhase::Defeated(LevelNumber::FIRST), 0, &mut out);
        assert_eq!(controller.pending_escalation(), Some(4));

        controller.cancel();
        assert_eq!(controller.pending_escalation(), None);
        assert!(out.is_empty());
    }

    #[test]
    fn returning_to_play_forgets_the_countdown() {
        let mut controller = LevelController::new(Config::new(LossPolicy::LivesBased, 5));
        let mut out = Vec::new();
        controller.handle(&[], LevelPhase::Defeated(LevelNumber::FIRST), 0, &mut out);
        controller.handle(&[], LevelPhase::Active(LevelNumber::FIRST), 3, &mut out);
        assert_eq!(controller.pending_escalation(), None);
    }
}
