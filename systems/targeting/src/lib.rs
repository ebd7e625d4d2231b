#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that selects defender targets and emits firing commands.

use breach_defence_core::{Command, DefenderView, EnemyId, EnemyView, LevelPhase, WorldPoint};

/// Targeting system that reuses scratch buffers to avoid repeated allocations.
#[derive(Debug, Default)]
pub struct Targeting {
    enemy_workspace: Vec<EnemyCandidate>,
}

impl Targeting {
    /// Creates a new targeting system with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits one `Command::FireAt` per ready defender with an enemy in range.
    ///
    /// Defenders resolve in placement order and each picks the earliest spawned
    /// enemy within its range. Damage committed by earlier defenders is
    /// projected, so no defender fires at an enemy already killed this tick.
    pub fn handle(
        &mut self,
        phase: LevelPhase,
        defenders: &DefenderView,
        enemies: &EnemyView,
        out: &mut Vec<Command>,
    ) {
        if !phase.is_active() {
            return;
        }

        if defenders.is_empty() || enemies.is_empty() {
            return;
        }

        self.prepare_enemy_workspace(enemies);

        for defender in defenders.iter() {
            if defender.cooldown_remaining > 0 {
                continue;
            }

            let Some(candidate) = self
                .enemy_workspace
                .iter_mut()
                .filter(|candidate| candidate.projected_health > 0)
                .find(|candidate| candidate.within(defender.slot, defender.range))
            else {
                continue;
            };

            candidate.projected_health = candidate
                .projected_health
                .saturating_sub(defender.damage.get());
            out.push(Command::FireAt {
                defender: defender.id,
                enemy: candidate.id,
            });
        }
    }

    // Enemy views iterate in spawn order, which the selection relies on.
    fn prepare_enemy_workspace(&mut self, enemies: &EnemyView) {
        self.enemy_workspace.clear();
        self.enemy_workspace.reserve(enemies.len());

        for snapshot in enemies.iter() {
            self.enemy_workspace.push(EnemyCandidate {
                id: snapshot.id,
                point: snapshot.point,
                projected_health: snapshot.health.get(),
            });
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct EnemyCandidate {
    id: EnemyId,
    point: WorldPoint,
    projected_health: u32,
}

impl EnemyCandidate {
    fn within(&self, origin: WorldPoint, range: f32) -> bool {
        origin.distance_to(self.point) <= range
    }
}
