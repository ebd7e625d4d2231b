//! Pool of enemies currently travelling along the path.

use breach_defence_core::{Damage, EnemyId, Health, PathPosition, WaveProfile};

use crate::path::PathModel;

#[derive(Clone, Debug)]
pub(crate) struct Enemy {
    pub(crate) id: EnemyId,
    pub(crate) position: PathPosition,
    pub(crate) health: Health,
    pub(crate) max_health: Health,
    pub(crate) speed: f32,
    travelled_ticks: u64,
}

/// Outcome of a single damage application.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum DamageOutcome {
    /// The enemy survived with the provided health.
    Wounded(Health),
    /// The enemy died and was removed from the pool.
    Killed,
}

/// Enemies kept in spawn order, which is also identifier order.
#[derive(Debug)]
pub(crate) struct EnemyPool {
    entries: Vec<Enemy>,
    next_enemy_id: EnemyId,
}

impl EnemyPool {
    pub(crate) fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_enemy_id: EnemyId::new(0),
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Enemy> {
        self.entries.iter()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    /// Spawns a full wave at the start of the path. The first enemy leads.
    pub(crate) fn spawn_wave(&mut self, profile: &WaveProfile) -> u32 {
        let health = Health::new(profile.max_health);
        for index in 0..profile.size {
            let speed = if index == 0 {
                profile.speed * profile.leader_speed_multiplier
            } else {
                profile.speed
            };
            let id = self.allocate_id();
            self.entries.push(Enemy {
                id,
                position: PathPosition::START,
                health,
                max_health: health,
                speed,
                travelled_ticks: 0,
            });
        }
        profile.size
    }

    /// Moves every enemy forward and removes those that reached the end.
    ///
    /// Returns the breached enemies in spawn order.
    pub(crate) fn advance(&mut self, path: &PathModel, tick_scale: f32) -> Vec<EnemyId> {
        let mut breached = Vec::new();
        self.entries.retain_mut(|enemy| {
            enemy.travelled_ticks = enemy.travelled_ticks.saturating_add(1);
            let step = f64::from(enemy.speed) * f64::from(tick_scale);
            enemy.position = PathPosition::after_ticks(step, enemy.travelled_ticks);
            if path.is_terminal(enemy.position) {
                breached.push(enemy.id);
                false
            } else {
                true
            }
        });
        breached
    }

    /// Applies damage to the enemy, removing it when its health is depleted.
    pub(crate) fn apply_damage(&mut self, id: EnemyId, damage: Damage) -> Option<DamageOutcome> {
        let index = self.entries.iter().position(|enemy| enemy.id == id)?;
        let enemy = &mut self.entries[index];
        enemy.health = enemy.health.after(damage);
        if enemy.health.is_depleted() {
            let _ = self.entries.remove(index);
            Some(DamageOutcome::Killed)
        } else {
            Some(DamageOutcome::Wounded(enemy.health))
        }
    }

    fn allocate_id(&mut self) -> EnemyId {
        let id = self.next_enemy_id;
        self.next_enemy_id = EnemyId::new(id.get().saturating_add(1));
        id
    }
}
