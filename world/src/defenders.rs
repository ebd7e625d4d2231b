//! Authoritative placement grid and defender roster.

use std::collections::BTreeMap;

use breach_defence_core::{
    Credits, Damage, DefenderId, DefenderProfile, PlacementError, WorldPoint, SLOT_MATCH_TOLERANCE,
};

/// State of a defender stored inside the world.
#[derive(Clone, Debug)]
pub(crate) struct DefenderState {
    /// Identifier allocated by the world for the defender.
    pub(crate) id: DefenderId,
    /// Coordinate of the occupied slot.
    pub(crate) slot: WorldPoint,
    /// Damage dealt per shot.
    pub(crate) damage: Damage,
    /// Targeting range.
    pub(crate) range: f32,
    /// Ticks the defender waits after firing.
    pub(crate) cooldown_ticks: u32,
    /// Ticks left before the defender may fire again.
    pub(crate) cooldown_remaining: u32,
}

/// Registry that stores defenders, slot occupancy and identifier allocation.
#[derive(Debug)]
pub(crate) struct DefenderRoster {
    slots: Vec<WorldPoint>,
    occupants: Vec<Option<DefenderId>>,
    entries: BTreeMap<DefenderId, DefenderState>,
    next_defender_id: DefenderId,
}

impl DefenderRoster {
    /// Creates an empty roster over the provided slots.
    pub(crate) fn new(slots: &[WorldPoint]) -> Self {
        Self {
            slots: slots.to_vec(),
            occupants: vec![None; slots.len()],
            entries: BTreeMap::new(),
            next_defender_id: DefenderId::new(0),
        }
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &DefenderState> {
        self.entries.values()
    }

    pub(crate) fn slots(&self) -> impl Iterator<Item = (WorldPoint, Option<DefenderId>)> + '_ {
        self.slots
            .iter()
            .copied()
            .zip(self.occupants.iter().copied())
    }

    /// Removes every defender and frees every slot. Identifiers keep growing.
    pub(crate) fn clear(&mut self) {
        self.entries.clear();
        self.occupants.fill(None);
    }

    /// Places a defender when the slot is free and the balance covers the cost.
    ///
    /// On success the balance is debited and the new identifier returned; on
    /// failure neither the balance nor the slot changes.
    pub(crate) fn try_place(
        &mut self,
        requested: WorldPoint,
        profile: &DefenderProfile,
        balance: &mut Credits,
    ) -> Result<(DefenderId, WorldPoint), PlacementError> {
        let index = self
            .slot_index(requested)
            .ok_or(PlacementError::UnknownSlot)?;
        if self.occupants[index].is_some() {
            return Err(PlacementError::Occupied);
        }
        let remaining = balance
            .checked_sub(Credits::new(profile.cost))
            .ok_or(PlacementError::InsufficientFunds)?;

        let id = self.next_defender_id;
        self.next_defender_id = DefenderId::new(id.get().saturating_add(1));
        let slot = self.slots[index];
        let _ = self.entries.insert(
            id,
            DefenderState {
                id,
                slot,
                damage: Damage::new(profile.damage),
                range: profile.range,
                cooldown_ticks: profile.cooldown_ticks,
                cooldown_remaining: 0,
            },
        );
        self.occupants[index] = Some(id);
        *balance = remaining;
        Ok((id, slot))
    }

    pub(crate) fn get_mut(&mut self, id: DefenderId) -> Option<&mut DefenderState> {
        self.entries.get_mut(&id)
    }

    /// Ticks every cooldown down by one.
    pub(crate) fn tick_cooldowns(&mut self) {
        for defender in self.entries.values_mut() {
            defender.cooldown_remaining = defender.cooldown_remaining.saturating_sub(1);
        }
    }

    fn slot_index(&self, requested: WorldPoint) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| slot.distance_to(requested) <= SLOT_MATCH_TOLERANCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(cost: u32) -> DefenderProfile {
        DefenderProfile {
            cost,
            damage: 10,
            range: 50.0,
            cooldown_ticks: 3,
        }
    }

    fn roster() -> DefenderRoster {
        DefenderRoster::new(&[WorldPoint::new(10.0, 10.0), WorldPoint::new(30.0, 10.0)])
    }

    #[test]
    fn roster_starts_empty_with_zero_identifier() {
        let roster = roster();
        assert!(roster.entries.is_empty());
        assert_eq!(roster.next_defender_id.get(), 0);
        assert!(roster.slots().all(|(_, occupant)| occupant.is_none()));
    }

    #[test]
    fn placement_debits_and_occupies_slot() {
        let mut roster = roster();
        let mut balance = Credits::new(100);

        let (id, slot) = roster
            .try_place(WorldPoint::new(10.2, 9.9), &profile(40), &mut balance)
            .expect("placement");

        assert_eq!(id, DefenderId::new(0));
        assert_eq!(slot, WorldPoint::new(10.0, 10.0));
        assert_eq!(balance, Credits::new(60));
        assert_eq!(roster.slots().next(), Some((slot, Some(id))));
    }

    #[test]
    fn occupied_slot_is_rejected_without_charge() {
        let mut roster = roster();
        let mut balance = Credits::new(100);
        let _ = roster
            .try_place(WorldPoint::new(10.0, 10.0), &profile(40), &mut balance)
            .expect("first placement");

        let result = roster.try_place(WorldPoint::new(10.0, 10.0), &profile(40), &mut balance);
        assert_eq!(result, Err(PlacementError::Occupied));
        assert_eq!(balance, Credits::new(60));
    }

    #[test]
    fn unaffordable_placement_leaves_slot_free() {
        let mut roster = roster();
        let mut balance = Credits::new(30);

        let result = roster.try_place(WorldPoint::new(30.0, 10.0), &profile(40), &mut balance);
        assert_eq!(result, Err(PlacementError::InsufficientFunds));
        assert_eq!(balance, Credits::new(30));
        assert!(roster.slots().all(|(_, occupant)| occupant.is_none()));
    }

    #[test]
    fn unknown_coordinate_is_rejected() {
        let mut roster = roster();
        let mut balance = Credits::new(100);
        let result = roster.try_place(WorldPoint::new(20.0, 10.0), &profile(40), &mut balance);
        assert_eq!(result, Err(PlacementError::UnknownSlot));
    }

    #[test]
    fn cooldowns_saturate_at_zero() {
        let mut roster = roster();
        let mut balance = Credits::new(100);
        let (id, _) = roster
            .try_place(WorldPoint::new(10.0, 10.0), &profile(40), &mut balance)
            .expect("placement");
        if let Some(defender) = roster.get_mut(id) {
            defender.cooldown_remaining = 1;
        }

        roster.tick_cooldowns();
        roster.tick_cooldowns();
        assert_eq!(roster.iter().next().map(|d| d.cooldown_remaining), Some(0));
    }
}
