// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Slot inventory and occupancy state.
//!
//! The [`SlotStore`] exclusively owns the occupancy flag of every slot.
//! Each flag flip happens under the [`DashMap`] entry lock for that slot,
//! which is the per-slot critical section: two vehicles racing for the same
//! slot serialize on that entry, while operations on different slots
//! proceed without contention.

use crate::ParkingError;
use crate::base::SlotId;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rust_decimal::Decimal;
use serde::Serialize;

/// A physical parking slot.
///
/// `rate_override` substitutes the global hourly rate for stays in this
/// slot (covered parking, EV chargers, and the like).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Slot {
    pub id: SlotId,
    pub occupied: bool,
    pub rate_override: Option<Decimal>,
}

impl Slot {
    fn new(id: SlotId, rate_override: Option<Decimal>) -> Self {
        Self {
            id,
            occupied: false,
            rate_override,
        }
    }
}

/// The set of parking slots and their occupancy flags.
#[derive(Debug, Default)]
pub struct SlotStore {
    slots: DashMap<SlotId, Slot>,
}

impl SlotStore {
    pub fn new() -> Self {
        Self {
            slots: DashMap::new(),
        }
    }

    /// Restores a store from persisted slot records.
    ///
    /// Occupancy flags are taken as-is; a coordinator constructed over a
    /// restored store resynchronizes them against the ledger's open
    /// sessions, which are the record of truth.
    pub fn from_slots(slots: impl IntoIterator<Item = Slot>) -> Self {
        let store = Self::new();
        for slot in slots {
            store.slots.insert(slot.id, slot);
        }
        store
    }

    /// Inserts a free slot. Re-adding an existing id is a no-op, never an
    /// error; returns whether the slot was actually inserted.
    pub fn add_slot(&self, id: SlotId) -> bool {
        self.add_slot_with_rate(id, None)
    }

    /// Inserts a free slot carrying an hourly-rate override.
    pub fn add_slot_with_rate(&self, id: SlotId, rate_override: Option<Decimal>) -> bool {
        match self.slots.entry(id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                entry.insert(Slot::new(id, rate_override));
                true
            }
        }
    }

    /// Deletes a slot.
    ///
    /// # Errors
    ///
    /// - [`ParkingError::SlotNotFound`] - No slot with this id exists.
    /// - [`ParkingError::SlotOccupied`] - A vehicle currently occupies it.
    pub fn remove_slot(&self, id: SlotId) -> Result<(), ParkingError> {
        match self.slots.entry(id) {
            Entry::Vacant(_) => Err(ParkingError::SlotNotFound),
            Entry::Occupied(entry) => {
                if entry.get().occupied {
                    return Err(ParkingError::SlotOccupied);
                }
                entry.remove();
                Ok(())
            }
        }
    }

    /// Atomically flips a free slot to occupied.
    ///
    /// # Errors
    ///
    /// - [`ParkingError::SlotNotFound`] - No slot with this id exists.
    /// - [`ParkingError::SlotUnavailable`] - The slot is already occupied.
    pub fn occupy(&self, id: SlotId) -> Result<(), ParkingError> {
        let mut slot = self.slots.get_mut(&id).ok_or(ParkingError::SlotNotFound)?;
        if slot.occupied {
            return Err(ParkingError::SlotUnavailable);
        }
        slot.occupied = true;
        Ok(())
    }

    /// Flips a slot back to free.
    ///
    /// Idempotent: vacating a free or absent slot succeeds with no effect.
    /// Returns whether anything changed, so callers can notice and log a
    /// pre-existing inconsistency without failing the release itself.
    pub fn vacate(&self, id: SlotId) -> bool {
        match self.slots.get_mut(&id) {
            Some(mut slot) if slot.occupied => {
                slot.occupied = false;
                true
            }
            _ => false,
        }
    }

    pub fn contains(&self, id: SlotId) -> bool {
        self.slots.contains_key(&id)
    }

    pub fn rate_override(&self, id: SlotId) -> Option<Decimal> {
        self.slots.get(&id).and_then(|slot| slot.rate_override)
    }

    /// All slots, sorted by id. A snapshot, not a live view.
    pub fn snapshot(&self) -> Vec<Slot> {
        let mut slots: Vec<Slot> = self.slots.iter().map(|entry| entry.value().clone()).collect();
        slots.sort_by_key(|slot| slot.id);
        slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn available_count(&self) -> usize {
        self.slots.iter().filter(|entry| !entry.value().occupied).count()
    }

    /// Marks every slot free. Used when resynchronizing occupancy against
    /// the ledger after a restore.
    pub(crate) fn clear_occupancy(&self) {
        for mut entry in self.slots.iter_mut() {
            entry.value_mut().occupied = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn add_slot_is_idempotent() {
        let store = SlotStore::new();
        assert!(store.add_slot(SlotId(1)));
        assert!(!store.add_slot(SlotId(1)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn readding_does_not_clobber_occupancy_or_rate() {
        let store = SlotStore::new();
        store.add_slot_with_rate(SlotId(1), Some(dec!(100)));
        store.occupy(SlotId(1)).unwrap();

        store.add_slot(SlotId(1));

        let slot = store.snapshot().remove(0);
        assert!(slot.occupied);
        assert_eq!(slot.rate_override, Some(dec!(100)));
    }

    #[test]
    fn occupy_twice_fails() {
        let store = SlotStore::new();
        store.add_slot(SlotId(1));
        store.occupy(SlotId(1)).unwrap();
        assert_eq!(store.occupy(SlotId(1)), Err(ParkingError::SlotUnavailable));
    }

    #[test]
    fn occupy_missing_slot_fails() {
        let store = SlotStore::new();
        assert_eq!(store.occupy(SlotId(9)), Err(ParkingError::SlotNotFound));
    }

    #[test]
    fn vacate_reports_whether_anything_changed() {
        let store = SlotStore::new();
        store.add_slot(SlotId(1));
        store.occupy(SlotId(1)).unwrap();

        assert!(store.vacate(SlotId(1)));
        assert!(!store.vacate(SlotId(1)));
        assert!(!store.vacate(SlotId(404)));
    }

    #[test]
    fn remove_occupied_slot_is_blocked() {
        let store = SlotStore::new();
        store.add_slot(SlotId(1));
        store.occupy(SlotId(1)).unwrap();
        assert_eq!(store.remove_slot(SlotId(1)), Err(ParkingError::SlotOccupied));

        store.vacate(SlotId(1));
        store.remove_slot(SlotId(1)).unwrap();
        assert_eq!(store.remove_slot(SlotId(1)), Err(ParkingError::SlotNotFound));
    }

    #[test]
    fn snapshot_is_sorted_by_id() {
        let store = SlotStore::new();
        for id in [5u32, 1, 3] {
            store.add_slot(SlotId(id));
        }
        let ids: Vec<u32> = store.snapshot().iter().map(|slot| slot.id.0).collect();
        assert_eq!(ids, vec![1, 3, 5]);
    }
}
