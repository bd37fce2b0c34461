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

//! Slot-allocation and session-lifecycle orchestration.
//!
//! The [`ParkingCoordinator`] is the central component that mediates every
//! cross-entity transition between the slot inventory and the session
//! ledger. It owns no occupancy or session state itself.
//!
//! # Operations
//!
//! - **Book**: occupy a slot and open a session for a plate, atomically as
//!   a unit.
//! - **Release**: close the plate's open session, compute duration and
//!   cost, vacate the slot.
//! - **Force release / reconcile**: administrative repair of corrupted
//!   states, never billed.
//! - **Slot management**: add, remove, and list slots.
//!
//! # Thread Safety
//!
//! Every method takes `&self` and is safe to call from many threads. A
//! booking orders its two critical sections slot-before-plate: the
//! occupy check-and-flip completes (and its lock is released) before the
//! plate lock is taken, so neither lock is ever held while acquiring the
//! other and concurrent conflicting requests fail fast instead of
//! queueing. If the session-open side of a booking loses a race after the
//! slot was occupied, the occupation is rolled back so no slot is left
//! stranded without a session.

use crate::ParkingError;
use crate::audit::{EventLog, ParkingEvent};
use crate::base::{Plate, SessionId, SlotId};
use crate::ledger::SessionLedger;
use crate::pricing::PricingPolicy;
use crate::session::Session;
use crate::slot::SlotStore;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use tracing::warn;

/// Result of a successful booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Booking {
    pub session_id: SessionId,
    pub slot_id: SlotId,
}

/// Result of a successful release.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Receipt {
    pub slot_id: SlotId,
    pub duration_minutes: i64,
    pub cost: Decimal,
}

/// One row of the slot listing: occupancy joined against the ledger's open
/// sessions. A snapshot, not a live view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotView {
    pub slot_id: SlotId,
    pub occupied: bool,
    pub plate: Option<Plate>,
    pub entry_time: Option<DateTime<Utc>>,
    pub rate_override: Option<Decimal>,
}

fn check_slot_id(id: SlotId) -> Result<(), ParkingError> {
    if id.0 == 0 {
        return Err(ParkingError::InvalidInput("slot id must be positive"));
    }
    Ok(())
}

/// Orchestrates bookings and releases across a [`SlotStore`] and a
/// [`SessionLedger`].
///
/// # Invariants
///
/// - A slot is occupied iff exactly one open session references it.
/// - A plate has at most one open session.
/// - Slots are only deleted while free, and never implicitly created.
#[derive(Debug, Default)]
pub struct ParkingCoordinator {
    slots: SlotStore,
    ledger: SessionLedger,
    pricing: PricingPolicy,
    events: EventLog,
}

impl ParkingCoordinator {
    /// Creates an empty coordinator with the given pricing policy.
    pub fn new(pricing: PricingPolicy) -> Self {
        Self {
            slots: SlotStore::new(),
            ledger: SessionLedger::new(),
            pricing,
            events: EventLog::new(),
        }
    }

    /// Builds a coordinator over restored state.
    ///
    /// Occupancy flags are resynchronized against the ledger's open
    /// sessions, which are the record of truth after a restore: every slot
    /// is marked free, then each open session occupies its slot. An open
    /// session referencing a missing slot is logged and left for
    /// reconciliation.
    pub fn with_state(slots: SlotStore, ledger: SessionLedger, pricing: PricingPolicy) -> Self {
        slots.clear_occupancy();
        for session in ledger.open_sessions() {
            if let Err(err) = slots.occupy(session.slot_id) {
                warn!(
                    plate = %session.plate,
                    slot = %session.slot_id,
                    %err,
                    "open session could not reclaim its slot during restore"
                );
            }
        }
        Self {
            slots,
            ledger,
            pricing,
            events: EventLog::new(),
        }
    }

    pub fn slots(&self) -> &SlotStore {
        &self.slots
    }

    pub fn ledger(&self) -> &SessionLedger {
        &self.ledger
    }

    pub fn pricing(&self) -> &PricingPolicy {
        &self.pricing
    }

    /// Cost of `minutes` in `slot_id`, honoring the slot's rate override.
    fn effective_cost(&self, slot_id: SlotId, minutes: i64) -> Decimal {
        match self.slots.rate_override(slot_id) {
            Some(rate) => self.pricing.with_rate(rate).cost(minutes),
            None => self.pricing.cost(minutes),
        }
    }

    /// Adds a free slot. Re-adding an existing id is a no-op; returns
    /// whether the slot was actually inserted.
    ///
    /// # Errors
    ///
    /// Returns [`ParkingError::InvalidInput`] for slot id zero.
    pub fn add_slot(&self, id: SlotId) -> Result<bool, ParkingError> {
        self.add_slot_with_rate(id, None)
    }

    /// Adds a free slot carrying a per-slot hourly-rate override.
    pub fn add_slot_with_rate(
        &self,
        id: SlotId,
        rate_override: Option<Decimal>,
    ) -> Result<bool, ParkingError> {
        check_slot_id(id)?;
        let inserted = self.slots.add_slot_with_rate(id, rate_override);
        if inserted {
            self.events.record(ParkingEvent::SlotAdded { slot_id: id });
        }
        Ok(inserted)
    }

    /// Deletes a slot.
    ///
    /// # Errors
    ///
    /// - [`ParkingError::SlotNotFound`] - No slot with this id exists.
    /// - [`ParkingError::SlotOccupied`] - A vehicle currently occupies it.
    pub fn remove_slot(&self, id: SlotId) -> Result<(), ParkingError> {
        self.slots.remove_slot(id)?;
        self.events.record(ParkingEvent::SlotRemoved { slot_id: id });
        Ok(())
    }

    /// All slots with occupancy and, for occupied slots, the occupying
    /// plate and entry time. Sorted by slot id; a snapshot, not a live
    /// view.
    pub fn list_slots(&self) -> Vec<SlotView> {
        let open: HashMap<SlotId, Session> = self
            .ledger
            .open_sessions()
            .into_iter()
            .map(|session| (session.slot_id, session))
            .collect();

        self.slots
            .snapshot()
            .into_iter()
            .map(|slot| {
                let session = if slot.occupied { open.get(&slot.id) } else { None };
                SlotView {
                    slot_id: slot.id,
                    occupied: slot.occupied,
                    plate: session.map(|s| s.plate.clone()),
                    entry_time: session.map(|s| s.entry_time),
                    rate_override: slot.rate_override,
                }
            })
            .collect()
    }

    /// Books a slot for a vehicle (entry).
    pub fn book(&self, plate: &str, slot_id: SlotId) -> Result<Booking, ParkingError> {
        self.book_at(plate, slot_id, Utc::now())
    }

    /// Books a slot with an explicit entry timestamp.
    ///
    /// # Errors
    ///
    /// - [`ParkingError::InvalidInput`] - Blank plate or slot id zero.
    /// - [`ParkingError::VehicleAlreadyParked`] - The plate has an open
    ///   session; this takes precedence over slot checks.
    /// - [`ParkingError::SlotNotFound`] / [`ParkingError::SlotUnavailable`]
    ///   - Propagated from the slot store with no ledger mutation.
    pub fn book_at(
        &self,
        plate: &str,
        slot_id: SlotId,
        now: DateTime<Utc>,
    ) -> Result<Booking, ParkingError> {
        let plate = Plate::new(plate)?;
        check_slot_id(slot_id)?;

        // Plate state first so a double booking reports VehicleAlreadyParked
        // even when the requested slot is also taken.
        if self.ledger.is_parked(&plate) {
            return Err(ParkingError::VehicleAlreadyParked);
        }

        self.slots.occupy(slot_id)?;
        match self.ledger.open_session(&plate, slot_id, now) {
            Ok(session_id) => {
                self.events.record(ParkingEvent::VehicleEntered {
                    plate,
                    slot_id,
                    at: now,
                });
                Ok(Booking { session_id, slot_id })
            }
            Err(err) => {
                // A concurrent booking for the same plate won the race
                // between the is_parked check and open_session. Roll the
                // occupation back so the slot is not stranded occupied with
                // no session.
                self.slots.vacate(slot_id);
                Err(err)
            }
        }
    }

    /// Releases a parked vehicle (exit).
    pub fn release(&self, plate: &str) -> Result<Receipt, ParkingError> {
        self.release_at(plate, Utc::now())
    }

    /// Releases with an explicit exit timestamp.
    ///
    /// The session closure is the record of truth: if the slot turns out to
    /// have been free already (a pre-existing inconsistency), that is
    /// logged and the release still succeeds.
    ///
    /// # Errors
    ///
    /// - [`ParkingError::InvalidInput`] - Blank plate.
    /// - [`ParkingError::NoActiveSession`] - The plate is not parked.
    pub fn release_at(&self, plate: &str, now: DateTime<Utc>) -> Result<Receipt, ParkingError> {
        let plate = Plate::new(plate)?;
        let closed = self
            .ledger
            .close_session(&plate, now, |slot_id, minutes| {
                self.effective_cost(slot_id, minutes)
            })?;

        if !self.slots.vacate(closed.slot_id) {
            warn!(
                plate = %plate,
                slot = %closed.slot_id,
                "released a session whose slot was already free"
            );
        }

        let cost = closed.billed_cost();
        self.events.record(ParkingEvent::VehicleExited {
            plate,
            slot_id: closed.slot_id,
            cost,
            at: now,
        });
        Ok(Receipt {
            slot_id: closed.slot_id,
            duration_minutes: closed.duration_minutes.unwrap_or(0),
            cost,
        })
    }

    /// Force-closes *all* open sessions for a plate and vacates every
    /// associated slot. Sessions are cancelled, never billed. Returns the
    /// count of sessions closed; zero when the plate is unparked.
    ///
    /// An administrative repair tool for the duplicate-session corruption
    /// state, gated by the surrounding layer.
    pub fn force_release(&self, plate: &str) -> Result<usize, ParkingError> {
        self.force_release_at(plate, Utc::now())
    }

    pub fn force_release_at(&self, plate: &str, now: DateTime<Utc>) -> Result<usize, ParkingError> {
        let plate = Plate::new(plate)?;
        let closed = self.ledger.force_close_all(&plate, now);
        for session in &closed {
            if !self.slots.vacate(session.slot_id) {
                warn!(
                    plate = %plate,
                    slot = %session.slot_id,
                    "force-released a session whose slot was already free"
                );
            }
            self.events.record(ParkingEvent::SessionCancelled {
                plate: plate.clone(),
                slot_id: session.slot_id,
                at: now,
            });
        }
        Ok(closed.len())
    }

    /// Repairs the multiple-open-sessions corruption state for a plate:
    /// keeps the most recent open session, cancels the rest, and vacates
    /// each cancelled session's slot. Returns the count closed; zero when
    /// the plate has at most one open session.
    pub fn reconcile_duplicates(&self, plate: &str) -> Result<usize, ParkingError> {
        self.reconcile_duplicates_at(plate, Utc::now())
    }

    pub fn reconcile_duplicates_at(
        &self,
        plate: &str,
        now: DateTime<Utc>,
    ) -> Result<usize, ParkingError> {
        let plate = Plate::new(plate)?;
        let cancelled = self.ledger.reconcile_duplicates(&plate, now);
        let kept_slot = self
            .ledger
            .current_session(&plate)
            .map(|session| session.slot_id);

        for session in &cancelled {
            // The surviving session may reference the same slot as a
            // cancelled duplicate; that slot must stay occupied.
            if Some(session.slot_id) != kept_slot && !self.slots.vacate(session.slot_id) {
                warn!(
                    plate = %plate,
                    slot = %session.slot_id,
                    "reconciled a session whose slot was already free"
                );
            }
            self.events.record(ParkingEvent::SessionCancelled {
                plate: plate.clone(),
                slot_id: session.slot_id,
                at: now,
            });
        }
        Ok(cancelled.len())
    }

    /// All sessions for a plate, newest entry first.
    pub fn history(&self, plate: &str) -> Result<Vec<Session>, ParkingError> {
        let plate = Plate::new(plate)?;
        Ok(self.ledger.history(&plate))
    }

    pub fn is_parked(&self, plate: &str) -> Result<bool, ParkingError> {
        let plate = Plate::new(plate)?;
        Ok(self.ledger.is_parked(&plate))
    }

    /// The plate's open session, if any: where the vehicle is parked and
    /// since when.
    pub fn vehicle_status(&self, plate: &str) -> Result<Option<Session>, ParkingError> {
        let plate = Plate::new(plate)?;
        Ok(self.ledger.current_session(&plate))
    }

    /// The newest sessions across all plates, newest entry first.
    pub fn recent_sessions(&self, limit: usize) -> Vec<Session> {
        self.ledger.recent_sessions(limit)
    }

    /// Drains the lifecycle event log, oldest first.
    pub fn drain_events(&self) -> Vec<ParkingEvent> {
        self.events.drain()
    }
}
