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

//! The append-only record of parking sessions.
//!
//! Sessions are grouped per plate behind a [`parking_lot::Mutex`], which is
//! the per-plate critical section: the check-or-create in
//! [`SessionLedger::open_session`] and the find-and-close in
//! [`SessionLedger::close_session`] each run entirely under one lock
//! acquisition, so two requests for the same plate serialize while
//! different plates never contend.
//!
//! # Invariants
//!
//! - Session ids are strictly monotonic across the process.
//! - At most one open session exists per plate (absent corruption
//!   introduced by a restored store; [`SessionLedger::reconcile_duplicates`]
//!   repairs that state).

use crate::ParkingError;
use crate::base::{Plate, SessionId, SlotId};
use crate::session::{Session, SessionStatus};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
struct PlateHistory {
    inner: Mutex<Vec<Session>>,
}

/// Ledger of all parking sessions, keyed by plate.
#[derive(Debug, Default)]
pub struct SessionLedger {
    plates: DashMap<Plate, PlateHistory>,
    /// Last assigned session id; the next session gets `previous + 1`.
    next_id: AtomicU64,
}

/// Index of the most recent open session: latest entry time, ties broken
/// by highest id (most recently created).
fn most_recent_open(sessions: &[Session]) -> Option<usize> {
    sessions
        .iter()
        .enumerate()
        .filter(|(_, session)| session.is_open())
        .max_by_key(|(_, session)| (session.entry_time, session.id))
        .map(|(index, _)| index)
}

fn force_close(session: &mut Session, now: DateTime<Utc>) {
    session.exit_time = Some(now);
    session.duration_minutes = Some(0);
    session.cost = Some(Decimal::ZERO);
    session.status = SessionStatus::Cancelled;
}

impl SessionLedger {
    pub fn new() -> Self {
        Self {
            plates: DashMap::new(),
            next_id: AtomicU64::new(0),
        }
    }

    /// Restores a ledger from persisted session records.
    ///
    /// Id assignment continues after the highest restored id. The restored
    /// data is taken as-is, including corrupted states such as multiple
    /// open sessions for one plate; those are left for
    /// [`SessionLedger::reconcile_duplicates`] to repair explicitly.
    pub fn from_sessions(sessions: impl IntoIterator<Item = Session>) -> Self {
        let ledger = Self::new();
        let mut max_id = 0u64;
        for session in sessions {
            max_id = max_id.max(session.id.0);
            let history = ledger.plates.entry(session.plate.clone()).or_default();
            history.inner.lock().push(session);
        }
        for entry in ledger.plates.iter() {
            entry.value().inner.lock().sort_by_key(|session| session.id);
        }
        ledger.next_id.store(max_id, Ordering::Relaxed);
        ledger
    }

    /// Opens a session for a plate in a slot.
    ///
    /// # Errors
    ///
    /// Returns [`ParkingError::VehicleAlreadyParked`] if an open session
    /// already exists for this plate.
    pub fn open_session(
        &self,
        plate: &Plate,
        slot_id: SlotId,
        now: DateTime<Utc>,
    ) -> Result<SessionId, ParkingError> {
        let history = self.plates.entry(plate.clone()).or_default();
        let mut sessions = history.inner.lock();

        if sessions.iter().any(Session::is_open) {
            return Err(ParkingError::VehicleAlreadyParked);
        }

        let id = SessionId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        sessions.push(Session::open(id, plate.clone(), slot_id, now));
        Ok(id)
    }

    /// Closes the most recent open session for a plate.
    ///
    /// Duration is whole minutes truncated toward zero, never negative.
    /// `cost_of` receives the session's slot and the duration so the caller
    /// can resolve per-slot pricing; the computed cost is stored on the
    /// session. The closed session is returned, including its slot id so
    /// the caller can vacate the slot.
    ///
    /// # Errors
    ///
    /// Returns [`ParkingError::NoActiveSession`] if no open session exists.
    pub fn close_session<F>(
        &self,
        plate: &Plate,
        now: DateTime<Utc>,
        cost_of: F,
    ) -> Result<Session, ParkingError>
    where
        F: FnOnce(SlotId, i64) -> Decimal,
    {
        let history = self.plates.get(plate).ok_or(ParkingError::NoActiveSession)?;
        let mut sessions = history.inner.lock();
        let index = most_recent_open(&sessions).ok_or(ParkingError::NoActiveSession)?;

        let minutes = (now - sessions[index].entry_time).num_minutes().max(0);
        let cost = cost_of(sessions[index].slot_id, minutes);

        let session = &mut sessions[index];
        session.exit_time = Some(now);
        session.duration_minutes = Some(minutes);
        session.cost = Some(cost);
        session.status = SessionStatus::Closed;
        Ok(session.clone())
    }

    /// True iff an open session exists for this plate.
    pub fn is_parked(&self, plate: &Plate) -> bool {
        self.plates
            .get(plate)
            .map(|history| history.inner.lock().iter().any(Session::is_open))
            .unwrap_or(false)
    }

    /// The plate's open session, if any.
    pub fn current_session(&self, plate: &Plate) -> Option<Session> {
        let history = self.plates.get(plate)?;
        let sessions = history.inner.lock();
        most_recent_open(&sessions).map(|index| sessions[index].clone())
    }

    /// All sessions for a plate, newest entry first (ties by id, newest
    /// first). Open sessions carry no duration or cost yet.
    pub fn history(&self, plate: &Plate) -> Vec<Session> {
        let mut sessions = match self.plates.get(plate) {
            Some(history) => history.inner.lock().clone(),
            None => return Vec::new(),
        };
        sessions.sort_by(|a, b| (b.entry_time, b.id).cmp(&(a.entry_time, a.id)));
        sessions
    }

    /// Snapshot of every open session across all plates.
    pub fn open_sessions(&self) -> Vec<Session> {
        let mut open = Vec::new();
        for entry in self.plates.iter() {
            let sessions = entry.value().inner.lock();
            open.extend(sessions.iter().filter(|session| session.is_open()).cloned());
        }
        open
    }

    /// The newest sessions across all plates, newest entry first, at most
    /// `limit` of them.
    pub fn recent_sessions(&self, limit: usize) -> Vec<Session> {
        let mut all = Vec::new();
        for entry in self.plates.iter() {
            all.extend(entry.value().inner.lock().iter().cloned());
        }
        all.sort_by(|a, b| (b.entry_time, b.id).cmp(&(a.entry_time, a.id)));
        all.truncate(limit);
        all
    }

    /// Repairs the multiple-open-sessions corruption state for a plate.
    ///
    /// Keeps the most recent open session and force-closes the rest as
    /// [`SessionStatus::Cancelled`] with duration 0 and cost 0. Returns the
    /// cancelled sessions so the caller can vacate each one's slot; empty
    /// when the plate has one open session or none.
    pub fn reconcile_duplicates(&self, plate: &Plate, now: DateTime<Utc>) -> Vec<Session> {
        let Some(history) = self.plates.get(plate) else {
            return Vec::new();
        };
        let mut sessions = history.inner.lock();
        let Some(keep) = most_recent_open(&sessions) else {
            return Vec::new();
        };
        let keep_id = sessions[keep].id;

        let mut cancelled = Vec::new();
        for session in sessions.iter_mut() {
            if session.is_open() && session.id != keep_id {
                force_close(session, now);
                cancelled.push(session.clone());
            }
        }
        cancelled
    }

    /// Force-closes every open session for a plate as
    /// [`SessionStatus::Cancelled`], unbilled. Returns the closed sessions;
    /// empty when the plate is unparked.
    pub fn force_close_all(&self, plate: &Plate, now: DateTime<Utc>) -> Vec<Session> {
        let Some(history) = self.plates.get(plate) else {
            return Vec::new();
        };
        let mut sessions = history.inner.lock();

        let mut closed = Vec::new();
        for session in sessions.iter_mut() {
            if session.is_open() {
                force_close(session, now);
                closed.push(session.clone());
            }
        }
        closed
    }
}
