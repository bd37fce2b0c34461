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

//! Parking session records.
//!
//! Sessions follow a state machine:
//! - [`Open`] → [`Closed`] (via release; duration and cost computed)
//! - [`Open`] → [`Cancelled`] (via administrative repair; never billed)
//!
//! [`Open`]: SessionStatus::Open
//! [`Closed`]: SessionStatus::Closed
//! [`Cancelled`]: SessionStatus::Cancelled

use crate::base::{Plate, SessionId, SlotId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

/// One park-and-leave record for a plate/slot pair.
///
/// `exit_time`, `duration_minutes`, and `cost` are `None` while the session
/// is open. Timestamps serialize as RFC 3339 so persisted records stay
/// sortable and parseable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    pub id: SessionId,
    pub plate: Plate,
    pub slot_id: SlotId,
    pub entry_time: DateTime<Utc>,
    pub exit_time: Option<DateTime<Utc>>,
    pub duration_minutes: Option<i64>,
    pub cost: Option<Decimal>,
    pub status: SessionStatus,
}

impl Session {
    pub(crate) fn open(id: SessionId, plate: Plate, slot_id: SlotId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            plate,
            slot_id,
            entry_time: now,
            exit_time: None,
            duration_minutes: None,
            cost: None,
            status: SessionStatus::Open,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == SessionStatus::Open
    }

    /// The amount actually charged: zero for open and cancelled sessions.
    pub fn billed_cost(&self) -> Decimal {
        self.cost.unwrap_or(Decimal::ZERO)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Open,
    Closed,
    Cancelled,
}
