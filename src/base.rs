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

//! Core identifier types for slots, sessions, and vehicles.

use crate::ParkingError;
use serde::Serialize;
use std::fmt;

/// Identifier of a physical parking slot.
///
/// Wraps a `u32`. Slot ids are caller-assigned, unique, and must be
/// positive; zero is rejected at the coordinator boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct SlotId(pub u32);

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a parking session.
///
/// Wraps a `u64`. Session ids are assigned by the ledger on creation and
/// are strictly monotonic across the whole process, so a higher id always
/// means a more recently created session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A normalized license plate, the natural key for "is this vehicle parked".
///
/// Plates are trimmed and uppercased on construction so that lookups and
/// stored records always agree: `" abc123 "` and `"ABC123"` are the same
/// vehicle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Plate(String);

impl Plate {
    /// Normalizes and validates a raw plate string.
    ///
    /// # Errors
    ///
    /// Returns [`ParkingError::InvalidInput`] if the plate is blank after
    /// trimming.
    pub fn new(raw: &str) -> Result<Self, ParkingError> {
        let normalized = raw.trim().to_uppercase();
        if normalized.is_empty() {
            return Err(ParkingError::InvalidInput("plate must not be blank"));
        }
        Ok(Plate(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Plate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
