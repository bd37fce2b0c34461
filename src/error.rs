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

//! Error types for slot allocation and session processing.

use thiserror::Error;

/// Slot allocation and session processing errors.
///
/// All variants are recoverable results for the caller, never fatal to the
/// process. [`ParkingError::Storage`] is the only kind where a retry may be
/// warranted; the rest are terminal for that specific request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParkingError {
    /// Referenced slot id does not exist
    #[error("slot not found")]
    SlotNotFound,

    /// Slot is already occupied by another vehicle
    #[error("slot is already occupied")]
    SlotUnavailable,

    /// Slot deletion blocked while a vehicle occupies it
    #[error("slot is occupied and cannot be removed")]
    SlotOccupied,

    /// An open session already exists for this plate
    #[error("vehicle is already parked")]
    VehicleAlreadyParked,

    /// No open session exists for this plate
    #[error("no active parking session")]
    NoActiveSession,

    /// Malformed plate or slot id
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),

    /// Underlying persistence failure; retryable
    #[error("storage failure: {0}")]
    Storage(String),
}
