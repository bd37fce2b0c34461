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

//! # Parklot
//!
//! This library provides a slot-allocation and parking-session engine: a
//! vehicle books a slot on entry, occupies it for a duration, and releases
//! it on exit with cost computed from elapsed time. The engine guarantees
//! that a slot holds at most one vehicle and a vehicle holds at most one
//! open session, even under duplicate or racing requests.
//!
//! ## Core Components
//!
//! - [`ParkingCoordinator`]: Orchestrates bookings, releases, and repairs
//! - [`SlotStore`]: Owns the slot inventory and occupancy flags
//! - [`SessionLedger`]: Owns the append-only record of parking sessions
//! - [`PricingPolicy`]: Pure duration-to-cost mapping
//! - [`ParkingError`]: Error types for allocation and session failures
//!
//! ## Example
//!
//! ```
//! use parklot_rs::{ParkingCoordinator, SlotId};
//!
//! let lot = ParkingCoordinator::default();
//! lot.add_slot(SlotId(3)).unwrap();
//!
//! // Entry: plates are normalized, so "abc123" and " ABC123 " are the
//! // same vehicle.
//! let booking = lot.book("abc123", SlotId(3)).unwrap();
//! assert_eq!(booking.slot_id, SlotId(3));
//!
//! // Exit: the receipt carries the slot, duration, and cost.
//! let receipt = lot.release(" ABC123 ").unwrap();
//! assert_eq!(receipt.slot_id, SlotId(3));
//! assert!(receipt.cost >= lot.pricing().minimum_charge());
//! ```
//!
//! ## Thread Safety
//!
//! All coordinator operations take `&self` and may be called concurrently.
//! Operations on the same slot or plate serialize and fail fast on
//! conflict; operations on disjoint slots and plates do not contend.

mod audit;
mod base;
mod coordinator;
pub mod error;
mod ledger;
mod pricing;
mod session;
mod slot;

pub use audit::{EventLog, ParkingEvent};
pub use base::{Plate, SessionId, SlotId};
pub use coordinator::{Booking, ParkingCoordinator, Receipt, SlotView};
pub use error::ParkingError;
pub use ledger::SessionLedger;
pub use pricing::PricingPolicy;
pub use session::{Session, SessionStatus};
pub use slot::{Slot, SlotStore};
