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

//! Append-only log of lifecycle events.
//!
//! The coordinator records an event for every entry, exit, and repair so
//! the surrounding layer has an audit trail for administrative operations
//! and a feed for notifications. Backed by a lock-free [`SegQueue`]
//! preserving record order; consumers drain in FIFO order.

use crate::base::{Plate, SlotId};
use chrono::{DateTime, Utc};
use crossbeam::queue::SegQueue;
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParkingEvent {
    VehicleEntered {
        plate: Plate,
        slot_id: SlotId,
        at: DateTime<Utc>,
    },
    VehicleExited {
        plate: Plate,
        slot_id: SlotId,
        cost: Decimal,
        at: DateTime<Utc>,
    },
    /// A session force-closed by `force_release` or `reconcile_duplicates`.
    SessionCancelled {
        plate: Plate,
        slot_id: SlotId,
        at: DateTime<Utc>,
    },
    SlotAdded {
        slot_id: SlotId,
    },
    SlotRemoved {
        slot_id: SlotId,
    },
}

/// A thread-safe, append-only event log.
#[derive(Debug, Default)]
pub struct EventLog {
    events: SegQueue<ParkingEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self {
            events: SegQueue::new(),
        }
    }

    pub fn record(&self, event: ParkingEvent) {
        self.events.push(event);
    }

    /// Removes and returns all recorded events, oldest first.
    pub fn drain(&self) -> Vec<ParkingEvent> {
        let mut drained = Vec::with_capacity(self.events.len());
        while let Some(event) = self.events.pop() {
            drained.push(event);
        }
        drained
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_returns_events_in_record_order() {
        let log = EventLog::new();
        log.record(ParkingEvent::SlotAdded { slot_id: SlotId(1) });
        log.record(ParkingEvent::SlotAdded { slot_id: SlotId(2) });
        log.record(ParkingEvent::SlotRemoved { slot_id: SlotId(1) });

        let events = log.drain();
        assert_eq!(
            events,
            vec![
                ParkingEvent::SlotAdded { slot_id: SlotId(1) },
                ParkingEvent::SlotAdded { slot_id: SlotId(2) },
                ParkingEvent::SlotRemoved { slot_id: SlotId(1) },
            ]
        );
        assert!(log.is_empty());
    }
}
