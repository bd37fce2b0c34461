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

use chrono::{DateTime, Utc};
use clap::Parser;
use csv::{ReaderBuilder, Trim, Writer};
use parklot_rs::{ParkingCoordinator, ParkingError, SlotId};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::PathBuf;
use std::process;
use tracing::debug;

/// Parking Engine - Process parking event CSV files
///
/// Reads parking events from a CSV file, replays them through the
/// engine, and outputs the resulting session ledger (or slot states) to
/// stdout.
#[derive(Parser, Debug)]
#[command(name = "parklot-rs")]
#[command(about = "A parking engine that processes event CSVs", long_about = None)]
struct Args {
    /// Path to CSV file with parking events
    ///
    /// Expected format: op,plate,slot,at
    /// Example: cargo run -- events.csv > sessions.csv
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Output the slot states instead of the session ledger
    #[arg(long)]
    slots: bool,
}

fn main() {
    // Diagnostics go to stderr so stdout stays a clean CSV stream.
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let file = match File::open(&args.input) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error opening file '{}': {}", args.input.display(), e);
            process::exit(1);
        }
    };

    let lot = match process_events(BufReader::new(file)) {
        Ok(lot) => lot,
        Err(e) => {
            eprintln!("Error processing events: {}", e);
            process::exit(1);
        }
    };

    let result = if args.slots {
        write_slots(&lot, std::io::stdout())
    } else {
        write_sessions(&lot, std::io::stdout())
    };
    if let Err(e) = result {
        eprintln!("Error writing output: {}", e);
        process::exit(1);
    }
}

/// Raw CSV record matching the input format.
///
/// Fields: `op, plate, slot, at`
#[derive(Debug, Deserialize)]
struct CsvRecord {
    op: String,
    plate: Option<String>,
    #[serde(deserialize_with = "csv::invalid_option")]
    slot: Option<u32>,
    at: Option<String>,
}

/// A parsed parking event.
#[derive(Debug)]
enum ParkingOp {
    AddSlot { slot: SlotId },
    RemoveSlot { slot: SlotId },
    Book { plate: String, slot: SlotId, at: Option<DateTime<Utc>> },
    Release { plate: String, at: Option<DateTime<Utc>> },
    ForceRelease { plate: String, at: Option<DateTime<Utc>> },
    Reconcile { plate: String, at: Option<DateTime<Utc>> },
}

impl CsvRecord {
    /// Converts a CSV record into a parking event.
    ///
    /// Returns `None` for unknown ops, missing required fields, or an
    /// unparseable `at` timestamp.
    fn into_op(self) -> Option<ParkingOp> {
        let at = match self.at.as_deref().filter(|s| !s.is_empty()) {
            Some(raw) => Some(DateTime::parse_from_rfc3339(raw).ok()?.with_timezone(&Utc)),
            None => None,
        };

        match self.op.to_lowercase().as_str() {
            "add_slot" => Some(ParkingOp::AddSlot {
                slot: SlotId(self.slot?),
            }),
            "remove_slot" => Some(ParkingOp::RemoveSlot {
                slot: SlotId(self.slot?),
            }),
            "book" => Some(ParkingOp::Book {
                plate: self.plate?,
                slot: SlotId(self.slot?),
                at,
            }),
            "release" => Some(ParkingOp::Release {
                plate: self.plate?,
                at,
            }),
            "force_release" => Some(ParkingOp::ForceRelease {
                plate: self.plate?,
                at,
            }),
            "reconcile" => Some(ParkingOp::Reconcile {
                plate: self.plate?,
                at,
            }),
            _ => None,
        }
    }
}

fn apply(lot: &ParkingCoordinator, op: ParkingOp) -> Result<(), ParkingError> {
    match op {
        ParkingOp::AddSlot { slot } => lot.add_slot(slot).map(|_| ()),
        ParkingOp::RemoveSlot { slot } => lot.remove_slot(slot),
        ParkingOp::Book { plate, slot, at } => lot
            .book_at(&plate, slot, at.unwrap_or_else(Utc::now))
            .map(|_| ()),
        ParkingOp::Release { plate, at } => lot
            .release_at(&plate, at.unwrap_or_else(Utc::now))
            .map(|_| ()),
        ParkingOp::ForceRelease { plate, at } => lot
            .force_release_at(&plate, at.unwrap_or_else(Utc::now))
            .map(|_| ()),
        ParkingOp::Reconcile { plate, at } => lot
            .reconcile_duplicates_at(&plate, at.unwrap_or_else(Utc::now))
            .map(|_| ()),
    }
}

/// Replays parking events from a CSV reader.
///
/// This function uses streaming parsing to handle arbitrarily large event
/// files without loading everything into memory. Malformed rows and events
/// the engine rejects (double bookings, releases of unparked vehicles) are
/// logged and skipped; processing continues.
///
/// # CSV Format
///
/// Expected columns: `op, plate, slot, at`
/// - `op`: add_slot, remove_slot, book, release, force_release, reconcile
/// - `plate`: License plate (required for vehicle ops)
/// - `slot`: Slot id (required for slot ops and book)
/// - `at`: Optional RFC 3339 timestamp; defaults to now
///
/// # Example
///
/// ```csv
/// op,plate,slot,at
/// add_slot,,1,
/// book,ABC123,1,2026-03-01T08:00:00Z
/// release,abc123,,2026-03-01T09:30:00Z
/// ```
///
/// # Errors
///
/// Returns a CSV error if the reader fails or the CSV structure is
/// invalid. Individual event errors don't stop processing.
pub fn process_events<R: Read>(reader: R) -> Result<ParkingCoordinator, csv::Error> {
    let lot = ParkingCoordinator::default();

    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All) // Handle whitespace in fields like " book "
        .flexible(true) // Allow trailing fields to be omitted
        .has_headers(true)
        .from_reader(reader);

    for result in rdr.deserialize::<CsvRecord>() {
        match result {
            Ok(record) => {
                let Some(op) = record.into_op() else {
                    debug!("skipping invalid event record");
                    continue;
                };

                if let Err(e) = apply(&lot, op) {
                    debug!(error = %e, "skipping rejected event");
                }
            }
            Err(e) => {
                debug!(error = %e, "skipping malformed row");
                continue;
            }
        }
    }

    Ok(lot)
}

/// Writes the session ledger to a CSV writer, newest sessions first.
///
/// Columns: `id, plate, slot_id, entry_time, exit_time, duration_minutes,
/// cost, status`
pub fn write_sessions<W: Write>(lot: &ParkingCoordinator, writer: W) -> Result<(), csv::Error> {
    let mut wtr = Writer::from_writer(writer);
    for session in lot.recent_sessions(usize::MAX) {
        wtr.serialize(&session)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes the slot states to a CSV writer, sorted by slot id.
///
/// Columns: `slot_id, occupied, plate, entry_time, rate_override`
pub fn write_slots<W: Write>(lot: &ParkingCoordinator, writer: W) -> Result<(), csv::Error> {
    let mut wtr = Writer::from_writer(writer);
    for view in lot.list_slots() {
        wtr.serialize(&view)?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::io::Cursor;

    #[test]
    fn replay_book_and_release_with_timestamps() {
        let csv = "op,plate,slot,at\n\
                   add_slot,,1,\n\
                   book,abc123,1,2026-03-01T08:00:00Z\n\
                   release,ABC123,,2026-03-01T09:30:00Z\n";
        let lot = process_events(Cursor::new(csv)).unwrap();

        let history = lot.history("ABC123").unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].duration_minutes, Some(90));
        assert_eq!(history[0].cost, Some(dec!(100)));
        assert!(!lot.is_parked("abc123").unwrap());
    }

    #[test]
    fn rejected_events_are_skipped() {
        let csv = "op,plate,slot,at\n\
                   add_slot,,1,\n\
                   book,AAA111,1,\n\
                   book,BBB222,1,\n\
                   release,CCC333,,\n";
        let lot = process_events(Cursor::new(csv)).unwrap();

        // The second booking lost the slot; the bogus release changed nothing.
        assert!(lot.is_parked("AAA111").unwrap());
        assert!(!lot.is_parked("BBB222").unwrap());
    }

    #[test]
    fn malformed_rows_are_skipped() {
        let csv = "op,plate,slot,at\n\
                   add_slot,,1,\n\
                   not-an-op,x,y,z\n\
                   book,AAA111,1,\n";
        let lot = process_events(Cursor::new(csv)).unwrap();

        assert!(lot.is_parked("aaa111").unwrap());
    }

    #[test]
    fn replay_with_whitespace() {
        let csv = "op,plate,slot,at\n add_slot , , 1 , \n book , abc123 , 1 , \n";
        let lot = process_events(Cursor::new(csv)).unwrap();

        assert!(lot.is_parked("ABC123").unwrap());
    }

    #[test]
    fn write_sessions_emits_header_and_rows() {
        let csv = "op,plate,slot,at\n\
                   add_slot,,1,\n\
                   book,abc123,1,2026-03-01T08:00:00Z\n\
                   release,abc123,,2026-03-01T08:45:00Z\n";
        let lot = process_events(Cursor::new(csv)).unwrap();

        let mut output = Vec::new();
        write_sessions(&lot, &mut output).unwrap();
        let output = String::from_utf8(output).unwrap();

        assert!(output.contains("id,plate,slot_id,entry_time,exit_time,duration_minutes,cost,status"));
        assert!(output.contains("ABC123"));
        assert!(output.contains("closed"));
    }

    #[test]
    fn write_slots_reflects_occupancy() {
        let csv = "op,plate,slot,at\n\
                   add_slot,,1,\n\
                   add_slot,,2,\n\
                   book,abc123,2,\n";
        let lot = process_events(Cursor::new(csv)).unwrap();

        let mut output = Vec::new();
        write_slots(&lot, &mut output).unwrap();
        let output = String::from_utf8(output).unwrap();

        assert!(output.contains("slot_id,occupied,plate,entry_time,rate_override"));
        assert!(output.contains("2,true,ABC123"));
    }
}
