//! Simple REST API server example for the parking engine.
//!
//! Run with: `cargo run --example server`
//!
//! ## Endpoints
//!
//! - `POST /book` - Book a slot for a plate (entry)
//! - `POST /release` - Release a parked vehicle (exit)
//! - `GET /slots` - List all slots with occupancy
//! - `POST /slots` - Add a slot
//! - `DELETE /slots/{id}` - Remove a free slot
//! - `GET /vehicles/{plate}/history` - Session history for a plate
//! - `GET /vehicles/{plate}/status` - Where a vehicle is parked, if at all
//! - `POST /vehicles/{plate}/force-release` - Admin: close all open sessions
//! - `POST /vehicles/{plate}/reconcile` - Admin: repair duplicate sessions
//! - `GET /events` - Drain the lifecycle event feed
//!
//! ## Example Usage
//!
//! ```bash
//! # Add a slot
//! curl -X POST http://localhost:3000/slots \
//!   -H "Content-Type: application/json" -d '{"id": 3}'
//!
//! # Entry
//! curl -X POST http://localhost:3000/book \
//!   -H "Content-Type: application/json" \
//!   -d '{"plate": "abc123", "slot_id": 3}'
//!
//! # Exit
//! curl -X POST http://localhost:3000/release \
//!   -H "Content-Type: application/json" -d '{"plate": "ABC123"}'
//!
//! # List slots
//! curl http://localhost:3000/slots
//! ```

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use chrono::{DateTime, Utc};
use parklot_rs::{Booking, ParkingCoordinator, ParkingError, Receipt, SlotId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;

// === Request/Response DTOs ===

#[derive(Debug, Deserialize)]
pub struct BookRequest {
    pub plate: String,
    pub slot_id: u32,
}

#[derive(Debug, Deserialize)]
pub struct ReleaseRequest {
    pub plate: String,
}

#[derive(Debug, Deserialize)]
pub struct AddSlotRequest {
    pub id: u32,
    pub rate_override: Option<Decimal>,
}

/// One history row; open sessions render as "ongoing" with cost 0, the way
/// the operator dashboards expect.
#[derive(Debug, Serialize)]
pub struct HistoryEntry {
    pub slot_id: u32,
    pub entry_time: DateTime<Utc>,
    pub exit_time: Option<DateTime<Utc>>,
    pub duration: String,
    pub cost: Decimal,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct RepairResponse {
    pub closed: usize,
}

/// Response body for errors.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

// === Application State ===

/// Shared application state containing the parking engine.
#[derive(Clone)]
pub struct AppState {
    pub lot: Arc<ParkingCoordinator>,
}

// === Error Handling ===

/// Wrapper for converting `ParkingError` into HTTP responses.
pub struct AppError(ParkingError);

impl From<ParkingError> for AppError {
    fn from(err: ParkingError) -> Self {
        AppError(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self.0 {
            ParkingError::SlotNotFound => (StatusCode::NOT_FOUND, "SLOT_NOT_FOUND"),
            ParkingError::SlotUnavailable => (StatusCode::CONFLICT, "SLOT_UNAVAILABLE"),
            ParkingError::SlotOccupied => (StatusCode::CONFLICT, "SLOT_OCCUPIED"),
            ParkingError::VehicleAlreadyParked => {
                (StatusCode::CONFLICT, "VEHICLE_ALREADY_PARKED")
            }
            ParkingError::NoActiveSession => (StatusCode::NOT_FOUND, "NO_ACTIVE_SESSION"),
            ParkingError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "INVALID_INPUT"),
            ParkingError::Storage(_) => (StatusCode::SERVICE_UNAVAILABLE, "STORAGE_FAILURE"),
        };

        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
                code: code.to_string(),
            }),
        )
            .into_response()
    }
}

// === Handlers ===

/// POST /book - Book a slot for a plate.
async fn book(
    State(state): State<AppState>,
    Json(request): Json<BookRequest>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    let booking = state.lot.book(&request.plate, SlotId(request.slot_id))?;
    Ok((StatusCode::CREATED, Json(booking)))
}

/// POST /release - Release a parked vehicle.
async fn release(
    State(state): State<AppState>,
    Json(request): Json<ReleaseRequest>,
) -> Result<Json<Receipt>, AppError> {
    let receipt = state.lot.release(&request.plate)?;
    Ok(Json(receipt))
}

/// GET /slots - List all slots with occupancy.
async fn list_slots(State(state): State<AppState>) -> Json<Vec<parklot_rs::SlotView>> {
    Json(state.lot.list_slots())
}

/// POST /slots - Add a slot.
async fn add_slot(
    State(state): State<AppState>,
    Json(request): Json<AddSlotRequest>,
) -> Result<StatusCode, AppError> {
    let inserted = state
        .lot
        .add_slot_with_rate(SlotId(request.id), request.rate_override)?;
    // Re-adding an existing slot is a no-op, not an error.
    Ok(if inserted {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    })
}

/// DELETE /slots/{id} - Remove a free slot.
async fn remove_slot(
    State(state): State<AppState>,
    Path(id): Path<u32>,
) -> Result<StatusCode, AppError> {
    state.lot.remove_slot(SlotId(id))?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /vehicles/{plate}/history - Session history, newest first.
async fn history(
    State(state): State<AppState>,
    Path(plate): Path<String>,
) -> Result<Json<Vec<HistoryEntry>>, AppError> {
    let entries = state
        .lot
        .history(&plate)?
        .into_iter()
        .map(|session| HistoryEntry {
            slot_id: session.slot_id.0,
            entry_time: session.entry_time,
            exit_time: session.exit_time,
            duration: match session.duration_minutes {
                Some(minutes) => format!("{}m", minutes),
                None => "ongoing".to_string(),
            },
            cost: session.billed_cost(),
            status: match session.status {
                parklot_rs::SessionStatus::Open => "open",
                parklot_rs::SessionStatus::Closed => "closed",
                parklot_rs::SessionStatus::Cancelled => "cancelled",
            }
            .to_string(),
        })
        .collect();
    Ok(Json(entries))
}

/// GET /vehicles/{plate}/status - Current parking state for a plate.
async fn vehicle_status(
    State(state): State<AppState>,
    Path(plate): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let status = state.lot.vehicle_status(&plate)?;
    Ok(Json(match status {
        Some(session) => serde_json::json!({
            "parked": true,
            "slot_id": session.slot_id,
            "entry_time": session.entry_time,
        }),
        None => serde_json::json!({ "parked": false }),
    }))
}

/// POST /vehicles/{plate}/force-release - Close all open sessions.
async fn force_release(
    State(state): State<AppState>,
    Path(plate): Path<String>,
) -> Result<Json<RepairResponse>, AppError> {
    let closed = state.lot.force_release(&plate)?;
    Ok(Json(RepairResponse { closed }))
}

/// POST /vehicles/{plate}/reconcile - Repair duplicate open sessions.
async fn reconcile(
    State(state): State<AppState>,
    Path(plate): Path<String>,
) -> Result<Json<RepairResponse>, AppError> {
    let closed = state.lot.reconcile_duplicates(&plate)?;
    Ok(Json(RepairResponse { closed }))
}

/// GET /events - Drain the lifecycle event feed.
async fn events(State(state): State<AppState>) -> Json<Vec<parklot_rs::ParkingEvent>> {
    Json(state.lot.drain_events())
}

// === Router ===

fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/book", post(book))
        .route("/release", post(release))
        .route("/slots", get(list_slots).post(add_slot))
        .route("/slots/{id}", delete(remove_slot))
        .route("/vehicles/{plate}/history", get(history))
        .route("/vehicles/{plate}/status", get(vehicle_status))
        .route("/vehicles/{plate}/force-release", post(force_release))
        .route("/vehicles/{plate}/reconcile", post(reconcile))
        .route("/events", get(events))
        .with_state(state)
}

// === Main ===

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let state = AppState {
        lot: Arc::new(ParkingCoordinator::default()),
    };

    // A small default lot so the demo is immediately usable.
    for id in 1..=10 {
        let _ = state.lot.add_slot(SlotId(id));
    }

    let app = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:3000").await.unwrap();
    println!("Parking API server running on http://127.0.0.1:3000");
    println!();
    println!("Endpoints:");
    println!("  POST   /book                            - Book a slot (entry)");
    println!("  POST   /release                         - Release a vehicle (exit)");
    println!("  GET    /slots                           - List slots");
    println!("  POST   /slots                           - Add a slot");
    println!("  DELETE /slots/:id                       - Remove a free slot");
    println!("  GET    /vehicles/:plate/history         - Session history");
    println!("  GET    /vehicles/:plate/status          - Vehicle status");
    println!("  POST   /vehicles/:plate/force-release   - Admin repair");
    println!("  POST   /vehicles/:plate/reconcile       - Admin repair");
    println!("  GET    /events                          - Event feed");

    axum::serve(listener, app).await.unwrap();
}
