use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::auth::Identity;
use crate::errors::AppError;
use crate::handlers::{reply, today};
use crate::services::booking::{self, BookingChanges, NewBooking};
use crate::state::AppState;

// POST /api/bookings
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    actor: Identity,
    Json(body): Json<NewBooking>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let created = {
        let mut db = state.db()?;
        booking::create_booking(&mut db, &actor, body, today())?
    };
    Ok((StatusCode::CREATED, reply("booking created", created)))
}

// GET /api/bookings
#[derive(Deserialize)]
pub struct BookingsQuery {
    pub status: Option<String>,
}

pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    actor: Identity,
    Query(query): Query<BookingsQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let bookings = {
        let db = state.db()?;
        booking::list_bookings(&db, &actor, query.status.as_deref())?
    };
    Ok(reply("bookings", bookings))
}

// GET /api/bookings/:id
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    actor: Identity,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let found = {
        let db = state.db()?;
        booking::get_booking(&db, &actor, &id)?
    };
    Ok(reply("booking", found))
}

// PATCH /api/bookings/:id
pub async fn update_booking(
    State(state): State<Arc<AppState>>,
    actor: Identity,
    Path(id): Path<String>,
    Json(body): Json<BookingChanges>,
) -> Result<Json<serde_json::Value>, AppError> {
    let updated = {
        let mut db = state.db()?;
        booking::update_booking(&mut db, &actor, &id, body, today())?
    };
    Ok(reply("booking updated", updated))
}

// POST /api/bookings/:id/cancel
pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    actor: Identity,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let cancelled = {
        let db = state.db()?;
        booking::cancel_booking(&db, &actor, &id)?
    };
    Ok(reply("booking cancelled", cancelled))
}

// PUT /api/bookings/:id/status
#[derive(Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

pub async fn set_status(
    State(state): State<Arc<AppState>>,
    actor: Identity,
    Path(id): Path<String>,
    Json(body): Json<StatusRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let updated = {
        let db = state.db()?;
        booking::set_booking_status(&db, &actor, &id, &body.status)?
    };
    Ok(reply("booking status updated", updated))
}

// DELETE /api/bookings/:id
pub async fn delete_booking(
    State(state): State<Arc<AppState>>,
    actor: Identity,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    {
        let db = state.db()?;
        booking::delete_booking(&db, &actor, &id)?;
    }
    Ok(reply("booking deleted", serde_json::json!({ "id": id })))
}
