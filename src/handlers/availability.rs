use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::auth::Identity;
use crate::errors::AppError;
use crate::handlers::{reply, today};
use crate::models::slots::day_view;
use crate::models::validate::FieldErrors;
use crate::services::availability;
use crate::services::scheduling::check_slot_time;
use crate::state::AppState;

/// Admin writes only target today or later.
fn writable_date(errors: &mut FieldErrors, raw: &str) -> Option<NaiveDate> {
    let date = errors.date("date", raw);
    if let Some(d) = date {
        errors.check(d >= today(), "date cannot be in the past");
    }
    date
}

/// Parses `raw` and requires it to be one of the day's slot start times.
fn slot_time(errors: &mut FieldErrors, date: Option<NaiveDate>, raw: &str) -> Option<String> {
    let time = errors.time("time", raw)?;
    if let Some(d) = date {
        check_slot_time(errors, d, time);
    }
    Some(time.format("%H:%M").to_string())
}

// GET /api/availability
#[derive(Deserialize)]
pub struct ListQuery {
    pub from: Option<String>,
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let from = match query.from.as_deref() {
        Some(raw) => {
            let mut errors = FieldErrors::new();
            let date = errors.date("from", raw);
            errors.finish()?;
            date.unwrap_or_else(today)
        }
        None => today(),
    };

    let records = {
        let db = state.db()?;
        crate::db::queries::list_availability(&db, &from)?
    };
    Ok(reply("availability restrictions", records))
}

// GET /api/availability/:date
pub async fn get_day(
    State(state): State<Arc<AppState>>,
    Path(raw): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut errors = FieldErrors::new();
    let date = errors.date("date", &raw);
    errors.finish()?;
    let Some(date) = date else {
        return Err(AppError::invalid("date is required"));
    };

    let record = {
        let db = state.db()?;
        availability::get_day(&db, date)?
    };
    let slots = day_view(date, record.as_ref());

    Ok(reply(
        "day availability",
        serde_json::json!({
            "date": date,
            "isFullDayUnavailable": record.as_ref().is_some_and(|r| r.is_full_day_unavailable),
            "unavailableSlots": record.as_ref().map(|r| r.unavailable_slots.clone()).unwrap_or_default(),
            "slots": slots,
        }),
    ))
}

// POST /api/availability/full-day
#[derive(Deserialize)]
pub struct DayRequest {
    pub date: String,
}

pub async fn mark_full_day(
    State(state): State<Arc<AppState>>,
    actor: Identity,
    Json(body): Json<DayRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    actor.require_admin()?;
    let mut errors = FieldErrors::new();
    let date = writable_date(&mut errors, &body.date);
    errors.finish()?;
    let Some(date) = date else {
        return Err(AppError::invalid("date is required"));
    };

    let record = {
        let db = state.db()?;
        availability::mark_full_day_unavailable(&db, date)?
    };
    Ok(reply("day marked unavailable", record))
}

// POST /api/availability/slot
#[derive(Deserialize)]
pub struct SlotRequest {
    pub date: String,
    pub time: String,
}

pub async fn mark_slot(
    State(state): State<Arc<AppState>>,
    actor: Identity,
    Json(body): Json<SlotRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    actor.require_admin()?;
    let mut errors = FieldErrors::new();
    let date = writable_date(&mut errors, &body.date);
    let time = slot_time(&mut errors, date, &body.time);
    errors.finish()?;
    let (Some(date), Some(time)) = (date, time) else {
        return Err(AppError::invalid("date and time are required"));
    };

    let record = {
        let mut db = state.db()?;
        availability::mark_slot_unavailable(&mut db, date, &time)?
    };
    let message = if record.is_full_day_unavailable {
        "day is already fully unavailable"
    } else {
        "slot marked unavailable"
    };
    Ok(reply(message, record))
}

// POST /api/availability/available
#[derive(Deserialize)]
pub struct ReleaseRequest {
    pub date: String,
    pub time: Option<String>,
}

pub async fn mark_available(
    State(state): State<Arc<AppState>>,
    actor: Identity,
    Json(body): Json<ReleaseRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    actor.require_admin()?;
    let mut errors = FieldErrors::new();
    let date = writable_date(&mut errors, &body.date);
    let time = match body.time.as_deref() {
        Some(raw) => slot_time(&mut errors, date, raw),
        None => None,
    };
    errors.finish()?;
    let Some(date) = date else {
        return Err(AppError::invalid("date is required"));
    };

    let remaining = {
        let mut db = state.db()?;
        availability::mark_available_again(&mut db, date, time.as_deref())?
    };
    let message = match &remaining {
        Some(_) => "slot marked available",
        None => "date is fully available",
    };
    Ok(reply(message, remaining))
}
