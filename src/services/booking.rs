use chrono::{NaiveDate, Utc};
use rusqlite::{Connection, TransactionBehavior};
use serde::Deserialize;

use crate::auth::Identity;
use crate::db::{self, queries};
use crate::errors::AppError;
use crate::models::validate::{is_valid_phone, FieldErrors};
use crate::models::{Booking, BookingStatus};
use crate::services::scheduling::{parse_slot, validate_booking_slot};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBooking {
    /// Only honoured for administrators booking on someone's behalf.
    pub user_id: Option<String>,
    pub service_id: String,
    pub date: String,
    pub time: String,
    pub name: String,
    pub phone: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingChanges {
    pub date: Option<String>,
    pub time: Option<String>,
    pub name: Option<String>,
    pub phone: Option<String>,
}

fn check_contact(errors: &mut FieldErrors, name: &str, phone: &str) {
    errors.non_empty("name", name);
    errors.check(is_valid_phone(phone), "phone must be 10 to 15 digits");
}

/// Store-level backstop for the per-user slot rule.
fn slot_taken(err: anyhow::Error) -> AppError {
    if db::is_constraint_violation(&err) {
        AppError::Conflict("you already have a booking at this date and time".to_string())
    } else {
        AppError::Internal(err)
    }
}

fn load(conn: &Connection, id: &str) -> Result<Booking, AppError> {
    queries::get_booking_by_id(conn, id)?
        .ok_or_else(|| AppError::NotFound(format!("booking {id}")))
}

pub fn create_booking(
    conn: &mut Connection,
    actor: &Identity,
    req: NewBooking,
    today: NaiveDate,
) -> Result<Booking, AppError> {
    let user_id = actor.acting_for(req.user_id.as_deref())?;

    let mut errors = FieldErrors::new();
    errors.non_empty("serviceId", &req.service_id);
    let slot = parse_slot(&mut errors, &req.date, &req.time, today);
    check_contact(&mut errors, &req.name, &req.phone);
    errors.finish()?;
    let Some((date, time)) = slot else {
        return Err(AppError::invalid("date and time are required"));
    };

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    if queries::get_user(&tx, &user_id)?.is_none() {
        return Err(AppError::NotFound(format!("user {user_id}")));
    }
    let service = queries::get_service(&tx, &req.service_id)?
        .ok_or_else(|| AppError::NotFound(format!("service {}", req.service_id)))?;

    validate_booking_slot(&tx, &user_id, &date, &time, None)?;

    let now = Utc::now().naive_utc();
    let booking = Booking {
        id: uuid::Uuid::new_v4().to_string(),
        user_id,
        service_id: service.id,
        service_name: service.name,
        service_price: service.price,
        service_duration: service.duration,
        date,
        time,
        name: req.name.trim().to_string(),
        phone: req.phone,
        status: BookingStatus::Pending,
        created_at: now,
        updated_at: now,
    };
    queries::insert_booking(&tx, &booking).map_err(slot_taken)?;
    tx.commit()?;

    tracing::info!(
        booking_id = %booking.id,
        user_id = %booking.user_id,
        date = %booking.date,
        time = %booking.time,
        "booking created"
    );
    Ok(booking)
}

/// Reschedules and/or edits contact details. A new date or time goes through
/// the same slot checks as creation, ignoring the booking itself.
pub fn update_booking(
    conn: &mut Connection,
    actor: &Identity,
    id: &str,
    changes: BookingChanges,
    today: NaiveDate,
) -> Result<Booking, AppError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let mut booking = load(&tx, id)?;
    actor.require_owner_or_admin(&booking.user_id)?;

    if booking.status.is_terminal() {
        return Err(AppError::InvalidState(format!(
            "a {} booking cannot be changed",
            booking.status.as_str()
        )));
    }

    let reschedule = changes.date.is_some() || changes.time.is_some();
    let date = changes
        .date
        .unwrap_or_else(|| booking.date.format("%Y-%m-%d").to_string());
    let time = changes.time.unwrap_or_else(|| booking.time.clone());
    let name = changes.name.unwrap_or_else(|| booking.name.clone());
    let phone = changes.phone.unwrap_or_else(|| booking.phone.clone());

    let mut errors = FieldErrors::new();
    let slot = if reschedule {
        parse_slot(&mut errors, &date, &time, today)
    } else {
        None
    };
    check_contact(&mut errors, &name, &phone);
    errors.finish()?;

    booking.name = name.trim().to_string();
    booking.phone = phone;

    if let Some((date, time)) = slot {
        validate_booking_slot(&tx, &booking.user_id, &date, &time, Some(&booking.id))?;
        booking.date = date;
        booking.time = time;
    }

    queries::update_booking(&tx, &booking).map_err(slot_taken)?;
    let booking = load(&tx, id)?;
    tx.commit()?;

    if reschedule {
        tracing::info!(booking_id = %booking.id, date = %booking.date, time = %booking.time, "booking rescheduled");
    }
    Ok(booking)
}

pub fn cancel_booking(
    conn: &Connection,
    actor: &Identity,
    id: &str,
) -> Result<Booking, AppError> {
    let mut booking = load(conn, id)?;
    actor.require_owner_or_admin(&booking.user_id)?;

    booking
        .status
        .check_transition(BookingStatus::Cancelled)
        .map_err(|msg| AppError::InvalidState(msg.to_string()))?;

    queries::update_booking_status(conn, id, BookingStatus::Cancelled)?;
    booking.status = BookingStatus::Cancelled;

    tracing::info!(booking_id = %id, "booking cancelled");
    Ok(booking)
}

/// Privileged status change. Any listed status is accepted except where the
/// cancellation rules forbid it.
pub fn set_booking_status(
    conn: &Connection,
    actor: &Identity,
    id: &str,
    status: &str,
) -> Result<Booking, AppError> {
    actor.require_admin()?;
    let next = BookingStatus::parse(status).ok_or_else(|| {
        AppError::invalid(format!(
            "status must be one of: {}",
            BookingStatus::ALL.map(|s| s.as_str()).join(", ")
        ))
    })?;

    let booking = load(conn, id)?;
    booking
        .status
        .check_transition(next)
        .map_err(|msg| AppError::InvalidState(msg.to_string()))?;

    queries::update_booking_status(conn, id, next).map_err(slot_taken)?;

    tracing::info!(booking_id = %id, from = booking.status.as_str(), to = next.as_str(), "booking status changed");
    load(conn, id)
}

pub fn delete_booking(conn: &Connection, actor: &Identity, id: &str) -> Result<(), AppError> {
    let booking = load(conn, id)?;
    actor.require_owner_or_admin(&booking.user_id)?;

    if booking.status != BookingStatus::Cancelled {
        return Err(AppError::InvalidState(
            "only cancelled bookings can be deleted".to_string(),
        ));
    }

    queries::delete_booking(conn, id)?;
    tracing::info!(booking_id = %id, "booking deleted");
    Ok(())
}

pub fn get_booking(conn: &Connection, actor: &Identity, id: &str) -> Result<Booking, AppError> {
    let booking = load(conn, id)?;
    actor.require_owner_or_admin(&booking.user_id)?;
    Ok(booking)
}

pub fn list_bookings(
    conn: &Connection,
    actor: &Identity,
    status: Option<&str>,
) -> Result<Vec<Booking>, AppError> {
    let status = match status {
        Some(s) => Some(
            BookingStatus::parse(s)
                .ok_or_else(|| AppError::invalid(format!("unknown status {s:?}")))?,
        ),
        None => None,
    };
    let user_filter = (!actor.is_admin()).then_some(actor.id.as_str());
    Ok(queries::list_bookings(conn, user_filter, status)?)
}
