use chrono::{NaiveDate, NaiveTime};
use rusqlite::Connection;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::availability::is_bookable;
use crate::models::slots::is_slot_start;
use crate::models::validate::FieldErrors;

#[derive(Debug, thiserror::Error)]
pub enum SchedulingError {
    #[error("{date} {time} is not available for booking")]
    Unavailable { date: NaiveDate, time: String },

    #[error("you already have a booking on {date} at {time}")]
    AlreadyBooked { date: NaiveDate, time: String },

    #[error("{time} is not a slot time; slots start every 30 minutes from 09:00 to 20:30")]
    OutsideSlots { time: String },
}

impl From<SchedulingError> for AppError {
    fn from(e: SchedulingError) -> Self {
        match e {
            SchedulingError::OutsideSlots { .. } => AppError::Validation(vec![e.to_string()]),
            _ => AppError::Conflict(e.to_string()),
        }
    }
}

/// Records an error when `time` is not one of the day's slot start times.
pub fn check_slot_time(errors: &mut FieldErrors, date: NaiveDate, time: NaiveTime) {
    if !is_slot_start(date, time) {
        let err = SchedulingError::OutsideSlots {
            time: time.format("%H:%M").to_string(),
        };
        errors.check(false, err.to_string());
    }
}

/// Parses a requested date and time, rejecting past dates. Time of day is
/// ignored when comparing against `today`.
pub fn parse_slot(
    errors: &mut FieldErrors,
    date: &str,
    time: &str,
    today: NaiveDate,
) -> Option<(NaiveDate, String)> {
    let date = errors.date("date", date);
    let time = errors.time("time", time);
    if let Some(d) = date {
        errors.check(d >= today, "date cannot be in the past");
    }
    if let (Some(d), Some(t)) = (date, time) {
        check_slot_time(errors, d, t);
    }
    Some((date?, time?.format("%H:%M").to_string()))
}

/// Checks the calendar, then the user's own bookings. Two different users may
/// hold the same slot; one user may not hold it twice.
pub fn validate_booking_slot(
    conn: &Connection,
    user_id: &str,
    date: &NaiveDate,
    time: &str,
    exclude_booking: Option<&str>,
) -> Result<(), AppError> {
    let record = queries::get_availability(conn, date)?;
    if !is_bookable(record.as_ref(), time) {
        tracing::warn!(%date, time, "slot blocked by calendar");
        return Err(SchedulingError::Unavailable {
            date: *date,
            time: time.to_string(),
        }
        .into());
    }

    if queries::find_active_booking(conn, user_id, date, time, exclude_booking)?.is_some() {
        tracing::warn!(user_id, %date, time, "duplicate booking rejected");
        return Err(SchedulingError::AlreadyBooked {
            date: *date,
            time: time.to_string(),
        }
        .into());
    }

    Ok(())
}
