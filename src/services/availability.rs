use chrono::NaiveDate;
use rusqlite::{Connection, TransactionBehavior};

use crate::db::queries;
use crate::errors::AppError;
use crate::models::availability::is_bookable;
use crate::models::Availability;

pub fn mark_full_day_unavailable(
    conn: &Connection,
    date: NaiveDate,
) -> Result<Availability, AppError> {
    let record = Availability::full_day(date);
    queries::save_availability(conn, &record)?;
    tracing::info!(%date, "day marked unavailable");
    Ok(record)
}

pub fn mark_slot_unavailable(
    conn: &mut Connection,
    date: NaiveDate,
    time: &str,
) -> Result<Availability, AppError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let existing = queries::get_availability(&tx, &date)?;

    if let Some(record) = existing.as_ref().filter(|r| r.is_full_day_unavailable) {
        tracing::debug!(%date, time, "day already blocked, slot unchanged");
        return Ok(record.clone());
    }

    let record = Availability::block_slot(existing, date, time);
    queries::save_availability(&tx, &record)?;
    tx.commit()?;

    tracing::info!(%date, time, "slot marked unavailable");
    Ok(record)
}

/// Lifts a restriction. `Ok(None)` means the date no longer has a record and
/// is fully available.
pub fn mark_available_again(
    conn: &mut Connection,
    date: NaiveDate,
    time: Option<&str>,
) -> Result<Option<Availability>, AppError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let existing = queries::get_availability(&tx, &date)?
        .ok_or_else(|| AppError::NotFound(format!("no availability restriction on {date}")))?;

    let remaining = existing.release(time);
    match &remaining {
        Some(record) => queries::save_availability(&tx, record)?,
        None => {
            queries::delete_availability(&tx, &date)?;
        }
    }
    tx.commit()?;

    tracing::info!(%date, time = time.unwrap_or("all"), "availability restored");
    Ok(remaining)
}

pub fn get_day(conn: &Connection, date: NaiveDate) -> Result<Option<Availability>, AppError> {
    let record = queries::get_availability(conn, &date)?;
    // A stored record with nothing in it reads the same as no record.
    Ok(record.filter(|r| !r.is_empty()))
}

pub fn is_slot_bookable(conn: &Connection, date: NaiveDate, time: &str) -> Result<bool, AppError> {
    let record = queries::get_availability(conn, &date)?;
    Ok(is_bookable(record.as_ref(), time))
}
