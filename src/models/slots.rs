use chrono::{Duration, NaiveDate, NaiveTime};
use serde::Serialize;

use super::availability::{is_bookable, Availability};

pub const OPENING_HOUR: u32 = 9;
pub const CLOSING_HOUR: u32 = 21;
pub const SLOT_MINUTES: i64 = 30;

/// Canonical slot start times for a day, 09:00 through 20:30.
///
/// The sequence does not depend on stored state; cloning the iterator
/// restarts it.
#[derive(Debug, Clone)]
pub struct DaySlots {
    next: Option<NaiveTime>,
    close: NaiveTime,
}

impl DaySlots {
    pub fn for_date(_date: NaiveDate) -> Self {
        Self {
            next: NaiveTime::from_hms_opt(OPENING_HOUR, 0, 0),
            close: NaiveTime::from_hms_opt(CLOSING_HOUR, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

impl Iterator for DaySlots {
    type Item = NaiveTime;

    fn next(&mut self) -> Option<NaiveTime> {
        let current = self.next.filter(|t| *t < self.close)?;
        let (following, wrapped) =
            current.overflowing_add_signed(Duration::minutes(SLOT_MINUTES));
        self.next = (wrapped == 0).then_some(following);
        Some(current)
    }
}

/// True when `time` is one of the day's slot start times.
pub fn is_slot_start(date: NaiveDate, time: NaiveTime) -> bool {
    DaySlots::for_date(date).any(|t| t == time)
}

pub fn slot_labels(date: NaiveDate) -> Vec<String> {
    DaySlots::for_date(date)
        .map(|t| t.format("%H:%M").to_string())
        .collect()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotView {
    pub time: String,
    pub is_bookable: bool,
}

/// Applies a day's blackout record to the canonical slot universe.
pub fn day_view(date: NaiveDate, record: Option<&Availability>) -> Vec<SlotView> {
    slot_labels(date)
        .into_iter()
        .map(|time| SlotView {
            is_bookable: is_bookable(record, &time),
            time,
        })
        .collect()
}
