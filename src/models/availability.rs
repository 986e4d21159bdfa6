use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Blackout state for one calendar date. A date with no record is fully
/// available; a record never exists without some restriction in it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Availability {
    pub date: NaiveDate,
    pub is_full_day_unavailable: bool,
    pub unavailable_slots: BTreeSet<String>,
}

impl Availability {
    pub fn full_day(date: NaiveDate) -> Self {
        Self {
            date,
            is_full_day_unavailable: true,
            unavailable_slots: BTreeSet::new(),
        }
    }

    /// Adds `time` to the blocked set. A full-day record is returned untouched.
    pub fn block_slot(existing: Option<Availability>, date: NaiveDate, time: &str) -> Self {
        let mut record = existing.unwrap_or(Availability {
            date,
            is_full_day_unavailable: false,
            unavailable_slots: BTreeSet::new(),
        });
        if !record.is_full_day_unavailable {
            record.unavailable_slots.insert(time.to_string());
        }
        record
    }

    /// Releases one slot, or the whole day when `time` is `None`.
    /// Returns `None` when nothing is left to restrict.
    pub fn release(self, time: Option<&str>) -> Option<Availability> {
        let time = time?;
        let mut record = self;
        record.is_full_day_unavailable = false;
        record.unavailable_slots.remove(time);
        if record.is_empty() {
            None
        } else {
            Some(record)
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.is_full_day_unavailable && self.unavailable_slots.is_empty()
    }

    pub fn blocks(&self, time: &str) -> bool {
        self.is_full_day_unavailable || self.unavailable_slots.contains(time)
    }
}

/// No record and an empty record both mean the slot is open.
pub fn is_bookable(record: Option<&Availability>, time: &str) -> bool {
    !record.is_some_and(|r| r.blocks(time))
}
