use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: String,
    pub user_id: String,
    pub service_id: String,
    pub service_name: String,
    pub service_price: f64,
    pub service_duration: String,
    pub date: NaiveDate,
    pub time: String,
    pub name: String,
    pub phone: String,
    pub status: BookingStatus,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 5] = [
        BookingStatus::Pending,
        BookingStatus::Confirmed,
        BookingStatus::InProgress,
        BookingStatus::Completed,
        BookingStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::InProgress => "in_progress",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == s)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Completed | BookingStatus::Cancelled)
    }

    /// Transition table applied to privileged status changes. Only the
    /// cancellation rules are enforced; other moves are accepted as given.
    pub fn check_transition(&self, next: BookingStatus) -> Result<(), &'static str> {
        match (self, next) {
            (BookingStatus::Completed, BookingStatus::Cancelled) => {
                Err("a completed booking cannot be cancelled")
            }
            (BookingStatus::Cancelled, BookingStatus::Cancelled) => {
                Err("booking is already cancelled")
            }
            _ => Ok(()),
        }
    }
}
