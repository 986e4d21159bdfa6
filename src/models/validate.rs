use chrono::{NaiveDate, NaiveTime};

use crate::errors::AppError;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M";

/// Strict `YYYY-MM-DD`.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    if s.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(s, DATE_FORMAT).ok()
}

/// Strict 24-hour `HH:mm`.
pub fn parse_time(s: &str) -> Option<NaiveTime> {
    if s.len() != 5 {
        return None;
    }
    NaiveTime::parse_from_str(s, TIME_FORMAT).ok()
}

pub fn is_valid_phone(s: &str) -> bool {
    let digits = s.strip_prefix('+').unwrap_or(s);
    (10..=15).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit())
}

pub fn is_valid_pincode(s: &str) -> bool {
    s.len() == 6 && s.chars().all(|c| c.is_ascii_digit())
}

/// Accumulates every field problem so callers see all of them at once.
#[derive(Debug, Default)]
pub struct FieldErrors(Vec<String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&mut self, ok: bool, message: impl Into<String>) {
        if !ok {
            self.0.push(message.into());
        }
    }

    pub fn date(&mut self, field: &str, value: &str) -> Option<NaiveDate> {
        let parsed = parse_date(value);
        self.check(
            parsed.is_some(),
            format!("{field} must be a date in YYYY-MM-DD format"),
        );
        parsed
    }

    pub fn time(&mut self, field: &str, value: &str) -> Option<NaiveTime> {
        let parsed = parse_time(value);
        self.check(
            parsed.is_some(),
            format!("{field} must be a time in HH:mm format"),
        );
        parsed
    }

    pub fn non_empty(&mut self, field: &str, value: &str) {
        self.check(!value.trim().is_empty(), format!("{field} is required"));
    }

    pub fn finish(self) -> Result<(), AppError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self.0))
        }
    }
}
