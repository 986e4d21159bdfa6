pub mod accounts;
pub mod availability;
pub mod booking;
pub mod catalog;
pub mod ordering;
pub mod scheduling;
