pub mod availability;
pub mod booking;
pub mod catalog;
pub mod order;
pub mod slots;
pub mod user;
pub mod validate;

pub use availability::Availability;
pub use booking::{Booking, BookingStatus};
pub use catalog::{Product, Review, Service};
pub use order::{Order, OrderItem, OrderStatus, PaymentMethod, PaymentStatus};
pub use slots::{DaySlots, SlotView};
pub use user::{Address, Role, User};
