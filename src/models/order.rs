use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub user_id: String,
    pub address_id: String,
    pub items: Vec<OrderItem>,
    pub total_amount: f64,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: String,
    pub name: String,
    pub price: f64,
    pub quantity: u32,
    pub subtotal: f64,
}

impl OrderItem {
    pub fn new(product_id: String, name: String, price: f64, quantity: u32) -> Self {
        Self {
            subtotal: price * f64::from(quantity),
            product_id,
            name,
            price,
            quantity,
        }
    }
}

pub fn total_amount(items: &[OrderItem]) -> f64 {
    items.iter().map(|item| item.subtotal).sum()
}

macro_rules! string_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }

            pub fn parse(s: &str) -> Option<Self> {
                match s {
                    $($text => Some($name::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

string_enum!(OrderStatus {
    Pending => "pending",
    Confirmed => "confirmed",
    InTransit => "in_transit",
    Delivered => "delivered",
    Cancelled => "cancelled",
});

string_enum!(PaymentStatus {
    Unpaid => "unpaid",
    Paid => "paid",
    Refunded => "refunded",
});

string_enum!(PaymentMethod {
    Cod => "cod",
    Online => "online",
});

impl OrderStatus {
    /// Statuses whose orders still hold stock and block product deletion.
    pub fn is_active(&self) -> bool {
        !matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Stock is taken once on creation and returned once on cancellation, so
    /// both `cancelled` and `delivered` are final.
    pub fn check_transition(&self, next: OrderStatus) -> Result<(), &'static str> {
        match (self, next) {
            (OrderStatus::Cancelled, _) => Err("order is already cancelled"),
            (OrderStatus::Delivered, OrderStatus::Cancelled) => {
                Err("a delivered order cannot be cancelled")
            }
            (OrderStatus::Delivered, _) => Err("a delivered order cannot change status"),
            _ => Ok(()),
        }
    }
}
