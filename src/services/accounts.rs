use chrono::Utc;
use rusqlite::{Connection, TransactionBehavior};
use serde::Deserialize;

use crate::auth::Identity;
use crate::db::{self, queries};
use crate::errors::AppError;
use crate::models::validate::{is_valid_phone, is_valid_pincode, FieldErrors};
use crate::models::{Address, Role, User};

#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub phone: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAddress {
    pub label: String,
    pub recipient_name: String,
    pub phone: String,
    pub address_line: String,
    pub landmark: Option<String>,
    pub pincode: String,
    pub city: String,
    pub state: String,
    #[serde(default)]
    pub is_default: bool,
}

pub fn register_user(conn: &Connection, req: NewUser) -> Result<User, AppError> {
    let mut errors = FieldErrors::new();
    errors.non_empty("name", &req.name);
    errors.check(is_valid_phone(&req.phone), "phone must be 10 to 15 digits");
    errors.finish()?;

    let user = User {
        id: uuid::Uuid::new_v4().to_string(),
        phone: req.phone,
        name: req.name.trim().to_string(),
        role: Role::User,
        created_at: Utc::now().naive_utc(),
    };
    queries::insert_user(conn, &user).map_err(|e| {
        if db::is_constraint_violation(&e) {
            AppError::Conflict("phone number is already registered".to_string())
        } else {
            AppError::Internal(e)
        }
    })?;
    tracing::info!(user_id = %user.id, "user registered");
    Ok(user)
}

pub fn get_user(conn: &Connection, id: &str) -> Result<User, AppError> {
    queries::get_user(conn, id)?.ok_or_else(|| AppError::NotFound(format!("user {id}")))
}

/// A user's first address, or one flagged default, becomes the only default.
pub fn add_address(
    conn: &mut Connection,
    actor: &Identity,
    req: NewAddress,
) -> Result<Address, AppError> {
    let mut errors = FieldErrors::new();
    errors.non_empty("label", &req.label);
    errors.non_empty("recipientName", &req.recipient_name);
    errors.non_empty("addressLine", &req.address_line);
    errors.non_empty("city", &req.city);
    errors.non_empty("state", &req.state);
    errors.check(is_valid_phone(&req.phone), "phone must be 10 to 15 digits");
    errors.check(is_valid_pincode(&req.pincode), "pincode must be 6 digits");
    errors.finish()?;

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    get_user(&tx, &actor.id)?;

    let first = queries::list_addresses(&tx, &actor.id)?.is_empty();
    let is_default = req.is_default || first;
    if is_default {
        queries::clear_default_address(&tx, &actor.id)?;
    }

    let address = Address {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: actor.id.clone(),
        label: req.label,
        recipient_name: req.recipient_name,
        phone: req.phone,
        address_line: req.address_line,
        landmark: req.landmark.filter(|l| !l.trim().is_empty()),
        pincode: req.pincode,
        city: req.city,
        state: req.state,
        is_default,
    };
    queries::insert_address(&tx, &address)?;
    tx.commit()?;
    Ok(address)
}

pub fn list_addresses(conn: &Connection, actor: &Identity) -> Result<Vec<Address>, AppError> {
    Ok(queries::list_addresses(conn, &actor.id)?)
}
