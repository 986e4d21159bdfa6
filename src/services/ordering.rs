use chrono::Utc;
use rusqlite::{Connection, TransactionBehavior};
use serde::Deserialize;

use crate::auth::Identity;
use crate::db::queries;
use crate::errors::AppError;
use crate::models::order::total_amount;
use crate::models::validate::FieldErrors;
use crate::models::{Order, OrderItem, OrderStatus, PaymentMethod, PaymentStatus};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub user_id: Option<String>,
    pub address_id: String,
    pub items: Vec<NewOrderItem>,
    pub payment_method: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrderItem {
    pub product_id: String,
    pub quantity: i64,
}

fn load(conn: &Connection, id: &str) -> Result<Order, AppError> {
    queries::get_order(conn, id)?.ok_or_else(|| AppError::NotFound(format!("order {id}")))
}

/// Validates the request, prices every line from current product data,
/// writes the order and takes stock, all in one transaction. Any shortfall
/// rolls the whole order back.
pub fn create_order(
    conn: &mut Connection,
    actor: &Identity,
    req: NewOrder,
) -> Result<Order, AppError> {
    let user_id = actor.acting_for(req.user_id.as_deref())?;

    let mut errors = FieldErrors::new();
    errors.non_empty("addressId", &req.address_id);
    errors.check(!req.items.is_empty(), "order must contain at least one item");
    for (i, item) in req.items.iter().enumerate() {
        errors.non_empty(&format!("items[{i}].productId"), &item.product_id);
        errors.check(
            item.quantity >= 1 && item.quantity <= i64::from(u32::MAX),
            format!("items[{i}].quantity must be a positive whole number"),
        );
    }
    let payment_method = match req.payment_method.as_deref() {
        None => Some(PaymentMethod::Cod),
        Some(raw) => {
            let parsed = PaymentMethod::parse(raw);
            errors.check(parsed.is_some(), "paymentMethod must be one of: cod, online");
            parsed
        }
    };
    errors.finish()?;
    let payment_method = payment_method.unwrap_or(PaymentMethod::Cod);

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    if queries::get_user(&tx, &user_id)?.is_none() {
        return Err(AppError::NotFound(format!("user {user_id}")));
    }
    queries::get_address(&tx, &req.address_id)?
        .filter(|a| a.user_id == user_id)
        .ok_or_else(|| AppError::NotFound(format!("address {}", req.address_id)))?;

    let mut items = Vec::with_capacity(req.items.len());
    for line in &req.items {
        let quantity = u32::try_from(line.quantity)
            .map_err(|_| AppError::invalid("quantity out of range"))?;
        let product = queries::get_product(&tx, &line.product_id)?
            .ok_or_else(|| AppError::NotFound(format!("product {}", line.product_id)))?;
        if product.stock < i64::from(quantity) {
            tracing::warn!(product_id = %product.id, requested = quantity, available = product.stock, "insufficient stock");
            return Err(AppError::InsufficientStock {
                product: product.name,
                requested: quantity,
                available: product.stock,
            });
        }
        items.push(OrderItem::new(product.id, product.name, product.price, quantity));
    }

    let now = Utc::now().naive_utc();
    let order = Order {
        id: uuid::Uuid::new_v4().to_string(),
        user_id,
        address_id: req.address_id,
        total_amount: total_amount(&items),
        items,
        status: OrderStatus::Pending,
        payment_status: PaymentStatus::Unpaid,
        payment_method,
        created_at: now,
        updated_at: now,
    };
    queries::insert_order(&tx, &order)?;

    for item in &order.items {
        if !queries::take_stock(&tx, &item.product_id, item.quantity)? {
            // Same product listed twice can pass the per-line check above.
            let available = queries::get_product(&tx, &item.product_id)?
                .map(|p| p.stock)
                .unwrap_or(0);
            tracing::warn!(product_id = %item.product_id, requested = item.quantity, available, "stock decrement refused");
            return Err(AppError::InsufficientStock {
                product: item.name.clone(),
                requested: item.quantity,
                available,
            });
        }
    }
    tx.commit()?;

    tracing::info!(
        order_id = %order.id,
        user_id = %order.user_id,
        items = order.items.len(),
        total = order.total_amount,
        "order created"
    );
    Ok(order)
}

/// Cancels and returns every line's quantity to stock.
pub fn cancel_order(conn: &mut Connection, actor: &Identity, id: &str) -> Result<Order, AppError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let order = load(&tx, id)?;
    actor.require_owner_or_admin(&order.user_id)?;

    order
        .status
        .check_transition(OrderStatus::Cancelled)
        .map_err(|msg| AppError::InvalidState(msg.to_string()))?;

    for item in &order.items {
        if !queries::restore_stock(&tx, &item.product_id, item.quantity)? {
            tracing::warn!(order_id = %id, product_id = %item.product_id, "product gone, stock not restored");
        }
    }
    queries::update_order_status(&tx, id, OrderStatus::Cancelled)?;
    let order = load(&tx, id)?;
    tx.commit()?;

    tracing::info!(order_id = %id, "order cancelled, stock restored");
    Ok(order)
}

pub fn set_order_status(
    conn: &mut Connection,
    actor: &Identity,
    id: &str,
    status: &str,
) -> Result<Order, AppError> {
    actor.require_admin()?;
    let next = OrderStatus::parse(status).ok_or_else(|| {
        AppError::invalid(
            "status must be one of: pending, confirmed, in_transit, delivered, cancelled",
        )
    })?;

    if next == OrderStatus::Cancelled {
        return cancel_order(conn, actor, id);
    }

    let order = load(conn, id)?;
    order
        .status
        .check_transition(next)
        .map_err(|msg| AppError::InvalidState(msg.to_string()))?;
    queries::update_order_status(conn, id, next)?;

    tracing::info!(order_id = %id, from = order.status.as_str(), to = next.as_str(), "order status changed");
    load(conn, id)
}

pub fn set_payment_status(
    conn: &Connection,
    actor: &Identity,
    id: &str,
    payment_status: &str,
) -> Result<Order, AppError> {
    actor.require_admin()?;
    let next = PaymentStatus::parse(payment_status)
        .ok_or_else(|| AppError::invalid("paymentStatus must be one of: unpaid, paid, refunded"))?;

    if !queries::update_payment_status(conn, id, next)? {
        return Err(AppError::NotFound(format!("order {id}")));
    }
    tracing::info!(order_id = %id, payment_status = next.as_str(), "payment status changed");
    load(conn, id)
}

pub fn get_order(conn: &Connection, actor: &Identity, id: &str) -> Result<Order, AppError> {
    let order = load(conn, id)?;
    actor.require_owner_or_admin(&order.user_id)?;
    Ok(order)
}

pub fn list_orders(conn: &Connection, actor: &Identity) -> Result<Vec<Order>, AppError> {
    let user_filter = (!actor.is_admin()).then_some(actor.id.as_str());
    Ok(queries::list_orders(conn, user_filter)?)
}
