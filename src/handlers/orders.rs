use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::auth::Identity;
use crate::errors::AppError;
use crate::handlers::reply;
use crate::services::ordering::{self, NewOrder};
use crate::state::AppState;

// POST /api/orders
pub async fn create_order(
    State(state): State<Arc<AppState>>,
    actor: Identity,
    Json(body): Json<NewOrder>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let order = {
        let mut db = state.db()?;
        ordering::create_order(&mut db, &actor, body)?
    };
    Ok((StatusCode::CREATED, reply("order placed", order)))
}

// GET /api/orders
pub async fn list_orders(
    State(state): State<Arc<AppState>>,
    actor: Identity,
) -> Result<Json<serde_json::Value>, AppError> {
    let orders = {
        let db = state.db()?;
        ordering::list_orders(&db, &actor)?
    };
    Ok(reply("orders", orders))
}

// GET /api/orders/:id
pub async fn get_order(
    State(state): State<Arc<AppState>>,
    actor: Identity,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let order = {
        let db = state.db()?;
        ordering::get_order(&db, &actor, &id)?
    };
    Ok(reply("order", order))
}

// POST /api/orders/:id/cancel
pub async fn cancel_order(
    State(state): State<Arc<AppState>>,
    actor: Identity,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let order = {
        let mut db = state.db()?;
        ordering::cancel_order(&mut db, &actor, &id)?
    };
    Ok(reply("order cancelled", order))
}

// PUT /api/orders/:id/status
#[derive(Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

pub async fn set_status(
    State(state): State<Arc<AppState>>,
    actor: Identity,
    Path(id): Path<String>,
    Json(body): Json<StatusRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let order = {
        let mut db = state.db()?;
        ordering::set_order_status(&mut db, &actor, &id, &body.status)?
    };
    Ok(reply("order status updated", order))
}

// PUT /api/orders/:id/payment
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub payment_status: String,
}

pub async fn set_payment(
    State(state): State<Arc<AppState>>,
    actor: Identity,
    Path(id): Path<String>,
    Json(body): Json<PaymentRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let order = {
        let db = state.db()?;
        ordering::set_payment_status(&db, &actor, &id, &body.payment_status)?
    };
    Ok(reply("payment status updated", order))
}
