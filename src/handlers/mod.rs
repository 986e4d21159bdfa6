pub mod accounts;
pub mod availability;
pub mod bookings;
pub mod catalog;
pub mod health;
pub mod orders;

use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Success envelope shared by every endpoint.
pub fn reply<T: Serialize>(message: &str, data: T) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "ok": true,
        "message": message,
        "data": data,
    }))
}

/// Salon-local calendar date used for past-date checks.
pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/users", post(accounts::register))
        .route("/api/users/me", get(accounts::me))
        .route(
            "/api/addresses",
            post(accounts::add_address).get(accounts::list_addresses),
        )
        .route(
            "/api/products",
            post(catalog::create_product).get(catalog::list_products),
        )
        .route(
            "/api/products/:id",
            get(catalog::get_product)
                .patch(catalog::update_product)
                .delete(catalog::delete_product),
        )
        .route(
            "/api/products/:id/reviews",
            post(catalog::add_review).get(catalog::list_reviews),
        )
        .route(
            "/api/services",
            post(catalog::create_service).get(catalog::list_services),
        )
        .route(
            "/api/services/:id",
            get(catalog::get_service)
                .patch(catalog::update_service)
                .delete(catalog::delete_service),
        )
        .route("/api/availability", get(availability::list))
        .route("/api/availability/full-day", post(availability::mark_full_day))
        .route("/api/availability/slot", post(availability::mark_slot))
        .route("/api/availability/available", post(availability::mark_available))
        .route("/api/availability/:date", get(availability::get_day))
        .route(
            "/api/bookings",
            post(bookings::create_booking).get(bookings::list_bookings),
        )
        .route(
            "/api/bookings/:id",
            get(bookings::get_booking)
                .patch(bookings::update_booking)
                .delete(bookings::delete_booking),
        )
        .route("/api/bookings/:id/cancel", post(bookings::cancel_booking))
        .route("/api/bookings/:id/status", put(bookings::set_status))
        .route(
            "/api/orders",
            post(orders::create_order).get(orders::list_orders),
        )
        .route("/api/orders/:id", get(orders::get_order))
        .route("/api/orders/:id/cancel", post(orders::cancel_order))
        .route("/api/orders/:id/status", put(orders::set_status))
        .route("/api/orders/:id/payment", put(orders::set_payment))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
