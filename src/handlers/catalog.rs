use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::auth::Identity;
use crate::errors::AppError;
use crate::handlers::reply;
use crate::services::catalog::{
    self, NewProduct, NewReview, NewService, ProductChanges, ServiceChanges,
};
use crate::state::AppState;

// POST /api/products
pub async fn create_product(
    State(state): State<Arc<AppState>>,
    actor: Identity,
    Json(body): Json<NewProduct>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let product = {
        let db = state.db()?;
        catalog::create_product(&db, &actor, body)?
    };
    Ok((StatusCode::CREATED, reply("product created", product)))
}

// GET /api/products
#[derive(Deserialize)]
pub struct ProductsQuery {
    pub category: Option<String>,
}

pub async fn list_products(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ProductsQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let products = {
        let db = state.db()?;
        catalog::list_products(&db, query.category.as_deref())?
    };
    Ok(reply("products", products))
}

// GET /api/products/:id
pub async fn get_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let product = {
        let db = state.db()?;
        catalog::get_product(&db, &id)?
    };
    Ok(reply("product", product))
}

// PATCH /api/products/:id
pub async fn update_product(
    State(state): State<Arc<AppState>>,
    actor: Identity,
    Path(id): Path<String>,
    Json(body): Json<ProductChanges>,
) -> Result<Json<serde_json::Value>, AppError> {
    let product = {
        let db = state.db()?;
        catalog::update_product(&db, &actor, &id, body)?
    };
    Ok(reply("product updated", product))
}

// DELETE /api/products/:id
pub async fn delete_product(
    State(state): State<Arc<AppState>>,
    actor: Identity,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    {
        let db = state.db()?;
        catalog::delete_product(&db, &actor, &id)?;
    }
    Ok(reply("product deleted", serde_json::json!({ "id": id })))
}

// POST /api/products/:id/reviews
pub async fn add_review(
    State(state): State<Arc<AppState>>,
    actor: Identity,
    Path(id): Path<String>,
    Json(body): Json<NewReview>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let review = {
        let db = state.db()?;
        catalog::add_review(&db, &actor, &id, body)?
    };
    Ok((StatusCode::CREATED, reply("review added", review)))
}

// GET /api/products/:id/reviews
pub async fn list_reviews(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let reviews = {
        let db = state.db()?;
        catalog::list_reviews(&db, &id)?
    };
    Ok(reply("reviews", reviews))
}

// POST /api/services
pub async fn create_service(
    State(state): State<Arc<AppState>>,
    actor: Identity,
    Json(body): Json<NewService>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let service = {
        let db = state.db()?;
        catalog::create_service(&db, &actor, body)?
    };
    Ok((StatusCode::CREATED, reply("service created", service)))
}

// GET /api/services
pub async fn list_services(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, AppError> {
    let services = {
        let db = state.db()?;
        catalog::list_services(&db)?
    };
    Ok(reply("services", services))
}

// GET /api/services/:id
pub async fn get_service(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let service = {
        let db = state.db()?;
        catalog::get_service(&db, &id)?
    };
    Ok(reply("service", service))
}

// PATCH /api/services/:id
pub async fn update_service(
    State(state): State<Arc<AppState>>,
    actor: Identity,
    Path(id): Path<String>,
    Json(body): Json<ServiceChanges>,
) -> Result<Json<serde_json::Value>, AppError> {
    let service = {
        let db = state.db()?;
        catalog::update_service(&db, &actor, &id, body)?
    };
    Ok(reply("service updated", service))
}

// DELETE /api/services/:id
pub async fn delete_service(
    State(state): State<Arc<AppState>>,
    actor: Identity,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    {
        let db = state.db()?;
        catalog::delete_service(&db, &actor, &id)?;
    }
    Ok(reply("service deleted", serde_json::json!({ "id": id })))
}
