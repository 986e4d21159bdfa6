use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::auth::Identity;
use crate::errors::AppError;
use crate::handlers::reply;
use crate::services::accounts::{self, NewAddress, NewUser};
use crate::state::AppState;

// POST /api/users
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NewUser>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let user = {
        let db = state.db()?;
        accounts::register_user(&db, body)?
    };
    Ok((StatusCode::CREATED, reply("user registered", user)))
}

// GET /api/users/me
pub async fn me(
    State(state): State<Arc<AppState>>,
    actor: Identity,
) -> Result<Json<serde_json::Value>, AppError> {
    let user = {
        let db = state.db()?;
        accounts::get_user(&db, &actor.id)?
    };
    Ok(reply("user", user))
}

// POST /api/addresses
pub async fn add_address(
    State(state): State<Arc<AppState>>,
    actor: Identity,
    Json(body): Json<NewAddress>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let address = {
        let mut db = state.db()?;
        accounts::add_address(&mut db, &actor, body)?
    };
    Ok((StatusCode::CREATED, reply("address added", address)))
}

// GET /api/addresses
pub async fn list_addresses(
    State(state): State<Arc<AppState>>,
    actor: Identity,
) -> Result<Json<serde_json::Value>, AppError> {
    let addresses = {
        let db = state.db()?;
        accounts::list_addresses(&db, &actor)?
    };
    Ok(reply("addresses", addresses))
}
