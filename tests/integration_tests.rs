use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use salon::auth::{issue_token, Identity};
use salon::config::AppConfig;
use salon::db;
use salon::handlers;
use salon::state::AppState;

const ADMIN: &str = "test-token";
const SECRET: &str = "test-secret";
const DAY: &str = "2099-06-01";
const NEXT_DAY: &str = "2099-06-02";

// ── Helpers ──

fn test_config() -> AppConfig {
    AppConfig {
        port: 3000,
        database_url: ":memory:".to_string(),
        admin_token: ADMIN.to_string(),
        auth_secret: SECRET.to_string(),
    }
}

fn test_state() -> Arc<AppState> {
    let conn = db::init_db(":memory:").unwrap();
    Arc::new(AppState::new(conn, test_config()))
}

fn test_app(state: Arc<AppState>) -> Router {
    handlers::router(state)
}

fn user_token(id: &str) -> String {
    issue_token(SECRET, &Identity::user(id)).unwrap()
}

async fn call(
    state: &Arc<AppState>,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let res = test_app(state.clone()).oneshot(request).await.unwrap();
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn register(state: &Arc<AppState>, phone: &str, name: &str) -> String {
    let (status, json) = call(
        state,
        "POST",
        "/api/users",
        None,
        Some(json!({"phone": phone, "name": name})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    json["data"]["id"].as_str().unwrap().to_string()
}

async fn create_service(state: &Arc<AppState>) -> String {
    let (status, json) = call(
        state,
        "POST",
        "/api/services",
        Some(ADMIN),
        Some(json!({"name": "Haircut", "price": 300.0, "duration": "30 min"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    json["data"]["id"].as_str().unwrap().to_string()
}

fn booking_body(service_id: &str, date: &str, time: &str) -> Value {
    json!({
        "serviceId": service_id,
        "date": date,
        "time": time,
        "name": "Asha",
        "phone": "9876543210",
    })
}

async fn create_product(state: &Arc<AppState>, name: &str, stock: i64) -> String {
    let (status, json) = call(
        state,
        "POST",
        "/api/products",
        Some(ADMIN),
        Some(json!({"name": name, "price": 250.0, "category": "care", "stock": stock})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    json["data"]["id"].as_str().unwrap().to_string()
}

async fn add_address(state: &Arc<AppState>, token: &str) -> String {
    let (status, json) = call(
        state,
        "POST",
        "/api/addresses",
        Some(token),
        Some(json!({
            "label": "Home",
            "recipientName": "Asha",
            "phone": "9876543210",
            "addressLine": "12 MG Road",
            "pincode": "560001",
            "city": "Bengaluru",
            "state": "KA",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    json["data"]["id"].as_str().unwrap().to_string()
}

async fn product_stock(state: &Arc<AppState>, id: &str) -> i64 {
    let (status, json) = call(state, "GET", &format!("/api/products/{id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    json["data"]["stock"].as_i64().unwrap()
}

// ── Health and auth ──

#[tokio::test]
async fn test_health() {
    let state = test_state();
    let (status, _) = call(&state, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_booking_requires_auth() {
    let state = test_state();
    let (status, json) = call(&state, "GET", "/api/bookings", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["kind"], "unauthorized");

    let (status, _) = call(&state, "GET", "/api/bookings", Some("forged.token"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_me_returns_profile() {
    let state = test_state();
    let id = register(&state, "9000000001", "Asha").await;
    let (status, json) = call(&state, "GET", "/api/users/me", Some(&user_token(&id)), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["name"], "Asha");
    assert_eq!(json["data"]["role"], "user");
}

// ── Availability ──

#[tokio::test]
async fn test_availability_requires_admin() {
    let state = test_state();
    let id = register(&state, "9000000001", "Asha").await;
    let (status, json) = call(
        &state,
        "POST",
        "/api/availability/full-day",
        Some(&user_token(&id)),
        Some(json!({"date": DAY})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["kind"], "forbidden");
}

#[tokio::test]
async fn test_availability_past_date_rejected() {
    let state = test_state();
    let (status, json) = call(
        &state,
        "POST",
        "/api/availability/slot",
        Some(ADMIN),
        Some(json!({"date": "2000-01-01", "time": "10:00"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "validation_failed");
}

#[tokio::test]
async fn test_slot_block_and_release_round_trip() {
    let state = test_state();
    for _ in 0..2 {
        let (status, _) = call(
            &state,
            "POST",
            "/api/availability/slot",
            Some(ADMIN),
            Some(json!({"date": DAY, "time": "14:00"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, json) = call(&state, "GET", &format!("/api/availability/{DAY}"), None, None).await;
    assert_eq!(json["data"]["unavailableSlots"], json!(["14:00"]));
    let slots = json["data"]["slots"].as_array().unwrap();
    assert_eq!(slots.len(), 24);
    let blocked: Vec<_> = slots
        .iter()
        .filter(|s| s["isBookable"] == false)
        .collect();
    assert_eq!(blocked.len(), 1);
    assert_eq!(blocked[0]["time"], "14:00");

    let (status, json) = call(
        &state,
        "POST",
        "/api/availability/available",
        Some(ADMIN),
        Some(json!({"date": DAY, "time": "14:00"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["data"].is_null());

    let (_, json) = call(&state, "GET", "/api/availability?from=2099-01-01", None, None).await;
    assert_eq!(json["data"], json!([]));
}

#[tokio::test]
async fn test_full_day_blocks_every_user() {
    let state = test_state();
    let service_id = create_service(&state).await;
    let u1 = register(&state, "9000000001", "Asha").await;
    let u2 = register(&state, "9000000002", "Ravi").await;

    let (status, json) = call(
        &state,
        "POST",
        "/api/availability/full-day",
        Some(ADMIN),
        Some(json!({"date": DAY})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["isFullDayUnavailable"], true);
    assert_eq!(json["data"]["unavailableSlots"], json!([]));

    for user in [&u1, &u2] {
        let (status, json) = call(
            &state,
            "POST",
            "/api/bookings",
            Some(&user_token(user)),
            Some(booking_body(&service_id, DAY, "10:00")),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["kind"], "conflict");
    }
}

// ── Bookings ──

#[tokio::test]
async fn test_double_booking_is_per_user() {
    let state = test_state();
    let service_id = create_service(&state).await;
    let u1 = user_token(&register(&state, "9000000001", "Asha").await);
    let u2 = user_token(&register(&state, "9000000002", "Ravi").await);

    let (status, json) = call(
        &state,
        "POST",
        "/api/bookings",
        Some(&u1),
        Some(booking_body(&service_id, NEXT_DAY, "10:00")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["data"]["status"], "pending");
    assert_eq!(json["data"]["serviceName"], "Haircut");

    let (status, _) = call(
        &state,
        "POST",
        "/api/bookings",
        Some(&u1),
        Some(booking_body(&service_id, NEXT_DAY, "10:00")),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = call(
        &state,
        "POST",
        "/api/bookings",
        Some(&u2),
        Some(booking_body(&service_id, NEXT_DAY, "10:00")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, json) = call(&state, "GET", "/api/bookings", Some(&u1), None).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);
    let (_, json) = call(&state, "GET", "/api/bookings", Some(ADMIN), None).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_booking_validation_lists_every_field() {
    let state = test_state();
    let service_id = create_service(&state).await;
    let u1 = user_token(&register(&state, "9000000001", "Asha").await);

    let (status, json) = call(
        &state,
        "POST",
        "/api/bookings",
        Some(&u1),
        Some(booking_body(&service_id, "01/06/2099", "10am")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["errors"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_cancel_twice_then_delete() {
    let state = test_state();
    let service_id = create_service(&state).await;
    let u1 = user_token(&register(&state, "9000000001", "Asha").await);
    let u2 = user_token(&register(&state, "9000000002", "Ravi").await);

    let (_, json) = call(
        &state,
        "POST",
        "/api/bookings",
        Some(&u1),
        Some(booking_body(&service_id, NEXT_DAY, "11:00")),
    )
    .await;
    let id = json["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = call(&state, "DELETE", &format!("/api/bookings/{id}"), Some(&u1), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = call(
        &state,
        "POST",
        &format!("/api/bookings/{id}/cancel"),
        Some(&u2),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, json) = call(
        &state,
        "POST",
        &format!("/api/bookings/{id}/cancel"),
        Some(&u1),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "cancelled");

    let (status, json) = call(
        &state,
        "POST",
        &format!("/api/bookings/{id}/cancel"),
        Some(&u1),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["kind"], "invalid_state_transition");

    let (status, _) = call(&state, "DELETE", &format!("/api/bookings/{id}"), Some(&u1), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(&state, "GET", &format!("/api/bookings/{id}"), Some(&u1), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_completed_booking_cannot_be_cancelled() {
    let state = test_state();
    let service_id = create_service(&state).await;
    let u1 = user_token(&register(&state, "9000000001", "Asha").await);

    let (_, json) = call(
        &state,
        "POST",
        "/api/bookings",
        Some(&u1),
        Some(booking_body(&service_id, NEXT_DAY, "12:00")),
    )
    .await;
    let id = json["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = call(
        &state,
        "PUT",
        &format!("/api/bookings/{id}/status"),
        Some(&u1),
        Some(json!({"status": "completed"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, json) = call(
        &state,
        "PUT",
        &format!("/api/bookings/{id}/status"),
        Some(ADMIN),
        Some(json!({"status": "completed"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "completed");

    let (status, json) = call(
        &state,
        "POST",
        &format!("/api/bookings/{id}/cancel"),
        Some(&u1),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["kind"], "invalid_state_transition");
}

#[tokio::test]
async fn test_reschedule_booking() {
    let state = test_state();
    let service_id = create_service(&state).await;
    let u1 = user_token(&register(&state, "9000000001", "Asha").await);

    let (_, json) = call(
        &state,
        "POST",
        "/api/bookings",
        Some(&u1),
        Some(booking_body(&service_id, NEXT_DAY, "10:00")),
    )
    .await;
    let id = json["data"]["id"].as_str().unwrap().to_string();

    let (status, json) = call(
        &state,
        "PATCH",
        &format!("/api/bookings/{id}"),
        Some(&u1),
        Some(json!({"time": "15:30"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["time"], "15:30");
    assert_eq!(json["data"]["date"], NEXT_DAY);
}

#[tokio::test]
async fn test_admin_books_on_behalf() {
    let state = test_state();
    let service_id = create_service(&state).await;
    let u1 = register(&state, "9000000001", "Asha").await;

    let mut body = booking_body(&service_id, NEXT_DAY, "10:00");
    body["userId"] = json!(u1);
    let (status, json) = call(&state, "POST", "/api/bookings", Some(ADMIN), Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["data"]["userId"], u1.as_str());
}

// ── Orders ──

#[tokio::test]
async fn test_order_takes_and_returns_stock() {
    let state = test_state();
    let product = create_product(&state, "Shampoo", 5).await;
    let token = user_token(&register(&state, "9000000001", "Asha").await);
    let address = add_address(&state, &token).await;

    let (status, json) = call(
        &state,
        "POST",
        "/api/orders",
        Some(&token),
        Some(json!({
            "addressId": address,
            "items": [{"productId": product, "quantity": 3}],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["data"]["totalAmount"], 750.0);
    assert_eq!(json["data"]["items"][0]["subtotal"], 750.0);
    assert_eq!(json["data"]["paymentStatus"], "unpaid");
    assert_eq!(product_stock(&state, &product).await, 2);

    let order_id = json["data"]["id"].as_str().unwrap().to_string();
    let (status, json) = call(
        &state,
        "POST",
        &format!("/api/orders/{order_id}/cancel"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "cancelled");
    assert_eq!(product_stock(&state, &product).await, 5);
}

#[tokio::test]
async fn test_order_over_stock_rejected() {
    let state = test_state();
    let product = create_product(&state, "Shampoo", 5).await;
    let token = user_token(&register(&state, "9000000001", "Asha").await);
    let address = add_address(&state, &token).await;

    let (status, json) = call(
        &state,
        "POST",
        "/api/orders",
        Some(&token),
        Some(json!({
            "addressId": address,
            "items": [{"productId": product, "quantity": 6}],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["kind"], "insufficient_stock");
    assert_eq!(product_stock(&state, &product).await, 5);

    let (_, json) = call(&state, "GET", "/api/orders", Some(&token), None).await;
    assert_eq!(json["data"], json!([]));
}

#[tokio::test]
async fn test_product_delete_guard_and_delivered_order() {
    let state = test_state();
    let product = create_product(&state, "Shampoo", 5).await;
    let token = user_token(&register(&state, "9000000001", "Asha").await);
    let address = add_address(&state, &token).await;

    let (_, json) = call(
        &state,
        "POST",
        "/api/orders",
        Some(&token),
        Some(json!({
            "addressId": address,
            "items": [{"productId": product, "quantity": 1}],
        })),
    )
    .await;
    let order_id = json["data"]["id"].as_str().unwrap().to_string();

    let (status, json) = call(
        &state,
        "DELETE",
        &format!("/api/products/{product}"),
        Some(ADMIN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["kind"], "conflict");

    let (status, _) = call(
        &state,
        "PUT",
        &format!("/api/orders/{order_id}/status"),
        Some(ADMIN),
        Some(json!({"status": "delivered"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = call(
        &state,
        "POST",
        &format!("/api/orders/{order_id}/cancel"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["kind"], "invalid_state_transition");
    assert_eq!(product_stock(&state, &product).await, 4);

    let (status, json) = call(
        &state,
        "PUT",
        &format!("/api/orders/{order_id}/status"),
        Some(ADMIN),
        Some(json!({"status": "pending"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["kind"], "invalid_state_transition");
    assert_eq!(product_stock(&state, &product).await, 4);

    let (status, _) = call(
        &state,
        "DELETE",
        &format!("/api/products/{product}"),
        Some(ADMIN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // the order keeps its snapshot after the product is gone
    let (status, json) = call(
        &state,
        "GET",
        &format!("/api/orders/{order_id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["items"][0]["name"], "Shampoo");
}

// ── Catalog ──

#[tokio::test]
async fn test_duplicate_product_name_conflicts() {
    let state = test_state();
    create_product(&state, "Shampoo", 5).await;
    let (status, json) = call(
        &state,
        "POST",
        "/api/products",
        Some(ADMIN),
        Some(json!({"name": "Shampoo", "price": 99.0})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["kind"], "conflict");
}

#[tokio::test]
async fn test_one_review_per_user() {
    let state = test_state();
    let product = create_product(&state, "Shampoo", 5).await;
    let token = user_token(&register(&state, "9000000001", "Asha").await);
    let uri = format!("/api/products/{product}/reviews");

    let (status, _) = call(
        &state,
        "POST",
        &uri,
        Some(&token),
        Some(json!({"rating": 4, "comment": "nice"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = call(
        &state,
        "POST",
        &uri,
        Some(&token),
        Some(json!({"rating": 5})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, json) = call(&state, "GET", &uri, None, None).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_booking_outside_slot_schedule_rejected() {
    let state = test_state();
    let service_id = create_service(&state).await;
    let token = user_token(&register(&state, "9000000001", "Asha").await);

    for time in ["03:17", "20:59", "21:00"] {
        let (status, json) = call(
            &state,
            "POST",
            "/api/bookings",
            Some(&token),
            Some(booking_body(&service_id, NEXT_DAY, time)),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{time}");
        assert_eq!(json["kind"], "validation_failed");
    }

    let (status, _) = call(
        &state,
        "POST",
        "/api/availability/slot",
        Some(ADMIN),
        Some(json!({"date": DAY, "time": "03:17"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, json) = call(&state, "GET", "/api/availability?from=2099-01-01", None, None).await;
    assert_eq!(json["data"], json!([]));
}

#[tokio::test]
async fn test_service_changes_keep_booking_snapshot() {
    let state = test_state();
    let service_id = create_service(&state).await;
    let token = user_token(&register(&state, "9000000001", "Asha").await);

    let (_, json) = call(
        &state,
        "POST",
        "/api/bookings",
        Some(&token),
        Some(booking_body(&service_id, NEXT_DAY, "10:00")),
    )
    .await;
    let booking_id = json["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = call(
        &state,
        "PATCH",
        &format!("/api/services/{service_id}"),
        Some(&token),
        Some(json!({"price": 500.0})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, json) = call(
        &state,
        "PATCH",
        &format!("/api/services/{service_id}"),
        Some(ADMIN),
        Some(json!({"price": 500.0})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["price"], 500.0);

    let (status, _) = call(
        &state,
        "DELETE",
        &format!("/api/services/{service_id}"),
        Some(ADMIN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(&state, "GET", &format!("/api/services/{service_id}"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, json) = call(
        &state,
        "GET",
        &format!("/api/bookings/{booking_id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(json["data"]["servicePrice"], 300.0);
    assert_eq!(json["data"]["serviceName"], "Haircut");
}
