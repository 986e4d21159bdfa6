use chrono::Utc;
use rusqlite::Connection;
use serde::Deserialize;

use crate::auth::Identity;
use crate::db::{self, queries};
use crate::errors::AppError;
use crate::models::validate::FieldErrors;
use crate::models::{Product, Review, Service};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub stock: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub image: Option<String>,
    pub category: Option<String>,
    pub stock: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewService {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    pub duration: String,
    #[serde(default)]
    pub image: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub duration: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewReview {
    pub rating: i64,
    #[serde(default)]
    pub comment: String,
}

fn check_product(errors: &mut FieldErrors, product: &Product) {
    errors.non_empty("name", &product.name);
    errors.check(product.price > 0.0, "price must be greater than zero");
    errors.check(product.stock >= 0, "stock cannot be negative");
}

fn check_service(errors: &mut FieldErrors, service: &Service) {
    errors.non_empty("name", &service.name);
    errors.non_empty("duration", &service.duration);
    errors.check(service.price > 0.0, "price must be greater than zero");
}

fn duplicate_name(err: anyhow::Error, name: &str) -> AppError {
    if db::is_constraint_violation(&err) {
        AppError::Conflict(format!("a product named {name:?} already exists"))
    } else {
        AppError::Internal(err)
    }
}

// ── Products ──

pub fn create_product(
    conn: &Connection,
    actor: &Identity,
    req: NewProduct,
) -> Result<Product, AppError> {
    actor.require_admin()?;
    let product = Product {
        id: uuid::Uuid::new_v4().to_string(),
        name: req.name.trim().to_string(),
        description: req.description,
        price: req.price,
        image: req.image,
        category: req.category,
        stock: req.stock,
    };

    let mut errors = FieldErrors::new();
    check_product(&mut errors, &product);
    errors.finish()?;

    queries::insert_product(conn, &product).map_err(|e| duplicate_name(e, &product.name))?;
    tracing::info!(product_id = %product.id, name = %product.name, "product created");
    Ok(product)
}

pub fn get_product(conn: &Connection, id: &str) -> Result<Product, AppError> {
    queries::get_product(conn, id)?.ok_or_else(|| AppError::NotFound(format!("product {id}")))
}

pub fn list_products(conn: &Connection, category: Option<&str>) -> Result<Vec<Product>, AppError> {
    Ok(queries::list_products(conn, category)?)
}

pub fn update_product(
    conn: &Connection,
    actor: &Identity,
    id: &str,
    changes: ProductChanges,
) -> Result<Product, AppError> {
    actor.require_admin()?;
    let mut product = get_product(conn, id)?;

    if let Some(name) = changes.name {
        product.name = name.trim().to_string();
    }
    if let Some(description) = changes.description {
        product.description = description;
    }
    if let Some(price) = changes.price {
        product.price = price;
    }
    if let Some(image) = changes.image {
        product.image = image;
    }
    if let Some(category) = changes.category {
        product.category = category;
    }
    if let Some(stock) = changes.stock {
        product.stock = stock;
    }

    let mut errors = FieldErrors::new();
    check_product(&mut errors, &product);
    errors.finish()?;

    queries::update_product(conn, &product).map_err(|e| duplicate_name(e, &product.name))?;
    Ok(product)
}

/// Refuses while any pending, confirmed or in-transit order holds the product.
pub fn delete_product(conn: &Connection, actor: &Identity, id: &str) -> Result<(), AppError> {
    actor.require_admin()?;
    let active = queries::count_active_orders_for_product(conn, id)?;
    if active > 0 {
        return Err(AppError::Conflict(format!(
            "product is referenced by {active} active order(s)"
        )));
    }
    if !queries::delete_product(conn, id)? {
        return Err(AppError::NotFound(format!("product {id}")));
    }
    tracing::info!(product_id = %id, "product deleted");
    Ok(())
}

// ── Services ──

pub fn create_service(
    conn: &Connection,
    actor: &Identity,
    req: NewService,
) -> Result<Service, AppError> {
    actor.require_admin()?;
    let service = Service {
        id: uuid::Uuid::new_v4().to_string(),
        name: req.name.trim().to_string(),
        description: req.description,
        price: req.price,
        duration: req.duration,
        image: req.image,
    };

    let mut errors = FieldErrors::new();
    check_service(&mut errors, &service);
    errors.finish()?;

    queries::insert_service(conn, &service)?;
    tracing::info!(service_id = %service.id, name = %service.name, "service created");
    Ok(service)
}

pub fn get_service(conn: &Connection, id: &str) -> Result<Service, AppError> {
    queries::get_service(conn, id)?.ok_or_else(|| AppError::NotFound(format!("service {id}")))
}

pub fn list_services(conn: &Connection) -> Result<Vec<Service>, AppError> {
    Ok(queries::list_services(conn)?)
}

/// Existing bookings keep the name, price and duration they were made with.
pub fn update_service(
    conn: &Connection,
    actor: &Identity,
    id: &str,
    changes: ServiceChanges,
) -> Result<Service, AppError> {
    actor.require_admin()?;
    let mut service = get_service(conn, id)?;

    if let Some(name) = changes.name {
        service.name = name.trim().to_string();
    }
    if let Some(description) = changes.description {
        service.description = description;
    }
    if let Some(price) = changes.price {
        service.price = price;
    }
    if let Some(duration) = changes.duration {
        service.duration = duration;
    }
    if let Some(image) = changes.image {
        service.image = image;
    }

    let mut errors = FieldErrors::new();
    check_service(&mut errors, &service);
    errors.finish()?;

    queries::update_service(conn, &service)?;
    tracing::info!(service_id = %service.id, "service updated");
    Ok(service)
}

pub fn delete_service(conn: &Connection, actor: &Identity, id: &str) -> Result<(), AppError> {
    actor.require_admin()?;
    if !queries::delete_service(conn, id)? {
        return Err(AppError::NotFound(format!("service {id}")));
    }
    tracing::info!(service_id = %id, "service deleted");
    Ok(())
}

// ── Reviews ──

pub fn add_review(
    conn: &Connection,
    actor: &Identity,
    product_id: &str,
    req: NewReview,
) -> Result<Review, AppError> {
    let rating = u8::try_from(req.rating)
        .ok()
        .filter(|r| (1..=5).contains(r))
        .ok_or_else(|| AppError::invalid("rating must be between 1 and 5"))?;
    get_product(conn, product_id)?;
    if queries::get_user(conn, &actor.id)?.is_none() {
        return Err(AppError::NotFound(format!("user {}", actor.id)));
    }

    let review = Review {
        id: uuid::Uuid::new_v4().to_string(),
        product_id: product_id.to_string(),
        user_id: actor.id.clone(),
        rating,
        comment: req.comment,
        created_at: Utc::now().naive_utc(),
    };
    queries::insert_review(conn, &review).map_err(|e| {
        if db::is_constraint_violation(&e) {
            AppError::Conflict("you have already reviewed this product".to_string())
        } else {
            AppError::Internal(e)
        }
    })?;
    Ok(review)
}

pub fn list_reviews(conn: &Connection, product_id: &str) -> Result<Vec<Review>, AppError> {
    get_product(conn, product_id)?;
    Ok(queries::list_reviews(conn, product_id)?)
}
