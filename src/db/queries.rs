use std::collections::BTreeSet;

use chrono::{NaiveDate, NaiveDateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::models::validate::DATE_FORMAT;
use crate::models::{
    Address, Availability, Booking, BookingStatus, Order, OrderItem, OrderStatus, PaymentMethod,
    PaymentStatus, Product, Review, Role, Service, User,
};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn timestamp(dt: &NaiveDateTime) -> String {
    dt.format(TIMESTAMP_FORMAT).to_string()
}

fn now() -> String {
    timestamp(&Utc::now().naive_utc())
}

fn date_str(date: &NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn conversion_error(idx: usize, msg: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, msg.into())
}

fn date_col(row: &Row, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    NaiveDate::parse_from_str(&raw, DATE_FORMAT)
        .map_err(|e| conversion_error(idx, format!("bad date {raw:?}: {e}")))
}

fn timestamp_col(row: &Row, idx: usize) -> rusqlite::Result<NaiveDateTime> {
    let raw: String = row.get(idx)?;
    NaiveDateTime::parse_from_str(&raw, TIMESTAMP_FORMAT)
        .map_err(|e| conversion_error(idx, format!("bad timestamp {raw:?}: {e}")))
}

fn enum_col<T>(row: &Row, idx: usize, parse: fn(&str) -> Option<T>) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    parse(&raw).ok_or_else(|| conversion_error(idx, format!("unknown value {raw:?}")))
}

// ── Users ──

pub fn insert_user(conn: &Connection, user: &User) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO users (id, phone, name, role, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            user.id,
            user.phone,
            user.name,
            user.role.as_str(),
            timestamp(&user.created_at),
        ],
    )?;
    Ok(())
}

fn parse_user_row(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        phone: row.get(1)?,
        name: row.get(2)?,
        role: Role::parse(&row.get::<_, String>(3)?),
        created_at: timestamp_col(row, 4)?,
    })
}

pub fn get_user(conn: &Connection, id: &str) -> anyhow::Result<Option<User>> {
    let user = conn
        .query_row(
            "SELECT id, phone, name, role, created_at FROM users WHERE id = ?1",
            params![id],
            parse_user_row,
        )
        .optional()?;
    Ok(user)
}

// ── Addresses ──

const ADDRESS_COLUMNS: &str = "id, user_id, label, recipient_name, phone, address_line, landmark, pincode, city, state, is_default";

fn parse_address_row(row: &Row) -> rusqlite::Result<Address> {
    Ok(Address {
        id: row.get(0)?,
        user_id: row.get(1)?,
        label: row.get(2)?,
        recipient_name: row.get(3)?,
        phone: row.get(4)?,
        address_line: row.get(5)?,
        landmark: row.get(6)?,
        pincode: row.get(7)?,
        city: row.get(8)?,
        state: row.get(9)?,
        is_default: row.get::<_, i32>(10)? != 0,
    })
}

pub fn insert_address(conn: &Connection, address: &Address) -> anyhow::Result<()> {
    conn.execute(
        &format!("INSERT INTO addresses ({ADDRESS_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"),
        params![
            address.id,
            address.user_id,
            address.label,
            address.recipient_name,
            address.phone,
            address.address_line,
            address.landmark,
            address.pincode,
            address.city,
            address.state,
            address.is_default as i32,
        ],
    )?;
    Ok(())
}

pub fn clear_default_address(conn: &Connection, user_id: &str) -> anyhow::Result<()> {
    conn.execute(
        "UPDATE addresses SET is_default = 0 WHERE user_id = ?1 AND is_default = 1",
        params![user_id],
    )?;
    Ok(())
}

pub fn get_address(conn: &Connection, id: &str) -> anyhow::Result<Option<Address>> {
    let address = conn
        .query_row(
            &format!("SELECT {ADDRESS_COLUMNS} FROM addresses WHERE id = ?1"),
            params![id],
            parse_address_row,
        )
        .optional()?;
    Ok(address)
}

pub fn list_addresses(conn: &Connection, user_id: &str) -> anyhow::Result<Vec<Address>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ADDRESS_COLUMNS} FROM addresses WHERE user_id = ?1 ORDER BY is_default DESC, label ASC"
    ))?;
    let rows = stmt.query_map(params![user_id], parse_address_row)?;

    let mut addresses = vec![];
    for row in rows {
        addresses.push(row?);
    }
    Ok(addresses)
}

// ── Products ──

const PRODUCT_COLUMNS: &str = "id, name, description, price, image, category, stock";

fn parse_product_row(row: &Row) -> rusqlite::Result<Product> {
    Ok(Product {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        price: row.get(3)?,
        image: row.get(4)?,
        category: row.get(5)?,
        stock: row.get(6)?,
    })
}

pub fn insert_product(conn: &Connection, product: &Product) -> anyhow::Result<()> {
    conn.execute(
        &format!("INSERT INTO products ({PRODUCT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
        params![
            product.id,
            product.name,
            product.description,
            product.price,
            product.image,
            product.category,
            product.stock,
        ],
    )?;
    Ok(())
}

pub fn get_product(conn: &Connection, id: &str) -> anyhow::Result<Option<Product>> {
    let product = conn
        .query_row(
            &format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"),
            params![id],
            parse_product_row,
        )
        .optional()?;
    Ok(product)
}

pub fn list_products(conn: &Connection, category: Option<&str>) -> anyhow::Result<Vec<Product>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE ?1 IS NULL OR category = ?1 ORDER BY name ASC"
    ))?;
    let rows = stmt.query_map(params![category], parse_product_row)?;

    let mut products = vec![];
    for row in rows {
        products.push(row?);
    }
    Ok(products)
}

pub fn update_product(conn: &Connection, product: &Product) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE products SET name = ?1, description = ?2, price = ?3, image = ?4, category = ?5, stock = ?6
         WHERE id = ?7",
        params![
            product.name,
            product.description,
            product.price,
            product.image,
            product.category,
            product.stock,
            product.id,
        ],
    )?;
    Ok(count > 0)
}

pub fn delete_product(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM products WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

pub fn count_active_orders_for_product(conn: &Connection, product_id: &str) -> anyhow::Result<i64> {
    let count = conn.query_row(
        "SELECT COUNT(DISTINCT o.id) FROM order_items oi
         JOIN orders o ON o.id = oi.order_id
         WHERE oi.product_id = ?1 AND o.status NOT IN ('cancelled', 'delivered')",
        params![product_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Conditional decrement. Returns false, leaving stock untouched, when the
/// product has fewer than `quantity` units.
pub fn take_stock(conn: &Connection, product_id: &str, quantity: u32) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE products SET stock = stock - ?1 WHERE id = ?2 AND stock >= ?1",
        params![quantity, product_id],
    )?;
    Ok(count > 0)
}

pub fn restore_stock(conn: &Connection, product_id: &str, quantity: u32) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE products SET stock = stock + ?1 WHERE id = ?2",
        params![quantity, product_id],
    )?;
    Ok(count > 0)
}

// ── Services ──

fn parse_service_row(row: &Row) -> rusqlite::Result<Service> {
    Ok(Service {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        price: row.get(3)?,
        duration: row.get(4)?,
        image: row.get(5)?,
    })
}

pub fn insert_service(conn: &Connection, service: &Service) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO services (id, name, description, price, duration, image)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            service.id,
            service.name,
            service.description,
            service.price,
            service.duration,
            service.image,
        ],
    )?;
    Ok(())
}

pub fn get_service(conn: &Connection, id: &str) -> anyhow::Result<Option<Service>> {
    let service = conn
        .query_row(
            "SELECT id, name, description, price, duration, image FROM services WHERE id = ?1",
            params![id],
            parse_service_row,
        )
        .optional()?;
    Ok(service)
}

pub fn list_services(conn: &Connection) -> anyhow::Result<Vec<Service>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, description, price, duration, image FROM services ORDER BY name ASC",
    )?;
    let rows = stmt.query_map([], parse_service_row)?;

    let mut services = vec![];
    for row in rows {
        services.push(row?);
    }
    Ok(services)
}

pub fn update_service(conn: &Connection, service: &Service) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE services SET name = ?1, description = ?2, price = ?3, duration = ?4, image = ?5
         WHERE id = ?6",
        params![
            service.name,
            service.description,
            service.price,
            service.duration,
            service.image,
            service.id,
        ],
    )?;
    Ok(count > 0)
}

/// Bookings keep their snapshot of the service, so nothing references it.
pub fn delete_service(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM services WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

// ── Reviews ──

pub fn insert_review(conn: &Connection, review: &Review) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO reviews (id, product_id, user_id, rating, comment, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            review.id,
            review.product_id,
            review.user_id,
            review.rating,
            review.comment,
            timestamp(&review.created_at),
        ],
    )?;
    Ok(())
}

pub fn list_reviews(conn: &Connection, product_id: &str) -> anyhow::Result<Vec<Review>> {
    let mut stmt = conn.prepare(
        "SELECT id, product_id, user_id, rating, comment, created_at
         FROM reviews WHERE product_id = ?1 ORDER BY created_at DESC",
    )?;
    let rows = stmt.query_map(params![product_id], |row| {
        Ok(Review {
            id: row.get(0)?,
            product_id: row.get(1)?,
            user_id: row.get(2)?,
            rating: row.get(3)?,
            comment: row.get(4)?,
            created_at: timestamp_col(row, 5)?,
        })
    })?;

    let mut reviews = vec![];
    for row in rows {
        reviews.push(row?);
    }
    Ok(reviews)
}

// ── Bookings ──

const BOOKING_COLUMNS: &str = "id, user_id, service_id, service_name, service_price, service_duration, date, time, name, phone, status, created_at, updated_at";

fn parse_booking_row(row: &Row) -> rusqlite::Result<Booking> {
    Ok(Booking {
        id: row.get(0)?,
        user_id: row.get(1)?,
        service_id: row.get(2)?,
        service_name: row.get(3)?,
        service_price: row.get(4)?,
        service_duration: row.get(5)?,
        date: date_col(row, 6)?,
        time: row.get(7)?,
        name: row.get(8)?,
        phone: row.get(9)?,
        status: enum_col(row, 10, BookingStatus::parse)?,
        created_at: timestamp_col(row, 11)?,
        updated_at: timestamp_col(row, 12)?,
    })
}

pub fn insert_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO bookings ({BOOKING_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"
        ),
        params![
            booking.id,
            booking.user_id,
            booking.service_id,
            booking.service_name,
            booking.service_price,
            booking.service_duration,
            date_str(&booking.date),
            booking.time,
            booking.name,
            booking.phone,
            booking.status.as_str(),
            timestamp(&booking.created_at),
            timestamp(&booking.updated_at),
        ],
    )?;
    Ok(())
}

pub fn get_booking_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<Booking>> {
    let booking = conn
        .query_row(
            &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1"),
            params![id],
            parse_booking_row,
        )
        .optional()?;
    Ok(booking)
}

pub fn list_bookings(
    conn: &Connection,
    user_id: Option<&str>,
    status: Option<BookingStatus>,
) -> anyhow::Result<Vec<Booking>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings
         WHERE (?1 IS NULL OR user_id = ?1) AND (?2 IS NULL OR status = ?2)
         ORDER BY date ASC, time ASC"
    ))?;
    let rows = stmt.query_map(
        params![user_id, status.map(|s| s.as_str())],
        parse_booking_row,
    )?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row?);
    }
    Ok(bookings)
}

/// The user's non-cancelled booking at `date`/`time`, other than `exclude_id`.
pub fn find_active_booking(
    conn: &Connection,
    user_id: &str,
    date: &NaiveDate,
    time: &str,
    exclude_id: Option<&str>,
) -> anyhow::Result<Option<Booking>> {
    let booking = conn
        .query_row(
            &format!(
                "SELECT {BOOKING_COLUMNS} FROM bookings
                 WHERE user_id = ?1 AND date = ?2 AND time = ?3 AND status <> 'cancelled'
                   AND (?4 IS NULL OR id <> ?4)
                 LIMIT 1"
            ),
            params![user_id, date_str(date), time, exclude_id],
            parse_booking_row,
        )
        .optional()?;
    Ok(booking)
}

pub fn update_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET date = ?1, time = ?2, name = ?3, phone = ?4, status = ?5, updated_at = ?6
         WHERE id = ?7",
        params![
            date_str(&booking.date),
            booking.time,
            booking.name,
            booking.phone,
            booking.status.as_str(),
            now(),
            booking.id,
        ],
    )?;
    Ok(count > 0)
}

pub fn update_booking_status(
    conn: &Connection,
    id: &str,
    status: BookingStatus,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status.as_str(), now(), id],
    )?;
    Ok(count > 0)
}

pub fn delete_booking(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM bookings WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

// ── Availability ──

fn parse_availability_row(row: &Row) -> rusqlite::Result<Availability> {
    let slots_json: String = row.get(2)?;
    let unavailable_slots: BTreeSet<String> = serde_json::from_str(&slots_json)
        .map_err(|e| conversion_error(2, format!("bad slot list: {e}")))?;
    Ok(Availability {
        date: date_col(row, 0)?,
        is_full_day_unavailable: row.get::<_, i32>(1)? != 0,
        unavailable_slots,
    })
}

pub fn get_availability(conn: &Connection, date: &NaiveDate) -> anyhow::Result<Option<Availability>> {
    let record = conn
        .query_row(
            "SELECT date, is_full_day_unavailable, unavailable_slots FROM availability WHERE date = ?1",
            params![date_str(date)],
            parse_availability_row,
        )
        .optional()?;
    Ok(record)
}

pub fn save_availability(conn: &Connection, record: &Availability) -> anyhow::Result<()> {
    let slots_json = serde_json::to_string(&record.unavailable_slots)?;
    conn.execute(
        "INSERT INTO availability (date, is_full_day_unavailable, unavailable_slots)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(date) DO UPDATE SET
           is_full_day_unavailable = excluded.is_full_day_unavailable,
           unavailable_slots = excluded.unavailable_slots",
        params![
            date_str(&record.date),
            record.is_full_day_unavailable as i32,
            slots_json,
        ],
    )?;
    Ok(())
}

pub fn delete_availability(conn: &Connection, date: &NaiveDate) -> anyhow::Result<bool> {
    let count = conn.execute(
        "DELETE FROM availability WHERE date = ?1",
        params![date_str(date)],
    )?;
    Ok(count > 0)
}

pub fn list_availability(conn: &Connection, from: &NaiveDate) -> anyhow::Result<Vec<Availability>> {
    let mut stmt = conn.prepare(
        "SELECT date, is_full_day_unavailable, unavailable_slots FROM availability
         WHERE date >= ?1 ORDER BY date ASC",
    )?;
    let rows = stmt.query_map(params![date_str(from)], parse_availability_row)?;

    let mut records = vec![];
    for row in rows {
        records.push(row?);
    }
    Ok(records)
}

// ── Orders ──

const ORDER_COLUMNS: &str = "id, user_id, address_id, total_amount, status, payment_status, payment_method, created_at, updated_at";

pub fn insert_order(conn: &Connection, order: &Order) -> anyhow::Result<()> {
    conn.execute(
        &format!("INSERT INTO orders ({ORDER_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"),
        params![
            order.id,
            order.user_id,
            order.address_id,
            order.total_amount,
            order.status.as_str(),
            order.payment_status.as_str(),
            order.payment_method.as_str(),
            timestamp(&order.created_at),
            timestamp(&order.updated_at),
        ],
    )?;

    let mut stmt = conn.prepare(
        "INSERT INTO order_items (order_id, position, product_id, name, price, quantity, subtotal)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )?;
    for (position, item) in order.items.iter().enumerate() {
        stmt.execute(params![
            order.id,
            position as i64,
            item.product_id,
            item.name,
            item.price,
            item.quantity,
            item.subtotal,
        ])?;
    }
    Ok(())
}

fn order_items(conn: &Connection, order_id: &str) -> anyhow::Result<Vec<OrderItem>> {
    let mut stmt = conn.prepare(
        "SELECT product_id, name, price, quantity, subtotal FROM order_items
         WHERE order_id = ?1 ORDER BY position ASC",
    )?;
    let rows = stmt.query_map(params![order_id], |row| {
        Ok(OrderItem {
            product_id: row.get(0)?,
            name: row.get(1)?,
            price: row.get(2)?,
            quantity: row.get(3)?,
            subtotal: row.get(4)?,
        })
    })?;

    let mut items = vec![];
    for row in rows {
        items.push(row?);
    }
    Ok(items)
}

fn parse_order_row(row: &Row) -> rusqlite::Result<Order> {
    Ok(Order {
        id: row.get(0)?,
        user_id: row.get(1)?,
        address_id: row.get(2)?,
        items: vec![],
        total_amount: row.get(3)?,
        status: enum_col(row, 4, OrderStatus::parse)?,
        payment_status: enum_col(row, 5, PaymentStatus::parse)?,
        payment_method: enum_col(row, 6, PaymentMethod::parse)?,
        created_at: timestamp_col(row, 7)?,
        updated_at: timestamp_col(row, 8)?,
    })
}

pub fn get_order(conn: &Connection, id: &str) -> anyhow::Result<Option<Order>> {
    let order = conn
        .query_row(
            &format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1"),
            params![id],
            parse_order_row,
        )
        .optional()?;

    match order {
        Some(mut order) => {
            order.items = order_items(conn, &order.id)?;
            Ok(Some(order))
        }
        None => Ok(None),
    }
}

pub fn list_orders(conn: &Connection, user_id: Option<&str>) -> anyhow::Result<Vec<Order>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE ?1 IS NULL OR user_id = ?1 ORDER BY created_at DESC"
    ))?;
    let rows = stmt.query_map(params![user_id], parse_order_row)?;

    let mut orders = vec![];
    for row in rows {
        let mut order = row?;
        order.items = order_items(conn, &order.id)?;
        orders.push(order);
    }
    Ok(orders)
}

pub fn update_order_status(conn: &Connection, id: &str, status: OrderStatus) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE orders SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status.as_str(), now(), id],
    )?;
    Ok(count > 0)
}

pub fn update_payment_status(
    conn: &Connection,
    id: &str,
    payment_status: PaymentStatus,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE orders SET payment_status = ?1, updated_at = ?2 WHERE id = ?3",
        params![payment_status.as_str(), now(), id],
    )?;
    Ok(count > 0)
}
