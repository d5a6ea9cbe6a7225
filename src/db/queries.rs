use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{CreateOrder, Order, OrderNote, OrderStatus, Product, TransactionRecord};

fn now() -> i64 {
    Utc::now().timestamp()
}

fn gen_id() -> String {
    Uuid::new_v4().to_string()
}

const ORDER_COLS: &str = "id, product_id, quantity, total_cents, currency, status, \
     billing_email, billing_street, billing_zipcode, billing_city, billing_country, \
     slip_id, transaction_id, checkout_token, is_paid, stock_reduced, created_at, updated_at";

fn order_from_row(row: &Row) -> rusqlite::Result<Order> {
    let status: String = row.get(5)?;
    Ok(Order {
        id: row.get(0)?,
        product_id: row.get(1)?,
        quantity: row.get(2)?,
        total_cents: row.get(3)?,
        currency: row.get(4)?,
        status: OrderStatus::from_str(&status).unwrap_or(OrderStatus::Created),
        billing_email: row.get(6)?,
        billing_street: row.get(7)?,
        billing_zipcode: row.get(8)?,
        billing_city: row.get(9)?,
        billing_country: row.get(10)?,
        slip_id: row.get(11)?,
        transaction_id: row.get(12)?,
        checkout_token: row.get(13)?,
        is_paid: row.get::<_, i64>(14)? != 0,
        stock_reduced: row.get::<_, i64>(15)? != 0,
        created_at: row.get(16)?,
        updated_at: row.get(17)?,
    })
}

// ============ Products ============

pub fn create_product(
    conn: &Connection,
    name: &str,
    price_cents: i64,
    currency: &str,
    stock: i64,
) -> Result<Product> {
    let id = gen_id();
    conn.execute(
        "INSERT INTO products (id, name, price_cents, currency, stock) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![&id, name, price_cents, currency, stock],
    )?;
    Ok(Product {
        id,
        name: name.to_string(),
        price_cents,
        currency: currency.to_string(),
        stock,
    })
}

pub fn get_product(conn: &Connection, id: &str) -> Result<Option<Product>> {
    let product = conn
        .query_row(
            "SELECT id, name, price_cents, currency, stock FROM products WHERE id = ?1",
            params![id],
            |row| {
                Ok(Product {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    price_cents: row.get(2)?,
                    currency: row.get(3)?,
                    stock: row.get(4)?,
                })
            },
        )
        .optional()?;
    Ok(product)
}

// ============ Orders ============

pub fn create_order(conn: &Connection, input: &CreateOrder) -> Result<Order> {
    let id = gen_id();
    let now = now();

    conn.execute(
        "INSERT INTO orders (id, product_id, quantity, total_cents, currency, status,
             billing_email, billing_street, billing_zipcode, billing_city, billing_country,
             created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, 'created', ?6, ?7, ?8, ?9, ?10, ?11, ?11)",
        params![
            &id,
            &input.product_id,
            input.quantity,
            input.total_cents,
            &input.currency,
            &input.billing_email,
            &input.billing_street,
            &input.billing_zipcode,
            &input.billing_city,
            &input.billing_country,
            now,
        ],
    )?;

    get_order(conn, &id)?.ok_or_else(|| AppError::Internal("order vanished after insert".into()))
}

pub fn get_order(conn: &Connection, id: &str) -> Result<Option<Order>> {
    let order = conn
        .query_row(
            &format!("SELECT {} FROM orders WHERE id = ?1", ORDER_COLS),
            params![id],
            order_from_row,
        )
        .optional()?;
    Ok(order)
}

/// Set the order status and append the accompanying note in one step.
pub fn set_order_status(
    conn: &Connection,
    id: &str,
    status: OrderStatus,
    note: &str,
) -> Result<()> {
    conn.execute(
        "UPDATE orders SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status.as_str(), now(), id],
    )?;
    add_order_note(conn, id, note)
}

/// Mark the order paid: terminal success status plus the monotonic
/// `is_paid` latch. No query ever writes the latch back to 0.
pub fn mark_order_paid(conn: &Connection, id: &str) -> Result<()> {
    conn.execute(
        "UPDATE orders SET status = 'paid', is_paid = 1, updated_at = ?1 WHERE id = ?2",
        params![now(), id],
    )?;
    Ok(())
}

pub fn add_order_note(conn: &Connection, order_id: &str, note: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO order_notes (order_id, note, created_at) VALUES (?1, ?2, ?3)",
        params![order_id, note, now()],
    )?;
    Ok(())
}

pub fn list_order_notes(conn: &Connection, order_id: &str) -> Result<Vec<OrderNote>> {
    let mut stmt = conn.prepare(
        "SELECT order_id, note, created_at FROM order_notes WHERE order_id = ?1 ORDER BY id",
    )?;
    let notes = stmt
        .query_map(params![order_id], |row| {
            Ok(OrderNote {
                order_id: row.get(0)?,
                note: row.get(1)?,
                created_at: row.get(2)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(notes)
}

// ============ Transaction record / idempotency ledger ============

/// Whether a provider transaction was already created for this order.
/// Checkout checks this before calling the provider and skips creation
/// when it returns true.
pub fn has_transaction(conn: &Connection, order_id: &str) -> Result<bool> {
    let exists: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM orders WHERE id = ?1 AND transaction_id IS NOT NULL",
            params![order_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(exists.is_some())
}

/// Atomically record the transaction id, set-if-absent.
///
/// Returns true if this call claimed the slot, false if a transaction id was
/// already recorded (concurrent double submit - the caller treats that as
/// "already created").
pub fn try_set_transaction_id(conn: &Connection, order_id: &str, tx_id: &str) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE orders SET transaction_id = ?1, updated_at = ?2
         WHERE id = ?3 AND transaction_id IS NULL",
        params![tx_id, now(), order_id],
    )?;
    Ok(affected > 0)
}

/// Capture the remaining creation-response fields alongside the order.
pub fn record_slip(
    conn: &Connection,
    order_id: &str,
    slip_id: &str,
    checkout_token: Option<&str>,
) -> Result<()> {
    conn.execute(
        "UPDATE orders SET slip_id = ?1, checkout_token = ?2, updated_at = ?3 WHERE id = ?4",
        params![slip_id, checkout_token, now(), order_id],
    )?;
    Ok(())
}

pub fn get_transaction_record(
    conn: &Connection,
    order_id: &str,
) -> Result<Option<TransactionRecord>> {
    let record = conn
        .query_row(
            "SELECT slip_id, transaction_id, checkout_token, is_paid FROM orders WHERE id = ?1",
            params![order_id],
            |row| {
                Ok(TransactionRecord {
                    slip_id: row.get(0)?,
                    transaction_id: row.get(1)?,
                    checkout_token: row.get(2)?,
                    is_paid: row.get::<_, i64>(3)? != 0,
                })
            },
        )
        .optional()?;
    Ok(record)
}

// ============ Checkout side effects ============

/// Reduce product stock for an order, at most once.
///
/// The compare-and-swap on `stock_reduced` makes redelivered checkouts and
/// duplicate webhooks safe: the decrement happens exactly once per order.
pub fn reduce_stock_once(conn: &mut Connection, order_id: &str) -> Result<bool> {
    let tx = conn.transaction()?;

    let claimed = tx.execute(
        "UPDATE orders SET stock_reduced = 1, updated_at = ?1
         WHERE id = ?2 AND stock_reduced = 0",
        params![now(), order_id],
    )?;
    if claimed == 0 {
        return Ok(false);
    }

    tx.execute(
        "UPDATE products SET stock = stock - (SELECT quantity FROM orders WHERE id = ?1)
         WHERE id = (SELECT product_id FROM orders WHERE id = ?1)",
        params![order_id],
    )?;

    tx.commit()?;
    Ok(true)
}
