use rusqlite::Connection;

/// Initialize the order store schema.
pub fn init_db(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        -- Products (shop catalog; stock is decremented once per paid-for order)
        CREATE TABLE IF NOT EXISTS products (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            price_cents INTEGER NOT NULL,
            currency TEXT NOT NULL,
            stock INTEGER NOT NULL DEFAULT 0
        );

        -- Orders with the embedded per-order transaction record.
        -- transaction_id is set at most once (see try_set_transaction_id);
        -- is_paid is a monotonic latch, never written back to 0.
        CREATE TABLE IF NOT EXISTS orders (
            id TEXT PRIMARY KEY,
            product_id TEXT NOT NULL REFERENCES products(id),
            quantity INTEGER NOT NULL DEFAULT 1,
            total_cents INTEGER NOT NULL,
            currency TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'created'
                CHECK (status IN ('created', 'pending', 'paid', 'failed')),
            billing_email TEXT NOT NULL,
            billing_street TEXT NOT NULL,
            billing_zipcode TEXT NOT NULL,
            billing_city TEXT NOT NULL,
            billing_country TEXT NOT NULL,
            slip_id TEXT,
            transaction_id TEXT,
            checkout_token TEXT,
            is_paid INTEGER NOT NULL DEFAULT 0,
            stock_reduced INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_orders_slip ON orders(slip_id);
        CREATE INDEX IF NOT EXISTS idx_orders_status ON orders(status);

        -- Free-text note log, append-only
        CREATE TABLE IF NOT EXISTS order_notes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            order_id TEXT NOT NULL REFERENCES orders(id) ON DELETE CASCADE,
            note TEXT NOT NULL,
            created_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_order_notes_order ON order_notes(order_id);
        "#,
    )?;
    Ok(())
}
