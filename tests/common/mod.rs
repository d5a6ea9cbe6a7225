//! Test utilities and fixtures for Cashgate integration tests

#![allow(dead_code)]

use axum::routing::post;
use axum::{Json, Router};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;

pub use cashgate::config::ProviderConfig;
pub use cashgate::db::{init_db, queries, AppState, DbPool};
pub use cashgate::handlers;
pub use cashgate::models::*;
pub use cashgate::provider::{ProviderClient, WebhookVerifier, SIGNATURE_HEADER};

/// Shared secret used across the test fixtures.
pub const TEST_PAYMENT_KEY: &str = "test-payment-key";

/// An endpoint nothing listens on. Any test that accidentally triggers an
/// outbound provider call fails fast with a connection error instead of
/// touching the network.
pub const UNREACHABLE_PROVIDER: &str = "http://127.0.0.1:9/v2/transactions";

pub fn test_provider_config() -> ProviderConfig {
    ProviderConfig {
        shop_id: "12345".to_string(),
        payment_key: TEST_PAYMENT_KEY.to_string(),
        sandbox: true,
    }
}

/// Create an in-memory test database with schema initialized
pub fn setup_test_db() -> Connection {
    let conn = Connection::open_in_memory().expect("Failed to create in-memory database");
    init_db(&conn).expect("Failed to initialize schema");
    conn
}

/// Create a single-connection in-memory pool. Size 1 matters: each pooled
/// `:memory:` connection would otherwise be its own empty database.
pub fn setup_test_pool() -> DbPool {
    let manager = SqliteConnectionManager::memory();
    let pool = Pool::builder()
        .max_size(1)
        .build(manager)
        .expect("Failed to build test pool");
    {
        let conn = pool.get().expect("Failed to get pooled connection");
        init_db(&conn).expect("Failed to initialize schema");
    }
    pool
}

/// Create a test product with default values
pub fn create_test_product(conn: &Connection) -> Product {
    queries::create_product(conn, "Test Product", 4999, "EUR", 10)
        .expect("Failed to create test product")
}

/// Create a test order for a product
pub fn create_test_order(conn: &Connection, product_id: &str, total_cents: i64) -> Order {
    let input = CreateOrder {
        product_id: product_id.to_string(),
        quantity: 1,
        total_cents,
        currency: "EUR".to_string(),
        billing_email: "buyer@example.com".to_string(),
        billing_street: "Musterstrasse 1".to_string(),
        billing_zipcode: "10115".to_string(),
        billing_city: "Berlin".to_string(),
        billing_country: "DE".to_string(),
    };
    queries::create_order(conn, &input).expect("Failed to create test order")
}

/// Record a completed slip creation on an order, the state checkout leaves
/// behind after a successful provider call.
pub fn record_test_slip(conn: &Connection, order_id: &str, slip_id: &str, tx_id: &str) {
    assert!(
        queries::try_set_transaction_id(conn, order_id, tx_id)
            .expect("Failed to set transaction id"),
        "transaction id already recorded"
    );
    queries::record_slip(conn, order_id, slip_id, Some("test-checkout-token"))
        .expect("Failed to record slip");
}

/// Create an AppState for testing, with the provider client pointed at an
/// unreachable endpoint.
pub fn create_test_app_state() -> AppState {
    test_app_state_with_pool(setup_test_pool())
}

pub fn test_app_state_with_pool(pool: DbPool) -> AppState {
    test_app_state_with_provider(pool, UNREACHABLE_PROVIDER)
}

/// AppState with the provider client pointed at an arbitrary endpoint,
/// usually one from `spawn_mock_provider`.
pub fn test_app_state_with_provider(pool: DbPool, provider_url: &str) -> AppState {
    let config = test_provider_config();
    AppState {
        db: pool,
        base_url: "http://localhost:3000".to_string(),
        provider: ProviderClient::new(&config).with_base_url(provider_url),
        verifier: WebhookVerifier::new(&config),
        slip_expiry_days: Some(7),
    }
}

/// Bind a loopback provider stub that answers every creation call with the
/// given JSON body. Returns the endpoint URL to hand to the client.
pub async fn spawn_mock_provider(response: serde_json::Value) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind mock provider");
    let addr = listener.local_addr().expect("Mock provider has a local addr");

    let stub = Router::new().route(
        "/v2/transactions",
        post(move || {
            let response = response.clone();
            async move { Json(response) }
        }),
    );
    tokio::spawn(async move {
        axum::serve(listener, stub)
            .await
            .expect("Mock provider failed");
    });

    format!("http://{}/v2/transactions", addr)
}

/// Create a Router with all endpoints wired to the given state
pub fn app(state: AppState) -> Router {
    handlers::router().with_state(state)
}

/// Compute the hex HMAC-SHA256 a genuine notification delivery would carry.
pub fn sign_body(key: &str, body: &[u8]) -> String {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    type HmacSha256 = Hmac<Sha256>;

    let mut mac =
        HmacSha256::new_from_slice(key.as_bytes()).expect("HMAC can take key of any size");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Get the current timestamp
pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}
