pub mod queries;
mod schema;

pub use schema::init_db;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::provider::{ProviderClient, WebhookVerifier};

pub type DbPool = Pool<SqliteConnectionManager>;

/// Application state: the order store plus the provider-facing components,
/// constructed once from configuration at startup.
#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    /// Base URL for webhook callbacks (e.g. https://shop.example.com)
    pub base_url: String,
    pub provider: ProviderClient,
    pub verifier: WebhookVerifier,
    /// Optional slip expiry in days, applied to new payment slips.
    pub slip_expiry_days: Option<i64>,
}

pub fn create_pool(database_path: &str) -> Result<DbPool, r2d2::Error> {
    let manager = SqliteConnectionManager::file(database_path);
    Pool::builder().max_size(10).build(manager)
}
