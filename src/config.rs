use std::env;

/// Provider account credentials and environment selection.
/// Passed into `ProviderClient` and `WebhookVerifier` at construction time;
/// there is no process-wide settings singleton.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Merchant division id with the provider.
    pub shop_id: String,
    /// Shared secret used for request signing and webhook verification.
    pub payment_key: String,
    /// Use the provider's sandbox API instead of production.
    pub sandbox: bool,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    /// Base URL for webhook callbacks (e.g. https://shop.example.com).
    pub base_url: String,
    pub provider: ProviderConfig,
    /// Optional slip expiry, in days from creation. None = provider default.
    pub slip_expiry_days: Option<i64>,
    pub dev_mode: bool,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let dev_mode = env::var("CASHGATE_ENV")
            .map(|v| v == "dev" || v == "development")
            .unwrap_or(false);

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port: u16 = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        let base_url =
            env::var("BASE_URL").unwrap_or_else(|_| format!("http://{}:{}", host, port));

        let provider = ProviderConfig {
            shop_id: env::var("CASHGATE_SHOP_ID").unwrap_or_default(),
            payment_key: env::var("CASHGATE_PAYMENT_KEY").unwrap_or_default(),
            sandbox: env::var("CASHGATE_SANDBOX")
                .map(|v| v == "1" || v == "true" || v == "yes")
                .unwrap_or(false),
        };

        Self {
            host,
            port,
            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "cashgate.db".to_string()),
            base_url,
            provider,
            slip_expiry_days: env::var("CASHGATE_SLIP_EXPIRY_DAYS")
                .ok()
                .and_then(|v| v.parse().ok()),
            dev_mode,
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
