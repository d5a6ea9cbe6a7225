use axum::Router;
use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cashgate::config::Config;
use cashgate::db::{create_pool, init_db, queries, AppState};
use cashgate::handlers;
use cashgate::models::CreateOrder;
use cashgate::provider::{ProviderClient, WebhookVerifier};

#[derive(Parser, Debug)]
#[command(name = "cashgate")]
#[command(about = "Merchant-side cash payment gateway")]
struct Cli {
    /// Seed the database with dev data (a product and an open order)
    #[arg(long)]
    seed: bool,

    /// Delete the database on exit (dev mode only, useful for fresh starts)
    #[arg(long)]
    ephemeral: bool,
}

/// Seeds a demo product and order for local testing against the sandbox API.
fn seed_dev_data(state: &AppState) {
    let conn = state.db.get().expect("Failed to get db connection for seeding");

    let product = queries::create_product(&conn, "Demo Product", 4999, "EUR", 100)
        .expect("Failed to create dev product");

    let order = queries::create_order(
        &conn,
        &CreateOrder {
            product_id: product.id.clone(),
            quantity: 1,
            total_cents: 4999,
            currency: "EUR".to_string(),
            billing_email: "dev@cashgate.local".to_string(),
            billing_street: "Musterstrasse 1".to_string(),
            billing_zipcode: "10115".to_string(),
            billing_city: "Berlin".to_string(),
            billing_country: "DE".to_string(),
        },
    )
    .expect("Failed to create dev order");

    tracing::info!("============================================");
    tracing::info!("DEV DATA SEEDED");
    tracing::info!("Product: {} (id: {})", product.name, product.id);
    tracing::info!("Order: {} ({} {})", order.id, order.total_cents, order.currency);
    tracing::info!("============================================");

    println!();
    println!("--- COPY FROM HERE ---");
    println!("  product_id: {}", product.id);
    println!("  order_id: {}", order.id);
    println!("--- END COPY ---");
    println!();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cashgate=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    if config.dev_mode {
        tracing::info!("Running in DEVELOPMENT mode");
    }
    if config.provider.sandbox {
        tracing::info!("Using the provider SANDBOX API");
    }

    let db_pool = create_pool(&config.database_path).expect("Failed to create database pool");
    {
        let conn = db_pool.get().expect("Failed to get connection");
        init_db(&conn).expect("Failed to initialize database");
    }

    let state = AppState {
        db: db_pool,
        base_url: config.base_url.clone(),
        provider: ProviderClient::new(&config.provider),
        verifier: WebhookVerifier::new(&config.provider),
        slip_expiry_days: config.slip_expiry_days,
    };

    if cli.seed {
        if !config.dev_mode {
            tracing::warn!("--seed flag ignored: not in dev mode (set CASHGATE_ENV=dev)");
        } else {
            seed_dev_data(&state);
        }
    }

    let app = Router::new()
        .merge(handlers::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    let cleanup_on_exit = cli.ephemeral && config.dev_mode;
    let db_path = config.database_path.clone();
    if cleanup_on_exit {
        tracing::info!("EPHEMERAL MODE: database will be deleted on exit");
    }

    tracing::info!("Cashgate listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Failed to start server");

    if cleanup_on_exit {
        tracing::info!("Cleaning up ephemeral database...");
        if let Err(e) = std::fs::remove_file(&db_path) {
            tracing::warn!("Failed to remove {}: {}", db_path, e);
        }
        let _ = std::fs::remove_file(format!("{}-wal", db_path));
        let _ = std::fs::remove_file(format!("{}-shm", db_path));
    }
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received, stopping server...");
}
