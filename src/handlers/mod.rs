pub mod checkout;
pub mod refund;
pub mod webhook;

pub use checkout::process_payment;
pub use refund::process_refund;
pub use webhook::payment_listener;

use axum::{routing::post, Router};

use crate::db::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/checkout", post(process_payment))
        .route("/webhook", post(payment_listener))
        .route("/orders/:id/refund", post(process_refund))
}
