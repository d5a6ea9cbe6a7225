//! Reconciliation of verified payment-status events against order state.
//!
//! Maps an authenticated notification to an order-state transition, applies
//! it at most once, and produces the HTTP acknowledgment code the provider's
//! retry logic keys off.

use axum::http::StatusCode;
use rusqlite::Connection;

use crate::db::queries;
use crate::models::OrderStatus;

/// Acknowledgment returned to the provider's delivery system.
pub type WebhookResult = (StatusCode, &'static str);

/// Status event carried by a notification payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentEvent {
    Paid,
    Expired,
    Canceled,
    /// Event field absent or empty - acked 406 so the provider can treat
    /// malformed deliveries differently from unexpected ones.
    Missing,
    /// Well-formed but unrecognized event string - acked 404.
    Unknown(String),
}

impl PaymentEvent {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            None | Some("") => PaymentEvent::Missing,
            Some("paid") => PaymentEvent::Paid,
            Some("expired") => PaymentEvent::Expired,
            Some("canceled") => PaymentEvent::Canceled,
            Some(other) => PaymentEvent::Unknown(other.to_string()),
        }
    }
}

/// Observer invoked synchronously after a state transition. Replaces the
/// named framework hooks of a typical shop plugin with an explicit seam.
pub trait StatusHooks: Send + Sync {
    fn on_paid(&self, _order_id: &str) {}
    fn on_failed(&self, _order_id: &str) {}
}

/// Default observer: transitions are only logged.
#[derive(Debug, Clone, Default)]
pub struct LogHooks;

impl StatusHooks for LogHooks {
    fn on_paid(&self, order_id: &str) {
        tracing::info!("order {}: payment completed", order_id);
    }

    fn on_failed(&self, order_id: &str) {
        tracing::info!("order {}: payment failed", order_id);
    }
}

fn db_error(e: crate::error::AppError) -> WebhookResult {
    tracing::error!("DB error during reconciliation: {}", e);
    (StatusCode::INTERNAL_SERVER_ERROR, "Database error")
}

/// Apply a verified event to an order. Transitions are idempotent: a
/// repeated `paid` is a harmless duplicate (provider delivery is not
/// exactly-once), and once `is_paid` is latched no later `expired` or
/// `canceled` can undo it.
pub fn apply_event(
    conn: &Connection,
    hooks: &dyn StatusHooks,
    order_id: &str,
    event: &PaymentEvent,
) -> WebhookResult {
    let record = match queries::get_transaction_record(conn, order_id) {
        Ok(Some(r)) => r,
        Ok(None) => {
            tracing::warn!("order {}: notification for unknown order, dropped", order_id);
            return (StatusCode::OK, "Order not found");
        }
        Err(e) => return db_error(e),
    };

    match event {
        PaymentEvent::Paid => {
            if record.is_paid {
                tracing::info!("order {}: duplicate paid notification", order_id);
                return (StatusCode::OK, "Already processed");
            }
            if let Err(e) = queries::add_order_note(conn, order_id, "Cash payment completed.") {
                return db_error(e);
            }
            if let Err(e) = queries::mark_order_paid(conn, order_id) {
                return db_error(e);
            }
            tracing::info!("order {}: payment completed", order_id);
            hooks.on_paid(order_id);
            (StatusCode::OK, "OK")
        }
        PaymentEvent::Expired | PaymentEvent::Canceled => {
            // The paid latch wins over late failure events.
            if record.is_paid {
                tracing::warn!(
                    "order {}: {:?} notification after payment, ignored",
                    order_id,
                    event
                );
                return (StatusCode::OK, "Already paid");
            }
            let note = if *event == PaymentEvent::Expired {
                "Cash payment expired."
            } else {
                "Cash payment canceled."
            };
            if let Err(e) = queries::set_order_status(conn, order_id, OrderStatus::Failed, note) {
                return db_error(e);
            }
            tracing::info!("order {}: {}", order_id, note);
            hooks.on_failed(order_id);
            (StatusCode::OK, "OK")
        }
        PaymentEvent::Missing => {
            if let Err(e) = queries::add_order_note(
                conn,
                order_id,
                "Payment status not submitted by provider.",
            ) {
                return db_error(e);
            }
            tracing::warn!("order {}: event field missing from notification", order_id);
            (StatusCode::NOT_ACCEPTABLE, "Missing event")
        }
        PaymentEvent::Unknown(value) => {
            let note = format!("Unknown payment status: {}.", value);
            if let Err(e) = queries::add_order_note(conn, order_id, &note) {
                return db_error(e);
            }
            tracing::warn!("order {}: unknown payment status {:?}", order_id, value);
            (StatusCode::NOT_FOUND, "Unknown event")
        }
    }
}
