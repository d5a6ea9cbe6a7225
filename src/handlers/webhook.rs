use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use serde::Deserialize;

use crate::db::AppState;
use crate::provider::SIGNATURE_HEADER;
use crate::reconcile::{apply_event, LogHooks, PaymentEvent, WebhookResult};

/// Inbound notification body, untrusted until the raw bytes are verified.
/// Decoded defensively: every field the provider might omit is optional so a
/// malformed delivery degrades into an ack code instead of a crash.
#[derive(Debug, Deserialize)]
pub struct NotificationPayload {
    #[serde(default)]
    pub event: Option<String>,
    pub slip: SlipRef,
}

#[derive(Debug, Deserialize)]
pub struct SlipRef {
    pub id: String,
    #[serde(default)]
    pub reference_key: Option<String>,
    #[serde(default)]
    pub metadata: SlipMetadata,
}

#[derive(Debug, Default, Deserialize)]
pub struct SlipMetadata {
    #[serde(default)]
    pub order_id: Option<String>,
}

/// Handle a provider status notification.
///
/// Verification runs on the raw body bytes before any parsing - the
/// signature covers bytes-on-the-wire, not the re-serialized structure.
/// Unverifiable or uncorrelatable deliveries are dropped without touching
/// order state; the ack codes for the event outcomes (200/406/404) drive
/// the provider's retry heuristics and come from `reconcile::apply_event`.
pub async fn payment_listener(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> WebhookResult {
    if !headers.contains_key(SIGNATURE_HEADER) {
        tracing::warn!("notification without signature header, dropped");
        return (StatusCode::BAD_REQUEST, "Missing signature header");
    }

    if !state.verifier.verify(&headers, &body) {
        tracing::warn!("notification failed signature verification, dropped");
        return (StatusCode::UNAUTHORIZED, "Invalid signature");
    }

    let payload: NotificationPayload = match serde_json::from_slice(&body) {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!("undecodable notification body: {}", e);
            return (StatusCode::BAD_REQUEST, "Invalid JSON");
        }
    };

    let order_id = match payload.slip.metadata.order_id.as_deref() {
        Some(id) if !id.is_empty() => id,
        _ => {
            tracing::warn!(
                "notification for slip {} missing order id, dropped",
                payload.slip.id
            );
            return (StatusCode::BAD_REQUEST, "Missing order id");
        }
    };

    tracing::debug!(
        "verified notification for slip {} (reference key {:?}, order {})",
        payload.slip.id,
        payload.slip.reference_key,
        order_id
    );

    let conn = match state.db.get() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("DB connection error: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Database error");
        }
    };

    // Correlate the slip before transitioning. A notification for a slip we
    // never recorded is logged and dropped, not applied.
    match crate::db::queries::get_order(&conn, order_id) {
        Ok(Some(order)) => match order.slip_id.as_deref() {
            Some(stored) if stored == payload.slip.id => {}
            stored => {
                tracing::warn!(
                    "order {}: notification slip {} does not match recorded slip {:?}, dropped",
                    order_id,
                    payload.slip.id,
                    stored
                );
                return (StatusCode::OK, "Unknown slip");
            }
        },
        Ok(None) => {
            tracing::warn!("order {}: notification for unknown order, dropped", order_id);
            return (StatusCode::OK, "Order not found");
        }
        Err(e) => {
            tracing::error!("DB error: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Database error");
        }
    }

    let event = PaymentEvent::parse(payload.event.as_deref());
    apply_event(&conn, &LogHooks, order_id, &event)
}
