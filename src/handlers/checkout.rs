use axum::{extract::State, Json};
use chrono::{Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::db::{queries, AppState};
use crate::error::{AppError, Result};
use crate::models::{format_amount, Order};
use crate::provider::{Customer, SlipRequest};

/// Provider-imposed cap on slip amounts (EUR 1,000).
const MAX_SLIP_CENTS: i64 = 100_000;

const BUYER_ERROR: &str =
    "The payment provider returned an error. Please choose another payment method.";

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub order_id: String,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub result: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkout_token: Option<String>,
}

impl CheckoutResponse {
    fn success(checkout_token: Option<String>) -> Self {
        Self {
            result: "success",
            message: None,
            checkout_token,
        }
    }

    fn failure() -> Self {
        Self {
            result: "error",
            message: Some(BUYER_ERROR),
            checkout_token: None,
        }
    }
}

fn build_slip_request(state: &AppState, order: &Order) -> SlipRequest {
    let mut req = SlipRequest::payment(format_amount(order.total_cents), order.currency.clone());
    // Unique per attempt: a retried creation after a failed attempt must not
    // collide with the provider's earlier reference.
    req.reference_key = Some(format!("Order-{}-{}", order.id, Utc::now().timestamp()));
    req.hook_url = Some(format!("{}/webhook", state.base_url));
    req.customer = Some(Customer {
        email: order.billing_email.clone(),
        key: order.billing_email.clone(),
        language: "de-DE".to_string(),
        street_and_no: order.billing_street.clone(),
        zipcode: order.billing_zipcode.clone(),
        city: order.billing_city.clone(),
        country: order.billing_country.clone(),
    });
    if let Some(days) = state.slip_expiry_days {
        let expires_at = Utc::now() + Duration::days(days);
        req.expires_at = Some(expires_at.to_rfc3339_opts(SecondsFormat::Secs, true));
    }
    req.metadata.push(("order_id".to_string(), order.id.clone()));
    req
}

/// Initiate payment for an order: create a provider slip (guarded by the
/// idempotency ledger), capture the response, and move the order to pending.
///
/// Calling this twice for the same order performs zero additional provider
/// calls - double form submissions and back-button retries must not create
/// duplicate slips.
pub async fn process_payment(
    State(state): State<AppState>,
    Json(request): Json<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>> {
    let order = {
        let conn = state.db.get()?;
        queries::get_order(&conn, &request.order_id)?
            .ok_or_else(|| AppError::NotFound("Order not found".into()))?
    };

    // Ledger check before any outbound call.
    if order.transaction_id.is_some() {
        tracing::info!("order {}: slip already created, skipping", order.id);
        return Ok(Json(CheckoutResponse::success(order.checkout_token)));
    }

    if order.total_cents > MAX_SLIP_CENTS {
        return Err(AppError::BadRequest(
            "Order total exceeds the cash payment limit.".into(),
        ));
    }

    let slip_request = build_slip_request(&state, &order);

    let response = match state.provider.create_transaction(&slip_request).await {
        Ok(r) => r,
        Err(e) => {
            // Detail stays in the log; the buyer gets a generic message.
            tracing::error!("order {}: slip creation failed: {}", order.id, e);
            return Ok(Json(CheckoutResponse::failure()));
        }
    };

    let mut conn = state.db.get()?;
    // The client rejects responses without transactions, so this arm is
    // unreachable in practice.
    let tx_id = response
        .transaction_id()
        .ok_or_else(|| AppError::Internal("transaction response without transactions".into()))?;

    if !queries::try_set_transaction_id(&conn, &order.id, tx_id)? {
        // A concurrent submit won the race. Its slip is the recorded one;
        // ours is orphaned on the provider side (documented residual risk).
        tracing::warn!(
            "order {}: concurrent slip creation detected, keeping the first record",
            order.id
        );
        let token = queries::get_transaction_record(&conn, &order.id)?
            .and_then(|r| r.checkout_token);
        return Ok(Json(CheckoutResponse::success(token)));
    }

    queries::record_slip(
        &conn,
        &order.id,
        &response.id,
        response.checkout_token.as_deref(),
    )?;
    queries::add_order_note(
        &conn,
        &order.id,
        &format!(
            "Cash payment initialized (Transaction ID: {}).",
            tx_id
        ),
    )?;
    queries::set_order_status(
        &conn,
        &order.id,
        crate::models::OrderStatus::Pending,
        "Awaiting cash payment.",
    )?;

    // Once-only checkout side effects.
    queries::reduce_stock_once(&mut conn, &order.id)?;

    tracing::info!(
        "order {}: created slip {} with transaction id {}",
        order.id,
        response.id,
        tx_id
    );

    Ok(Json(CheckoutResponse::success(response.checkout_token)))
}
