use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::{queries, AppState};
use crate::error::{AppError, Result};
use crate::models::format_amount;
use crate::provider::ProviderError;

#[derive(Error, Debug)]
pub enum RefundError {
    /// No slip was ever recorded for this order; nothing to refund against.
    #[error("no transaction recorded for order")]
    NoTransaction,

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Store(#[from] AppError),
}

/// Issue a refund against the order's recorded slip.
///
/// The provider models refunds as negative-amount payment slips referencing
/// the original slip, so the amount is negated before the request is built.
/// On success an order note records the amount (and reason, if given); on
/// failure the order is left untouched.
pub async fn refund_order(
    state: &AppState,
    order_id: &str,
    amount_cents: i64,
    reason: Option<&str>,
) -> std::result::Result<(), RefundError> {
    let (order, slip_id) = {
        let conn = state.db.get().map_err(AppError::from)?;
        let order = queries::get_order(&conn, order_id)?
            .ok_or(RefundError::NoTransaction)?;
        let slip_id = order.slip_id.clone().ok_or(RefundError::NoTransaction)?;
        (order, slip_id)
    };

    let amount = format_amount(-amount_cents);

    if let Err(e) = state
        .provider
        .refund_transaction(&slip_id, &amount, &order.currency)
        .await
    {
        tracing::error!("order {}: refund failed: {}", order_id, e);
        return Err(e.into());
    }

    tracing::info!(
        "order {}: refunded {} against slip {}",
        order_id,
        format_amount(amount_cents),
        slip_id
    );

    let conn = state.db.get().map_err(AppError::from)?;
    let transaction_id = order.transaction_id.as_deref().unwrap_or(&slip_id);
    let note = match reason {
        Some(reason) if !reason.is_empty() => format!(
            "Refunded {} to transaction {} with the reason: {}.",
            format_amount(amount_cents),
            transaction_id,
            reason
        ),
        _ => format!(
            "Refunded {} to transaction {}.",
            format_amount(amount_cents),
            transaction_id
        ),
    };
    queries::add_order_note(&conn, order_id, &note)?;

    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct RefundRequest {
    pub amount_cents: i64,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RefundResponse {
    pub result: &'static str,
}

pub async fn process_refund(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
    Json(request): Json<RefundRequest>,
) -> Result<Json<RefundResponse>> {
    if request.amount_cents <= 0 {
        return Err(AppError::BadRequest("Refund amount must be positive".into()));
    }

    refund_order(
        &state,
        &order_id,
        request.amount_cents,
        request.reason.as_deref(),
    )
    .await
    .map_err(|e| match e {
        RefundError::NoTransaction => {
            AppError::BadRequest("No transaction recorded for this order".into())
        }
        RefundError::Provider(e) => AppError::Provider(e),
        RefundError::Store(e) => e,
    })?;

    Ok(Json(RefundResponse { result: "success" }))
}
