//! Checkout tests: idempotent slip creation, the amount cap, and the
//! once-only side effects

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use common::*;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

fn checkout_request(order_id: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/checkout")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "order_id": order_id }).to_string()))
        .expect("Failed to build request")
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to read body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("Body is JSON")
}

#[tokio::test]
async fn test_successful_checkout_records_slip() {
    let pool = setup_test_pool();
    let (product, order) = {
        let conn = pool.get().unwrap();
        let product = create_test_product(&conn);
        let order = create_test_order(&conn, &product.id, 4999);
        (product, order)
    };

    let provider_url = spawn_mock_provider(json!({
        "id": "S1",
        "transactions": [{ "id": "T1" }],
        "checkout_token": "TOK"
    }))
    .await;
    let state = test_app_state_with_provider(pool, &provider_url);

    let response = app(state.clone())
        .oneshot(checkout_request(&order.id))
        .await
        .expect("Request failed");

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["result"], "success");
    assert_eq!(body["checkout_token"], "TOK");

    {
        let conn = state.db.get().unwrap();
        let record = queries::get_transaction_record(&conn, &order.id)
            .unwrap()
            .unwrap();
        assert_eq!(record.slip_id.as_deref(), Some("S1"));
        assert_eq!(record.transaction_id.as_deref(), Some("T1"));
        assert_eq!(record.checkout_token.as_deref(), Some("TOK"));
        assert!(!record.is_paid);

        let order = queries::get_order(&conn, &order.id).unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(order.stock_reduced);

        let notes: Vec<String> = queries::list_order_notes(&conn, &order.id)
            .unwrap()
            .into_iter()
            .map(|n| n.note)
            .collect();
        assert!(notes.contains(&"Cash payment initialized (Transaction ID: T1).".to_string()));
        assert!(notes.contains(&"Awaiting cash payment.".to_string()));

        let product = queries::get_product(&conn, &product.id).unwrap().unwrap();
        assert_eq!(product.stock, 9);
    }

    // A resubmitted checkout rides the recorded transaction: same token,
    // no second slip, no second stock decrement.
    let second = app(state.clone())
        .oneshot(checkout_request(&order.id))
        .await
        .expect("Request failed");
    assert_eq!(second.status(), StatusCode::OK);
    let body = body_json(second).await;
    assert_eq!(body["result"], "success");
    assert_eq!(body["checkout_token"], "TOK");

    let conn = state.db.get().unwrap();
    let product = queries::get_product(&conn, &product.id).unwrap().unwrap();
    assert_eq!(product.stock, 9);
}

#[tokio::test]
async fn test_unknown_order_is_404() {
    let state = create_test_app_state();

    let response = app(state)
        .oneshot(checkout_request("no-such-order"))
        .await
        .expect("Request failed");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_amount_over_cap_is_rejected() {
    let state = create_test_app_state();
    let order = {
        let conn = state.db.get().unwrap();
        let product = create_test_product(&conn);
        // 1,500.00 EUR, over the cash payment cap.
        create_test_order(&conn, &product.id, 150_000)
    };

    let response = app(state.clone())
        .oneshot(checkout_request(&order.id))
        .await
        .expect("Request failed");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Rejected before any provider call or state change.
    let conn = state.db.get().unwrap();
    let order = queries::get_order(&conn, &order.id).unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Created);
    assert!(order.transaction_id.is_none());
}

#[tokio::test]
async fn test_existing_transaction_short_circuits() {
    let state = create_test_app_state();
    let order = {
        let conn = state.db.get().unwrap();
        let product = create_test_product(&conn);
        let order = create_test_order(&conn, &product.id, 4999);
        record_test_slip(&conn, &order.id, "slip-1", "tx-1");
        order
    };

    // The provider endpoint is unreachable, so a success response proves the
    // ledger short-circuit: no outbound call was attempted.
    let response = app(state.clone())
        .oneshot(checkout_request(&order.id))
        .await
        .expect("Request failed");

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["result"], "success");
    assert_eq!(body["checkout_token"], "test-checkout-token");

    let conn = state.db.get().unwrap();
    let record = queries::get_transaction_record(&conn, &order.id)
        .unwrap()
        .unwrap();
    assert_eq!(record.transaction_id.as_deref(), Some("tx-1"));
    assert_eq!(record.slip_id.as_deref(), Some("slip-1"));
}

#[tokio::test]
async fn test_provider_failure_leaves_order_untouched() {
    let state = create_test_app_state();
    let (product, order) = {
        let conn = state.db.get().unwrap();
        let product = create_test_product(&conn);
        let order = create_test_order(&conn, &product.id, 4999);
        (product, order)
    };

    // Fresh order, so checkout reaches for the provider and hits the
    // unreachable endpoint.
    let response = app(state.clone())
        .oneshot(checkout_request(&order.id))
        .await
        .expect("Request failed");

    // Provider failure is a buyer-facing soft error, not an HTTP error.
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["result"], "error");
    assert!(body["message"]
        .as_str()
        .expect("message present")
        .contains("another payment method"));

    let conn = state.db.get().unwrap();
    let order = queries::get_order(&conn, &order.id).unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Created);
    assert!(order.transaction_id.is_none());
    assert!(order.slip_id.is_none());
    assert!(!order.stock_reduced);
    let product = queries::get_product(&conn, &product.id).unwrap().unwrap();
    assert_eq!(product.stock, 10);
}

#[test]
fn test_transaction_id_is_set_at_most_once() {
    let conn = setup_test_db();
    let product = create_test_product(&conn);
    let order = create_test_order(&conn, &product.id, 4999);

    assert!(!queries::has_transaction(&conn, &order.id).unwrap());
    assert!(queries::try_set_transaction_id(&conn, &order.id, "tx-1").unwrap());
    assert!(queries::has_transaction(&conn, &order.id).unwrap());

    // The loser of a double submit must not overwrite the record.
    assert!(!queries::try_set_transaction_id(&conn, &order.id, "tx-2").unwrap());
    let record = queries::get_transaction_record(&conn, &order.id)
        .unwrap()
        .unwrap();
    assert_eq!(record.transaction_id.as_deref(), Some("tx-1"));
}

#[test]
fn test_stock_is_reduced_exactly_once() {
    let mut conn = setup_test_db();
    let product = create_test_product(&conn);
    let order = create_test_order(&conn, &product.id, 4999);

    assert!(queries::reduce_stock_once(&mut conn, &order.id).unwrap());
    let after_first = queries::get_product(&conn, &product.id).unwrap().unwrap();
    assert_eq!(after_first.stock, 9);

    assert!(!queries::reduce_stock_once(&mut conn, &order.id).unwrap());
    let after_second = queries::get_product(&conn, &product.id).unwrap().unwrap();
    assert_eq!(after_second.stock, 9);
}
