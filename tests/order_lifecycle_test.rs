mod common;

use axum::http::{Method, StatusCode};
use common::{read_json, TestApp};
use rust_decimal_macros::dec;
use serde_json::{json, Value};

async fn place_order(app: &TestApp, token: &str) -> String {
    let product = app.seed_product("Desk Lamp", dec!(19.99)).await;
    app.request(
        Method::POST,
        "/api/v1/cart/items",
        Some(json!({ "product_id": product.id, "quantity": 1 })),
        Some(token),
    )
    .await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/checkout",
            Some(json!({
                "full_name": "Dana Tester",
                "line1": "42 Test Lane",
                "city": "Pune",
                "state": "MH",
                "postal_code": "411001",
                "country": "India",
                "phone": "9876543210"
            })),
            Some(token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let order = read_json(response).await;
    order["id"].as_str().unwrap().to_string()
}

async fn set_status(app: &TestApp, token: &str, order_id: &str, status: &str) -> (StatusCode, Value) {
    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/orders/{}/status", order_id),
            Some(json!({ "status": status })),
            Some(token),
        )
        .await;
    let status_code = response.status();
    (status_code, read_json(response).await)
}

#[tokio::test]
#[cfg_attr(not(feature = "mock-tests"), ignore)]
async fn orders_walk_the_forward_lifecycle() {
    let app = TestApp::new().await;
    let (_, token) = app.register_user("lifecycle@example.com").await;
    let order_id = place_order(&app, &token).await;

    for next in ["processing", "shipped", "delivered"] {
        let (code, body) = set_status(&app, &token, &order_id, next).await;
        assert_eq!(code, StatusCode::OK, "transition to {} should succeed", next);
        assert_eq!(body["status"].as_str(), Some(next));
    }
}

#[tokio::test]
#[cfg_attr(not(feature = "mock-tests"), ignore)]
async fn cancellation_is_only_allowed_before_shipment() {
    let app = TestApp::new().await;
    let (_, token) = app.register_user("lifecycle-cancel@example.com").await;

    let order_id = place_order(&app, &token).await;
    let (code, body) = set_status(&app, &token, &order_id, "cancelled").await;
    assert_eq!(code, StatusCode::OK);
    assert_eq!(body["status"].as_str(), Some("cancelled"));

    let order_id = place_order(&app, &token).await;
    set_status(&app, &token, &order_id, "processing").await;
    set_status(&app, &token, &order_id, "shipped").await;
    let (code, _) = set_status(&app, &token, &order_id, "cancelled").await;
    assert_eq!(code, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
#[cfg_attr(not(feature = "mock-tests"), ignore)]
async fn backward_and_skipping_transitions_are_rejected() {
    let app = TestApp::new().await;
    let (_, token) = app.register_user("lifecycle-illegal@example.com").await;
    let order_id = place_order(&app, &token).await;

    // Skipping straight to shipped is not allowed from pending.
    let (code, _) = set_status(&app, &token, &order_id, "shipped").await;
    assert_eq!(code, StatusCode::UNPROCESSABLE_ENTITY);

    set_status(&app, &token, &order_id, "processing").await;
    let (code, _) = set_status(&app, &token, &order_id, "pending").await;
    assert_eq!(code, StatusCode::UNPROCESSABLE_ENTITY);

    // The order is untouched by the failed attempts.
    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/orders/{}", order_id),
            None,
            Some(&token),
        )
        .await;
    let order = read_json(response).await;
    assert_eq!(order["status"].as_str(), Some("processing"));
}

#[tokio::test]
#[cfg_attr(not(feature = "mock-tests"), ignore)]
async fn terminal_orders_accept_no_further_transitions() {
    let app = TestApp::new().await;
    let (_, token) = app.register_user("lifecycle-terminal@example.com").await;
    let order_id = place_order(&app, &token).await;

    set_status(&app, &token, &order_id, "cancelled").await;
    let (code, _) = set_status(&app, &token, &order_id, "processing").await;
    assert_eq!(code, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
#[cfg_attr(not(feature = "mock-tests"), ignore)]
async fn orders_are_invisible_to_other_users() {
    let app = TestApp::new().await;
    let (_, owner_token) = app.register_user("order-owner@example.com").await;
    let (_, intruder_token) = app.register_user("order-intruder@example.com").await;
    let order_id = place_order(&app, &owner_token).await;

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/orders/{}", order_id),
            None,
            Some(&intruder_token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let (code, _) = set_status(&app, &intruder_token, &order_id, "processing").await;
    assert_eq!(code, StatusCode::NOT_FOUND);

    let response = app
        .request(Method::GET, "/api/v1/orders", None, Some(&intruder_token))
        .await;
    let body = read_json(response).await;
    assert!(body["data"].as_array().unwrap().is_empty());
}
