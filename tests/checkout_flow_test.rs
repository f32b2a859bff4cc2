mod common;

use axum::http::{Method, StatusCode};
use common::{read_json, TestApp};
use rust_decimal_macros::dec;
use serde_json::{json, Value};

fn billing_payload() -> Value {
    json!({
        "full_name": "Dana Tester",
        "line1": "42 Test Lane",
        "line2": null,
        "city": "Pune",
        "state": "MH",
        "postal_code": "411001",
        "country": "India",
        "phone": "9876543210"
    })
}

#[tokio::test]
#[cfg_attr(not(feature = "mock-tests"), ignore)]
async fn checkout_snapshots_the_cart_and_clears_it() {
    let app = TestApp::new().await;
    let (user_id, token) = app.register_user("checkout@example.com").await;
    let lamp = app.seed_product("Desk Lamp", dec!(19.99)).await;
    let mug = app.seed_product("Mug", dec!(7.25)).await;

    for (product, qty) in [(&lamp, 2), (&mug, 1)] {
        let response = app
            .request(
                Method::POST,
                "/api/v1/cart/items",
                Some(json!({ "product_id": product.id, "quantity": qty })),
                Some(&token),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .request(
            Method::POST,
            "/api/v1/checkout",
            Some(billing_payload()),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let order = read_json(response).await;
    assert_eq!(order["user_id"].as_str(), Some(user_id.to_string().as_str()));
    assert_eq!(order["status"].as_str(), Some("pending"));
    assert_eq!(order["total_price"], json!("47.23"));
    assert!(order["order_number"]
        .as_str()
        .is_some_and(|n| n.starts_with("ORD-")));
    let order_id = order["id"].as_str().unwrap().to_string();

    // The stored lines carry name and price snapshots.
    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/orders/{}/items", order_id),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let items = read_json(response).await;
    let items = items.as_array().unwrap();
    assert_eq!(items.len(), 2);
    let lamp_line = items
        .iter()
        .find(|line| line["product_name"] == json!("Desk Lamp"))
        .expect("lamp line present");
    assert_eq!(lamp_line["unit_price"], json!("19.99"));
    assert_eq!(lamp_line["quantity"], json!(2));

    // The cart is emptied in the same transaction.
    let response = app
        .request(Method::GET, "/api/v1/cart", None, Some(&token))
        .await;
    let cart = read_json(response).await;
    assert!(cart["items"].as_array().unwrap().is_empty());
    assert_eq!(cart["item_count"], json!(0));
}

#[tokio::test]
#[cfg_attr(not(feature = "mock-tests"), ignore)]
async fn snapshot_prices_survive_later_catalog_changes() {
    use sea_orm::{ActiveModelTrait, Set};
    use storefront_api::entities::product;

    let app = TestApp::new().await;
    let (_, token) = app.register_user("checkout-snapshot@example.com").await;
    let mug = app.seed_product("Mug", dec!(7.25)).await;

    app.request(
        Method::POST,
        "/api/v1/cart/items",
        Some(json!({ "product_id": mug.id, "quantity": 1 })),
        Some(&token),
    )
    .await;
    let response = app
        .request(
            Method::POST,
            "/api/v1/checkout",
            Some(billing_payload()),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let order = read_json(response).await;
    let order_id = order["id"].as_str().unwrap().to_string();

    // Raise the catalog price after the order is placed.
    let mut active: product::ActiveModel = mug.into();
    active.price = Set(dec!(99.99));
    active.updated_at = Set(chrono::Utc::now());
    active
        .update(&*app.state.db)
        .await
        .expect("catalog price update");

    // The stored order and its lines keep the price paid.
    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/orders/{}/items", order_id),
            None,
            Some(&token),
        )
        .await;
    let items = read_json(response).await;
    assert_eq!(items[0]["unit_price"], json!("7.25"));

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/orders/{}", order_id),
            None,
            Some(&token),
        )
        .await;
    let order = read_json(response).await;
    assert_eq!(order["total_price"], json!("7.25"));
}

#[tokio::test]
#[cfg_attr(not(feature = "mock-tests"), ignore)]
async fn checkout_with_an_empty_cart_conflicts() {
    let app = TestApp::new().await;
    let (_, token) = app.register_user("checkout-empty@example.com").await;

    // Never added anything, cart row may not even exist yet.
    let response = app
        .request(
            Method::POST,
            "/api/v1/checkout",
            Some(billing_payload()),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // Same result once a cart exists but holds no lines.
    let response = app
        .request(Method::GET, "/api/v1/cart", None, Some(&token))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .request(
            Method::POST,
            "/api/v1/checkout",
            Some(billing_payload()),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
#[cfg_attr(not(feature = "mock-tests"), ignore)]
async fn placed_orders_show_up_in_the_users_history() {
    let app = TestApp::new().await;
    let (_, token) = app.register_user("checkout-history@example.com").await;
    let product = app.seed_product("Poster", dec!(12.00)).await;

    app.request(
        Method::POST,
        "/api/v1/cart/items",
        Some(json!({ "product_id": product.id, "quantity": 1 })),
        Some(&token),
    )
    .await;
    let response = app
        .request(
            Method::POST,
            "/api/v1/checkout",
            Some(billing_payload()),
            Some(&token),
        )
        .await;
    let order = read_json(response).await;
    let order_id = order["id"].as_str().unwrap();

    let response = app
        .request(Method::GET, "/api/v1/orders", None, Some(&token))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    let orders = body["data"].as_array().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["id"].as_str(), Some(order_id));
    assert_eq!(body["pagination"]["total"], json!(1));
}

#[tokio::test]
#[cfg_attr(not(feature = "mock-tests"), ignore)]
async fn consecutive_checkouts_need_a_refilled_cart() {
    let app = TestApp::new().await;
    let (_, token) = app.register_user("checkout-twice@example.com").await;
    let product = app.seed_product("Notebook", dec!(4.50)).await;

    app.request(
        Method::POST,
        "/api/v1/cart/items",
        Some(json!({ "product_id": product.id, "quantity": 1 })),
        Some(&token),
    )
    .await;
    let first = app
        .request(
            Method::POST,
            "/api/v1/checkout",
            Some(billing_payload()),
            Some(&token),
        )
        .await;
    assert_eq!(first.status(), StatusCode::CREATED);

    // The cart was cleared, so a second checkout has nothing to order.
    let second = app
        .request(
            Method::POST,
            "/api/v1/checkout",
            Some(billing_payload()),
            Some(&token),
        )
        .await;
    assert_eq!(second.status(), StatusCode::CONFLICT);
}
