use actix_web::{http::StatusCode, test::TestRequest};
use serde_json::json;
use storefront_engine::traits::OrderManagement;

use super::helpers::{checkout_body, FlowHarness, KEY_ID};
use crate::middleware::RateLimits;

#[actix_web::test]
async fn online_checkout_opens_a_payment_intent() {
    let h = FlowHarness::new().await;
    let saree = h.seed_product("Kanjivaram Silk", 12_500, 2).await;
    let reply = h.checkout(&saree, 2).await;
    assert_eq!(reply.status, StatusCode::CREATED);
    let body = reply.value();
    assert_eq!(body["order"]["order_status"], "AWAITING_PAYMENT");
    assert_eq!(body["order"]["payment_status"], "PENDING");
    assert_eq!(body["order"]["email"], "meera@example.com");
    assert_eq!(body["order"]["total_amount"], 2_500_000);
    assert!(body["order"]["order_id"].as_str().unwrap().starts_with("TEST-"));
    assert_eq!(body["payment"]["key_id"], KEY_ID);
    assert_eq!(body["payment"]["gateway_order_id"], "order_test_1");
    assert_eq!(body["payment"]["amount"], 2_500_000);
    assert_eq!(body["payment"]["currency"], "INR");

    let saree = h.product(saree.id).await;
    assert_eq!(saree.stock, 0);
    assert!(!saree.is_active);
}

#[actix_web::test]
async fn cash_on_delivery_is_placed_immediately() {
    let h = FlowHarness::new().await;
    let saree = h.seed_product("Chanderi Cotton", 2_400, 3).await;
    let req = TestRequest::post().uri("/api/orders").set_json(checkout_body(&saree, 1, "COD"));
    let reply = h.call(req).await;
    assert_eq!(reply.status, StatusCode::CREATED);
    let body = reply.value();
    assert_eq!(body["order"]["order_status"], "PLACED");
    assert_eq!(body["order"]["payment_method"], "COD");
    assert!(body["payment"].is_null());
    assert_eq!(h.gateway.orders_created(), 0);
    assert_eq!(h.product(saree.id).await.stock, 2);
}

#[actix_web::test]
async fn insufficient_stock_is_a_conflict() {
    let h = FlowHarness::new().await;
    let saree = h.seed_product("Banarasi", 8_000, 1).await;
    let reply = h.checkout(&saree, 2).await;
    assert_eq!(reply.status, StatusCode::CONFLICT);
    assert!(reply.value()["error"].as_str().unwrap().contains("Insufficient stock"));
    assert_eq!(h.product(saree.id).await.stock, 1);
    assert_eq!(h.gateway.orders_created(), 0);
}

#[actix_web::test]
async fn gateway_outage_is_a_bad_gateway_and_releases_stock() {
    let h = FlowHarness::new().await;
    let saree = h.seed_product("Paithani", 18_000, 4).await;
    h.gateway.set_failing(true);
    let reply = h.checkout(&saree, 3).await;
    assert_eq!(reply.status, StatusCode::BAD_GATEWAY);
    assert_eq!(h.product(saree.id).await.stock, 4);
    assert!(h.db.fetch_orders().await.unwrap().is_empty());
}

#[actix_web::test]
async fn invalid_checkouts_are_rejected() {
    let h = FlowHarness::new().await;
    let saree = h.seed_product("Tant", 1_500, 5).await;

    let mut body = checkout_body(&saree, 1, "ONLINE");
    body["shipping_address"]["pincode"] = json!("60004");
    let reply = h.call(TestRequest::post().uri("/api/orders").set_json(body)).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert!(reply.value()["error"].as_str().unwrap().contains("pincode"));

    let mut body = checkout_body(&saree, 1, "ONLINE");
    body["total_amount"] = json!(100);
    let reply = h.call(TestRequest::post().uri("/api/orders").set_json(body)).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    let mut body = checkout_body(&saree, 1, "ONLINE");
    body["payment_method"] = json!("BARTER");
    let reply = h.call(TestRequest::post().uri("/api/orders").set_json(body)).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    assert_eq!(h.product(saree.id).await.stock, 5);
}

#[actix_web::test]
async fn payment_routes_are_rate_limited_per_ip() {
    let h = FlowHarness::with_rate_limits(RateLimits::new(5, 2)).await;
    let saree = h.seed_product("Kasavu", 3_000, 10).await;
    assert_eq!(h.checkout(&saree, 1).await.status, StatusCode::CREATED);
    assert_eq!(h.checkout(&saree, 1).await.status, StatusCode::CREATED);
    let reply = h.checkout(&saree, 1).await;
    assert_eq!(reply.status, StatusCode::TOO_MANY_REQUESTS);
    let retry_after = reply.headers.get("Retry-After").expect("Retry-After header").to_str().unwrap();
    assert!(retry_after.parse::<u64>().unwrap() >= 1);
    assert_eq!(h.product(saree.id).await.stock, 8);

    // Tracking has its own budget
    let reply = h.call(TestRequest::get().uri("/api/orders/track?order_id=TEST-1&email=a%40b.com")).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}
