use actix_web::{http::StatusCode, test::TestRequest};
use serde_json::{json, Value};
use storefront_engine::{db_types::OrderId, helpers::WEBHOOK_SIGNATURE_HEADER, traits::OrderManagement};

use super::helpers::{signed_webhook, webhook_body, FlowHarness};

/// Places an online order for one unit and returns `(order_id, gateway_order_id)`.
async fn place_order(h: &FlowHarness, product_id: i64) -> (String, String) {
    let product = h.product(product_id).await;
    let body: Value = h.checkout(&product, 1).await.value();
    let order_id = body["order"]["order_id"].as_str().unwrap().to_string();
    let gateway_order_id = body["payment"]["gateway_order_id"].as_str().unwrap().to_string();
    (order_id, gateway_order_id)
}

fn verify_request(gateway_order_id: &str, payment_id: &str, signature: &str) -> TestRequest {
    TestRequest::post().uri("/api/payments/verify").set_json(json!({
        "gateway_order_id": gateway_order_id,
        "gateway_payment_id": payment_id,
        "signature": signature
    }))
}

#[actix_web::test]
async fn verified_payments_place_the_order() {
    let h = FlowHarness::new().await;
    let saree = h.seed_product("Pochampally Ikat", 6_500, 3).await;
    let (order_id, gid) = place_order(&h, saree.id).await;
    let signature = h.gateway.sign(&gid, "pay_Q1w2e3r4t5");
    let reply = h.call(verify_request(&gid, "pay_Q1w2e3r4t5", &signature)).await;
    assert_eq!(reply.status, StatusCode::OK);
    let body = reply.value();
    assert_eq!(body["success"], true);
    assert_eq!(body["order"]["order_id"], order_id.as_str());
    assert_eq!(body["order"]["payment_status"], "PAID");
    assert_eq!(body["order"]["order_status"], "PLACED");
    assert_eq!(body["order"]["gateway_payment_id"], "pay_Q1w2e3r4t5");

    // A second confirmation is a success, whatever it carries
    let reply = h.call(verify_request(&gid, "pay_Q1w2e3r4t5", "stale")).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.value()["order"]["payment_status"], "PAID");
    assert_eq!(h.product(saree.id).await.stock, 2);
}

#[actix_web::test]
async fn forged_signatures_cancel_the_order() {
    let h = FlowHarness::new().await;
    let saree = h.seed_product("Bandhani", 4_200, 1).await;
    let (order_id, gid) = place_order(&h, saree.id).await;
    assert_eq!(h.product(saree.id).await.stock, 0);
    let forged = h.gateway.sign(&gid, "pay_someone_else");
    let reply = h.call(verify_request(&gid, "pay_Q1w2e3r4t5", &forged)).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    let order = h.db.fetch_order_by_order_id(&OrderId::from(order_id)).await.unwrap().unwrap();
    assert_eq!(order.order_status.to_string(), "CANCELLED");
    assert_eq!(order.payment_status.to_string(), "FAILED");
    let saree = h.product(saree.id).await;
    assert_eq!(saree.stock, 1);
}

#[actix_web::test]
async fn verifying_an_unknown_gateway_order_is_not_found() {
    let h = FlowHarness::new().await;
    let reply = h.call(verify_request("order_nope", "pay_nope", "00")).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn webhooks_must_be_signed() {
    let h = FlowHarness::new().await;
    let saree = h.seed_product("Gadwal", 9_900, 2).await;
    let (order_id, gid) = place_order(&h, saree.id).await;

    let unsigned = TestRequest::post()
        .uri("/api/webhooks/razorpay")
        .insert_header(("Content-Type", "application/json"))
        .set_payload(webhook_body("payment.captured", &gid, "pay_1"));
    let reply = h.call(unsigned).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert!(reply.value()["error"].as_str().unwrap().contains("Missing signature"));

    let tampered = signed_webhook("payment.captured", &gid, "pay_1")
        .insert_header((WEBHOOK_SIGNATURE_HEADER, "8f2c0bd5a3a1d6e2f7c9b4a0e1d2c3b4a5968778695a4b3c2d1e0f9a8b7c6d5e"));
    let reply = h.call(tampered).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);

    let order = h.db.fetch_order_by_order_id(&OrderId::from(order_id)).await.unwrap().unwrap();
    assert_eq!(order.payment_status.to_string(), "PENDING");
}

#[actix_web::test]
async fn captured_webhook_marks_the_order_paid() {
    let h = FlowHarness::new().await;
    let saree = h.seed_product("Baluchari", 15_000, 2).await;
    let (order_id, gid) = place_order(&h, saree.id).await;
    let reply = h.call(signed_webhook("payment.captured", &gid, "pay_W3bh00k")).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.value(), json!({ "status": "ok" }));

    let order = h.db.fetch_order_by_order_id(&OrderId::from(order_id.as_str())).await.unwrap().unwrap();
    assert_eq!(order.payment_status.to_string(), "PAID");
    assert_eq!(order.order_status.to_string(), "PLACED");
    assert_eq!(order.gateway_payment_id.as_deref(), Some("pay_W3bh00k"));
    assert!(order.paid_at.is_some());

    // The browser confirmation arriving second is still a success
    let signature = h.gateway.sign(&gid, "pay_W3bh00k");
    let reply = h.call(verify_request(&gid, "pay_W3bh00k", &signature)).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(h.product(saree.id).await.stock, 1);
}

#[actix_web::test]
async fn captured_webhook_without_a_payment_id() {
    let h = FlowHarness::new().await;
    let saree = h.seed_product("Chanderi", 6_400, 3).await;
    let (order_id, gid) = place_order(&h, saree.id).await;
    let reply = h.call(signed_webhook("order.paid", &gid, "")).await;
    assert_eq!(reply.status, StatusCode::OK);

    let order = h.db.fetch_order_by_order_id(&OrderId::from(order_id)).await.unwrap().unwrap();
    assert_eq!(order.payment_status.to_string(), "PAID");
    assert_eq!(order.order_status.to_string(), "PLACED");
    assert_eq!(order.gateway_payment_id, None);
    assert_eq!(h.product(saree.id).await.stock, 2);
}

#[actix_web::test]
async fn failed_webhook_cancels_and_restocks() {
    let h = FlowHarness::new().await;
    let saree = h.seed_product("Sambalpuri", 7_700, 1).await;
    let (order_id, gid) = place_order(&h, saree.id).await;
    let reply = h.call(signed_webhook("payment.failed", &gid, "pay_F41l")).await;
    assert_eq!(reply.status, StatusCode::OK);

    let order = h.db.fetch_order_by_order_id(&OrderId::from(order_id)).await.unwrap().unwrap();
    assert_eq!(order.order_status.to_string(), "CANCELLED");
    assert_eq!(order.payment_status.to_string(), "FAILED");
    assert_eq!(h.product(saree.id).await.stock, 1);
}

#[actix_web::test]
async fn unrelated_webhooks_are_acknowledged() {
    let h = FlowHarness::new().await;
    let reply = h.call(signed_webhook("payment.captured", "order_unknown", "pay_1")).await;
    assert_eq!(reply.status, StatusCode::OK);
    let reply = h.call(signed_webhook("refund.processed", "order_unknown", "pay_1")).await;
    assert_eq!(reply.status, StatusCode::OK);
}

#[actix_web::test]
async fn customers_can_cancel_unpaid_orders() {
    let h = FlowHarness::new().await;
    let saree = h.seed_product("Kota Doria", 3_300, 2).await;
    let (order_id, _) = place_order(&h, saree.id).await;
    assert_eq!(h.product(saree.id).await.stock, 1);

    let uri = format!("/api/orders/{order_id}/cancel");
    let reply = h.call(TestRequest::post().uri(&uri)).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.value()["order"]["order_status"], "CANCELLED");
    assert_eq!(h.product(saree.id).await.stock, 2);

    // Cancelling twice must not return the stock twice
    let reply = h.call(TestRequest::post().uri(&uri)).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(h.product(saree.id).await.stock, 2);

    let reply = h.call(TestRequest::post().uri("/api/orders/TEST-0-000000/cancel")).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn paid_orders_cannot_be_cancelled_by_the_customer() {
    let h = FlowHarness::new().await;
    let saree = h.seed_product("Muga Silk", 21_000, 1).await;
    let (order_id, gid) = place_order(&h, saree.id).await;
    h.call(signed_webhook("payment.captured", &gid, "pay_1")).await;
    let reply = h.call(TestRequest::post().uri(&format!("/api/orders/{order_id}/cancel"))).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(h.product(saree.id).await.stock, 0);
}

#[actix_web::test]
async fn retrying_payment_opens_a_new_gateway_order() {
    let h = FlowHarness::new().await;
    let saree = h.seed_product("Venkatagiri", 5_000, 2).await;
    let (order_id, gid) = place_order(&h, saree.id).await;
    let uri = format!("/api/orders/{order_id}/retry-payment");
    let reply = h.call(TestRequest::post().uri(&uri)).await;
    assert_eq!(reply.status, StatusCode::OK);
    let body = reply.value();
    let new_gid = body["payment"]["gateway_order_id"].as_str().unwrap();
    assert_ne!(new_gid, gid);
    assert_eq!(body["order"]["gateway_order_id"], new_gid);
    assert_eq!(body["order"]["order_status"], "AWAITING_PAYMENT");
    assert_eq!(h.product(saree.id).await.stock, 1, "the reservation is unchanged");

    h.call(TestRequest::post().uri(&format!("/api/orders/{order_id}/cancel"))).await;
    let reply = h.call(TestRequest::post().uri(&uri)).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
}
