use actix_web::{http::StatusCode, test::TestRequest};
use serde_json::{json, Value};

use super::helpers::{admin_request, signed_webhook, FlowHarness};

async fn paid_order(h: &FlowHarness, product_id: i64) -> String {
    let product = h.product(product_id).await;
    let body: Value = h.checkout(&product, 1).await.value();
    let gid = body["payment"]["gateway_order_id"].as_str().unwrap().to_string();
    h.call(signed_webhook("payment.captured", &gid, "pay_admin")).await;
    body["order"]["order_id"].as_str().unwrap().to_string()
}

fn status_request(order_id: &str, status: &str) -> TestRequest {
    admin_request(TestRequest::put().uri(&format!("/api/orders/{order_id}/status")).set_json(json!({ "status": status })))
}

#[actix_web::test]
async fn admin_routes_reject_missing_tokens() {
    let h = FlowHarness::new().await;
    let saree = h.seed_product("Maheshwari", 2_800, 4).await;
    let order_id = paid_order(&h, saree.id).await;

    let reply = h.call(TestRequest::get().uri("/api/orders")).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    let req = TestRequest::put().uri(&format!("/api/orders/{order_id}/status")).set_json(json!({ "status": "SHIPPED" }));
    assert_eq!(h.call(req).await.status, StatusCode::UNAUTHORIZED);
    let req = TestRequest::post().uri("/api/products").set_json(json!({ "name": "X", "price": 100, "stock": 1 }));
    assert_eq!(h.call(req).await.status, StatusCode::UNAUTHORIZED);
    let req = TestRequest::put().uri(&format!("/api/products/{}/stock", saree.id)).set_json(json!({ "stock": 0 }));
    assert_eq!(h.call(req).await.status, StatusCode::UNAUTHORIZED);
    assert_eq!(h.product(saree.id).await.stock, 3);

    let reply = h.call(admin_request(TestRequest::get().uri("/api/orders"))).await;
    assert_eq!(reply.status, StatusCode::OK);
    let orders: Vec<Value> = reply.json();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["order_id"], order_id.as_str());
    assert_eq!(orders[0]["items"][0]["name"], "Maheshwari");
}

#[actix_web::test]
async fn fulfilment_status_changes() {
    let h = FlowHarness::new().await;
    let saree = h.seed_product("Phulkari", 4_400, 2).await;
    let order_id = paid_order(&h, saree.id).await;

    for status in ["CONFIRMED", "SHIPPED", "DELIVERED"] {
        let reply = h.call(status_request(&order_id, status)).await;
        assert_eq!(reply.status, StatusCode::OK);
        let body = reply.value();
        assert_eq!(body["order_status"], status);
        assert_eq!(body["payment_status"], "PAID");
    }
    let reply = h.call(status_request(&order_id, "LOST_IN_TRANSIT")).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(h.product(saree.id).await.stock, 1);
}

#[actix_web::test]
async fn cancelling_and_resuming_moves_stock() {
    let h = FlowHarness::new().await;
    let saree = h.seed_product("Ilkal", 3_900, 1).await;
    let order_id = paid_order(&h, saree.id).await;
    assert_eq!(h.product(saree.id).await.stock, 0);

    let reply = h.call(status_request(&order_id, "CANCELLED")).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(h.product(saree.id).await.stock, 1);

    // The product sold out, so it stays off sale until it is reactivated
    assert!(!h.product(saree.id).await.is_active);
    let reply = h.call(status_request(&order_id, "PLACED")).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert!(reply.value()["error"].as_str().unwrap().contains("insufficient stock"));
    let order = h.call(admin_request(TestRequest::get().uri(&format!("/api/orders/{order_id}")))).await.value();
    assert_eq!(order["order_status"], "CANCELLED");
    assert_eq!(h.product(saree.id).await.stock, 1);

    let active_uri = format!("/api/products/{}/active", saree.id);
    h.call(admin_request(TestRequest::put().uri(&active_uri).set_json(json!({ "active": true })))).await;
    let reply = h.call(status_request(&order_id, "PLACED")).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.value()["order_status"], "PLACED");
    assert_eq!(h.product(saree.id).await.stock, 0);
}

#[actix_web::test]
async fn product_management() {
    let h = FlowHarness::new().await;
    let req = admin_request(TestRequest::post().uri("/api/products").set_json(json!({
        "name": "Kanjivaram Silk",
        "price": 1_250_000,
        "stock": 3
    })));
    let reply = h.call(req).await;
    assert_eq!(reply.status, StatusCode::CREATED);
    let product = reply.value();
    assert_eq!(product["is_active"], true);
    let id = product["id"].as_i64().unwrap();

    let req = admin_request(TestRequest::post().uri("/api/products").set_json(json!({
        "name": "Free saree",
        "price": 0,
        "stock": 3
    })));
    assert_eq!(h.call(req).await.status, StatusCode::BAD_REQUEST);

    let stock_uri = format!("/api/products/{id}/stock");
    let reply = h.call(admin_request(TestRequest::put().uri(&stock_uri).set_json(json!({ "stock": 0 })))).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.value()["stock"], 0);
    assert_eq!(reply.value()["is_active"], false);

    let reply = h.call(admin_request(TestRequest::put().uri(&stock_uri).set_json(json!({ "stock": -2 })))).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    let reply = h.call(admin_request(TestRequest::put().uri(&stock_uri).set_json(json!({ "stock": 6 })))).await;
    assert_eq!(reply.value()["stock"], 6);
    assert_eq!(reply.value()["is_active"], false, "restocking does not reactivate a product");

    let active_uri = format!("/api/products/{id}/active");
    let reply = h.call(admin_request(TestRequest::put().uri(&active_uri).set_json(json!({ "active": true })))).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.value()["is_active"], true);

    let reply =
        h.call(admin_request(TestRequest::put().uri("/api/products/9999/stock").set_json(json!({ "stock": 1 })))).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}
