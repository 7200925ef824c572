use actix_web::{http::StatusCode, test::TestRequest, web, App};
use serde_json::Value;
use storefront_engine::{db_types::OrderId, OrderQueryApi};

use super::{
    helpers::{send, ADMIN_TOKEN},
    mocks::{sample_order, MockOrderManager},
};
use crate::{
    middleware::AdminToken,
    routes::{ListOrdersRoute, OrderByIdRoute, TrackOrderRoute},
    server::query_config,
};

fn app(db: MockOrderManager) -> App<
    impl actix_web::dev::ServiceFactory<
        actix_web::dev::ServiceRequest,
        Config = (),
        Response = actix_web::dev::ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(query_config())
        .app_data(web::Data::new(OrderQueryApi::new(db)))
        .app_data(web::Data::new(AdminToken::new(ADMIN_TOKEN)))
        .service(
            web::scope("/api")
                .service(TrackOrderRoute::<MockOrderManager>::new())
                .service(ListOrdersRoute::<MockOrderManager>::new())
                .service(OrderByIdRoute::<MockOrderManager>::new()),
        )
}

#[actix_web::test]
async fn track_order() {
    let _ = env_logger::try_init();
    let mut db = MockOrderManager::new();
    db.expect_fetch_order_for_tracking()
        .withf(|oid, email| oid == &OrderId::from("AVIRA-1718011800000-042317") && email == "Meera@Example.com")
        .times(1)
        .returning(|_, _| Ok(Some(sample_order())));
    let req = TestRequest::get().uri("/api/orders/track?order_id=AVIRA-1718011800000-042317&email=Meera%40Example.com");
    let reply = send(app(db), req).await;
    assert_eq!(reply.status, StatusCode::OK);
    let body = reply.value();
    assert_eq!(body["order_id"], "AVIRA-1718011800000-042317");
    assert_eq!(body["order_status"], "PLACED");
    assert_eq!(body["payment_status"], "PAID");
    assert_eq!(body["total_amount"], 2_500_000);
    assert_eq!(body["items"][0]["name"], "Kanjivaram Silk");
    assert_eq!(body["items"][0]["quantity"], 2);
    // Contact details and internal ids stay private
    let fields = body.as_object().unwrap();
    for private in ["id", "phone", "email", "address", "pincode", "gateway_order_id", "gateway_payment_id"] {
        assert!(!fields.contains_key(private), "tracking view leaks {private}");
    }
}

#[actix_web::test]
async fn track_order_email_mismatch_is_not_found() {
    let _ = env_logger::try_init();
    let mut db = MockOrderManager::new();
    db.expect_fetch_order_for_tracking().times(1).returning(|_, _| Ok(None));
    let req = TestRequest::get().uri("/api/orders/track?order_id=AVIRA-1718011800000-042317&email=someone%40else.com");
    let reply = send(app(db), req).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    let body = reply.value();
    assert!(body["error"].as_str().unwrap().contains("No order"));
}

#[actix_web::test]
async fn track_order_requires_both_fields() {
    let _ = env_logger::try_init();
    let mut db = MockOrderManager::new();
    db.expect_fetch_order_for_tracking().never();
    let reply = send(app(db), TestRequest::get().uri("/api/orders/track?order_id=AVIRA-1")).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    let mut db = MockOrderManager::new();
    db.expect_fetch_order_for_tracking().never();
    let reply = send(app(db), TestRequest::get().uri("/api/orders/track?order_id=AVIRA-1&email=%20")).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn listing_orders_needs_the_admin_token() {
    let _ = env_logger::try_init();
    let mut db = MockOrderManager::new();
    db.expect_fetch_orders().never();
    let reply = send(app(db), TestRequest::get().uri("/api/orders")).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);

    let mut db = MockOrderManager::new();
    db.expect_fetch_orders().never();
    let req = TestRequest::get().uri("/api/orders").insert_header(("Authorization", "Bearer not-the-token"));
    let reply = send(app(db), req).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);

    let mut db = MockOrderManager::new();
    db.expect_fetch_orders().times(1).returning(|| Ok(vec![sample_order()]));
    let req = TestRequest::get().uri("/api/orders").insert_header(("Authorization", format!("Bearer {ADMIN_TOKEN}")));
    let reply = send(app(db), req).await;
    assert_eq!(reply.status, StatusCode::OK);
    let orders: Vec<Value> = reply.json();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["phone"], "9876543210");
}

#[actix_web::test]
async fn order_by_internal_or_public_id() {
    let _ = env_logger::try_init();
    let auth = ("Authorization", format!("Bearer {ADMIN_TOKEN}"));
    let mut db = MockOrderManager::new();
    db.expect_fetch_order_by_id().withf(|id| *id == 7).times(1).returning(|_| Ok(Some(sample_order())));
    let reply = send(app(db), TestRequest::get().uri("/api/orders/7").insert_header(auth.clone())).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.value()["id"], 7);

    let mut db = MockOrderManager::new();
    db.expect_fetch_order_by_order_id()
        .withf(|oid| oid.as_str() == "AVIRA-404")
        .times(1)
        .returning(|_| Ok(None));
    let reply = send(app(db), TestRequest::get().uri("/api/orders/AVIRA-404").insert_header(auth)).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}
