use actix_web::{
    body::to_bytes,
    http::{header::HeaderMap, StatusCode},
    test,
    test::TestRequest,
    web,
    App,
};
use log::debug;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use storefront_common::{Paise, Secret};
use storefront_engine::{
    db_types::{NewProduct, Product},
    events::EventProducers,
    helpers::{calculate_hmac, WEBHOOK_SIGNATURE_HEADER},
    test_utils::{prepare_env::new_test_db, TestGateway},
    InventoryApi,
    OrderFlowApi,
    OrderQueryApi,
    SqliteDatabase,
};

use crate::{
    data_objects::GatewayKeyId,
    middleware::{AdminToken, RateLimits},
    server::{configure_api, configure_webhooks, json_config, query_config},
};

pub const ADMIN_TOKEN: &str = "admin-test-token-do-not-reuse";
pub const WEBHOOK_SECRET: &str = "webhook-test-secret";
pub const KEY_ID: &str = "rzp_test_key_id";
pub const CLIENT_IP: &str = "203.0.113.7:40000";

/// A response, with the body read out.
pub struct Reply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl Reply {
    pub fn json<T: DeserializeOwned>(&self) -> T {
        serde_json::from_str(&self.body).unwrap_or_else(|e| panic!("Unexpected body '{}': {e}", self.body))
    }

    pub fn value(&self) -> Value {
        self.json()
    }
}

/// Runs `req` against `app`. Errors raised by middleware are rendered the way the server
/// would render them.
pub async fn send<F>(app: App<F>, req: TestRequest) -> Reply
where
    F: actix_web::dev::ServiceFactory<
            actix_web::dev::ServiceRequest,
            Config = (),
            Response = actix_web::dev::ServiceResponse,
            Error = actix_web::Error,
            InitError = (),
        > + 'static,
{
    let service = test::init_service(app).await;
    let res = match test::try_call_service(&service, req.to_request()).await {
        Ok(res) => res.into_parts().1.map_into_boxed_body(),
        Err(e) => e.error_response(),
    };
    let status = res.status();
    let headers = res.headers().clone();
    let body = to_bytes(res.into_body()).await.map(|b| String::from_utf8_lossy(&b).into_owned()).unwrap_or_default();
    debug!("Response: {status} {body}");
    Reply { status, headers, body }
}

/// A real SQLite store and the in-process gateway, wired up the way the server wires the production stack.
pub struct FlowHarness {
    pub db: SqliteDatabase,
    pub gateway: TestGateway,
    pub rate_limits: web::Data<RateLimits>,
}

impl FlowHarness {
    pub async fn new() -> Self {
        Self::with_rate_limits(RateLimits::new(0, 0)).await
    }

    pub async fn with_rate_limits(limits: RateLimits) -> Self {
        let _ = env_logger::try_init();
        let db = new_test_db().await;
        Self { db, gateway: TestGateway::new(), rate_limits: web::Data::new(limits) }
    }

    pub async fn call(&self, req: TestRequest) -> Reply {
        let flow_api = OrderFlowApi::new(self.db.clone(), self.gateway.clone(), EventProducers::default())
            .with_order_id_prefix("TEST");
        let app = App::new()
            .app_data(json_config())
            .app_data(query_config())
            .app_data(web::Data::new(flow_api))
            .app_data(web::Data::new(OrderQueryApi::new(self.db.clone())))
            .app_data(web::Data::new(InventoryApi::new(self.db.clone())))
            .app_data(web::Data::new(GatewayKeyId(KEY_ID.into())))
            .app_data(web::Data::new(AdminToken::new(ADMIN_TOKEN)))
            .app_data(self.rate_limits.clone())
            .configure(configure_webhooks::<SqliteDatabase, TestGateway>(Secret::new(WEBHOOK_SECRET.into()), true))
            .configure(configure_api::<SqliteDatabase, TestGateway>);
        send(app, req.peer_addr(CLIENT_IP.parse().expect("valid socket address"))).await
    }

    pub async fn seed_product(&self, name: &str, rupees: i64, stock: i64) -> Product {
        InventoryApi::new(self.db.clone())
            .create_product(NewProduct::new(name, Paise::from_rupees(rupees), stock))
            .await
            .expect("Could not create product")
    }

    pub async fn product(&self, id: i64) -> Product {
        InventoryApi::new(self.db.clone()).fetch_product(id).await.unwrap().expect("product exists")
    }

    /// Places an online order for `quantity` units of `product` and returns the response body.
    pub async fn checkout(&self, product: &Product, quantity: i64) -> Reply {
        let body = checkout_body(product, quantity, "ONLINE");
        self.call(TestRequest::post().uri("/api/orders").set_json(body)).await
    }
}

pub fn checkout_body(product: &Product, quantity: i64, method: &str) -> Value {
    json!({
        "customer_name": "Meera Iyer",
        "email": "Meera@Example.com",
        "phone": "9876543210",
        "shipping_address": {
            "address": "12 Temple Street, Mylapore",
            "city": "Chennai",
            "state": "Tamil Nadu",
            "pincode": "600004"
        },
        "items": [{ "product_id": product.id, "quantity": quantity }],
        "total_amount": product.price.value() * quantity,
        "payment_method": method
    })
}

pub fn admin_request(req: TestRequest) -> TestRequest {
    req.insert_header(("Authorization", format!("Bearer {ADMIN_TOKEN}")))
}

/// A webhook delivery for `event`, signed with the test webhook secret.
pub fn signed_webhook(event: &str, gateway_order_id: &str, payment_id: &str) -> TestRequest {
    let body = webhook_body(event, gateway_order_id, payment_id);
    let signature = calculate_hmac(WEBHOOK_SECRET, body.as_bytes());
    TestRequest::post()
        .uri("/api/webhooks/razorpay")
        .insert_header(("Content-Type", "application/json"))
        .insert_header((WEBHOOK_SIGNATURE_HEADER, signature))
        .set_payload(body)
}

pub fn webhook_body(event: &str, gateway_order_id: &str, payment_id: &str) -> String {
    json!({
        "entity": "event",
        "account_id": "acc_TestAccount01",
        "event": event,
        "contains": ["payment"],
        "payload": {
            "payment": {
                "entity": {
                    "id": payment_id,
                    "entity": "payment",
                    "amount": 1_250_000,
                    "currency": "INR",
                    "status": if event == "payment.failed" { "failed" } else { "captured" },
                    "order_id": gateway_order_id,
                    "method": "upi",
                    "email": "meera@example.com",
                    "contact": "+919876543210",
                    "created_at": 1_718_000_000
                }
            }
        },
        "created_at": 1_718_000_001
    })
    .to_string()
}
