use std::time::Duration;

use actix_web::{
    dev::Server,
    error::{JsonPayloadError, QueryPayloadError},
    http::KeepAlive,
    middleware::Logger,
    web,
    App,
    Error,
    HttpRequest,
    HttpServer,
};
use log::*;
use storefront_common::Secret;
use storefront_engine::{
    events::EventProducers,
    helpers::WEBHOOK_SIGNATURE_HEADER,
    traits::{PaymentGateway, StorefrontDatabase},
    InventoryApi,
    OrderFlowApi,
    OrderQueryApi,
    SqliteDatabase,
};

use crate::{
    config::ServerConfig,
    data_objects::GatewayKeyId,
    errors::ServerError,
    expiry_worker::start_expiry_worker,
    integrations::razorpay::RazorpayGateway,
    middleware::{AdminToken, HmacMiddlewareFactory, RateLimits},
    notifications::create_notification_event_handlers,
    routes::{
        health,
        CancelOrderRoute,
        CreateOrderRoute,
        CreateProductRoute,
        ListOrdersRoute,
        OrderByIdRoute,
        RazorpayWebhookRoute,
        RetryPaymentRoute,
        SetProductActiveRoute,
        TrackOrderRoute,
        UpdateOrderStatusRoute,
        UpdateStockRoute,
        VerifyPaymentRoute,
    },
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.run_migrations().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let gateway = RazorpayGateway::new(config.razorpay.clone())?;
    let handlers = create_notification_event_handlers(config.notifications.clone())
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let worker_api = order_flow_api(&config, db.clone(), gateway.clone(), producers.clone());
    let worker = start_expiry_worker(worker_api, config.expiry_interval, config.unpaid_order_timeout);
    let srv = create_server_instance(config, db, gateway, producers)?;
    let result = srv.await.map_err(|e| ServerError::Unspecified(e.to_string()));
    worker.shutdown().await;
    result
}

fn order_flow_api<B, G>(config: &ServerConfig, db: B, gateway: G, producers: EventProducers) -> OrderFlowApi<B, G> {
    OrderFlowApi::new(db, gateway, producers)
        .with_order_id_prefix(config.order_id_prefix.as_str())
        .with_currency(config.currency.as_str())
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    gateway: RazorpayGateway,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    // Shared by all workers, so that limits hold across the whole server
    let rate_limits = web::Data::new(
        RateLimits::new(config.track_rate_limit, config.payment_rate_limit)
            .with_forwarding(config.use_x_forwarded_for, config.use_forwarded),
    );
    let admin_token = web::Data::new(AdminToken(config.admin_token.clone()));
    let key_id = web::Data::new(GatewayKeyId(config.razorpay.key_id.clone()));
    let webhook_secret = config.razorpay.webhook_secret.clone();
    let webhook_hmac_enabled = !config.disable_webhook_hmac;
    let host = config.host.clone();
    let port = config.port;
    let srv = HttpServer::new(move || {
        let flow_api = order_flow_api(&config, db.clone(), gateway.clone(), producers.clone());
        let query_api = OrderQueryApi::new(db.clone());
        let inventory_api = InventoryApi::new(db.clone());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("sfs::access_log"))
            .app_data(json_config())
            .app_data(query_config())
            .app_data(web::Data::new(flow_api))
            .app_data(web::Data::new(query_api))
            .app_data(web::Data::new(inventory_api))
            .app_data(key_id.clone())
            .app_data(admin_token.clone())
            .app_data(rate_limits.clone())
            .service(health)
            .configure(configure_webhooks::<SqliteDatabase, RazorpayGateway>(
                webhook_secret.clone(),
                webhook_hmac_enabled,
            ))
            .configure(configure_api::<SqliteDatabase, RazorpayGateway>)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    info!("💻️ Server listening on {host}:{port}");
    Ok(srv)
}

/// The gateway webhook routes. Every request must pass the HMAC check before it reaches a handler.
///
/// This must be registered before [`configure_api`], since the `/api` scope would otherwise claim `/api/webhooks`.
pub fn configure_webhooks<B, G>(secret: Secret<String>, enabled: bool) -> impl FnOnce(&mut web::ServiceConfig)
where
    B: StorefrontDatabase + 'static,
    G: PaymentGateway + 'static,
{
    move |cfg| {
        let scope = web::scope("/api/webhooks")
            .wrap(HmacMiddlewareFactory::new(WEBHOOK_SIGNATURE_HEADER, secret, enabled))
            .service(RazorpayWebhookRoute::<B, G>::new());
        cfg.service(scope);
    }
}

/// The storefront and admin routes.
///
/// `/orders/track` is registered ahead of `/orders/{id}`, which would otherwise match it.
pub fn configure_api<B, G>(cfg: &mut web::ServiceConfig)
where
    B: StorefrontDatabase + 'static,
    G: PaymentGateway + 'static,
{
    let scope = web::scope("/api")
        .service(TrackOrderRoute::<B>::new())
        .service(CreateOrderRoute::<B, G>::new())
        .service(ListOrdersRoute::<B>::new())
        .service(CancelOrderRoute::<B, G>::new())
        .service(RetryPaymentRoute::<B, G>::new())
        .service(UpdateOrderStatusRoute::<B, G>::new())
        .service(OrderByIdRoute::<B>::new())
        .service(VerifyPaymentRoute::<B, G>::new())
        .service(CreateProductRoute::<B>::new())
        .service(UpdateStockRoute::<B>::new())
        .service(SetProductActiveRoute::<B>::new());
    cfg.service(scope);
}

pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err: JsonPayloadError, _req: &HttpRequest| -> Error {
        debug!("💻️ Rejecting request body. {err}");
        ServerError::InvalidRequestBody(err.to_string()).into()
    })
}

pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err: QueryPayloadError, _req: &HttpRequest| -> Error {
        debug!("💻️ Rejecting query string. {err}");
        ServerError::ValidationError(err.to_string()).into()
    })
}
