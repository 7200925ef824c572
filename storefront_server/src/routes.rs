//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Every handler here awaits the database or the payment gateway, so
//! they are all async and never block the worker.
//!
//! Handlers are generic over the storage backend and the payment gateway, so that they can be exercised against test
//! doubles. See [`crate::server`] for how they are mounted.
use actix_web::{get, web, HttpResponse, Responder};
use log::*;
use razorpay_tools::{WebhookEvent, WebhookEventType};
use serde_json::json;
use storefront_engine::{
    db_types::{NewProduct, OrderId, OrderRef},
    order_objects::{CheckoutRequest, PaymentConfirmation},
    traits::{InventoryManagement, OrderManagement, PaymentGateway, StorefrontDatabase},
    InventoryApi,
    OrderFlowApi,
    OrderQueryApi,
};

use crate::{
    data_objects::{
        CheckoutResponse,
        GatewayKeyId,
        OrderActionResponse,
        TrackOrderParams,
        UpdateActiveParams,
        UpdateStatusParams,
        UpdateStockParams,
    },
    errors::ServerError,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro.
//
// `route!(name => Method "/path" impl TraitA, TraitB)` declares `NameRoute<TTraitA, TTraitB>` which mounts the handler
// `name::<TTraitA, TTraitB>`. Append `where requires admin` to put the route behind the admin token, or
// `where limited Group` to rate-limit it per client IP.
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ident),+ where requires admin) => {
        $crate::route!(@build $name => $method $path [$($bounds),+]
            wrap $crate::middleware::AdminAuthMiddlewareFactory::new());
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ident),+ where limited $group:ident) => {
        $crate::route!(@build $name => $method $path [$($bounds),+]
            wrap $crate::middleware::RateLimitMiddlewareFactory::new($crate::middleware::RateLimitGroup::$group));
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ident),+) => {
        $crate::route!(@build $name => $method $path [$($bounds),+]);
    };

    (@build $name:ident => $method:ident $path:literal [$($bounds:ident),+] $(wrap $mw:expr)?) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                $( let res = res.wrap($mw); )?
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

fn parse_order_ref(id: &str) -> Result<OrderRef, ServerError> {
    id.trim().parse::<OrderRef>().map_err(|_| ServerError::InvalidRequestPath(format!("'{id}' is not an order id")))
}

//----------------------------------------------   Checkout  ----------------------------------------------------
route!(create_order => Post "/orders" impl StorefrontDatabase, PaymentGateway where limited Payments);
/// Route handler for checkout.
///
/// Reserves stock for the cart, opens a gateway order for online payments and records the order. Cash-on-delivery
/// orders are placed immediately. The response includes what the storefront needs to open the gateway checkout.
///
/// Insufficient stock is reported as `409 Conflict`. A gateway failure is `502 Bad Gateway`, and in both cases no
/// stock remains reserved.
pub async fn create_order<B, G>(
    api: web::Data<OrderFlowApi<B, G>>,
    key_id: web::Data<GatewayKeyId>,
    body: web::Json<CheckoutRequest>,
) -> Result<HttpResponse, ServerError>
where
    B: StorefrontDatabase,
    G: PaymentGateway,
{
    let request = body.into_inner();
    debug!("💻️ Checkout request for {} items from {}", request.items.len(), request.email);
    let result = api.create_order(request).await?;
    info!("💻️ Order {} created ({})", result.order.order_id, result.order.order_status);
    Ok(HttpResponse::Created().json(CheckoutResponse::new(result, &key_id)))
}

//----------------------------------------------   Payments  ----------------------------------------------------
route!(verify_payment => Post "/payments/verify" impl StorefrontDatabase, PaymentGateway where limited Payments);
/// Route handler for the client-side payment confirmation.
///
/// The storefront posts the `(gateway_order_id, gateway_payment_id, signature)` triple it received from the gateway. A
/// valid signature marks the order as paid. Confirming an order that is already paid is a success. An invalid
/// signature cancels the order, returns its stock, and responds with `400 Bad Request`.
pub async fn verify_payment<B, G>(
    api: web::Data<OrderFlowApi<B, G>>,
    body: web::Json<PaymentConfirmation>,
) -> Result<HttpResponse, ServerError>
where
    B: StorefrontDatabase,
    G: PaymentGateway,
{
    let confirmation = body.into_inner();
    debug!("💻️ Payment verification for gateway order {}", confirmation.gateway_order_id);
    let order = api.verify_payment(confirmation).await?;
    Ok(HttpResponse::Ok().json(OrderActionResponse::new("Payment verified successfully", order)))
}

route!(razorpay_webhook => Post "/razorpay" impl StorefrontDatabase, PaymentGateway);
/// Route handler for Razorpay webhooks. The signature has already been checked by the HMAC middleware.
///
/// `payment.captured` and `order.paid` mark the order as paid, `payment.failed` cancels it. Any other event, or an
/// event for an order we don't know, is acknowledged and ignored. Storage errors are reported as `500` so that the
/// gateway redelivers.
pub async fn razorpay_webhook<B, G>(
    api: web::Data<OrderFlowApi<B, G>>,
    body: web::Bytes,
) -> Result<HttpResponse, ServerError>
where
    B: StorefrontDatabase,
    G: PaymentGateway,
{
    let event = serde_json::from_slice::<WebhookEvent>(body.as_ref()).map_err(|e| {
        warn!("💻️ Could not parse webhook payload. {e}");
        ServerError::InvalidRequestBody(e.to_string())
    })?;
    trace!("💻️ Received webhook event {}", event.event);
    let kind = event.event_type();
    match (kind, event.gateway_order_id()) {
        (WebhookEventType::PaymentCaptured | WebhookEventType::OrderPaid, Some(gateway_order_id)) => {
            let payment_id = event.payment_id();
            if payment_id.is_none() {
                warn!("💻️ Webhook {} for gateway order {gateway_order_id} carries no payment id", event.event);
            }
            match api.payment_captured(gateway_order_id, payment_id).await? {
                Some(order) => info!("💻️ Webhook {}: order {} is {}", event.event, order.order_id, order.payment_status),
                None => debug!("💻️ Webhook {} for unknown gateway order {gateway_order_id}", event.event),
            }
        },
        (WebhookEventType::PaymentFailed, Some(gateway_order_id)) => {
            if let Some(order) = api.payment_failed(gateway_order_id).await? {
                info!("💻️ Webhook {}: order {} is {}", event.event, order.order_id, order.order_status);
            }
        },
        (WebhookEventType::Other, _) => debug!("💻️ Ignoring webhook event {}", event.event),
        (_, None) => warn!("💻️ Webhook event {} carries no payment order id. Ignoring.", event.event),
    }
    Ok(HttpResponse::Ok().json(json!({ "status": "ok" })))
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(track_order => Get "/orders/track" impl OrderManagement where limited Tracking);
/// Public order tracking. Both the order id and the email used at checkout are required, and a mismatch is
/// indistinguishable from an unknown order.
pub async fn track_order<B: OrderManagement>(
    api: web::Data<OrderQueryApi<B>>,
    params: web::Query<TrackOrderParams>,
) -> Result<HttpResponse, ServerError> {
    let TrackOrderParams { order_id, email } = params.into_inner();
    if order_id.trim().is_empty() || email.trim().is_empty() {
        return Err(ServerError::ValidationError("Order id and email are required".into()));
    }
    let order_id = OrderId::from(order_id.trim());
    let tracked = api
        .track_order(&order_id, &email)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("No order {order_id} for that email address")))?;
    Ok(HttpResponse::Ok().json(tracked))
}

route!(cancel_order => Post "/orders/{id}/cancel" impl StorefrontDatabase, PaymentGateway);
pub async fn cancel_order<B, G>(
    api: web::Data<OrderFlowApi<B, G>>,
    path: web::Path<String>,
) -> Result<HttpResponse, ServerError>
where
    B: StorefrontDatabase,
    G: PaymentGateway,
{
    let order_ref = parse_order_ref(&path)?;
    let order = api.cancel_order(&order_ref).await?;
    Ok(HttpResponse::Ok().json(OrderActionResponse::new("Order cancelled and stock restored", order)))
}

route!(retry_payment => Post "/orders/{id}/retry-payment" impl StorefrontDatabase, PaymentGateway where limited Payments);
/// Opens a fresh gateway order for an unpaid online order. The stock reservation is unchanged.
pub async fn retry_payment<B, G>(
    api: web::Data<OrderFlowApi<B, G>>,
    key_id: web::Data<GatewayKeyId>,
    path: web::Path<String>,
) -> Result<HttpResponse, ServerError>
where
    B: StorefrontDatabase,
    G: PaymentGateway,
{
    let order_ref = parse_order_ref(&path)?;
    let result = api.retry_payment(&order_ref).await?;
    Ok(HttpResponse::Ok().json(CheckoutResponse::new(result, &key_id)))
}

route!(list_orders => Get "/orders" impl OrderManagement where requires admin);
pub async fn list_orders<B: OrderManagement>(api: web::Data<OrderQueryApi<B>>) -> Result<HttpResponse, ServerError> {
    let orders = api.list_orders().await?;
    trace!("💻️ Listing {} orders", orders.len());
    Ok(HttpResponse::Ok().json(orders))
}

route!(order_by_id => Get "/orders/{id}" impl OrderManagement where requires admin);
/// Fetches a single order by its human-readable order id or its internal id.
pub async fn order_by_id<B: OrderManagement>(
    api: web::Data<OrderQueryApi<B>>,
    path: web::Path<String>,
) -> Result<HttpResponse, ServerError> {
    let order_ref = parse_order_ref(&path)?;
    let order =
        api.fetch_order(&order_ref).await?.ok_or_else(|| ServerError::NoRecordFound(format!("Order {order_ref}")))?;
    Ok(HttpResponse::Ok().json(order))
}

route!(update_order_status => Put "/orders/{id}/status" impl StorefrontDatabase, PaymentGateway where requires admin);
/// Manual status change. Moving an order into `CANCELLED` returns its stock; moving it out of `CANCELLED` reserves the
/// stock again, and is refused if the stock is no longer there.
pub async fn update_order_status<B, G>(
    api: web::Data<OrderFlowApi<B, G>>,
    path: web::Path<String>,
    body: web::Json<UpdateStatusParams>,
) -> Result<HttpResponse, ServerError>
where
    B: StorefrontDatabase,
    G: PaymentGateway,
{
    let order_ref = parse_order_ref(&path)?;
    let status = body.into_inner().status;
    let changed = api.update_order_status(&order_ref, status).await?;
    info!(
        "💻️ Order {} status changed from {} to {}",
        changed.new_order.order_id, changed.old_order.order_status, changed.new_order.order_status
    );
    Ok(HttpResponse::Ok().json(changed.new_order))
}

//----------------------------------------------   Products  ----------------------------------------------------
route!(create_product => Post "/products" impl InventoryManagement where requires admin);
pub async fn create_product<B: InventoryManagement>(
    api: web::Data<InventoryApi<B>>,
    body: web::Json<NewProduct>,
) -> Result<HttpResponse, ServerError> {
    let product = body.into_inner();
    if product.name.trim().is_empty() {
        return Err(ServerError::ValidationError("Product name is required".into()));
    }
    if !product.price.is_positive() {
        return Err(ServerError::ValidationError("Product price must be positive".into()));
    }
    if product.stock < 0 {
        return Err(ServerError::ValidationError("Stock cannot be negative".into()));
    }
    let product = api.create_product(product).await?;
    Ok(HttpResponse::Created().json(product))
}

route!(update_stock => Put "/products/{id}/stock" impl InventoryManagement where requires admin);
pub async fn update_stock<B: InventoryManagement>(
    api: web::Data<InventoryApi<B>>,
    path: web::Path<i64>,
    body: web::Json<UpdateStockParams>,
) -> Result<HttpResponse, ServerError> {
    let stock = body.into_inner().stock;
    if stock < 0 {
        return Err(ServerError::ValidationError("Stock cannot be negative".into()));
    }
    let product = api.set_stock(path.into_inner(), stock).await?;
    Ok(HttpResponse::Ok().json(product))
}

route!(set_product_active => Put "/products/{id}/active" impl InventoryManagement where requires admin);
pub async fn set_product_active<B: InventoryManagement>(
    api: web::Data<InventoryApi<B>>,
    path: web::Path<i64>,
    body: web::Json<UpdateActiveParams>,
) -> Result<HttpResponse, ServerError> {
    let product = api.set_active(path.into_inner(), body.into_inner().active).await?;
    Ok(HttpResponse::Ok().json(product))
}
