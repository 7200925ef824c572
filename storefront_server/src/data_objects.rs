use serde::{Deserialize, Serialize};
use storefront_common::Paise;
use storefront_engine::{
    db_types::{Order, OrderStatusType},
    order_objects::CheckoutResult,
};

/// The publishable gateway key id. The storefront needs it to open the gateway's checkout widget.
#[derive(Debug, Clone)]
pub struct GatewayKeyId(pub String);

/// What the storefront needs to open the gateway checkout for an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub key_id: String,
    pub gateway_order_id: String,
    pub amount: Paise,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutResponse {
    pub order: Order,
    /// `None` for cash-on-delivery orders
    pub payment: Option<PaymentIntent>,
}

impl CheckoutResponse {
    pub fn new(result: CheckoutResult, key_id: &GatewayKeyId) -> Self {
        let payment = result.gateway_order.map(|g| PaymentIntent {
            key_id: key_id.0.clone(),
            gateway_order_id: g.id,
            amount: g.amount,
            currency: g.currency,
        });
        Self { order: result.order, payment }
    }
}

/// The result of a customer action on an order (payment verification, cancellation).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderActionResponse {
    pub success: bool,
    pub message: String,
    pub order: Order,
}

impl OrderActionResponse {
    pub fn new<S: Into<String>>(message: S, order: Order) -> Self {
        Self { success: true, message: message.into(), order }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackOrderParams {
    pub order_id: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusParams {
    pub status: OrderStatusType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStockParams {
    pub stock: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateActiveParams {
    pub active: bool,
}
