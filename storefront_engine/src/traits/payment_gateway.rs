use serde::{Deserialize, Serialize};
use storefront_common::Paise;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("Could not reach the payment gateway: {0}")]
    RequestFailed(String),
    #[error("The payment gateway rejected the request. {0}")]
    Rejected(String),
    #[error("Unexpected response from the payment gateway: {0}")]
    InvalidResponse(String),
}

/// A request to open a payment intent with the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayOrderRequest {
    /// In minor units (paise)
    pub amount: Paise,
    pub currency: String,
    /// Our own order id, echoed back by the gateway
    pub receipt: String,
}

/// The gateway's own record of a payment intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
    pub amount: Paise,
    pub currency: String,
    pub receipt: Option<String>,
}

/// The engine's view of a payment gateway.
///
/// Creating remote orders is the only outbound call. Payment verification is local: the gateway signs
/// `gateway_order_id|gateway_payment_id` with a shared key secret, and implementations recompute and compare.
#[allow(async_fn_in_trait)]
pub trait PaymentGateway {
    async fn create_order(&self, request: GatewayOrderRequest) -> Result<GatewayOrder, GatewayError>;

    /// Returns true if `signature` is the gateway's signature over the order/payment id pair.
    fn verify_payment_signature(&self, gateway_order_id: &str, gateway_payment_id: &str, signature: &str) -> bool;
}
