//! Razorpay as the engine's [`PaymentGateway`].
use log::*;
use razorpay_tools::{RazorpayApi, RazorpayApiError, RazorpayConfig};
use storefront_common::Paise;
use storefront_engine::{
    helpers::verify_payment_signature,
    traits::{GatewayError, GatewayOrder, GatewayOrderRequest, PaymentGateway},
};

use crate::errors::ServerError;

#[derive(Clone)]
pub struct RazorpayGateway {
    api: RazorpayApi,
}

impl RazorpayGateway {
    pub fn new(config: RazorpayConfig) -> Result<Self, ServerError> {
        let api = RazorpayApi::new(config).map_err(|e| ServerError::InitializeError(e.to_string()))?;
        Ok(Self { api })
    }

    pub fn api(&self) -> &RazorpayApi {
        &self.api
    }
}

impl PaymentGateway for RazorpayGateway {
    async fn create_order(&self, request: GatewayOrderRequest) -> Result<GatewayOrder, GatewayError> {
        let order =
            self.api.create_order(request.amount, &request.currency, &request.receipt).await.map_err(gateway_error)?;
        if order.amount != request.amount.value() {
            warn!(
                "💳️ Razorpay order {} was created for {} paise, but {} was requested",
                order.id,
                order.amount,
                request.amount.value()
            );
        }
        Ok(GatewayOrder {
            id: order.id,
            amount: Paise::from(order.amount),
            currency: order.currency,
            receipt: order.receipt,
        })
    }

    fn verify_payment_signature(&self, gateway_order_id: &str, gateway_payment_id: &str, signature: &str) -> bool {
        let secret = self.api.config().key_secret.reveal();
        verify_payment_signature(secret, gateway_order_id, gateway_payment_id, signature).is_ok()
    }
}

fn gateway_error(e: RazorpayApiError) -> GatewayError {
    match e {
        e if e.is_rejection() => GatewayError::Rejected(e.to_string()),
        RazorpayApiError::InvalidRequest(s) => GatewayError::Rejected(s),
        RazorpayApiError::JsonError(s) => GatewayError::InvalidResponse(s),
        e => GatewayError::RequestFailed(e.to_string()),
    }
}
