use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
};

use crate::{
    helpers::signature::{payment_signature, verify_payment_signature},
    traits::{GatewayError, GatewayOrder, GatewayOrderRequest, PaymentGateway},
};

pub const TEST_KEY_SECRET: &str = "test_key_secret";

/// An in-process payment gateway. Gateway order ids are `order_test_{n}`, signatures use [`TEST_KEY_SECRET`], and
/// order creation can be switched to fail.
#[derive(Debug, Clone, Default)]
pub struct TestGateway {
    created: Arc<AtomicUsize>,
    failing: Arc<AtomicBool>,
}

impl TestGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of gateway orders created so far.
    pub fn orders_created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// The signature the gateway would hand the customer's browser for this payment.
    pub fn sign(&self, gateway_order_id: &str, gateway_payment_id: &str) -> String {
        payment_signature(TEST_KEY_SECRET, gateway_order_id, gateway_payment_id)
    }
}

impl PaymentGateway for TestGateway {
    async fn create_order(&self, request: GatewayOrderRequest) -> Result<GatewayOrder, GatewayError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(GatewayError::RequestFailed("test gateway is offline".into()));
        }
        let n = self.created.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(GatewayOrder {
            id: format!("order_test_{n}"),
            amount: request.amount,
            currency: request.currency,
            receipt: Some(request.receipt),
        })
    }

    fn verify_payment_signature(&self, gateway_order_id: &str, gateway_payment_id: &str, signature: &str) -> bool {
        verify_payment_signature(TEST_KEY_SECRET, gateway_order_id, gateway_payment_id, signature).is_ok()
    }
}
