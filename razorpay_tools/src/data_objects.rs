use serde::{Deserialize, Serialize};
use serde_json::Value;

//--------------------------------------   Orders   ----------------------------------------------------------

/// Body of `POST /orders`. `amount` is in the smallest currency unit (paise for INR).
#[derive(Debug, Clone, Serialize)]
pub struct NewRazorpayOrder {
    pub amount: i64,
    pub currency: String,
    pub receipt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RazorpayOrder {
    pub id: String,
    pub amount: i64,
    #[serde(default)]
    pub amount_paid: i64,
    #[serde(default)]
    pub amount_due: i64,
    pub currency: String,
    pub receipt: Option<String>,
    /// `created`, `attempted` or `paid`
    pub status: String,
    #[serde(default)]
    pub attempts: i64,
    pub created_at: i64,
}

//--------------------------------------   Payments   --------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct RazorpayPayment {
    #[serde(default)]
    pub id: String,
    pub order_id: Option<String>,
    pub amount: i64,
    pub currency: String,
    /// `created`, `authorized`, `captured`, `refunded` or `failed`
    pub status: String,
    pub method: Option<String>,
    pub email: Option<String>,
    pub contact: Option<String>,
    pub error_code: Option<String>,
    pub error_description: Option<String>,
    #[serde(default)]
    pub created_at: i64,
}

//--------------------------------------   Webhooks   --------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookEventType {
    PaymentCaptured,
    PaymentFailed,
    OrderPaid,
    /// Anything else. These are acknowledged and ignored.
    Other,
}

impl From<&str> for WebhookEventType {
    fn from(value: &str) -> Self {
        match value {
            "payment.captured" => Self::PaymentCaptured,
            "payment.failed" => Self::PaymentFailed,
            "order.paid" => Self::OrderPaid,
            _ => Self::Other,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentEntity {
    pub entity: RazorpayPayment,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookPayload {
    pub payment: Option<PaymentEntity>,
}

/// A webhook delivery. Only the fields the storefront acts on are typed; the rest of the payload is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub event: String,
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub payload: WebhookPayload,
    #[serde(default)]
    pub created_at: i64,
}

impl WebhookEvent {
    pub fn event_type(&self) -> WebhookEventType {
        WebhookEventType::from(self.event.as_str())
    }

    pub fn payment(&self) -> Option<&RazorpayPayment> {
        self.payload.payment.as_ref().map(|p| &p.entity)
    }

    /// The gateway order the payment entity belongs to, if the delivery carries one.
    pub fn gateway_order_id(&self) -> Option<&str> {
        self.payment().and_then(|p| p.order_id.as_deref())
    }

    /// The payment id, if the delivery carries a non-empty one.
    pub fn payment_id(&self) -> Option<&str> {
        self.payment().map(|p| p.id.as_str()).filter(|id| !id.is_empty())
    }
}
