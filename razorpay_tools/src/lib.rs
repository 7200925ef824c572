//! A thin client for the parts of the Razorpay REST API the storefront uses, and the wire types for its webhooks.
mod api;
mod config;
mod error;

mod data_objects;
mod helpers;

pub use api::RazorpayApi;
pub use config::RazorpayConfig;
pub use data_objects::{
    NewRazorpayOrder,
    PaymentEntity,
    RazorpayOrder,
    RazorpayPayment,
    WebhookEvent,
    WebhookEventType,
    WebhookPayload,
};
pub use error::RazorpayApiError;
pub use helpers::{receipt_for, MAX_RECEIPT_LENGTH};
