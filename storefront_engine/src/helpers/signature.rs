//! # Payment gateway signatures
//!
//! The gateway authenticates payment confirmations in two independent ways, each with its own secret.
//!
//! ## Client-submitted verification
//!
//! After checkout the customer's browser receives `(gateway_order_id, gateway_payment_id, signature)` from the
//! gateway and posts it back to us. The signature is
//!
//! ```text
//!    hex(HMAC-SHA256(key_secret, "{gateway_order_id}|{gateway_payment_id}"))
//! ```
//!
//! ## Webhooks
//!
//! Server-to-server webhook deliveries carry `hex(HMAC-SHA256(webhook_secret, raw_body))` in the
//! `X-Razorpay-Signature` header. The MAC is taken over the exact bytes received, so the body must be verified before
//! it is parsed.
//!
//! Comparisons are constant-time ([`Mac::verify_slice`]).
use hmac::{Hmac, Mac};
use log::*;
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// The header that carries the webhook signature.
pub const WEBHOOK_SIGNATURE_HEADER: &str = "X-Razorpay-Signature";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("The signature is not valid hex")]
    MalformedSignature,
    #[error("The signature does not match")]
    Mismatch,
}

fn mac_for(secret: &str) -> HmacSha256 {
    // HMAC accepts keys of any length, so this cannot fail
    <HmacSha256 as Mac>::new_from_slice(secret.as_bytes()).unwrap_or_else(|_| unreachable!("HMAC takes any key size"))
}

/// Hex-encoded HMAC-SHA256 of `data` under `secret`.
pub fn calculate_hmac(secret: &str, data: &[u8]) -> String {
    let mut mac = mac_for(secret);
    mac.update(data);
    hex::encode(mac.finalize().into_bytes())
}

/// The message the gateway signs for client-side payment verification.
pub fn payment_signature_message(gateway_order_id: &str, gateway_payment_id: &str) -> String {
    format!("{gateway_order_id}|{gateway_payment_id}")
}

/// Calculates the signature the gateway would produce for the given order/payment pair.
pub fn payment_signature(key_secret: &str, gateway_order_id: &str, gateway_payment_id: &str) -> String {
    calculate_hmac(key_secret, payment_signature_message(gateway_order_id, gateway_payment_id).as_bytes())
}

/// Checks `signature` (hex) against the HMAC of `data` under `secret`, in constant time.
pub fn verify_hmac(secret: &str, data: &[u8], signature: &str) -> Result<(), SignatureError> {
    let expected = hex::decode(signature.trim()).map_err(|_| SignatureError::MalformedSignature)?;
    let mut mac = mac_for(secret);
    mac.update(data);
    mac.verify_slice(&expected).map_err(|_| SignatureError::Mismatch)
}

pub fn verify_payment_signature(
    key_secret: &str,
    gateway_order_id: &str,
    gateway_payment_id: &str,
    signature: &str,
) -> Result<(), SignatureError> {
    let message = payment_signature_message(gateway_order_id, gateway_payment_id);
    let result = verify_hmac(key_secret, message.as_bytes(), signature);
    if let Err(e) = &result {
        warn!("🔐️ Payment signature check failed for gateway order {gateway_order_id}: {e}");
    }
    result
}

pub fn verify_webhook_signature(webhook_secret: &str, raw_body: &[u8], signature: &str) -> Result<(), SignatureError> {
    verify_hmac(webhook_secret, raw_body, signature)
}
