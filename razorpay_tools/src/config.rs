use log::*;
use storefront_common::Secret;

pub const DEFAULT_RAZORPAY_API_URL: &str = "https://api.razorpay.com/v1";

#[derive(Debug, Clone, Default)]
pub struct RazorpayConfig {
    pub api_url: String,
    pub key_id: String,
    /// Authenticates API calls and signs client-side payment confirmations.
    pub key_secret: Secret<String>,
    /// Signs webhook deliveries. Distinct from the key secret.
    pub webhook_secret: Secret<String>,
}

impl RazorpayConfig {
    pub fn new_from_env_or_default() -> Self {
        let api_url = std::env::var("SFS_RAZORPAY_API_URL").unwrap_or_else(|_| {
            info!("SFS_RAZORPAY_API_URL not set, using {DEFAULT_RAZORPAY_API_URL}");
            DEFAULT_RAZORPAY_API_URL.to_string()
        });
        let key_id = std::env::var("SFS_RAZORPAY_KEY_ID").unwrap_or_else(|_| {
            warn!("SFS_RAZORPAY_KEY_ID not set, using (probably useless) default");
            "rzp_test_00000000000000".to_string()
        });
        let key_secret = Secret::new(std::env::var("SFS_RAZORPAY_KEY_SECRET").unwrap_or_else(|_| {
            warn!("SFS_RAZORPAY_KEY_SECRET not set, using (probably useless) default");
            "00000000000000".to_string()
        }));
        let webhook_secret = Secret::new(std::env::var("SFS_RAZORPAY_WEBHOOK_SECRET").unwrap_or_else(|_| {
            warn!("SFS_RAZORPAY_WEBHOOK_SECRET not set. Webhook deliveries will fail verification.");
            String::default()
        }));
        Self { api_url: api_url.trim_end_matches('/').to_string(), key_id, key_secret, webhook_secret }
    }
}
