//! Server configuration
//!
//! Everything is read from `SFS_`-prefixed environment variables once, at start-up. Values that are present but
//! invalid are reported and replaced by their defaults, so a typo never stops the server from starting. Run the
//! server with `--env` to see the variables it understands.
use std::{env, str::FromStr, time::Duration as StdDuration};

use chrono::Duration;
use log::*;
use razorpay_tools::RazorpayConfig;
use storefront_common::{parse_boolean_flag, Secret, INR_CURRENCY_CODE};
use storefront_engine::helpers::DEFAULT_ORDER_ID_PREFIX;

const DEFAULT_SFS_HOST: &str = "127.0.0.1";
const DEFAULT_SFS_PORT: u16 = 8360;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/storefront.db";
const DEFAULT_EXPIRY_INTERVAL_MINS: u64 = 15;
const DEFAULT_UNPAID_ORDER_TIMEOUT_MINS: i64 = 30;
const DEFAULT_TRACK_RATE_LIMIT: u32 = 5;
const DEFAULT_PAYMENT_RATE_LIMIT: u32 = 10;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Prefix for human-readable order ids, e.g. `AVIRA` in `AVIRA-1718000000000-042317`
    pub order_id_prefix: String,
    pub currency: String,
    pub razorpay: RazorpayConfig,
    /// Bearer token for the admin routes. If empty, admin routes reject every request.
    pub admin_token: Secret<String>,
    /// How often the expiry worker runs.
    pub expiry_interval: StdDuration,
    /// The time before an unpaid order is considered abandoned and cancelled.
    pub unpaid_order_timeout: Duration,
    /// Tracking lookups per client IP per minute
    pub track_rate_limit: u32,
    /// Checkout, payment verification and payment retry requests per client IP per minute
    pub payment_rate_limit: u32,
    /// Skip webhook signature checks. **DANGER**. Only for local testing against a gateway simulator.
    pub disable_webhook_hmac: bool,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the Forwarded header will be used to determine the client's IP address.
    pub use_forwarded: bool,
    pub notifications: NotificationConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_SFS_HOST.to_string(),
            port: DEFAULT_SFS_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            order_id_prefix: DEFAULT_ORDER_ID_PREFIX.to_string(),
            currency: INR_CURRENCY_CODE.to_string(),
            razorpay: RazorpayConfig::default(),
            admin_token: Secret::default(),
            expiry_interval: StdDuration::from_secs(DEFAULT_EXPIRY_INTERVAL_MINS * 60),
            unpaid_order_timeout: Duration::minutes(DEFAULT_UNPAID_ORDER_TIMEOUT_MINS),
            track_rate_limit: DEFAULT_TRACK_RATE_LIMIT,
            payment_rate_limit: DEFAULT_PAYMENT_RATE_LIMIT,
            disable_webhook_hmac: false,
            use_x_forwarded_for: false,
            use_forwarded: false,
            notifications: NotificationConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("SFS_HOST").ok().unwrap_or_else(|| DEFAULT_SFS_HOST.into());
        let port = parse_env("SFS_PORT", DEFAULT_SFS_PORT);
        let database_url = env::var("SFS_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ SFS_DATABASE_URL is not set. Using {DEFAULT_DATABASE_URL}");
            DEFAULT_DATABASE_URL.into()
        });
        let order_id_prefix = env::var("SFS_ORDER_ID_PREFIX").ok().unwrap_or_else(|| DEFAULT_ORDER_ID_PREFIX.into());
        let currency = env::var("SFS_CURRENCY").ok().unwrap_or_else(|| INR_CURRENCY_CODE.into());
        let admin_token = Secret::new(env::var("SFS_ADMIN_TOKEN").ok().unwrap_or_else(|| {
            warn!("🪛️ SFS_ADMIN_TOKEN is not set. All admin routes will be unavailable.");
            String::default()
        }));
        let expiry_mins = parse_env("SFS_EXPIRY_INTERVAL_MINS", DEFAULT_EXPIRY_INTERVAL_MINS).max(1);
        let timeout_mins = parse_env("SFS_UNPAID_ORDER_TIMEOUT_MINS", DEFAULT_UNPAID_ORDER_TIMEOUT_MINS);
        let timeout_mins = if timeout_mins > 0 {
            timeout_mins
        } else {
            error!("🪛️ SFS_UNPAID_ORDER_TIMEOUT_MINS must be positive. Using {DEFAULT_UNPAID_ORDER_TIMEOUT_MINS}");
            DEFAULT_UNPAID_ORDER_TIMEOUT_MINS
        };
        let disable_webhook_hmac = parse_boolean_flag(env::var("SFS_DISABLE_WEBHOOK_HMAC").ok(), false);
        if disable_webhook_hmac {
            warn!("🪛️ Webhook signature checks are DISABLED. Anyone can mark orders as paid. Never do this in production.");
        }
        Self {
            host,
            port,
            database_url,
            order_id_prefix,
            currency,
            razorpay: RazorpayConfig::new_from_env_or_default(),
            admin_token,
            expiry_interval: StdDuration::from_secs(expiry_mins * 60),
            unpaid_order_timeout: Duration::minutes(timeout_mins),
            track_rate_limit: parse_env("SFS_TRACK_RATE_LIMIT", DEFAULT_TRACK_RATE_LIMIT),
            payment_rate_limit: parse_env("SFS_PAYMENT_RATE_LIMIT", DEFAULT_PAYMENT_RATE_LIMIT),
            disable_webhook_hmac,
            use_x_forwarded_for: parse_boolean_flag(env::var("SFS_USE_X_FORWARDED_FOR").ok(), false),
            use_forwarded: parse_boolean_flag(env::var("SFS_USE_FORWARDED").ok(), false),
            notifications: NotificationConfig::from_env_or_default(),
        }
    }
}

fn parse_env<T>(key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display + Copy,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(s) => s.trim().parse::<T>().unwrap_or_else(|e| {
            error!("🪛️ {s} is not a valid value for {key}. {e} Using the default, {default}, instead.");
            default
        }),
        Err(_) => default,
    }
}

#[derive(Clone, Debug, Default)]
pub struct NotificationConfig {
    pub email: Option<EmailConfig>,
    pub whatsapp: Option<WhatsAppConfig>,
}

/// An HTTP email relay that accepts `{from, to, subject, html}` as JSON.
#[derive(Clone, Debug)]
pub struct EmailConfig {
    pub api_url: String,
    pub api_key: Secret<String>,
    pub from: String,
    /// Receives a copy of every order notification, if set.
    pub admin_email: Option<String>,
}

#[derive(Clone, Debug)]
pub struct WhatsAppConfig {
    pub api_url: String,
    pub token: Secret<String>,
    /// Store owner's number. Order alerts are sent here.
    pub admin_phone: String,
}

impl NotificationConfig {
    pub fn from_env_or_default() -> Self {
        let email = if parse_boolean_flag(env::var("SFS_ENABLE_EMAIL").ok(), false) {
            match (env::var("SFS_EMAIL_API_URL"), env::var("SFS_EMAIL_FROM")) {
                (Ok(api_url), Ok(from)) => Some(EmailConfig {
                    api_url,
                    api_key: Secret::new(env::var("SFS_EMAIL_API_KEY").unwrap_or_default()),
                    from,
                    admin_email: env::var("SFS_ADMIN_EMAIL").ok(),
                }),
                _ => {
                    warn!("🪛️ SFS_ENABLE_EMAIL is set, but SFS_EMAIL_API_URL or SFS_EMAIL_FROM is missing. Emails are off.");
                    None
                },
            }
        } else {
            info!("🪛️ Order emails are disabled");
            None
        };
        let whatsapp = match (env::var("SFS_WHATSAPP_API_URL"), env::var("SFS_WHATSAPP_TOKEN")) {
            (Ok(api_url), Ok(token)) => match env::var("SFS_WHATSAPP_ADMIN_PHONE") {
                Ok(admin_phone) => Some(WhatsAppConfig { api_url, token: Secret::new(token), admin_phone }),
                Err(_) => {
                    warn!("🪛️ SFS_WHATSAPP_ADMIN_PHONE is not set. WhatsApp alerts are off.");
                    None
                },
            },
            _ => {
                info!("🪛️ WhatsApp alerts are not configured");
                None
            },
        };
        Self { email, whatsapp }
    }
}
