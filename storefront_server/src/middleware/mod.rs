mod admin;
mod hmac;
mod rate_limit;

pub use admin::{AdminAuthMiddlewareFactory, AdminAuthMiddlewareService, AdminToken};
pub use hmac::{HmacMiddlewareFactory, HmacMiddlewareService};
pub use rate_limit::{RateLimitGroup, RateLimitMiddlewareFactory, RateLimitMiddlewareService, RateLimiter, RateLimits};
