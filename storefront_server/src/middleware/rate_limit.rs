//! Fixed-window rate limiting per client IP.
//!
//! Each [`RateLimitGroup`] has its own [`RateLimiter`]. A route opts in by wrapping itself in a
//! [`RateLimitMiddlewareFactory`] for its group; the limiters themselves are shared app data ([`RateLimits`]) so that
//! every worker counts against the same windows.

use std::{
    collections::HashMap,
    future::{ready, Ready},
    net::IpAddr,
    rc::Rc,
    sync::{Arc, Mutex, PoisonError},
    time::{Duration, Instant},
};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    web,
    Error,
};
use futures::future::LocalBoxFuture;
use log::{debug, trace, warn};

use crate::{errors::ServerError, helpers::get_remote_ip};

const PRUNE_THRESHOLD: usize = 10_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RateLimitGroup {
    /// Public order tracking lookups
    Tracking,
    /// Checkout, payment verification and payment retries
    Payments,
}

#[derive(Clone, Debug)]
pub struct RateLimiter {
    /// Requests allowed per window. Zero disables the limiter.
    limit: u32,
    window: Duration,
    counts: Arc<Mutex<HashMap<IpAddr, (u32, Instant)>>>,
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self { limit, window, counts: Arc::new(Mutex::new(HashMap::new())) }
    }

    pub fn per_minute(limit: u32) -> Self {
        Self::new(limit, Duration::from_secs(60))
    }

    /// Counts a request from `ip`. Returns `Err(seconds)` with the time until the window resets if the client is over
    /// its limit.
    pub fn check(&self, ip: IpAddr) -> Result<(), u64> {
        if self.limit == 0 {
            return Ok(());
        }
        let now = Instant::now();
        let mut counts = self.counts.lock().unwrap_or_else(PoisonError::into_inner);
        if counts.len() > PRUNE_THRESHOLD {
            let window = self.window;
            counts.retain(|_, (_, start)| now.duration_since(*start) < window);
        }
        let entry = counts.entry(ip).or_insert((0, now));
        if now.duration_since(entry.1) >= self.window {
            *entry = (0, now);
        }
        if entry.0 >= self.limit {
            let remaining = self.window.saturating_sub(now.duration_since(entry.1));
            return Err(remaining.as_secs().max(1));
        }
        entry.0 += 1;
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct RateLimits {
    pub tracking: RateLimiter,
    pub payments: RateLimiter,
    pub use_x_forwarded_for: bool,
    pub use_forwarded: bool,
}

impl RateLimits {
    pub fn new(tracking_per_minute: u32, payments_per_minute: u32) -> Self {
        Self {
            tracking: RateLimiter::per_minute(tracking_per_minute),
            payments: RateLimiter::per_minute(payments_per_minute),
            use_x_forwarded_for: false,
            use_forwarded: false,
        }
    }

    pub fn with_forwarding(mut self, use_x_forwarded_for: bool, use_forwarded: bool) -> Self {
        self.use_x_forwarded_for = use_x_forwarded_for;
        self.use_forwarded = use_forwarded;
        self
    }

    pub fn limiter(&self, group: RateLimitGroup) -> &RateLimiter {
        match group {
            RateLimitGroup::Tracking => &self.tracking,
            RateLimitGroup::Payments => &self.payments,
        }
    }
}

pub struct RateLimitMiddlewareFactory {
    group: RateLimitGroup,
}

impl RateLimitMiddlewareFactory {
    pub fn new(group: RateLimitGroup) -> Self {
        Self { group }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimitMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = RateLimitMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimitMiddlewareService { group: self.group, service: Rc::new(service) }))
    }
}

pub struct RateLimitMiddlewareService<S> {
    group: RateLimitGroup,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for RateLimitMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let group = self.group;
        Box::pin(async move {
            let Some(limits) = req.app_data::<web::Data<RateLimits>>().cloned() else {
                warn!("💻️ No rate limits are registered with the app. {group:?} requests are not limited.");
                return service.call(req).await;
            };
            let ip = get_remote_ip(req.request(), limits.use_x_forwarded_for, limits.use_forwarded);
            match ip {
                Some(ip) => {
                    if let Err(retry_after) = limits.limiter(group).check(ip) {
                        debug!("💻️ {ip} is over the {group:?} rate limit. Retry in {retry_after}s");
                        return Err(ServerError::RateLimited { retry_after }.into());
                    }
                    trace!("💻️ {group:?} request from {ip} is within limits");
                },
                None => warn!("💻️ Could not determine the client IP. {group:?} request is not rate limited."),
            }
            service.call(req).await
        })
    }
}
