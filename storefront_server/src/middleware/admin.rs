//! Admin access middleware.
//!
//! Wraps a route so that it only runs when the request carries `Authorization: Bearer <SFS_ADMIN_TOKEN>`. The token
//! is taken from the [`AdminToken`] registered as app data. If no token is configured, every admin request is refused.

use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header,
    web,
    Error,
};
use futures::future::LocalBoxFuture;
use log::{trace, warn};
use storefront_common::Secret;

use crate::errors::ServerError;

#[derive(Clone, Debug, Default)]
pub struct AdminToken(pub Secret<String>);

impl AdminToken {
    pub fn new<S: Into<String>>(token: S) -> Self {
        Self(Secret::new(token.into()))
    }

    /// Compares in time that depends only on the length of the presented token.
    pub fn matches(&self, presented: &str) -> bool {
        let expected = self.0.reveal().as_bytes();
        let presented = presented.as_bytes();
        if expected.is_empty() || expected.len() != presented.len() {
            return false;
        }
        expected.iter().zip(presented).fold(0u8, |acc, (a, b)| acc | (a ^ b)) == 0
    }
}

#[derive(Default)]
pub struct AdminAuthMiddlewareFactory;

impl AdminAuthMiddlewareFactory {
    pub fn new() -> Self {
        Self
    }
}

impl<S, B> Transform<S, ServiceRequest> for AdminAuthMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = AdminAuthMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AdminAuthMiddlewareService { service: Rc::new(service) }))
    }
}

pub struct AdminAuthMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AdminAuthMiddlewareService<S>
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
        Box::pin(async move {
            let token = req.app_data::<web::Data<AdminToken>>().cloned().ok_or_else(|| {
                warn!("🔐️ No admin token is registered with the app. Refusing admin request.");
                ServerError::Unauthorized("Admin access is not configured".into())
            })?;
            let presented = req
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
                .map(str::trim)
                .ok_or_else(|| ServerError::Unauthorized("Missing bearer token".into()))?;
            if token.matches(presented) {
                trace!("🔐️ Admin request authorized for {}", req.path());
                service.call(req).await
            } else {
                warn!("🔐️ Invalid admin token presented for {}", req.path());
                Err(ServerError::Unauthorized("Invalid bearer token".into()).into())
            }
        })
    }
}
