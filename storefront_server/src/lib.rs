//! # Storefront server
//! This crate hosts the HTTP front end of the storefront order core. It is responsible for:
//! * Accepting checkouts, payment confirmations, cancellations and payment retries from the storefront.
//! * Receiving payment webhooks from Razorpay and feeding them into the same order lifecycle.
//! * The public order tracking view, and the admin endpoints for orders and stock.
//! * Running the expiry worker that cancels orders that were never paid.
//! * Sending order notifications by email and WhatsApp.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! See [`server::create_server_instance`] for the full route table. In brief:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/api/orders/...` and `/api/payments/verify`: the customer-facing order flow.
//! * `/api/webhooks/razorpay`: payment gateway webhooks. Every delivery must carry a valid HMAC signature.
//! * Admin routes (order listing, status changes, product and stock edits) require the admin bearer token.

pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod expiry_worker;
pub mod helpers;
pub mod integrations;
pub mod middleware;
pub mod notifications;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
