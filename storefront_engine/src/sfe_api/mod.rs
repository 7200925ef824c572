//! # Storefront engine public API
//!
//! The `sfe_api` module exposes the programmatic API of the storefront order core. As with the storage traits, the
//! API is split by concern so that callers only need the backend capabilities they actually use.
//!
//! * [`inventory_api`] is the inventory ledger. It is the only code that moves stock.
//! * [`order_flow_api`] is the order lifecycle controller: checkout, payment verification over both channels,
//!   cancellation, payment retry, admin status changes and the expiry sweep.
//! * [`order_query_api`] provides read-only access to orders, including the public tracking projection.
//!
//! The other submodules are support types.
//!
//! # API usage
//!
//! Every API is created by handing it a backend that implements the traits it needs:
//!
//! ```rust,ignore
//! use storefront_engine::{events::EventProducers, OrderFlowApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url("sqlite://data/storefront.db", 25).await?;
//! let api = OrderFlowApi::new(db, my_gateway, EventProducers::default());
//! let result = api.create_order(checkout_request).await?;
//! ```
pub mod errors;
pub mod inventory_api;
pub mod order_flow_api;
pub mod order_objects;
pub mod order_query_api;
