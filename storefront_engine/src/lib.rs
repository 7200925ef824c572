//! Storefront Engine
//!
//! The storefront engine is the order, payment and stock core of an online saree store. It reserves inventory at
//! checkout, opens payment intents with the payment gateway, reconciles payment confirmations arriving over two
//! racing channels (the customer's browser and the gateway's webhooks) and expires orders that are never paid.
//!
//! The library is divided into these main sections:
//! 1. Storage contracts ([`mod@traits`]) and the SQLite backend that implements them. Every order status change goes
//!    through a single guarded-transition primitive, and every stock movement through a conditional update, so
//!    concurrent writers never need in-process locks.
//! 2. The public API. [`InventoryApi`] is the inventory ledger, [`OrderFlowApi`] drives the order lifecycle and
//!    [`OrderQueryApi`] provides read access and the public tracking view.
//!
//! The engine also emits events when orders are paid, placed or annulled. Subscribe with
//! [`events::EventHooks`] to send notifications without holding up the request that triggered them.
pub mod db_types;
pub mod events;
pub mod helpers;
mod sfe_api;
pub mod traits;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use sfe_api::{
    errors::OrderFlowError,
    inventory_api::InventoryApi,
    order_flow_api::OrderFlowApi,
    order_objects,
    order_query_api::OrderQueryApi,
};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
