//! # Storage and gateway contracts
//!
//! This module defines the behaviour that backends must expose to act as storage for the storefront order core,
//! and the contract for the payment gateway.
//!
//! * [`InventoryManagement`] holds the per-product conditional stock primitives the inventory ledger is built on.
//! * [`OrderManagement`] stores order records and provides the guarded transition primitive
//!   ([`OrderManagement::transition_order`]) that every status change goes through.
//! * [`CustomerManagement`] resolves the customer placing an order.
//! * [`StorefrontDatabase`] ties the three together.
//! * [`PaymentGateway`] creates remote payment intents and verifies client-submitted payment signatures.
mod customer_management;
mod inventory_management;
mod order_management;
mod payment_gateway;
mod storefront_database;

mod data_objects;

pub use customer_management::{CustomerError, CustomerManagement};
pub use data_objects::{ExpiryResult, OrderGuard, OrderUpdate};
pub use inventory_management::{InventoryError, InventoryManagement};
pub use order_management::{OrderManagement, OrderManagementError};
pub use payment_gateway::{GatewayError, GatewayOrder, GatewayOrderRequest, PaymentGateway};
pub use storefront_database::StorefrontDatabase;
