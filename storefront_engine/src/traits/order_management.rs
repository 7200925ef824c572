use chrono::Duration;
use thiserror::Error;

use crate::{
    db_types::{NewOrder, Order, OrderId},
    traits::data_objects::{OrderGuard, OrderUpdate},
};

#[derive(Debug, Clone, Error)]
pub enum OrderManagementError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Cannot insert order, since it already exists with id {0}")]
    OrderAlreadyExists(OrderId),
    #[error("The order update is empty")]
    EmptyUpdate,
}

impl From<sqlx::Error> for OrderManagementError {
    fn from(e: sqlx::Error) -> Self {
        OrderManagementError::DatabaseError(e.to_string())
    }
}

/// Storage for order records and their line items.
///
/// All the `fetch_*` methods return orders with their `items` populated.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    /// Stores a new order and its line items in a single atomic transaction.
    async fn insert_order(&self, order: NewOrder) -> Result<Order, OrderManagementError>;

    async fn fetch_order_by_id(&self, id: i64) -> Result<Option<Order>, OrderManagementError>;

    async fn fetch_order_by_order_id(&self, order_id: &OrderId) -> Result<Option<Order>, OrderManagementError>;

    async fn fetch_order_by_gateway_order_id(
        &self,
        gateway_order_id: &str,
    ) -> Result<Option<Order>, OrderManagementError>;

    /// Looks an order up by its order id and the (case-insensitive) email address it was placed with.
    async fn fetch_order_for_tracking(
        &self,
        order_id: &OrderId,
        email: &str,
    ) -> Result<Option<Order>, OrderManagementError>;

    /// All orders, newest first.
    async fn fetch_orders(&self) -> Result<Vec<Order>, OrderManagementError>;

    /// All orders placed with the given email address, newest first.
    async fn fetch_orders_for_email(&self, email: &str) -> Result<Vec<Order>, OrderManagementError>;

    /// Orders that are still `AWAITING_PAYMENT` with a `PENDING` payment, and were created more than `older_than`
    /// ago. Oldest first.
    async fn fetch_stale_orders(&self, older_than: Duration) -> Result<Vec<Order>, OrderManagementError>;

    /// The single guarded transition primitive for orders.
    ///
    /// Applies `update` to the order with internal id `id` if, and only if, the order currently satisfies `guard`.
    /// The check and the write must happen as one conditional write.
    ///
    /// Returns the updated order, or `None` if no row matched. `None` is not an error: it means another writer got
    /// there first (or the order does not exist), and callers decide what that means for them.
    async fn transition_order(
        &self,
        id: i64,
        guard: &OrderGuard,
        update: &OrderUpdate,
    ) -> Result<Option<Order>, OrderManagementError>;
}
