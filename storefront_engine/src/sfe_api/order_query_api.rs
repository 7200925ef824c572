use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{Order, OrderId, OrderRef},
    sfe_api::order_objects::TrackedOrder,
    traits::{OrderManagement, OrderManagementError},
};

/// Read-only access to orders: the public tracking lookup and the admin listings.
pub struct OrderQueryApi<B> {
    db: B,
}

impl<B> Debug for OrderQueryApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderQueryApi")
    }
}

impl<B: Clone> Clone for OrderQueryApi<B> {
    fn clone(&self) -> Self {
        Self { db: self.db.clone() }
    }
}

impl<B> OrderQueryApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> OrderQueryApi<B>
where B: OrderManagement
{
    /// The public tracking lookup. The order id and email act as a shared secret pair: if either is wrong the result
    /// is `None`, and callers cannot tell which one it was.
    pub async fn track_order(&self, order_id: &OrderId, email: &str) -> Result<Option<TrackedOrder>, OrderManagementError> {
        let order = self.db.fetch_order_for_tracking(order_id, email).await?;
        if order.is_none() {
            debug!("🔍️ Tracking lookup for {order_id} did not match");
        }
        Ok(order.map(TrackedOrder::from))
    }

    pub async fn fetch_order(&self, order_ref: &OrderRef) -> Result<Option<Order>, OrderManagementError> {
        match order_ref {
            OrderRef::Id(id) => self.db.fetch_order_by_id(*id).await,
            OrderRef::OrderId(oid) => self.db.fetch_order_by_order_id(oid).await,
        }
    }

    /// All orders, newest first.
    pub async fn list_orders(&self) -> Result<Vec<Order>, OrderManagementError> {
        self.db.fetch_orders().await
    }

    pub async fn orders_for_email(&self, email: &str) -> Result<Vec<Order>, OrderManagementError> {
        self.db.fetch_orders_for_email(email).await
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}
