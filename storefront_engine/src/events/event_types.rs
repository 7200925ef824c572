use serde::{Deserialize, Serialize};

use crate::db_types::{Order, OrderStatusType, PaymentStatus};

/// Published exactly once per order, by whichever writer won the PAID transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPaidEvent {
    pub order: Order,
}

impl OrderPaidEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// A cash-on-delivery order was placed. There is no payment step, so this is the only notification it gets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPlacedEvent {
    pub order: Order,
}

impl OrderPlacedEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// The order was cancelled (by the customer, an admin, a failed payment or the expiry sweep) and its stock returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderAnnulledEvent {
    pub order: Order,
    pub status: OrderStatusType,
    pub payment_status: PaymentStatus,
    pub reason: String,
}

impl OrderAnnulledEvent {
    pub fn new<S: Into<String>>(order: Order, reason: S) -> Self {
        let status = order.order_status;
        let payment_status = order.payment_status;
        Self { order, status, payment_status, reason: reason.into() }
    }
}
