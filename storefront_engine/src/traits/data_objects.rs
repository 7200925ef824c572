use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db_types::{Order, OrderId, OrderStatusType, PaymentStatus};

/// The precondition for a guarded order transition.
///
/// A transition only takes effect if the order row matches *every* clause in the guard at the moment the update is
/// applied. Backends must evaluate the guard and apply the update as a single conditional write, so that concurrent
/// writers (client verification, webhook, reaper, admin) can never both win.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderGuard {
    pub order_status_in: Vec<OrderStatusType>,
    pub order_status_not: Vec<OrderStatusType>,
    pub payment_status_in: Vec<PaymentStatus>,
    pub payment_status_not: Vec<PaymentStatus>,
}

impl OrderGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn order_status_is(mut self, status: OrderStatusType) -> Self {
        self.order_status_in.push(status);
        self
    }

    pub fn order_status_not(mut self, status: OrderStatusType) -> Self {
        self.order_status_not.push(status);
        self
    }

    pub fn payment_status_is(mut self, status: PaymentStatus) -> Self {
        self.payment_status_in.push(status);
        self
    }

    pub fn payment_status_not(mut self, status: PaymentStatus) -> Self {
        self.payment_status_not.push(status);
        self
    }

    /// Evaluates the guard against an in-memory copy of the order. Backends must not use this in place of a
    /// conditional write; it exists for in-memory backends and for reasoning about a freshly fetched order.
    pub fn matches(&self, order: &Order) -> bool {
        (self.order_status_in.is_empty() || self.order_status_in.contains(&order.order_status))
            && !self.order_status_not.contains(&order.order_status)
            && (self.payment_status_in.is_empty() || self.payment_status_in.contains(&order.payment_status))
            && !self.payment_status_not.contains(&order.payment_status)
    }
}

/// The set of fields written by a guarded order transition. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderUpdate {
    pub order_status: Option<OrderStatusType>,
    pub payment_status: Option<PaymentStatus>,
    pub gateway_order_id: Option<String>,
    pub gateway_payment_id: Option<String>,
    pub gateway_signature: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl OrderUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    /// PAID / PLACED, with the gateway payment details.
    pub fn paid(payment_id: Option<&str>, signature: Option<&str>) -> Self {
        Self {
            order_status: Some(OrderStatusType::Placed),
            payment_status: Some(PaymentStatus::Paid),
            gateway_payment_id: payment_id.map(String::from),
            gateway_signature: signature.map(String::from),
            paid_at: Some(Utc::now()),
            ..Default::default()
        }
    }

    /// FAILED / CANCELLED
    pub fn cancelled() -> Self {
        Self {
            order_status: Some(OrderStatusType::Cancelled),
            payment_status: Some(PaymentStatus::Failed),
            ..Default::default()
        }
    }

    pub fn with_order_status(mut self, status: OrderStatusType) -> Self {
        self.order_status = Some(status);
        self
    }

    pub fn with_payment_status(mut self, status: PaymentStatus) -> Self {
        self.payment_status = Some(status);
        self
    }

    pub fn with_gateway_order_id<S: Into<String>>(mut self, id: S) -> Self {
        self.gateway_order_id = Some(id.into());
        self
    }

    pub fn with_gateway_payment_id(mut self, id: Option<&str>) -> Self {
        self.gateway_payment_id = id.map(String::from);
        self
    }

    pub fn with_gateway_signature(mut self, signature: Option<&str>) -> Self {
        self.gateway_signature = signature.map(String::from);
        self
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExpiryResult {
    /// Orders cancelled by this sweep, with their stock returned.
    pub cancelled: Vec<Order>,
    /// Candidates that were paid, cancelled or otherwise modified between the scan and the guarded update.
    pub skipped: Vec<OrderId>,
    /// Candidates that could not be processed, with the reason.
    pub failed: Vec<(OrderId, String)>,
}

impl ExpiryResult {
    pub fn cancelled_count(&self) -> usize {
        self.cancelled.len()
    }

    pub fn total_count(&self) -> usize {
        self.cancelled.len() + self.skipped.len() + self.failed.len()
    }
}
