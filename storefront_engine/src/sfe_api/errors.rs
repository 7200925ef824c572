use thiserror::Error;

use crate::{
    db_types::{OrderRef, OrderStatusType, PaymentStatus},
    traits::{CustomerError, GatewayError, InventoryError, OrderManagementError},
};

/// The outcome taxonomy of the order lifecycle.
///
/// Everything except [`OrderFlowError::DatabaseError`] is a per-request rejection with a human-readable reason.
/// Storage errors are fatal for the request that hit them, and nothing else.
#[derive(Debug, Clone, Error)]
pub enum OrderFlowError {
    #[error("Insufficient stock for one or more items in the order")]
    InsufficientStock,
    #[error("Could not create the payment gateway order. {0}")]
    GatewayCreateFailed(String),
    #[error("The payment signature is invalid. The order has been cancelled.")]
    InvalidSignature,
    #[error("{0}")]
    InvalidStateTransition(String),
    #[error("Order {0} not found")]
    OrderNotFound(String),
    #[error("Product {0} not found")]
    ProductNotFound(i64),
    #[error("Invalid order request. {0}")]
    ValidationError(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl OrderFlowError {
    pub fn not_found(order: &OrderRef) -> Self {
        Self::OrderNotFound(order.to_string())
    }

    /// An [`OrderFlowError::InvalidStateTransition`] that explains the order's current state.
    pub fn invalid_state(action: &str, status: OrderStatusType, payment_status: PaymentStatus) -> Self {
        Self::InvalidStateTransition(format!(
            "Cannot {action}: the order is {status} with payment status {payment_status}"
        ))
    }
}

impl From<InventoryError> for OrderFlowError {
    fn from(e: InventoryError) -> Self {
        match e {
            InventoryError::ProductNotFound(id) => Self::ProductNotFound(id),
            InventoryError::InvalidQuantity(q) => Self::ValidationError(format!("Invalid quantity {q}")),
            InventoryError::DatabaseError(s) => Self::DatabaseError(s),
        }
    }
}

impl From<OrderManagementError> for OrderFlowError {
    fn from(e: OrderManagementError) -> Self {
        match e {
            OrderManagementError::DatabaseError(s) => Self::DatabaseError(s),
            e => Self::DatabaseError(e.to_string()),
        }
    }
}

impl From<CustomerError> for OrderFlowError {
    fn from(e: CustomerError) -> Self {
        match e {
            CustomerError::MissingEmail => Self::ValidationError(e.to_string()),
            CustomerError::DatabaseError(s) => Self::DatabaseError(s),
        }
    }
}

impl From<GatewayError> for OrderFlowError {
    fn from(e: GatewayError) -> Self {
        Self::GatewayCreateFailed(e.to_string())
    }
}
