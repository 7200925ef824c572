use thiserror::Error;

use crate::db_types::{Customer, NewCustomer};

#[derive(Debug, Clone, Error)]
pub enum CustomerError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("A customer must have an email address")]
    MissingEmail,
}

impl From<sqlx::Error> for CustomerError {
    fn from(e: sqlx::Error) -> Self {
        CustomerError::DatabaseError(e.to_string())
    }
}

#[allow(async_fn_in_trait)]
pub trait CustomerManagement {
    /// Resolves the customer placing an order.
    ///
    /// Customers are matched on (lower-cased) email first, then on phone number. If neither matches, a new customer
    /// is created. An existing customer without a phone number has it filled in from `customer`.
    ///
    /// Two concurrent calls with the same email must resolve to the same customer record.
    async fn fetch_or_create_customer(&self, customer: NewCustomer) -> Result<Customer, CustomerError>;

    async fn fetch_customer_by_email(&self, email: &str) -> Result<Option<Customer>, CustomerError>;
}
