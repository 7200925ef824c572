use thiserror::Error;

use crate::db_types::{NewProduct, Product};

#[derive(Debug, Clone, Error)]
pub enum InventoryError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Product {0} does not exist")]
    ProductNotFound(i64),
    #[error("Invalid stock quantity: {0}")]
    InvalidQuantity(i64),
}

impl From<sqlx::Error> for InventoryError {
    fn from(e: sqlx::Error) -> Self {
        InventoryError::DatabaseError(e.to_string())
    }
}

/// Storage primitives for the inventory ledger.
///
/// Every stock mutation in the system goes through this trait. Implementations must apply each call as a single
/// conditional write on the product row. A read-then-write implementation is not acceptable, since checkouts, the
/// expiry reaper and admin edits all race on the same counters.
///
/// Implementations must also uphold the product activity rule on every write path: if a write leaves `stock <= 0`,
/// the product's `is_active` flag is cleared.
#[allow(async_fn_in_trait)]
pub trait InventoryManagement {
    async fn fetch_product(&self, product_id: i64) -> Result<Option<Product>, InventoryError>;

    async fn fetch_products(&self, product_ids: &[i64]) -> Result<Vec<Product>, InventoryError>;

    async fn insert_product(&self, product: NewProduct) -> Result<Product, InventoryError>;

    /// Decrements the stock of `product_id` by `quantity` if, and only if, the product is active and has at least
    /// `quantity` units available. Returns `true` if the decrement was applied.
    async fn try_decrement_stock(&self, product_id: i64, quantity: i64) -> Result<bool, InventoryError>;

    /// Unconditionally returns `quantity` units to the stock of `product_id`. Does not reactivate the product.
    /// Returns `false` if the product does not exist.
    async fn increment_stock(&self, product_id: i64, quantity: i64) -> Result<bool, InventoryError>;

    /// Overwrites the stock level for a product (admin edit). Returns the updated product, or `None` if the product
    /// does not exist.
    async fn set_stock(&self, product_id: i64, stock: i64) -> Result<Option<Product>, InventoryError>;

    /// Sets the catalog visibility flag (admin edit). A product without stock stays inactive regardless.
    async fn set_active(&self, product_id: i64, active: bool) -> Result<Option<Product>, InventoryError>;
}
