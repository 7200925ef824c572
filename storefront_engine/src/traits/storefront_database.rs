use crate::traits::{CustomerManagement, InventoryManagement, OrderManagement};

/// The full set of behaviour a storage backend must provide to run the storefront order core.
#[allow(async_fn_in_trait)]
pub trait StorefrontDatabase: Clone + InventoryManagement + OrderManagement + CustomerManagement {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Closes the database connection.
    async fn close(&mut self) {}
}
