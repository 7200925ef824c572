use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{NewProduct, Product, StockDirection, StockItem},
    traits::{InventoryError, InventoryManagement},
};

/// The inventory ledger.
///
/// All stock movement in the system goes through [`InventoryApi::adjust_stock`], which composes the backend's
/// per-item conditional primitives into an all-or-nothing batch:
///
/// * `Decrease` reserves each item in turn with a conditional decrement. If any item cannot be reserved, every item
///   already reserved by the same call is handed back with a compensating increment, and the call reports `false`.
/// * `Increase` returns every item unconditionally. It is never refused.
///
/// Batches touching several products are not atomic across products. Two concurrent batches can interleave, but each
/// product's counter is only ever moved by a single conditional write, so no product can be oversold.
pub struct InventoryApi<B> {
    db: B,
}

impl<B> Debug for InventoryApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "InventoryApi")
    }
}

impl<B: Clone> Clone for InventoryApi<B> {
    fn clone(&self) -> Self {
        Self { db: self.db.clone() }
    }
}

impl<B> InventoryApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> InventoryApi<B>
where B: InventoryManagement
{
    /// Adjusts stock for a batch of items. Returns `Ok(true)` if the whole batch was applied, and `Ok(false)` if a
    /// `Decrease` was refused for lack of stock (in which case nothing remains applied).
    ///
    /// If the backend fails part way through a `Decrease`, the items already reserved are handed back before the
    /// error is returned. For an `Increase`, the remaining items are still returned and the first error is reported.
    pub async fn adjust_stock(&self, items: &[StockItem], direction: StockDirection) -> Result<bool, InventoryError> {
        if let Some(item) = items.iter().find(|i| i.quantity <= 0) {
            return Err(InventoryError::InvalidQuantity(item.quantity));
        }
        match direction {
            StockDirection::Decrease => self.reserve(items).await,
            StockDirection::Increase => self.release(items).await.map(|_| true),
        }
    }

    async fn reserve(&self, items: &[StockItem]) -> Result<bool, InventoryError> {
        let mut reserved = Vec::with_capacity(items.len());
        for item in items {
            match self.db.try_decrement_stock(item.product_id, item.quantity).await {
                Ok(true) => reserved.push(*item),
                Ok(false) => {
                    debug!(
                        "📦️ Product {} cannot supply {} units. Rolling back {} reserved items",
                        item.product_id,
                        item.quantity,
                        reserved.len()
                    );
                    self.compensate(&reserved).await;
                    return Ok(false);
                },
                Err(e) => {
                    error!(
                        "📦️ Storage error reserving product {}: {e}. Rolling back {} reserved items",
                        item.product_id,
                        reserved.len()
                    );
                    self.compensate(&reserved).await;
                    return Err(e);
                },
            }
        }
        trace!("📦️ Reserved {} items", reserved.len());
        Ok(true)
    }

    async fn release(&self, items: &[StockItem]) -> Result<(), InventoryError> {
        let mut first_error = None;
        for item in items {
            match self.db.increment_stock(item.product_id, item.quantity).await {
                Ok(true) => trace!("📦️ Returned {} units of product {}", item.quantity, item.product_id),
                Ok(false) => warn!(
                    "📦️ Tried to return {} units to product {}, but it no longer exists",
                    item.quantity, item.product_id
                ),
                Err(e) => {
                    error!("📦️ Could not return {} units to product {}: {e}", item.quantity, item.product_id);
                    first_error.get_or_insert(e);
                },
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn compensate(&self, reserved: &[StockItem]) {
        if let Err(e) = self.release(reserved).await {
            error!("📦️ Compensating stock release was incomplete: {e}. Stock levels need manual review.");
        }
    }

    pub async fn fetch_product(&self, product_id: i64) -> Result<Option<Product>, InventoryError> {
        self.db.fetch_product(product_id).await
    }

    pub async fn fetch_products(&self, product_ids: &[i64]) -> Result<Vec<Product>, InventoryError> {
        self.db.fetch_products(product_ids).await
    }

    pub async fn create_product(&self, product: NewProduct) -> Result<Product, InventoryError> {
        let product = self.db.insert_product(product).await?;
        info!("📦️ Product {} ({}) created with {} units", product.id, product.name, product.stock);
        Ok(product)
    }

    /// Admin stock edit. This goes through the same storage write path as the ledger, so the product activity rule
    /// still applies.
    pub async fn set_stock(&self, product_id: i64, stock: i64) -> Result<Product, InventoryError> {
        let product = self.db.set_stock(product_id, stock).await?.ok_or(InventoryError::ProductNotFound(product_id))?;
        info!("📦️ Stock for product {product_id} set to {stock}. Active: {}", product.is_active);
        Ok(product)
    }

    /// Catalog visibility. Restocking never reactivates a product on its own, so this is how it goes back on sale.
    pub async fn set_active(&self, product_id: i64, active: bool) -> Result<Product, InventoryError> {
        let product =
            self.db.set_active(product_id, active).await?.ok_or(InventoryError::ProductNotFound(product_id))?;
        if active && !product.is_active {
            warn!("📦️ Product {product_id} cannot be activated while it has no stock");
        } else {
            info!("📦️ Product {product_id} is now {}", if product.is_active { "active" } else { "inactive" });
        }
        Ok(product)
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}
