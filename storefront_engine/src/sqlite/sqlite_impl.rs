use std::fmt::Debug;

use chrono::Duration;
use log::*;
use sqlx::SqlitePool;

use super::db::{customers, db_url, new_pool, orders, products, MIGRATOR};
use crate::{
    db_types::{Customer, NewCustomer, NewOrder, NewProduct, Order, OrderId, Product},
    traits::{
        CustomerError,
        CustomerManagement,
        InventoryError,
        InventoryManagement,
        OrderGuard,
        OrderManagement,
        OrderManagementError,
        OrderUpdate,
        StorefrontDatabase,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl InventoryManagement for SqliteDatabase {
    async fn fetch_product(&self, product_id: i64) -> Result<Option<Product>, InventoryError> {
        let mut conn = self.pool.acquire().await?;
        Ok(products::fetch_product(product_id, &mut conn).await?)
    }

    async fn fetch_products(&self, product_ids: &[i64]) -> Result<Vec<Product>, InventoryError> {
        let mut conn = self.pool.acquire().await?;
        Ok(products::fetch_products(product_ids, &mut conn).await?)
    }

    async fn insert_product(&self, product: NewProduct) -> Result<Product, InventoryError> {
        let mut conn = self.pool.acquire().await?;
        products::insert_product(product, &mut conn).await
    }

    async fn try_decrement_stock(&self, product_id: i64, quantity: i64) -> Result<bool, InventoryError> {
        if quantity <= 0 {
            return Err(InventoryError::InvalidQuantity(quantity));
        }
        let mut conn = self.pool.acquire().await?;
        Ok(products::try_decrement_stock(product_id, quantity, &mut conn).await?)
    }

    async fn increment_stock(&self, product_id: i64, quantity: i64) -> Result<bool, InventoryError> {
        if quantity <= 0 {
            return Err(InventoryError::InvalidQuantity(quantity));
        }
        let mut conn = self.pool.acquire().await?;
        Ok(products::increment_stock(product_id, quantity, &mut conn).await?)
    }

    async fn set_stock(&self, product_id: i64, stock: i64) -> Result<Option<Product>, InventoryError> {
        let mut conn = self.pool.acquire().await?;
        products::set_stock(product_id, stock, &mut conn).await
    }

    async fn set_active(&self, product_id: i64, active: bool) -> Result<Option<Product>, InventoryError> {
        let mut conn = self.pool.acquire().await?;
        Ok(products::set_active(product_id, active, &mut conn).await?)
    }
}

impl OrderManagement for SqliteDatabase {
    async fn insert_order(&self, order: NewOrder) -> Result<Order, OrderManagementError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::insert_order(order, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order {} has been saved in the DB with id {}", order.order_id, order.id);
        Ok(order)
    }

    async fn fetch_order_by_id(&self, id: i64) -> Result<Option<Order>, OrderManagementError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order_by_id(id, &mut conn).await?)
    }

    async fn fetch_order_by_order_id(&self, order_id: &OrderId) -> Result<Option<Order>, OrderManagementError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order_by_order_id(order_id, &mut conn).await?)
    }

    async fn fetch_order_by_gateway_order_id(
        &self,
        gateway_order_id: &str,
    ) -> Result<Option<Order>, OrderManagementError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order_by_gateway_order_id(gateway_order_id, &mut conn).await?)
    }

    async fn fetch_order_for_tracking(
        &self,
        order_id: &OrderId,
        email: &str,
    ) -> Result<Option<Order>, OrderManagementError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order_for_tracking(order_id, email, &mut conn).await?)
    }

    async fn fetch_orders(&self) -> Result<Vec<Order>, OrderManagementError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_orders(&mut conn).await?)
    }

    async fn fetch_orders_for_email(&self, email: &str) -> Result<Vec<Order>, OrderManagementError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_orders_for_email(email, &mut conn).await?)
    }

    async fn fetch_stale_orders(&self, older_than: Duration) -> Result<Vec<Order>, OrderManagementError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_stale_orders(older_than, &mut conn).await?)
    }

    async fn transition_order(
        &self,
        id: i64,
        guard: &OrderGuard,
        update: &OrderUpdate,
    ) -> Result<Option<Order>, OrderManagementError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::transition_order(id, guard, update, &mut tx).await?;
        tx.commit().await?;
        match &order {
            Some(o) => trace!("🗃️ Guarded transition applied to order {}", o.order_id),
            None => trace!("🗃️ Guarded transition for order id {id} matched no rows"),
        }
        Ok(order)
    }
}

impl CustomerManagement for SqliteDatabase {
    async fn fetch_or_create_customer(&self, customer: NewCustomer) -> Result<Customer, CustomerError> {
        let mut conn = self.pool.acquire().await?;
        customers::fetch_or_create_customer(customer, &mut conn).await
    }

    async fn fetch_customer_by_email(&self, email: &str) -> Result<Option<Customer>, CustomerError> {
        let mut conn = self.pool.acquire().await?;
        Ok(customers::fetch_customer_by_email(email, &mut conn).await?)
    }
}

impl StorefrontDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn close(&mut self) {
        self.pool.close().await;
    }
}

impl SqliteDatabase {
    /// Creates a new database API object
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Brings the schema up to date.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        MIGRATOR.run(&self.pool).await?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
