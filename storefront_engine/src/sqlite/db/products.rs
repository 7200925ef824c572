use log::{debug, trace};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    db_types::{NewProduct, Product},
    traits::InventoryError,
};

pub async fn insert_product(product: NewProduct, conn: &mut SqliteConnection) -> Result<Product, InventoryError> {
    if product.stock < 0 {
        return Err(InventoryError::InvalidQuantity(product.stock));
    }
    let id: i64 = sqlx::query_scalar("INSERT INTO products (name, price, stock) VALUES ($1, $2, $3) RETURNING id")
        .bind(product.name)
        .bind(product.price.value())
        .bind(product.stock)
        .fetch_one(&mut *conn)
        .await?;
    debug!("🗃️ Product {id} inserted");
    // Re-read rather than trust RETURNING, since the activity trigger runs after the insert
    fetch_product(id, conn).await?.ok_or(InventoryError::ProductNotFound(id))
}

pub async fn fetch_product(id: i64, conn: &mut SqliteConnection) -> Result<Option<Product>, sqlx::Error> {
    let product = sqlx::query_as("SELECT * FROM products WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(product)
}

pub async fn fetch_products(ids: &[i64], conn: &mut SqliteConnection) -> Result<Vec<Product>, sqlx::Error> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let mut builder = QueryBuilder::<Sqlite>::new("SELECT * FROM products WHERE id IN (");
    let mut list = builder.separated(", ");
    for id in ids {
        list.push_bind(*id);
    }
    list.push_unseparated(") ORDER BY id");
    let products = builder.build_query_as::<Product>().fetch_all(conn).await?;
    Ok(products)
}

/// The conditional decrement at the heart of the inventory ledger. The availability test and the write are a single
/// statement, so two checkouts racing for the last unit cannot both succeed.
pub async fn try_decrement_stock(
    product_id: i64,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE products SET stock = stock - $1, updated_at = CURRENT_TIMESTAMP
        WHERE id = $2 AND is_active = 1 AND stock >= $1
        "#,
    )
    .bind(quantity)
    .bind(product_id)
    .execute(conn)
    .await?;
    let applied = result.rows_affected() == 1;
    trace!("🗃️ Decrement product {product_id} by {quantity}: {}", if applied { "applied" } else { "refused" });
    Ok(applied)
}

pub async fn increment_stock(
    product_id: i64,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("UPDATE products SET stock = stock + $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2")
            .bind(quantity)
            .bind(product_id)
            .execute(conn)
            .await?;
    let applied = result.rows_affected() == 1;
    trace!("🗃️ Increment product {product_id} by {quantity}: {}", if applied { "applied" } else { "no such product" });
    Ok(applied)
}

pub async fn set_stock(
    product_id: i64,
    stock: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Product>, InventoryError> {
    if stock < 0 {
        return Err(InventoryError::InvalidQuantity(stock));
    }
    let result = sqlx::query("UPDATE products SET stock = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2")
        .bind(stock)
        .bind(product_id)
        .execute(&mut *conn)
        .await?;
    if result.rows_affected() == 0 {
        return Ok(None);
    }
    debug!("🗃️ Stock for product {product_id} set to {stock}");
    Ok(fetch_product(product_id, conn).await?)
}

pub async fn set_active(
    product_id: i64,
    active: bool,
    conn: &mut SqliteConnection,
) -> Result<Option<Product>, sqlx::Error> {
    let result = sqlx::query("UPDATE products SET is_active = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2")
        .bind(active)
        .bind(product_id)
        .execute(&mut *conn)
        .await?;
    if result.rows_affected() == 0 {
        return Ok(None);
    }
    fetch_product(product_id, conn).await
}
