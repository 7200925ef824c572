use chrono::{Duration, Utc};
use log::{debug, trace};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    db_types::{NewOrder, Order, OrderId, OrderItem, OrderStatusType, PaymentStatus},
    traits::{OrderGuard, OrderManagementError, OrderUpdate},
};

/// Inserts a new order and its line items using the given connection. This is not atomic. You can embed this call
/// inside a transaction if you need to ensure atomicity, and pass `&mut *tx` as the connection argument.
///
/// The first statement is the write, so that inside a transaction SQLite takes the write lock up front instead of
/// upgrading a read snapshot.
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, OrderManagementError> {
    let order_id = order.order_id.clone();
    let inserted: Result<Order, sqlx::Error> = sqlx::query_as(
        r#"
            INSERT INTO orders (
                order_id,
                customer_id,
                customer_name,
                phone,
                email,
                address,
                city,
                state,
                pincode,
                total_amount,
                payment_method,
                payment_status,
                order_status,
                gateway_order_id,
                created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING *;
        "#,
    )
    .bind(order.order_id.as_str())
    .bind(order.customer_id)
    .bind(order.customer_name)
    .bind(order.phone)
    .bind(order.email.trim().to_lowercase())
    .bind(order.shipping.address)
    .bind(order.shipping.city)
    .bind(order.shipping.state)
    .bind(order.shipping.pincode)
    .bind(order.total_amount.value())
    .bind(order.payment_method.to_string())
    .bind(order.payment_status.to_string())
    .bind(order.order_status.to_string())
    .bind(order.gateway_order_id)
    .bind(order.created_at)
    .fetch_one(&mut *conn)
    .await;
    let mut inserted = match inserted {
        Ok(o) => o,
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            return Err(OrderManagementError::OrderAlreadyExists(order_id));
        },
        Err(e) => return Err(e.into()),
    };
    for (position, item) in order.items.iter().enumerate() {
        insert_order_item(inserted.id, position as i64, item, conn).await?;
    }
    inserted.items = order.items;
    debug!("🗃️ Order [{}] inserted with id {} and {} items", inserted.order_id, inserted.id, inserted.items.len());
    Ok(inserted)
}

async fn insert_order_item(
    order_pk: i64,
    position: i64,
    item: &OrderItem,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO order_items (order_id, position, product_id, name, price, quantity) VALUES ($1, $2, $3, $4, $5, \
         $6)",
    )
    .bind(order_pk)
    .bind(position)
    .bind(item.product_id)
    .bind(&item.name)
    .bind(item.price.value())
    .bind(item.quantity)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn fetch_items_for_order(order_pk: i64, conn: &mut SqliteConnection) -> Result<Vec<OrderItem>, sqlx::Error> {
    let items = sqlx::query_as(
        "SELECT product_id, name, price, quantity FROM order_items WHERE order_id = $1 ORDER BY position ASC",
    )
    .bind(order_pk)
    .fetch_all(conn)
    .await?;
    Ok(items)
}

async fn with_items(order: Option<Order>, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    match order {
        Some(mut order) => {
            order.items = fetch_items_for_order(order.id, conn).await?;
            Ok(Some(order))
        },
        None => Ok(None),
    }
}

async fn all_with_items(orders: Vec<Order>, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let mut result = Vec::with_capacity(orders.len());
    for mut order in orders {
        order.items = fetch_items_for_order(order.id, conn).await?;
        result.push(order);
    }
    Ok(result)
}

pub async fn fetch_order_by_id(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(&mut *conn).await?;
    with_items(order, conn).await
}

pub async fn fetch_order_by_order_id(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE order_id = $1")
        .bind(order_id.as_str())
        .fetch_optional(&mut *conn)
        .await?;
    with_items(order, conn).await
}

pub async fn fetch_order_by_gateway_order_id(
    gateway_order_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE gateway_order_id = $1 ORDER BY id DESC LIMIT 1")
        .bind(gateway_order_id)
        .fetch_optional(&mut *conn)
        .await?;
    with_items(order, conn).await
}

pub async fn fetch_order_for_tracking(
    order_id: &OrderId,
    email: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE order_id = $1 AND email = $2")
        .bind(order_id.as_str())
        .bind(email.trim().to_lowercase())
        .fetch_optional(&mut *conn)
        .await?;
    with_items(order, conn).await
}

pub async fn fetch_orders(conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let orders = sqlx::query_as("SELECT * FROM orders ORDER BY created_at DESC, id DESC").fetch_all(&mut *conn).await?;
    all_with_items(orders, conn).await
}

pub async fn fetch_orders_for_email(email: &str, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let orders = sqlx::query_as("SELECT * FROM orders WHERE email = $1 ORDER BY created_at DESC, id DESC")
        .bind(email.trim().to_lowercase())
        .fetch_all(&mut *conn)
        .await?;
    all_with_items(orders, conn).await
}

/// Unpaid orders still waiting for payment that were created before `now - older_than`.
pub async fn fetch_stale_orders(older_than: Duration, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let cutoff = (Utc::now() - older_than).timestamp();
    let orders = sqlx::query_as(
        r#"
        SELECT * FROM orders
        WHERE order_status = $1 AND payment_status = $2 AND unixepoch(created_at) <= $3
        ORDER BY created_at ASC
        "#,
    )
    .bind(OrderStatusType::AwaitingPayment.to_string())
    .bind(PaymentStatus::Pending.to_string())
    .bind(cutoff)
    .fetch_all(&mut *conn)
    .await?;
    trace!("🗃️ {} stale orders found (cutoff {cutoff})", orders.len());
    all_with_items(orders, conn).await
}

/// Applies `update` to order `id` in one conditional `UPDATE`. The guard clauses are part of the `WHERE` clause, so
/// zero rows affected means the guard did not hold at the time of the write.
pub async fn transition_order(
    id: i64,
    guard: &OrderGuard,
    update: &OrderUpdate,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, OrderManagementError> {
    if update.is_empty() {
        return Err(OrderManagementError::EmptyUpdate);
    }
    let mut builder = QueryBuilder::<Sqlite>::new("UPDATE orders SET updated_at = CURRENT_TIMESTAMP");
    if let Some(status) = update.order_status {
        builder.push(", order_status = ").push_bind(status.to_string());
    }
    if let Some(status) = update.payment_status {
        builder.push(", payment_status = ").push_bind(status.to_string());
    }
    if let Some(gateway_order_id) = &update.gateway_order_id {
        builder.push(", gateway_order_id = ").push_bind(gateway_order_id.clone());
    }
    if let Some(payment_id) = &update.gateway_payment_id {
        builder.push(", gateway_payment_id = ").push_bind(payment_id.clone());
    }
    if let Some(signature) = &update.gateway_signature {
        builder.push(", gateway_signature = ").push_bind(signature.clone());
    }
    if let Some(paid_at) = update.paid_at {
        builder.push(", paid_at = ").push_bind(paid_at);
    }
    builder.push(" WHERE id = ").push_bind(id);
    push_guard_clause(&mut builder, "order_status", true, &guard.order_status_in);
    push_guard_clause(&mut builder, "order_status", false, &guard.order_status_not);
    push_guard_clause(&mut builder, "payment_status", true, &guard.payment_status_in);
    push_guard_clause(&mut builder, "payment_status", false, &guard.payment_status_not);
    builder.push(" RETURNING *");
    trace!("🗃️ Executing guarded transition: {}", builder.sql());
    let order = builder.build_query_as::<Order>().fetch_optional(&mut *conn).await?;
    Ok(with_items(order, conn).await?)
}

fn push_guard_clause<T: ToString>(builder: &mut QueryBuilder<'_, Sqlite>, column: &str, include: bool, values: &[T]) {
    if values.is_empty() {
        return;
    }
    let op = if include { "IN" } else { "NOT IN" };
    builder.push(format!(" AND {column} {op} ("));
    let mut list = builder.separated(", ");
    for value in values {
        list.push_bind(value.to_string());
    }
    list.push_unseparated(")");
}
