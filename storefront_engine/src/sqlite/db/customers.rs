use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{Customer, NewCustomer},
    traits::CustomerError,
};

pub async fn fetch_customer_by_email(email: &str, conn: &mut SqliteConnection) -> Result<Option<Customer>, sqlx::Error> {
    let customer = sqlx::query_as("SELECT * FROM customers WHERE email = $1")
        .bind(email.trim().to_lowercase())
        .fetch_optional(conn)
        .await?;
    Ok(customer)
}

pub async fn fetch_customer_by_phone(phone: &str, conn: &mut SqliteConnection) -> Result<Option<Customer>, sqlx::Error> {
    let customer = sqlx::query_as("SELECT * FROM customers WHERE phone = $1 ORDER BY id LIMIT 1")
        .bind(phone)
        .fetch_optional(conn)
        .await?;
    Ok(customer)
}

/// Email first, then phone, else insert. The insert tolerates a concurrent insert for the same email, in which case
/// the other writer's record is returned.
pub async fn fetch_or_create_customer(
    customer: NewCustomer,
    conn: &mut SqliteConnection,
) -> Result<Customer, CustomerError> {
    let email = customer.email.trim().to_lowercase();
    if email.is_empty() {
        return Err(CustomerError::MissingEmail);
    }
    let existing = match fetch_customer_by_email(&email, conn).await? {
        Some(c) => Some(c),
        None => match &customer.phone {
            Some(phone) => fetch_customer_by_phone(phone, conn).await?,
            None => None,
        },
    };
    if let Some(existing) = existing {
        return fill_missing_phone(existing, customer.phone, conn).await;
    }
    let inserted: Option<Customer> = sqlx::query_as(
        r#"
        INSERT INTO customers (name, email, phone) VALUES ($1, $2, $3)
        ON CONFLICT (email) DO NOTHING
        RETURNING *
        "#,
    )
    .bind(customer.name)
    .bind(&email)
    .bind(customer.phone.clone())
    .fetch_optional(&mut *conn)
    .await?;
    match inserted {
        Some(c) => {
            debug!("🗃️ New customer {} created for {}", c.id, c.email);
            Ok(c)
        },
        None => {
            let c = fetch_customer_by_email(&email, conn)
                .await?
                .ok_or_else(|| CustomerError::DatabaseError(format!("Customer {email} vanished after insert")))?;
            fill_missing_phone(c, customer.phone, conn).await
        },
    }
}

async fn fill_missing_phone(
    customer: Customer,
    phone: Option<String>,
    conn: &mut SqliteConnection,
) -> Result<Customer, CustomerError> {
    match (customer.phone.as_ref(), phone) {
        (None, Some(phone)) => {
            let updated: Option<Customer> = sqlx::query_as(
                "UPDATE customers SET phone = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 AND phone IS NULL \
                 RETURNING *",
            )
            .bind(phone)
            .bind(customer.id)
            .fetch_optional(conn)
            .await?;
            Ok(updated.unwrap_or(customer))
        },
        _ => Ok(customer),
    }
}
