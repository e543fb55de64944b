//! PostgreSQL implementation of BillingStore.
//!
//! All credit mutations run inside a transaction with a row-level lock on
//! the customer, so concurrent webhook deliveries and API debits serialize
//! per customer. Redelivered order grants are absorbed by the partial unique
//! index on (customer_id, creem_order_id, type).

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::billing::{
    CreemCustomer, LedgerEntryType, StoreError, SubscriptionPayload,
};
use crate::ports::BillingStore;

/// PostgreSQL implementation of the BillingStore port.
pub struct PostgresBillingStore {
    pool: PgPool,
}

impl PostgresBillingStore {
    /// Creates a new PostgresBillingStore with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn db_err(e: sqlx::Error) -> StoreError {
    StoreError::Database(e.to_string())
}

#[async_trait]
impl BillingStore for PostgresBillingStore {
    async fn upsert_customer(
        &self,
        customer: &CreemCustomer,
        user_id: &str,
    ) -> Result<Uuid, StoreError> {
        // COALESCE keeps existing profile fields when the event omits them.
        let (id,): (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO customers (user_id, creem_customer_id, email, name, country)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (creem_customer_id) DO UPDATE SET
                user_id = EXCLUDED.user_id,
                email = COALESCE(EXCLUDED.email, customers.email),
                name = COALESCE(EXCLUDED.name, customers.name),
                country = COALESCE(EXCLUDED.country, customers.country),
                updated_at = now()
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(&customer.id)
        .bind(&customer.email)
        .bind(&customer.name)
        .bind(&customer.country)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(id)
    }

    async fn upsert_subscription(
        &self,
        subscription: &SubscriptionPayload,
        customer_id: Uuid,
    ) -> Result<Uuid, StoreError> {
        let (id,): (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO subscriptions (
                customer_id, creem_subscription_id, creem_product_id, status,
                current_period_start, current_period_end, canceled_at, metadata
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (creem_subscription_id) DO UPDATE SET
                customer_id = EXCLUDED.customer_id,
                creem_product_id = COALESCE(EXCLUDED.creem_product_id, subscriptions.creem_product_id),
                status = EXCLUDED.status,
                current_period_start = COALESCE(EXCLUDED.current_period_start, subscriptions.current_period_start),
                current_period_end = COALESCE(EXCLUDED.current_period_end, subscriptions.current_period_end),
                canceled_at = EXCLUDED.canceled_at,
                metadata = COALESCE(EXCLUDED.metadata, subscriptions.metadata),
                updated_at = now()
            RETURNING id
            "#,
        )
        .bind(customer_id)
        .bind(&subscription.id)
        .bind(subscription.product_id())
        .bind(subscription.status.as_str())
        .bind(subscription.current_period_start_date)
        .bind(subscription.current_period_end_date)
        .bind(subscription.canceled_at)
        .bind(&subscription.metadata)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(id)
    }

    async fn add_credits(
        &self,
        customer_id: Uuid,
        amount: i64,
        order_id: Option<&str>,
        description: &str,
    ) -> Result<i64, StoreError> {
        if amount <= 0 {
            return Err(StoreError::InvalidAmount(amount));
        }

        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let balance: Option<(i64,)> =
            sqlx::query_as("SELECT credits FROM customers WHERE id = $1 FOR UPDATE")
                .bind(customer_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(db_err)?;

        let Some((balance,)) = balance else {
            return Err(StoreError::CustomerNotFound);
        };

        if let Some(order_id) = order_id {
            let inserted = sqlx::query(
                r#"
                INSERT INTO credits_history (customer_id, amount, type, description, creem_order_id)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (customer_id, creem_order_id, type)
                    WHERE creem_order_id IS NOT NULL
                DO NOTHING
                "#,
            )
            .bind(customer_id)
            .bind(amount)
            .bind(LedgerEntryType::Add.as_str())
            .bind(description)
            .bind(order_id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

            // Redelivered order: the grant already happened, keep the balance.
            if inserted.rows_affected() == 0 {
                tx.commit().await.map_err(db_err)?;
                tracing::info!(
                    customer_id = %customer_id,
                    order_id = %order_id,
                    "duplicate credit grant skipped"
                );
                return Ok(balance);
            }
        } else {
            sqlx::query(
                r#"
                INSERT INTO credits_history (customer_id, amount, type, description)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(customer_id)
            .bind(amount)
            .bind(LedgerEntryType::Add.as_str())
            .bind(description)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }

        let (new_balance,): (i64,) = sqlx::query_as(
            "UPDATE customers SET credits = credits + $2, updated_at = now() WHERE id = $1 RETURNING credits",
        )
        .bind(customer_id)
        .bind(amount)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;

        Ok(new_balance)
    }

    async fn use_credits(
        &self,
        customer_id: Uuid,
        amount: i64,
        description: &str,
    ) -> Result<i64, StoreError> {
        if amount <= 0 {
            return Err(StoreError::InvalidAmount(amount));
        }

        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let balance: Option<(i64,)> =
            sqlx::query_as("SELECT credits FROM customers WHERE id = $1 FOR UPDATE")
                .bind(customer_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(db_err)?;

        let Some((balance,)) = balance else {
            return Err(StoreError::CustomerNotFound);
        };

        if balance < amount {
            return Err(StoreError::InsufficientCredits {
                requested: amount,
                available: balance,
            });
        }

        // Ledger amounts are signed; debits are stored negative.
        sqlx::query(
            r#"
            INSERT INTO credits_history (customer_id, amount, type, description)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(customer_id)
        .bind(-amount)
        .bind(LedgerEntryType::Subtract.as_str())
        .bind(description)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        let (new_balance,): (i64,) = sqlx::query_as(
            "UPDATE customers SET credits = credits - $2, updated_at = now() WHERE id = $1 RETURNING credits",
        )
        .bind(customer_id)
        .bind(amount)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;

        Ok(new_balance)
    }
}
