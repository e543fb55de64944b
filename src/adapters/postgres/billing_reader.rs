//! PostgreSQL implementation of BillingReader.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::billing::{LedgerEntryType, StoreError, SubscriptionStatus};
use crate::ports::{BillingReader, LedgerEntrySummary, SubscriptionSummary};

/// PostgreSQL implementation of the BillingReader port.
pub struct PostgresBillingReader {
    pool: PgPool,
}

impl PostgresBillingReader {
    /// Creates a new PostgresBillingReader with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn db_err(e: sqlx::Error) -> StoreError {
    StoreError::Database(e.to_string())
}

#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    id: Uuid,
    creem_subscription_id: String,
    creem_product_id: Option<String>,
    status: String,
    current_period_start: Option<DateTime<Utc>>,
    current_period_end: Option<DateTime<Utc>>,
    canceled_at: Option<DateTime<Utc>>,
}

impl TryFrom<SubscriptionRow> for SubscriptionSummary {
    type Error = StoreError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        let status = SubscriptionStatus::parse(&row.status)
            .ok_or_else(|| StoreError::Database(format!("Invalid status value: {}", row.status)))?;

        Ok(SubscriptionSummary {
            id: row.id,
            creem_subscription_id: row.creem_subscription_id,
            creem_product_id: row.creem_product_id,
            status,
            current_period_start: row.current_period_start,
            current_period_end: row.current_period_end,
            canceled_at: row.canceled_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct LedgerRow {
    amount: i64,
    #[sqlx(rename = "type")]
    entry_type: String,
    description: Option<String>,
    creem_order_id: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<LedgerRow> for LedgerEntrySummary {
    type Error = StoreError;

    fn try_from(row: LedgerRow) -> Result<Self, Self::Error> {
        let entry_type = LedgerEntryType::parse(&row.entry_type).ok_or_else(|| {
            StoreError::Database(format!("Invalid entry type: {}", row.entry_type))
        })?;

        Ok(LedgerEntrySummary {
            amount: row.amount,
            entry_type,
            description: row.description,
            creem_order_id: row.creem_order_id,
            created_at: row.created_at,
        })
    }
}

#[async_trait]
impl BillingReader for PostgresBillingReader {
    async fn active_subscription(
        &self,
        user_id: &str,
    ) -> Result<Option<SubscriptionSummary>, StoreError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(
            r#"
            SELECT s.id, s.creem_subscription_id, s.creem_product_id, s.status,
                   s.current_period_start, s.current_period_end, s.canceled_at
            FROM subscriptions s
            JOIN customers c ON c.id = s.customer_id
            WHERE c.user_id = $1 AND s.status = 'active'
            ORDER BY s.updated_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(SubscriptionSummary::try_from).transpose()
    }

    async fn credit_balance(&self, user_id: &str) -> Result<i64, StoreError> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT credits FROM customers WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;

        // No customer record means the user never purchased anything.
        Ok(row.map(|(credits,)| credits).unwrap_or(0))
    }

    async fn credit_history(&self, user_id: &str) -> Result<Vec<LedgerEntrySummary>, StoreError> {
        let rows: Vec<LedgerRow> = sqlx::query_as(
            r#"
            SELECT h.amount, h.type, h.description, h.creem_order_id, h.created_at
            FROM credits_history h
            JOIN customers c ON c.id = h.customer_id
            WHERE c.user_id = $1
            ORDER BY h.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter()
            .map(LedgerEntrySummary::try_from)
            .collect()
    }
}
