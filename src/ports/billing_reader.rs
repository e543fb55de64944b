//! Read-side port for billing queries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::billing::{LedgerEntryType, StoreError, SubscriptionStatus};

/// Subscription projection returned to API consumers.
#[derive(Debug, Clone)]
pub struct SubscriptionSummary {
    pub id: Uuid,
    pub creem_subscription_id: String,
    pub creem_product_id: Option<String>,
    pub status: SubscriptionStatus,
    pub current_period_start: Option<DateTime<Utc>>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub canceled_at: Option<DateTime<Utc>>,
}

/// One row of a customer's credit history.
#[derive(Debug, Clone)]
pub struct LedgerEntrySummary {
    pub amount: i64,
    pub entry_type: LedgerEntryType,
    pub description: Option<String>,
    pub creem_order_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Read-side port for the billing API.
///
/// Queries are keyed by the application user id, not the internal customer
/// id, because callers authenticate as users.
#[async_trait]
pub trait BillingReader: Send + Sync {
    /// The user's active subscription, if any. When several rows qualify
    /// the most recently updated one wins.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Database` when the query fails.
    async fn active_subscription(
        &self,
        user_id: &str,
    ) -> Result<Option<SubscriptionSummary>, StoreError>;

    /// The user's current credit balance. Users without a customer record
    /// have a balance of zero.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Database` when the query fails.
    async fn credit_balance(&self, user_id: &str) -> Result<i64, StoreError>;

    /// The user's credit ledger, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Database` when the query fails.
    async fn credit_history(&self, user_id: &str) -> Result<Vec<LedgerEntrySummary>, StoreError>;
}
