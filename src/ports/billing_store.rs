//! Port for billing state mutation.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::billing::{CreemCustomer, StoreError, SubscriptionPayload};

/// Write-side port for synchronizing billing state from webhook events.
///
/// All operations are idempotent with respect to webhook redelivery:
/// upserts converge on the latest payload, and credit grants deduplicate
/// on the originating order.
#[async_trait]
pub trait BillingStore: Send + Sync {
    /// Creates or updates a customer record keyed by its Creem customer id.
    ///
    /// Absent profile fields (email, name, country) leave the stored values
    /// unchanged. Returns the internal customer id.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Database` when the write fails.
    async fn upsert_customer(
        &self,
        customer: &CreemCustomer,
        user_id: &str,
    ) -> Result<Uuid, StoreError>;

    /// Creates or updates a subscription record keyed by its Creem
    /// subscription id, attached to the given customer.
    ///
    /// Returns the internal subscription id.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Database` when the write fails.
    async fn upsert_subscription(
        &self,
        subscription: &SubscriptionPayload,
        customer_id: Uuid,
    ) -> Result<Uuid, StoreError>;

    /// Grants credits to a customer and appends a ledger entry.
    ///
    /// When `order_id` is present, redelivery of the same order is a no-op:
    /// the balance is returned unchanged and no second entry is written.
    /// Returns the balance after the grant.
    ///
    /// # Errors
    ///
    /// - `StoreError::InvalidAmount` when `amount` is not strictly positive
    /// - `StoreError::CustomerNotFound` when the customer does not exist
    /// - `StoreError::Database` when the write fails
    async fn add_credits(
        &self,
        customer_id: Uuid,
        amount: i64,
        order_id: Option<&str>,
        description: &str,
    ) -> Result<i64, StoreError>;

    /// Consumes credits from a customer and appends a ledger entry.
    ///
    /// Fails closed: when the balance cannot cover `amount`, nothing is
    /// written. Returns the balance after the debit.
    ///
    /// # Errors
    ///
    /// - `StoreError::InvalidAmount` when `amount` is not strictly positive
    /// - `StoreError::CustomerNotFound` when the customer does not exist
    /// - `StoreError::InsufficientCredits` when the balance is too low
    /// - `StoreError::Database` when the write fails
    async fn use_credits(
        &self,
        customer_id: Uuid,
        amount: i64,
        description: &str,
    ) -> Result<i64, StoreError>;
}
