//! In-memory implementation of BillingStore and BillingReader.
//!
//! Mirrors the PostgreSQL adapter's semantics (COALESCE-style upserts,
//! order-keyed grant dedup, fail-closed debits) so handler and HTTP tests
//! exercise the same behavior without a database.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::billing::{
    CreemCustomer, LedgerEntryType, StoreError, SubscriptionPayload,
};
use crate::ports::{BillingReader, BillingStore, LedgerEntrySummary, SubscriptionSummary};

#[derive(Debug, Clone)]
struct CustomerRecord {
    id: Uuid,
    user_id: String,
    creem_customer_id: String,
    email: Option<String>,
    name: Option<String>,
    country: Option<String>,
    credits: i64,
}

#[derive(Debug, Clone)]
struct SubscriptionRecord {
    id: Uuid,
    customer_id: Uuid,
    summary: SubscriptionSummary,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct LedgerRecord {
    customer_id: Uuid,
    entry: LedgerEntrySummary,
}

#[derive(Debug, Default)]
struct Inner {
    customers: Vec<CustomerRecord>,
    subscriptions: Vec<SubscriptionRecord>,
    ledger: Vec<LedgerRecord>,
}

/// In-memory billing store for tests.
#[derive(Debug, Default)]
pub struct InMemoryBillingStore {
    inner: Mutex<Inner>,
}

impl InMemoryBillingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored customers.
    pub fn customer_count(&self) -> usize {
        self.inner.lock().unwrap().customers.len()
    }

    /// Number of stored subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.inner.lock().unwrap().subscriptions.len()
    }

    /// Number of ledger entries.
    pub fn ledger_count(&self) -> usize {
        self.inner.lock().unwrap().ledger.len()
    }
}

#[async_trait]
impl BillingStore for InMemoryBillingStore {
    async fn upsert_customer(
        &self,
        customer: &CreemCustomer,
        user_id: &str,
    ) -> Result<Uuid, StoreError> {
        let mut inner = self.inner.lock().unwrap();

        if let Some(existing) = inner
            .customers
            .iter_mut()
            .find(|c| c.creem_customer_id == customer.id)
        {
            existing.user_id = user_id.to_string();
            if customer.email.is_some() {
                existing.email = customer.email.clone();
            }
            if customer.name.is_some() {
                existing.name = customer.name.clone();
            }
            if customer.country.is_some() {
                existing.country = customer.country.clone();
            }
            return Ok(existing.id);
        }

        let id = Uuid::new_v4();
        inner.customers.push(CustomerRecord {
            id,
            user_id: user_id.to_string(),
            creem_customer_id: customer.id.clone(),
            email: customer.email.clone(),
            name: customer.name.clone(),
            country: customer.country.clone(),
            credits: 0,
        });
        Ok(id)
    }

    async fn upsert_subscription(
        &self,
        subscription: &SubscriptionPayload,
        customer_id: Uuid,
    ) -> Result<Uuid, StoreError> {
        let mut inner = self.inner.lock().unwrap();

        if let Some(existing) = inner
            .subscriptions
            .iter_mut()
            .find(|s| s.summary.creem_subscription_id == subscription.id)
        {
            existing.customer_id = customer_id;
            existing.summary.status = subscription.status;
            if let Some(product_id) = subscription.product_id() {
                existing.summary.creem_product_id = Some(product_id.to_string());
            }
            if subscription.current_period_start_date.is_some() {
                existing.summary.current_period_start = subscription.current_period_start_date;
            }
            if subscription.current_period_end_date.is_some() {
                existing.summary.current_period_end = subscription.current_period_end_date;
            }
            existing.summary.canceled_at = subscription.canceled_at;
            existing.updated_at = Utc::now();
            return Ok(existing.id);
        }

        let id = Uuid::new_v4();
        inner.subscriptions.push(SubscriptionRecord {
            id,
            customer_id,
            summary: SubscriptionSummary {
                id,
                creem_subscription_id: subscription.id.clone(),
                creem_product_id: subscription.product_id().map(str::to_string),
                status: subscription.status,
                current_period_start: subscription.current_period_start_date,
                current_period_end: subscription.current_period_end_date,
                canceled_at: subscription.canceled_at,
            },
            updated_at: Utc::now(),
        });
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

        let mut inner = self.inner.lock().unwrap();

        if let Some(order_id) = order_id {
            let duplicate = inner.ledger.iter().any(|l| {
                l.customer_id == customer_id
                    && l.entry.creem_order_id.as_deref() == Some(order_id)
                    && l.entry.entry_type == LedgerEntryType::Add
            });
            if duplicate {
                let customer = inner
                    .customers
                    .iter()
                    .find(|c| c.id == customer_id)
                    .ok_or(StoreError::CustomerNotFound)?;
                return Ok(customer.credits);
            }
        }

        let customer = inner
            .customers
            .iter_mut()
            .find(|c| c.id == customer_id)
            .ok_or(StoreError::CustomerNotFound)?;
        customer.credits += amount;
        let balance = customer.credits;

        inner.ledger.push(LedgerRecord {
            customer_id,
            entry: LedgerEntrySummary {
                amount,
                entry_type: LedgerEntryType::Add,
                description: Some(description.to_string()),
                creem_order_id: order_id.map(str::to_string),
                created_at: Utc::now(),
            },
        });

        Ok(balance)
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

        let mut inner = self.inner.lock().unwrap();

        let customer = inner
            .customers
            .iter_mut()
            .find(|c| c.id == customer_id)
            .ok_or(StoreError::CustomerNotFound)?;

        if customer.credits < amount {
            return Err(StoreError::InsufficientCredits {
                requested: amount,
                available: customer.credits,
            });
        }

        customer.credits -= amount;
        let balance = customer.credits;

        inner.ledger.push(LedgerRecord {
            customer_id,
            entry: LedgerEntrySummary {
                amount: -amount,
                entry_type: LedgerEntryType::Subtract,
                description: Some(description.to_string()),
                creem_order_id: None,
                created_at: Utc::now(),
            },
        });

        Ok(balance)
    }
}

#[async_trait]
impl BillingReader for InMemoryBillingStore {
    async fn active_subscription(
        &self,
        user_id: &str,
    ) -> Result<Option<SubscriptionSummary>, StoreError> {
        let inner = self.inner.lock().unwrap();

        let Some(customer) = inner.customers.iter().find(|c| c.user_id == user_id) else {
            return Ok(None);
        };

        Ok(inner
            .subscriptions
            .iter()
            .filter(|s| {
                s.customer_id == customer.id
                    && s.summary.status == crate::domain::billing::SubscriptionStatus::Active
            })
            .max_by_key(|s| s.updated_at)
            .map(|s| s.summary.clone()))
    }

    async fn credit_balance(&self, user_id: &str) -> Result<i64, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .customers
            .iter()
            .find(|c| c.user_id == user_id)
            .map(|c| c.credits)
            .unwrap_or(0))
    }

    async fn credit_history(&self, user_id: &str) -> Result<Vec<LedgerEntrySummary>, StoreError> {
        let inner = self.inner.lock().unwrap();

        let Some(customer) = inner.customers.iter().find(|c| c.user_id == user_id) else {
            return Ok(Vec::new());
        };

        let mut entries: Vec<LedgerEntrySummary> = inner
            .ledger
            .iter()
            .filter(|l| l.customer_id == customer.id)
            .map(|l| l.entry.clone())
            .collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(entries)
    }
}
