//! HTTP DTOs (Data Transfer Objects) for billing endpoints.
//!
//! These types define the JSON request/response structure for the billing API.
//! They serve as the boundary between HTTP and the application layer.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::ports::{LedgerEntrySummary, SubscriptionSummary};

// ════════════════════════════════════════════════════════════════════════════════
// Webhook DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Acknowledgment body returned for a successfully processed webhook.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookAck {
    pub received: bool,
}

impl WebhookAck {
    pub fn ok() -> Self {
        Self { received: true }
    }
}

/// Generic error body.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Read API DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Active subscription view, or null when the user has none.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionResponse {
    pub subscription: Option<SubscriptionView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionView {
    pub id: Uuid,
    pub creem_subscription_id: String,
    pub creem_product_id: Option<String>,
    pub status: String,
    pub current_period_start: Option<DateTime<Utc>>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub canceled_at: Option<DateTime<Utc>>,
}

impl From<SubscriptionSummary> for SubscriptionView {
    fn from(summary: SubscriptionSummary) -> Self {
        Self {
            id: summary.id,
            creem_subscription_id: summary.creem_subscription_id,
            creem_product_id: summary.creem_product_id,
            status: summary.status.as_str().to_string(),
            current_period_start: summary.current_period_start,
            current_period_end: summary.current_period_end,
            canceled_at: summary.canceled_at,
        }
    }
}

/// Credit balance view.
#[derive(Debug, Clone, Serialize)]
pub struct CreditBalanceResponse {
    pub credits: i64,
}

/// Credit ledger view, newest entry first.
#[derive(Debug, Clone, Serialize)]
pub struct CreditHistoryResponse {
    pub entries: Vec<LedgerEntryView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LedgerEntryView {
    pub amount: i64,
    #[serde(rename = "type")]
    pub entry_type: String,
    pub description: Option<String>,
    pub creem_order_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<LedgerEntrySummary> for LedgerEntryView {
    fn from(entry: LedgerEntrySummary) -> Self {
        Self {
            amount: entry.amount,
            entry_type: entry.entry_type.as_str().to_string(),
            description: entry.description,
            creem_order_id: entry.creem_order_id,
            created_at: entry.created_at,
        }
    }
}
