//! Error types for webhook handling and billing state mutation.
//!
//! Defines the error conditions that can occur while processing a webhook
//! event, with HTTP status code mapping and retryability semantics. The
//! status code is what drives Creem's redelivery behavior, so the mapping
//! here is part of the delivery contract, not cosmetics.

use axum::http::StatusCode;
use thiserror::Error;

/// Errors from the billing store (the state synchronizer).
#[derive(Debug, Error)]
pub enum StoreError {
    /// The referenced customer row does not exist.
    ///
    /// On the webhook path the customer is upserted before any credit
    /// mutation, so hitting this usually means eventual consistency or a
    /// caller bug.
    #[error("Customer not found")]
    CustomerNotFound,

    /// A debit would drive the balance negative. Nothing is written.
    #[error("Insufficient credits: requested {requested}, available {available}")]
    InsufficientCredits { requested: i64, available: i64 },

    /// Credit mutations require a strictly positive amount.
    #[error("Invalid credit amount: {0}")]
    InvalidAmount(i64),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(String),
}

/// Errors that occur during webhook processing.
///
/// Unknown event types are NOT an error; they are acknowledged and ignored.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Signature verification failed (or the signature header was absent).
    #[error("Invalid signature")]
    InvalidSignature,

    /// Failed to parse the event envelope or its payload.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Required metadata field missing from the event (business-rule
    /// violation, e.g. no user id anywhere in a checkout).
    #[error("Missing metadata: {0}")]
    MissingMetadata(&'static str),

    /// Required field missing from the webhook payload.
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// The state synchronizer failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl WebhookError {
    /// Returns true if Creem should retry delivering this webhook.
    ///
    /// Retryable errors indicate temporary failures that may succeed on a
    /// subsequent delivery. Every upsert is idempotent, so redelivery after
    /// a partial failure converges to the correct state.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WebhookError::Store(StoreError::Database(_))
                | WebhookError::Store(StoreError::CustomerNotFound)
        )
    }

    /// Maps the error to an HTTP status code.
    ///
    /// Status codes determine Creem's retry behavior:
    /// - 2xx: event acknowledged, no retry
    /// - 4xx: client error, no retry
    /// - 5xx: server error, will retry
    pub fn status_code(&self) -> StatusCode {
        match self {
            // Auth failure - don't retry
            WebhookError::InvalidSignature => StatusCode::UNAUTHORIZED,

            // Malformed or incomplete event - don't retry
            WebhookError::ParseError(_)
            | WebhookError::MissingMetadata(_)
            | WebhookError::MissingField(_) => StatusCode::BAD_REQUEST,

            // Domain rejections - don't retry (never hit on the webhook path)
            WebhookError::Store(StoreError::InsufficientCredits { .. })
            | WebhookError::Store(StoreError::InvalidAmount(_)) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }

            // Server errors - will retry
            WebhookError::Store(StoreError::CustomerNotFound)
            | WebhookError::Store(StoreError::Database(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
