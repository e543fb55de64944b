//! HTTP handlers for billing endpoints.
//!
//! These handlers connect axum routes to application layer command handlers
//! and the read-side port.

use std::sync::Arc;

use axum::extract::{Json, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::application::handlers::billing::{ProcessWebhookCommand, ProcessWebhookHandler};
use crate::domain::billing::{CreemWebhookVerifier, StoreError, WebhookError};
use crate::ports::{BillingReader, BillingStore};

use super::dto::{
    CreditBalanceResponse, CreditHistoryResponse, ErrorResponse, LedgerEntryView,
    SubscriptionResponse, SubscriptionView, WebhookAck,
};

/// Header carrying the Creem webhook signature.
pub const CREEM_SIGNATURE_HEADER: &str = "creem-signature";

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared application state containing all dependencies.
///
/// This struct is cloned for each request and contains Arc-wrapped
/// dependencies for efficient sharing across handlers.
#[derive(Clone)]
pub struct BillingAppState {
    pub verifier: CreemWebhookVerifier,
    pub store: Arc<dyn BillingStore>,
    pub reader: Arc<dyn BillingReader>,
}

impl BillingAppState {
    /// Create the webhook handler on demand from the shared state.
    pub fn webhook_handler(&self) -> ProcessWebhookHandler {
        ProcessWebhookHandler::new(self.verifier.clone(), self.store.clone())
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// User Context
// ════════════════════════════════════════════════════════════════════════════════

/// Authenticated user context extracted from the request.
///
/// Identity is established upstream (gateway or session layer); this service
/// trusts the `x-user-id` header it forwards.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: String,
}

/// Rejection type for AuthenticatedUser extraction.
pub struct AuthenticationRequired;

impl IntoResponse for AuthenticationRequired {
    fn into_response(self) -> axum::response::Response {
        let error = ErrorResponse::new("Authentication is required");
        (StatusCode::UNAUTHORIZED, Json(error)).into_response()
    }
}

impl<S> axum::extract::FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AuthenticationRequired;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut axum::http::request::Parts,
        _state: &'life1 S,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self, Self::Rejection>> + Send + 'async_trait>,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            let user_id = parts
                .headers
                .get("x-user-id")
                .and_then(|v| v.to_str().ok())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .ok_or(AuthenticationRequired)?;

            Ok(AuthenticatedUser { user_id })
        })
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Webhook Handler
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/webhooks/creem - Handle Creem webhook events
///
/// Processing is synchronous: the 200 acknowledgment is only sent after the
/// state change is durable, so a failed synchronization surfaces as an error
/// status and Creem redelivers.
pub async fn handle_creem_webhook(
    State(state): State<BillingAppState>,
    headers: axum::http::HeaderMap,
    body: axum::body::Bytes,
) -> impl IntoResponse {
    let Some(signature) = headers
        .get(CREEM_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
    else {
        // Absent signature is treated the same as a bad one.
        let err = WebhookError::InvalidSignature;
        return (err.status_code(), Json(ErrorResponse::new(err.to_string()))).into_response();
    };

    let handler = state.webhook_handler();
    let cmd = ProcessWebhookCommand {
        payload: body.to_vec(),
        signature: signature.to_string(),
    };

    match handler.handle(cmd).await {
        Ok(result) => {
            tracing::debug!(result = ?result, "webhook processed");
            (StatusCode::OK, Json(WebhookAck::ok())).into_response()
        }
        Err(err) => {
            tracing::error!(
                error = %err,
                retryable = err.is_retryable(),
                "webhook processing failed"
            );
            (err.status_code(), Json(ErrorResponse::new(err.to_string()))).into_response()
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Read API Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// GET /api/billing/subscription - Current user's active subscription
pub async fn get_subscription(
    State(state): State<BillingAppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, BillingApiError> {
    let subscription = state.reader.active_subscription(&user.user_id).await?;

    Ok(Json(SubscriptionResponse {
        subscription: subscription.map(SubscriptionView::from),
    }))
}

/// GET /api/billing/credits - Current user's credit balance
pub async fn get_credit_balance(
    State(state): State<BillingAppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, BillingApiError> {
    let credits = state.reader.credit_balance(&user.user_id).await?;

    Ok(Json(CreditBalanceResponse { credits }))
}

/// GET /api/billing/credits/history - Current user's credit ledger
pub async fn get_credit_history(
    State(state): State<BillingAppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, BillingApiError> {
    let entries = state.reader.credit_history(&user.user_id).await?;

    Ok(Json(CreditHistoryResponse {
        entries: entries.into_iter().map(LedgerEntryView::from).collect(),
    }))
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts store errors to HTTP responses.
pub struct BillingApiError(StoreError);

impl From<StoreError> for BillingApiError {
    fn from(err: StoreError) -> Self {
        Self(err)
    }
}

impl IntoResponse for BillingApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self.0 {
            StoreError::CustomerNotFound => StatusCode::NOT_FOUND,
            StoreError::InsufficientCredits { .. } | StoreError::InvalidAmount(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            StoreError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Database detail stays in the logs, not the response body.
        let message = match &self.0 {
            StoreError::Database(detail) => {
                tracing::error!(error = %detail, "billing query failed");
                "Internal error".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(ErrorResponse::new(message))).into_response()
    }
}
