//! Axum router configuration for billing endpoints.
//!
//! This module defines the route structure for billing-related API endpoints
//! and wires them to their corresponding handlers.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    get_credit_balance, get_credit_history, get_subscription, handle_creem_webhook,
    BillingAppState,
};

/// Create the billing API router.
///
/// # Routes
///
/// ## User Endpoints (require authentication)
/// - `GET /subscription` - Current user's active subscription
/// - `GET /credits` - Current user's credit balance
/// - `GET /credits/history` - Current user's credit ledger
pub fn billing_routes() -> Router<BillingAppState> {
    Router::new()
        .route("/subscription", get(get_subscription))
        .route("/credits", get(get_credit_balance))
        .route("/credits/history", get(get_credit_history))
}

/// Create the Creem webhook router.
///
/// This is separate from the main billing routes because webhooks don't
/// require user authentication (they're verified via signature).
///
/// # Routes
/// - `POST /creem` - Handle Creem webhooks
pub fn webhook_routes() -> Router<BillingAppState> {
    Router::new().route("/creem", post(handle_creem_webhook))
}

/// Create the complete billing module router.
///
/// Mounted under `/api` this yields `/api/billing/*` and
/// `/api/webhooks/creem`.
pub fn billing_router() -> Router<BillingAppState> {
    Router::new()
        .nest("/billing", billing_routes())
        .nest("/webhooks", webhook_routes())
}
