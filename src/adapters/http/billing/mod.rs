//! HTTP adapter for billing endpoints.
//!
//! Exposes the billing domain via REST API:
//! - `POST /api/webhooks/creem` - Handle Creem webhooks (signature verified)
//! - `GET /api/billing/subscription` - Current user's active subscription
//! - `GET /api/billing/credits` - Current user's credit balance
//! - `GET /api/billing/credits/history` - Current user's credit ledger

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::BillingAppState;
pub use routes::billing_router;
