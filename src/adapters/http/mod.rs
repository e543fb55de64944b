//! HTTP adapters (axum).

pub mod billing;

pub use billing::{billing_router, BillingAppState};
