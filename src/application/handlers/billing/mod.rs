//! Billing handlers.
//!
//! Command handlers for webhook-driven billing synchronization:
//!
//! ## Commands
//! - Processing Creem webhooks (signature check, parse, dispatch)

mod process_webhook;

pub use process_webhook::{ProcessWebhookCommand, ProcessWebhookHandler, ProcessWebhookResult};
