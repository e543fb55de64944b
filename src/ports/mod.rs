//! Port definitions (interfaces) for the hexagonal architecture.
//!
//! Ports define the contracts between the application core and the outside
//! world. Adapters implement these traits.

mod billing_reader;
mod billing_store;

pub use billing_reader::{BillingReader, LedgerEntrySummary, SubscriptionSummary};
pub use billing_store::BillingStore;
