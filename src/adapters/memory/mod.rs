//! In-memory adapter implementations for tests.

mod billing_store;

pub use billing_store::InMemoryBillingStore;
