//! PostgreSQL adapter implementations.

mod billing_reader;
mod billing_store;

pub use billing_reader::PostgresBillingReader;
pub use billing_store::PostgresBillingStore;
