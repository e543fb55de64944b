//! Billing domain - Creem webhook events and billing state rules.
//!
//! Everything in this module is transport- and storage-agnostic: the event
//! envelope and its typed payloads, the signature verifier, and the error
//! taxonomy shared by the webhook path and the state synchronizer.

mod errors;
mod event;
mod ledger;
mod status;
mod verifier;

pub use errors::{StoreError, WebhookError};
pub use event::{
    CheckoutMetadata, CheckoutPayload, CreditPurchase, CreemCustomer, CreemEvent, CreemEventKind,
    CreemOrder, CustomerRef, EventPayload, ProductObject, ProductRef, SubscriptionPayload,
};
pub use ledger::LedgerEntryType;
pub use status::SubscriptionStatus;
pub use verifier::CreemWebhookVerifier;

#[cfg(test)]
pub use verifier::compute_test_signature;
