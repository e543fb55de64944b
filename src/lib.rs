//! Creem Sync - Payment webhook receiver
//!
//! Accepts asynchronous billing notifications from the Creem payment
//! processor, verifies their authenticity, and synchronizes customers,
//! subscriptions, and credit balances into PostgreSQL.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
