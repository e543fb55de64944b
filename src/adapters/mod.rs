//! Adapter implementations of the ports.
//!
//! - `http`: axum routes and handlers (inbound)
//! - `postgres`: sqlx-backed persistence (outbound)
//! - `memory`: in-memory persistence for tests (outbound)

pub mod http;
pub mod memory;
pub mod postgres;
