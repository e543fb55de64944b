//! Application layer.
//!
//! Orchestrates domain operations through command handlers.

pub mod handlers;
