//! Domain layer - billing rules independent of transport and storage.

pub mod billing;
