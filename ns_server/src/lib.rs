//! HTTP server for Namma Suraksha community incident reporting.
//!
//! The binary in `main.rs` wires configuration, logging and the database
//! together; everything it serves lives in [`api`].

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
