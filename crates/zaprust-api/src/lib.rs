//! ZapRust API - REST API server
//!
//! This crate provides the REST surface for ZapRust: accounts and
//! their sessions, scheduled jobs, campaigns, reply rules, activity
//! and the transport webhook sink.

pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::AppState;
