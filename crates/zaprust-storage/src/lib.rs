//! ZapRust Storage - PostgreSQL access layer
//!
//! This crate provides the database pool, row models, and one
//! repository per entity for ZapRust.

pub mod db;
pub mod models;
pub mod repository;

pub use db::DatabasePool;
pub use models::*;
pub use repository::*;
