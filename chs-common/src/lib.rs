//! # chs-common
//!
//! Shared code for the chess-data ingest workspace:
//! - Error and result types
//! - TOML configuration and root folder resolution
//! - Database initialization (SQLite schema)
//! - Ingest event bus

pub mod config;
#[cfg(feature = "sqlx")]
pub mod db;
pub mod error;
pub mod events;

pub use error::{Error, Result};
