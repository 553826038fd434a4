//! Test Helper Utilities
//!
//! Shared utilities for testing chs-ingest

#![allow(dead_code)]

pub mod db_utils;
pub mod pgn_fixtures;
pub mod scripted_source;

// Re-export commonly used items
pub use db_utils::{create_test_env, get_table_columns, has_column, TestEnv};
pub use pgn_fixtures::{game_pgn, month_blob};
pub use scripted_source::ScriptedSource;
