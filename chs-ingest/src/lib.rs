//! chs-ingest library interface
//!
//! Fetches a player's monthly PGN archives, replays every game into moves and
//! positions, and persists them with a per-month dataset catalog.
//!
//! Exposes public APIs for the binary and integration tests.

pub mod board;
pub mod db;
pub mod error;
pub mod models;
pub mod pgn;
pub mod services;
pub mod types;
pub mod utils;

pub use crate::db::SqliteStore;
pub use crate::error::{FetchError, IngestError, IngestResult};
pub use crate::services::{Collaborators, IngestOrchestrator};
