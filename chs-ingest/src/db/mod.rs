//! SQLite-backed stores
//!
//! `SqliteStore` wraps one pool and implements the run, game and catalog
//! repositories. Schema lives in `chs_common::db`.

pub mod catalog;
pub mod games;
pub mod runs;

use chs_common::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Run, game and catalog persistence on a shared pool
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if needed) the database file and apply the schema
    pub async fn open(db_path: &Path) -> Result<Self> {
        let pool = chs_common::db::init_database(db_path).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Parse an RFC 3339 column value
pub(crate) fn parse_timestamp(
    column: &str,
    value: &str,
) -> Result<chrono::DateTime<chrono::Utc>> {
    chrono::DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .map_err(|e| chs_common::Error::Internal(format!("Failed to parse {}: {}", column, e)))
}
