//! Collaborator traits for the ingest pipeline
//!
//! The orchestrator only talks to these seams; `db::SqliteStore`,
//! `services::FsArtifactSink` and `services::ChessComClient` are the
//! production implementations. All are `Send + Sync` so one instance can be
//! shared by every worker.

use crate::error::FetchError;
use crate::models::{CatalogVersion, IngestRun, ParsedGame, RunReport, YearMonth};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chs_common::Result;
use std::collections::HashSet;
use uuid::Uuid;

/// Per-user monthly game archive
#[async_trait]
pub trait ArchiveSource: Send + Sync {
    /// Months with archived games, oldest first
    async fn list_archives(&self, subject: &str) -> std::result::Result<Vec<YearMonth>, FetchError>;

    /// Raw PGN bytes for one month
    async fn fetch_month(
        &self,
        subject: &str,
        month: YearMonth,
    ) -> std::result::Result<Vec<u8>, FetchError>;
}

/// Run record persistence
#[async_trait]
pub trait RunRepository: Send + Sync {
    /// Insert or replace the stored run
    async fn save_run(&self, run: &IngestRun) -> Result<()>;

    async fn load_run(&self, run_id: Uuid) -> Result<Option<IngestRun>>;
}

/// Outcome of inserting one game
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// Game, moves and positions stored
    Inserted { moves: u64, positions: u64 },
    /// `external_id` already present; nothing written
    Duplicate,
}

/// Game, move and position persistence
#[async_trait]
pub trait GameRepository: Send + Sync {
    /// Subset of `external_ids` already stored
    async fn find_existing_ids(&self, external_ids: &[String]) -> Result<HashSet<String>>;

    /// Insert a game with its moves and positions in one transaction
    async fn insert_game(&self, subject: &str, run_id: Uuid, game: &ParsedGame) -> Result<InsertOutcome>;

    async fn count_games(&self, subject: &str) -> Result<u64>;
}

/// Dataset catalog
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Create or overwrite `(dataset, version)`; returns true if created
    async fn upsert_version(
        &self,
        dataset_name: &str,
        version: &str,
        rows: u64,
        size_bytes: u64,
    ) -> Result<bool>;

    async fn get_version(&self, dataset_name: &str, version: &str) -> Result<Option<CatalogVersion>>;

    /// All versions of a dataset, ordered by version label
    async fn list_versions(&self, dataset_name: &str) -> Result<Vec<CatalogVersion>>;
}

/// Destination for run reports and raw blobs
#[async_trait]
pub trait ArtifactSink: Send + Sync {
    /// Store the run report, returning its location URI
    async fn put_report(&self, run_id: Uuid, report: &RunReport) -> Result<String>;

    /// Store raw bytes under a relative key, returning the location URI
    async fn write_blob(&self, key: &str, bytes: &[u8]) -> Result<String>;
}

/// Time source
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
