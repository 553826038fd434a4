//! Database Test Utilities
//!
//! Temporary store, artifact sink and orchestrator wiring

use super::ScriptedSource;
use chs_common::events::{EventBus, IngestEvent};
use chs_ingest::services::{Collaborators, FsArtifactSink, IngestOrchestrator};
use chs_ingest::SqliteStore;
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::broadcast;

/// Column information from PRAGMA table_info
#[derive(Debug, sqlx::FromRow)]
pub struct ColumnInfo {
    pub cid: i32,
    pub name: String,
    pub r#type: String,
    pub notnull: i32,
    pub dflt_value: Option<String>,
    pub pk: i32,
}

/// Orchestrator over a temp database and artifact folder
///
/// `_dir` must be kept alive for the duration of the test.
pub struct TestEnv {
    pub _dir: TempDir,
    pub store: SqliteStore,
    pub source: Arc<ScriptedSource>,
    pub orchestrator: IngestOrchestrator,
    pub artifact_root: PathBuf,
}

impl TestEnv {
    pub fn subscribe(&self) -> broadcast::Receiver<IngestEvent> {
        self.orchestrator.event_bus().subscribe()
    }
}

/// Build a test environment with `worker_pool_size` workers
pub async fn create_test_env(source: ScriptedSource, worker_pool_size: usize) -> TestEnv {
    let dir = TempDir::new().unwrap();
    let store = SqliteStore::open(&dir.path().join("test_chs.db"))
        .await
        .unwrap();
    let artifact_root = dir.path().join("artifacts");
    let source = Arc::new(source);

    let deps = Collaborators::with_store(
        source.clone(),
        store.clone(),
        Arc::new(FsArtifactSink::new(&artifact_root)),
    );
    let orchestrator = IngestOrchestrator::new(deps, worker_pool_size, "chesscom", EventBus::new(256));

    TestEnv {
        _dir: dir,
        store,
        source,
        orchestrator,
        artifact_root,
    }
}

/// Get table schema information
pub async fn get_table_columns(pool: &SqlitePool, table_name: &str) -> Vec<ColumnInfo> {
    let query = format!("PRAGMA table_info({})", table_name);
    sqlx::query_as::<_, ColumnInfo>(&query)
        .fetch_all(pool)
        .await
        .unwrap()
}

/// Check if table has specific column
pub async fn has_column(pool: &SqlitePool, table_name: &str, column_name: &str) -> bool {
    get_table_columns(pool, table_name)
        .await
        .iter()
        .any(|c| c.name == column_name)
}
