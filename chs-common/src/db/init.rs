//! Database initialization
//!
//! Opens (creating if needed) the SQLite database and applies the schema.
//! Schema creation is idempotent; calling `init_database` on an existing file
//! leaves stored rows untouched.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Current schema version
///
/// Increment when a table definition below changes.
pub const CURRENT_SCHEMA_VERSION: i64 = 2;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    // WAL lets concurrent runs read while one writes
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;

    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    init_schema(&pool).await?;

    Ok(pool)
}

/// Create all tables and indexes (idempotent)
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    create_schema_version_table(pool).await?;
    create_ingest_runs_table(pool).await?;
    create_games_table(pool).await?;
    create_moves_table(pool).await?;
    create_positions_table(pool).await?;
    create_datasets_table(pool).await?;
    create_dataset_versions_table(pool).await?;

    sqlx::query(
        "INSERT INTO schema_version (version, applied_at) VALUES (?, ?)
         ON CONFLICT(version) DO NOTHING",
    )
    .bind(CURRENT_SCHEMA_VERSION)
    .bind(chrono::Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

/// Highest schema version recorded in the database
pub async fn schema_version(pool: &SqlitePool) -> Result<i64> {
    let version: Option<i64> = sqlx::query_scalar("SELECT MAX(version) FROM schema_version")
        .fetch_one(pool)
        .await?;
    Ok(version.unwrap_or(0))
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_ingest_runs_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS ingest_runs (
            run_id TEXT PRIMARY KEY,
            subject TEXT NOT NULL,
            dataset_name TEXT NOT NULL,
            requested_months TEXT NOT NULL DEFAULT '[]',
            status TEXT NOT NULL,
            started_at TEXT NOT NULL,
            finished_at TEXT,
            games_added INTEGER NOT NULL DEFAULT 0,
            games_skipped INTEGER NOT NULL DEFAULT 0,
            moves_added INTEGER NOT NULL DEFAULT 0,
            positions_added INTEGER NOT NULL DEFAULT 0,
            months_completed INTEGER NOT NULL DEFAULT 0,
            report_location TEXT,
            error TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_ingest_runs_subject ON ingest_runs(subject)")
        .execute(pool)
        .await?;
    Ok(())
}

async fn create_games_table(pool: &SqlitePool) -> Result<()> {
    // UNIQUE(external_id) is the dedup source of truth for concurrent runs
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS games (
            game_id TEXT PRIMARY KEY,
            external_id TEXT NOT NULL UNIQUE,
            subject TEXT NOT NULL,
            run_id TEXT,
            end_time TEXT,
            time_control TEXT,
            result TEXT NOT NULL,
            white TEXT,
            black TEXT,
            white_rating INTEGER,
            black_rating INTEGER,
            pgn TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_games_subject ON games(subject)")
        .execute(pool)
        .await?;
    Ok(())
}

async fn create_moves_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS moves (
            game_id TEXT NOT NULL REFERENCES games(game_id) ON DELETE CASCADE,
            ply INTEGER NOT NULL,
            san TEXT NOT NULL,
            uci TEXT NOT NULL,
            color TEXT NOT NULL,
            PRIMARY KEY (game_id, ply)
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_positions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS positions (
            game_id TEXT NOT NULL REFERENCES games(game_id) ON DELETE CASCADE,
            ply INTEGER NOT NULL,
            fen TEXT NOT NULL,
            side_to_move TEXT NOT NULL,
            legal_moves TEXT NOT NULL DEFAULT '[]',
            PRIMARY KEY (game_id, ply)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Added in schema version 2
    add_column_if_missing(pool, "positions", "legal_moves", "TEXT NOT NULL DEFAULT '[]'").await
}

/// ALTER TABLE ADD COLUMN unless `table` already has `column`
async fn add_column_if_missing(
    pool: &SqlitePool,
    table: &str,
    column: &str,
    definition: &str,
) -> Result<()> {
    let columns: Vec<String> = sqlx::query_scalar(&format!("SELECT name FROM pragma_table_info('{}')", table))
        .fetch_all(pool)
        .await?;
    if columns.iter().any(|c| c == column) {
        return Ok(());
    }

    info!("Adding column {}.{}", table, column);
    let sql = format!("ALTER TABLE {} ADD COLUMN {} {}", table, column, definition);
    match sqlx::query(&sql).execute(pool).await {
        Ok(_) => Ok(()),
        // Another connection added it first
        Err(sqlx::Error::Database(db_err)) if db_err.message().contains("duplicate column") => Ok(()),
        Err(e) => Err(e.into()),
    }
}

async fn create_datasets_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS datasets (
            dataset_id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE COLLATE NOCASE,
            latest_version TEXT,
            size_rows INTEGER NOT NULL DEFAULT 0,
            size_bytes INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_dataset_versions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS dataset_versions (
            dataset_id TEXT NOT NULL REFERENCES datasets(dataset_id) ON DELETE CASCADE,
            version TEXT NOT NULL,
            row_count INTEGER NOT NULL,
            size_bytes INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (dataset_id, version)
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}
