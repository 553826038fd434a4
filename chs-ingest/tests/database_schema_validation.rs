//! Schema validation for the ingest database

mod helpers;

use helpers::{create_test_env, get_table_columns, has_column, ScriptedSource};
use sqlx::sqlite::SqlitePoolOptions;
use tempfile::TempDir;

#[tokio::test]
async fn test_tables_have_expected_columns() {
    let env = create_test_env(ScriptedSource::new(), 1).await;
    let pool = env.store.pool();

    for column in ["run_id", "subject", "status", "months_completed", "report_location", "error"] {
        assert!(has_column(pool, "ingest_runs", column).await, "ingest_runs.{}", column);
    }
    for column in ["external_id", "end_time", "time_control", "result", "pgn"] {
        assert!(has_column(pool, "games", column).await, "games.{}", column);
    }
    for column in ["ply", "san", "uci", "color"] {
        assert!(has_column(pool, "moves", column).await, "moves.{}", column);
    }
    for column in ["ply", "fen", "side_to_move", "legal_moves"] {
        assert!(has_column(pool, "positions", column).await, "positions.{}", column);
    }
    for column in ["version", "row_count", "size_bytes"] {
        assert!(has_column(pool, "dataset_versions", column).await, "dataset_versions.{}", column);
    }
}

#[tokio::test]
async fn test_version_table_is_keyed_by_dataset_and_version() {
    let env = create_test_env(ScriptedSource::new(), 1).await;
    let columns = get_table_columns(env.store.pool(), "dataset_versions").await;

    let mut key: Vec<(i32, String)> = columns
        .into_iter()
        .filter(|c| c.pk > 0)
        .map(|c| (c.pk, c.name))
        .collect();
    key.sort();
    assert_eq!(
        key,
        vec![(1, "dataset_id".to_string()), (2, "version".to_string())]
    );
}

#[tokio::test]
async fn test_external_id_is_unique() {
    let env = create_test_env(ScriptedSource::new(), 1).await;
    let pool = env.store.pool();

    let insert = "INSERT INTO games (game_id, external_id, subject, result, pgn, created_at)
                  VALUES (?, 'same', 'alice', 'UNKNOWN', '', '2024-01-01T00:00:00Z')";
    sqlx::query(insert).bind("g1").execute(pool).await.unwrap();
    let err = sqlx::query(insert).bind("g2").execute(pool).await.unwrap_err();

    assert!(chs_common::Error::Database(err).is_unique_violation());
}

#[tokio::test]
async fn test_existing_positions_table_gains_legal_moves() {
    let dir = TempDir::new().unwrap();
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("old.db").display());
    let pool = SqlitePoolOptions::new().connect(&url).await.unwrap();

    // Positions table as created by schema version 1
    sqlx::query(
        "CREATE TABLE positions (
            game_id TEXT NOT NULL,
            ply INTEGER NOT NULL,
            fen TEXT NOT NULL,
            side_to_move TEXT NOT NULL,
            PRIMARY KEY (game_id, ply)
        )",
    )
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query("INSERT INTO positions VALUES ('g1', 1, 'x', 'BLACK')")
        .execute(&pool)
        .await
        .unwrap();

    chs_common::db::init_schema(&pool).await.unwrap();
    // Second pass is a no-op
    chs_common::db::init_schema(&pool).await.unwrap();

    assert!(has_column(&pool, "positions", "legal_moves").await);
    let stored: String = sqlx::query_scalar("SELECT legal_moves FROM positions WHERE game_id = 'g1'")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(stored, "[]");
    assert_eq!(
        chs_common::db::schema_version(&pool).await.unwrap(),
        chs_common::db::CURRENT_SCHEMA_VERSION
    );
}
