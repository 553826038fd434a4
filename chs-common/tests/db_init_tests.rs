//! Integration tests for database initialization

use chs_common::db::init::{init_database, schema_version, CURRENT_SCHEMA_VERSION};
use tempfile::TempDir;

#[tokio::test]
async fn test_database_created_when_missing() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("sub").join("chs.db");

    let pool = init_database(&db_path).await.unwrap();

    assert!(db_path.exists());
    assert_eq!(schema_version(&pool).await.unwrap(), CURRENT_SCHEMA_VERSION);
}

#[tokio::test]
async fn test_reopen_keeps_rows() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("chs.db");

    {
        let pool = init_database(&db_path).await.unwrap();
        sqlx::query(
            "INSERT INTO datasets (dataset_id, name, created_at, updated_at)
             VALUES ('d1', 'chesscom-hikaru', 'now', 'now')",
        )
        .execute(&pool)
        .await
        .unwrap();
        pool.close().await;
    }

    let pool = init_database(&db_path).await.unwrap();
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM datasets")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_external_id_is_unique() {
    let temp_dir = TempDir::new().unwrap();
    let pool = init_database(&temp_dir.path().join("chs.db")).await.unwrap();

    let insert = "INSERT INTO games (game_id, external_id, subject, result, pgn, created_at)
                  VALUES (?, 'ext-1', 'hikaru', 'UNKNOWN', '', 'now')";
    sqlx::query(insert).bind("g1").execute(&pool).await.unwrap();
    let err = sqlx::query(insert).bind("g2").execute(&pool).await.unwrap_err();

    assert!(chs_common::Error::Database(err).is_unique_violation());
}
