//! Dataset catalog persistence
//!
//! Version rows are keyed by `(dataset_id, version)`; re-upserting the same
//! key overwrites counts instead of adding a row. The dataset row keeps the
//! highest version label as `latest_version` and the totals across versions.

use super::{parse_timestamp, SqliteStore};
use crate::models::{CatalogVersion, Dataset};
use crate::types::CatalogStore;
use crate::utils::{retry_on_lock, DEFAULT_MAX_LOCK_WAIT_MS};
use async_trait::async_trait;
use chs_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

impl SqliteStore {
    async fn try_upsert_version(
        &self,
        dataset_name: &str,
        version: &str,
        rows: u64,
        size_bytes: u64,
    ) -> Result<bool> {
        let now = chrono::Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;

        // Register dataset if absent
        sqlx::query(
            r#"
            INSERT INTO datasets (dataset_id, name, size_rows, size_bytes, created_at, updated_at)
            VALUES (?, ?, 0, 0, ?, ?)
            ON CONFLICT(name) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(dataset_name)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        let dataset_id: String = sqlx::query_scalar("SELECT dataset_id FROM datasets WHERE name = ?")
            .bind(dataset_name)
            .fetch_one(&mut *tx)
            .await?;

        let exists: Option<i64> = sqlx::query_scalar(
            "SELECT 1 FROM dataset_versions WHERE dataset_id = ? AND version = ?",
        )
        .bind(&dataset_id)
        .bind(version)
        .fetch_optional(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO dataset_versions (dataset_id, version, row_count, size_bytes, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(dataset_id, version) DO UPDATE SET
                row_count = excluded.row_count,
                size_bytes = excluded.size_bytes,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&dataset_id)
        .bind(version)
        .bind(rows as i64)
        .bind(size_bytes as i64)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE datasets SET
                latest_version = CASE
                    WHEN latest_version IS NULL OR latest_version < ?1 THEN ?1
                    ELSE latest_version
                END,
                size_rows = (SELECT COALESCE(SUM(row_count), 0) FROM dataset_versions WHERE dataset_id = ?2),
                size_bytes = (SELECT COALESCE(SUM(size_bytes), 0) FROM dataset_versions WHERE dataset_id = ?2),
                updated_at = ?3
            WHERE dataset_id = ?2
            "#,
        )
        .bind(version)
        .bind(&dataset_id)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(exists.is_none())
    }

    /// Dataset row by name (case-insensitive)
    pub async fn get_dataset(&self, dataset_name: &str) -> Result<Option<Dataset>> {
        let row = sqlx::query(
            r#"
            SELECT name, latest_version, size_rows, size_bytes, created_at, updated_at
            FROM datasets WHERE name = ?
            "#,
        )
        .bind(dataset_name)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            let created_at: String = row.get("created_at");
            let updated_at: String = row.get("updated_at");
            Ok(Dataset {
                name: row.get("name"),
                latest_version: row.get("latest_version"),
                size_rows: row.get::<i64, _>("size_rows") as u64,
                size_bytes: row.get::<i64, _>("size_bytes") as u64,
                created_at: parse_timestamp("created_at", &created_at)?,
                updated_at: parse_timestamp("updated_at", &updated_at)?,
            })
        })
        .transpose()
    }
}

fn version_from_row(row: &SqliteRow) -> Result<CatalogVersion> {
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");
    Ok(CatalogVersion {
        dataset_name: row.get("name"),
        version: row.get("version"),
        rows: row.get::<i64, _>("row_count") as u64,
        size_bytes: row.get::<i64, _>("size_bytes") as u64,
        created_at: parse_timestamp("created_at", &created_at)?,
        updated_at: parse_timestamp("updated_at", &updated_at)?,
    })
}

const VERSION_SELECT: &str = r#"
    SELECT d.name, v.version, v.row_count, v.size_bytes, v.created_at, v.updated_at
    FROM dataset_versions v
    JOIN datasets d ON d.dataset_id = v.dataset_id
"#;

#[async_trait]
impl CatalogStore for SqliteStore {
    async fn upsert_version(
        &self,
        dataset_name: &str,
        version: &str,
        rows: u64,
        size_bytes: u64,
    ) -> Result<bool> {
        if dataset_name.trim().is_empty() || version.trim().is_empty() {
            return Err(Error::InvalidInput(
                "Dataset name and version must not be empty".to_string(),
            ));
        }

        let created = retry_on_lock("upsert_version", DEFAULT_MAX_LOCK_WAIT_MS, || {
            self.try_upsert_version(dataset_name, version, rows, size_bytes)
        })
        .await?;

        tracing::debug!(
            dataset = dataset_name,
            version,
            rows,
            size_bytes,
            created,
            "Catalog version upserted"
        );
        Ok(created)
    }

    async fn get_version(&self, dataset_name: &str, version: &str) -> Result<Option<CatalogVersion>> {
        let sql = format!("{} WHERE d.name = ? AND v.version = ?", VERSION_SELECT);
        let row = sqlx::query(&sql)
            .bind(dataset_name)
            .bind(version)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(version_from_row).transpose()
    }

    async fn list_versions(&self, dataset_name: &str) -> Result<Vec<CatalogVersion>> {
        let sql = format!("{} WHERE d.name = ? ORDER BY v.version", VERSION_SELECT);
        let rows = sqlx::query(&sql)
            .bind(dataset_name)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(version_from_row).collect()
    }
}
