//! Ingest run persistence

use super::{parse_timestamp, SqliteStore};
use crate::models::{IngestRun, YearMonth};
use crate::types::RunRepository;
use crate::utils::{retry_on_lock, DEFAULT_MAX_LOCK_WAIT_MS};
use async_trait::async_trait;
use chs_common::events::{RunCounts, RunStatus};
use chs_common::{Error, Result};
use sqlx::Row;
use uuid::Uuid;

#[async_trait]
impl RunRepository for SqliteStore {
    async fn save_run(&self, run: &IngestRun) -> Result<()> {
        // Prepare all values before touching the pool
        let run_id = run.id.to_string();
        let requested_months = serde_json::to_string(&run.requested_months)?;
        let status = run.status.as_str();
        let started_at = run.started_at.to_rfc3339();
        let finished_at = run.finished_at.map(|dt| dt.to_rfc3339());
        let counts = run.counts;

        retry_on_lock("save_run", DEFAULT_MAX_LOCK_WAIT_MS, || async {
            sqlx::query(
                r#"
                INSERT INTO ingest_runs (
                    run_id, subject, dataset_name, requested_months, status,
                    started_at, finished_at, games_added, games_skipped,
                    moves_added, positions_added, months_completed,
                    report_location, error
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(run_id) DO UPDATE SET
                    status = excluded.status,
                    finished_at = excluded.finished_at,
                    games_added = excluded.games_added,
                    games_skipped = excluded.games_skipped,
                    moves_added = excluded.moves_added,
                    positions_added = excluded.positions_added,
                    months_completed = excluded.months_completed,
                    report_location = excluded.report_location,
                    error = excluded.error
                "#,
            )
            .bind(&run_id)
            .bind(&run.subject)
            .bind(&run.dataset_name)
            .bind(&requested_months)
            .bind(status)
            .bind(&started_at)
            .bind(&finished_at)
            .bind(counts.games_added as i64)
            .bind(counts.games_skipped as i64)
            .bind(counts.moves_added as i64)
            .bind(counts.positions_added as i64)
            .bind(run.months_completed as i64)
            .bind(&run.report_location)
            .bind(&run.error)
            .execute(&self.pool)
            .await?;
            Ok::<(), Error>(())
        })
        .await
    }

    async fn load_run(&self, run_id: Uuid) -> Result<Option<IngestRun>> {
        let row = sqlx::query(
            r#"
            SELECT run_id, subject, dataset_name, requested_months, status,
                   started_at, finished_at, games_added, games_skipped,
                   moves_added, positions_added, months_completed,
                   report_location, error
            FROM ingest_runs
            WHERE run_id = ?
            "#,
        )
        .bind(run_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let requested_months: String = row.get("requested_months");
        let requested_months: Vec<YearMonth> = serde_json::from_str(&requested_months)
            .map_err(|e| Error::Internal(format!("Failed to deserialize requested_months: {}", e)))?;

        let status: String = row.get("status");
        let status: RunStatus = status.parse()?;

        let started_at: String = row.get("started_at");
        let finished_at: Option<String> = row.get("finished_at");

        Ok(Some(IngestRun {
            id: run_id,
            subject: row.get("subject"),
            dataset_name: row.get("dataset_name"),
            requested_months,
            status,
            started_at: parse_timestamp("started_at", &started_at)?,
            finished_at: finished_at
                .map(|s| parse_timestamp("finished_at", &s))
                .transpose()?,
            counts: RunCounts {
                games_added: row.get::<i64, _>("games_added") as u64,
                games_skipped: row.get::<i64, _>("games_skipped") as u64,
                moves_added: row.get::<i64, _>("moves_added") as u64,
                positions_added: row.get::<i64, _>("positions_added") as u64,
            },
            months_completed: row.get::<i64, _>("months_completed") as u32,
            report_location: row.get("report_location"),
            error: row.get("error"),
        }))
    }
}
