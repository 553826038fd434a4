//! Game, move and position persistence
//!
//! `UNIQUE(external_id)` on `games` decides duplicates. The game row is
//! inserted with `ON CONFLICT DO NOTHING`; zero affected rows means another
//! run (or an earlier one) already stored it, and the transaction is rolled
//! back without touching moves or positions.

use super::SqliteStore;
use crate::models::ParsedGame;
use crate::types::{GameRepository, InsertOutcome};
use crate::utils::{retry_on_lock, DEFAULT_MAX_LOCK_WAIT_MS};
use async_trait::async_trait;
use chs_common::{Error, Result};
use std::collections::HashSet;
use uuid::Uuid;

/// SQLite host parameter budget per `IN (...)` query
const ID_BATCH_SIZE: usize = 500;

impl SqliteStore {
    async fn try_insert_game(
        &self,
        subject: &str,
        run_id: Uuid,
        game: &ParsedGame,
    ) -> Result<InsertOutcome> {
        let game_id = Uuid::new_v4().to_string();
        let now = chrono::Utc::now().to_rfc3339();

        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO games (
                game_id, external_id, subject, run_id, end_time, time_control,
                result, white, black, white_rating, black_rating, pgn, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(external_id) DO NOTHING
            "#,
        )
        .bind(&game_id)
        .bind(&game.external_id)
        .bind(subject)
        .bind(run_id.to_string())
        .bind(game.end_time.map(|t| t.to_rfc3339()))
        .bind(&game.time_control)
        .bind(game.result.as_str())
        .bind(&game.white)
        .bind(&game.black)
        .bind(game.white_rating)
        .bind(game.black_rating)
        .bind(&game.raw_text)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(InsertOutcome::Duplicate);
        }

        for mv in &game.moves {
            sqlx::query("INSERT INTO moves (game_id, ply, san, uci, color) VALUES (?, ?, ?, ?, ?)")
                .bind(&game_id)
                .bind(mv.ply as i64)
                .bind(&mv.algebraic_notation)
                .bind(&mv.compact_notation)
                .bind(mv.side_to_move.as_str())
                .execute(&mut *tx)
                .await?;
        }

        for pos in &game.positions {
            sqlx::query(
                "INSERT INTO positions (game_id, ply, fen, side_to_move, legal_moves) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&game_id)
            .bind(pos.ply as i64)
            .bind(&pos.fen)
            .bind(pos.side_to_move_after.as_str())
            .bind(serde_json::to_string(&pos.legal_moves)?)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(InsertOutcome::Inserted {
            moves: game.moves.len() as u64,
            positions: game.positions.len() as u64,
        })
    }
}

#[async_trait]
impl GameRepository for SqliteStore {
    async fn find_existing_ids(&self, external_ids: &[String]) -> Result<HashSet<String>> {
        let mut existing = HashSet::new();

        for batch in external_ids.chunks(ID_BATCH_SIZE) {
            let placeholders = vec!["?"; batch.len()].join(", ");
            let sql = format!(
                "SELECT external_id FROM games WHERE external_id IN ({})",
                placeholders
            );

            let mut query = sqlx::query_scalar::<_, String>(&sql);
            for id in batch {
                query = query.bind(id);
            }
            existing.extend(query.fetch_all(&self.pool).await?);
        }

        Ok(existing)
    }

    async fn insert_game(&self, subject: &str, run_id: Uuid, game: &ParsedGame) -> Result<InsertOutcome> {
        let result = retry_on_lock("insert_game", DEFAULT_MAX_LOCK_WAIT_MS, || {
            self.try_insert_game(subject, run_id, game)
        })
        .await;

        match result {
            Err(err) if err.is_unique_violation() => {
                tracing::debug!(
                    external_id = %game.external_id,
                    "Unique violation on insert, treating as duplicate"
                );
                Ok(InsertOutcome::Duplicate)
            }
            other => other,
        }
    }

    async fn count_games(&self, subject: &str) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM games WHERE subject = ?")
            .bind(subject)
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(count as u64)
    }
}
