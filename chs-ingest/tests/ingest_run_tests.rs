//! End-to-end ingest runs against a scripted archive
//!
//! Covers idempotent re-ingestion, failure propagation across months, the
//! event sequence, catalog versions and artifacts written per run.

mod helpers;

use chs_common::events::{IngestEvent, RunStatus};
use chs_ingest::models::RunReport;
use chs_ingest::types::{CatalogStore, GameRepository};
use chs_ingest::FetchError;
use helpers::{create_test_env, game_pgn, month_blob, ScriptedSource};
use std::path::PathBuf;

fn months(labels: &[&str]) -> Vec<chs_ingest::models::YearMonth> {
    labels.iter().map(|m| m.parse().unwrap()).collect()
}

fn file_path(location: &str) -> PathBuf {
    PathBuf::from(location.strip_prefix("file://").unwrap())
}

// ============================================================================
// Idempotence
// ============================================================================

#[tokio::test]
async fn test_second_identical_run_adds_nothing() {
    let source = ScriptedSource::new()
        .with_month("2024-01", month_blob(1, 3))
        .with_month("2024-02", month_blob(10, 2));
    let env = create_test_env(source, 2).await;

    let first_id = env
        .orchestrator
        .start_run("alice", months(&["2024-01", "2024-02"]))
        .await
        .unwrap();
    let first = env.orchestrator.wait_for_run(first_id).await.unwrap().unwrap();
    assert_eq!(first.status, RunStatus::Succeeded);
    assert_eq!(first.counts.games_added, 5);
    assert_eq!(first.counts.games_skipped, 0);
    assert_eq!(first.counts.moves_added, 30);
    assert_eq!(first.counts.positions_added, 30);

    let second_id = env
        .orchestrator
        .start_run("alice", months(&["2024-01", "2024-02"]))
        .await
        .unwrap();
    let second = env.orchestrator.wait_for_run(second_id).await.unwrap().unwrap();
    assert_eq!(second.status, RunStatus::Succeeded);
    assert_eq!(second.counts.games_added, 0);
    assert_eq!(second.counts.games_skipped, 5);
    assert_eq!(second.counts.moves_added, 0);

    assert_eq!(env.store.count_games("alice").await.unwrap(), 5);

    // Re-run overwrites the same versions instead of adding rows
    let versions = env.store.list_versions("chesscom-alice").await.unwrap();
    assert_eq!(versions.len(), 2);
    assert_eq!(versions[0].version, "v2024-01");
    assert_eq!(versions[0].rows, 3);
    assert_eq!(versions[1].rows, 2);

    let dataset = env.store.get_dataset("chesscom-alice").await.unwrap().unwrap();
    assert_eq!(dataset.latest_version.as_deref(), Some("v2024-02"));
    assert_eq!(dataset.size_rows, 5);
}

#[tokio::test]
async fn test_subject_case_does_not_split_dataset() {
    let source = ScriptedSource::new().with_month("2024-01", month_blob(1, 2));
    let env = create_test_env(source, 1).await;

    let a = env.orchestrator.start_run("Alice", months(&["2024-01"])).await.unwrap();
    env.orchestrator.wait_for_run(a).await.unwrap();
    let b = env.orchestrator.start_run("ALICE", months(&["2024-01"])).await.unwrap();
    let run = env.orchestrator.wait_for_run(b).await.unwrap().unwrap();

    assert_eq!(run.dataset_name, "chesscom-alice");
    assert_eq!(run.counts.games_skipped, 2);
    assert_eq!(env.store.count_games("alice").await.unwrap(), 2);
}

// ============================================================================
// Failure propagation
// ============================================================================

#[tokio::test]
async fn test_terminal_fetch_error_fails_run_and_keeps_earlier_months() {
    let source = ScriptedSource::new()
        .with_month("2024-01", month_blob(1, 2))
        .with_failure(
            "2024-02",
            FetchError::Status {
                status: 404,
                url: "https://api.chess.com/pub/player/alice/games/2024/02/pgn".to_string(),
            },
        )
        .with_month("2024-03", month_blob(20, 2));
    let env = create_test_env(source, 1).await;

    let run_id = env
        .orchestrator
        .start_run("alice", months(&["2024-01", "2024-02", "2024-03"]))
        .await
        .unwrap();
    let run = env.orchestrator.wait_for_run(run_id).await.unwrap().unwrap();

    assert_eq!(run.status, RunStatus::Failed);
    assert_eq!(run.months_completed, 1);
    assert_eq!(run.counts.games_added, 2);
    assert!(run.error.as_deref().unwrap().contains("HTTP 404"));
    assert!(run.finished_at.is_some());

    // March never fetched
    assert_eq!(env.source.fetched(), months(&["2024-01", "2024-02"]));
    assert_eq!(env.store.count_games("alice").await.unwrap(), 2);
    assert!(env
        .store
        .get_version("chesscom-alice", "v2024-01")
        .await
        .unwrap()
        .is_some());
    assert!(env
        .store
        .get_version("chesscom-alice", "v2024-03")
        .await
        .unwrap()
        .is_none());

    // Report still written for the failed run
    let location = run.report_location.expect("failed run has a report");
    let report: RunReport =
        serde_json::from_slice(&std::fs::read(file_path(&location)).unwrap()).unwrap();
    assert_eq!(report.status, RunStatus::Failed);
    assert_eq!(report.months.len(), 1);
    assert_eq!(report.error, run.error);
}

// ============================================================================
// Parsing outcomes surfaced per month
// ============================================================================

#[tokio::test]
async fn test_skipped_chunks_and_truncated_games_are_counted() {
    let mut blob = game_pgn(1, "1. e4 e5 2. Nf3 *");
    // Tags but no moves
    blob.push_str("[Event \"Live Chess\"]\n[Link \"https://www.chess.com/game/live/2\"]\n\n*\n\n");
    // Illegal third ply: kept with two plies
    blob.push_str(&game_pgn(3, "1. e4 e5 2. Ke3 Nc6 *"));

    let source = ScriptedSource::new().with_month("2024-01", blob.into_bytes());
    let env = create_test_env(source, 1).await;

    let run_id = env.orchestrator.start_run("alice", months(&["2024-01"])).await.unwrap();
    let run = env.orchestrator.wait_for_run(run_id).await.unwrap().unwrap();

    assert_eq!(run.status, RunStatus::Succeeded);
    assert_eq!(run.counts.games_added, 2);
    assert_eq!(run.counts.moves_added, 5);

    let report: RunReport = serde_json::from_slice(
        &std::fs::read(file_path(run.report_location.as_deref().unwrap())).unwrap(),
    )
    .unwrap();
    let january = &report.months[0];
    assert_eq!(january.chunks_skipped, 1);
    assert_eq!(january.games_truncated, 1);
    assert_eq!(january.version, "v2024-01");
}

#[tokio::test]
async fn test_raw_blob_is_stored_per_version() {
    let blob = month_blob(1, 1);
    let source = ScriptedSource::new().with_month("2024-01", blob.clone());
    let env = create_test_env(source, 1).await;

    let run_id = env.orchestrator.start_run("alice", months(&["2024-01"])).await.unwrap();
    env.orchestrator.wait_for_run(run_id).await.unwrap();

    let stored = std::fs::read(
        env.artifact_root
            .join("datasets/chesscom-alice/v2024-01/raw.pgn"),
    )
    .unwrap();
    assert_eq!(stored, blob);

    let version = env
        .store
        .get_version("chesscom-alice", "v2024-01")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(version.size_bytes, blob.len() as u64);
}

// ============================================================================
// Events
// ============================================================================

#[tokio::test]
async fn test_event_sequence_for_successful_run() {
    let source = ScriptedSource::new()
        .with_month("2024-01", month_blob(1, 1))
        .with_month("2024-02", month_blob(2, 1));
    let env = create_test_env(source, 1).await;
    let mut rx = env.subscribe();

    let run_id = env
        .orchestrator
        .start_run("alice", months(&["2024-01", "2024-02"]))
        .await
        .unwrap();
    env.orchestrator.wait_for_run(run_id).await.unwrap();

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    assert!(events.iter().all(|e| e.run_id() == run_id));

    let kinds: Vec<String> = events
        .iter()
        .map(|e| match e {
            IngestEvent::RunStateChanged { new_status, .. } => format!("state:{}", new_status),
            IngestEvent::MonthIngested { month, .. } => format!("month:{}", month),
            IngestEvent::RunFinished { status, .. } => format!("finished:{}", status),
        })
        .collect();
    assert_eq!(
        kinds,
        [
            "state:RUNNING",
            "month:2024-01",
            "month:2024-02",
            "state:SUCCEEDED",
            "finished:SUCCEEDED",
        ]
    );
}

// ============================================================================
// Range selection
// ============================================================================

#[tokio::test]
async fn test_range_run_uses_archive_listing() {
    let source = ScriptedSource::new()
        .with_month("2023-11", month_blob(1, 1))
        .with_month("2023-12", month_blob(2, 1))
        .with_month("2024-01", month_blob(3, 1))
        .with_month("2024-02", month_blob(4, 1));
    let env = create_test_env(source, 1).await;

    let run_id = env
        .orchestrator
        .start_run_range(
            "alice",
            Some("2023-12".parse().unwrap()),
            Some("2024-01".parse().unwrap()),
        )
        .await
        .unwrap();
    let run = env.orchestrator.wait_for_run(run_id).await.unwrap().unwrap();

    assert_eq!(run.requested_months, months(&["2023-12", "2024-01"]));
    assert_eq!(env.source.fetched(), months(&["2023-12", "2024-01"]));
    assert_eq!(run.counts.games_added, 2);
}

#[tokio::test]
async fn test_run_with_no_months_succeeds_empty() {
    let env = create_test_env(ScriptedSource::new(), 1).await;

    let run_id = env.orchestrator.start_run_range("alice", None, None).await.unwrap();
    let run = env.orchestrator.wait_for_run(run_id).await.unwrap().unwrap();

    assert_eq!(run.status, RunStatus::Succeeded);
    assert_eq!(run.counts.games_seen(), 0);
    assert!(run.report_location.is_some());
}
