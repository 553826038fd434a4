//! Ingest orchestrator
//!
//! Owns the run lifecycle `PENDING → RUNNING → {SUCCEEDED, FAILED}`.
//!
//! # Flow
//! `start_run` persists a `PENDING` run and hands it to a spawned task that
//! waits for a worker permit. Once a permit is held the run moves to
//! `RUNNING` and each requested month is processed in the order requested:
//!
//! 1. Fetch the month's PGN (throttled, retried by the archive client)
//! 2. Store the raw blob under `datasets/{dataset}/{version}/raw.pgn`
//! 3. Normalize chunks into games (skips and truncations are logged)
//! 4. Insert games not already stored; duplicates count as skipped
//! 5. Upsert the month's catalog version
//! 6. Persist the run's counters
//!
//! The first error ends the run as `FAILED`; remaining months are not
//! touched. A summary report is written on both outcomes.

use crate::db::SqliteStore;
use crate::error::{IngestError, IngestResult};
use crate::models::{IngestRun, MonthSummary, RunReport, YearMonth};
use crate::pgn::{normalize, ChunkOutcome};
use crate::types::{
    ArchiveSource, ArtifactSink, CatalogStore, Clock, GameRepository, InsertOutcome,
    RunRepository, SystemClock,
};
use chs_common::config::IngestSettings;
use chs_common::events::{EventBus, IngestEvent, RunStatus};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Everything the orchestrator reads from or writes to
#[derive(Clone)]
pub struct Collaborators {
    pub source: Arc<dyn ArchiveSource>,
    pub runs: Arc<dyn RunRepository>,
    pub games: Arc<dyn GameRepository>,
    pub catalog: Arc<dyn CatalogStore>,
    pub artifacts: Arc<dyn ArtifactSink>,
    pub clock: Arc<dyn Clock>,
}

impl Collaborators {
    /// One SQLite store for runs, games and catalog; wall clock
    pub fn with_store(
        source: Arc<dyn ArchiveSource>,
        store: SqliteStore,
        artifacts: Arc<dyn ArtifactSink>,
    ) -> Self {
        let store = Arc::new(store);
        Self {
            source,
            runs: store.clone(),
            games: store.clone(),
            catalog: store,
            artifacts,
            clock: Arc::new(SystemClock),
        }
    }
}

struct Inner {
    deps: Collaborators,
    event_bus: EventBus,
    dataset_prefix: String,
    workers: Arc<Semaphore>,
    handles: Mutex<HashMap<Uuid, JoinHandle<()>>>,
}

/// Schedules and executes ingest runs on a bounded worker pool
#[derive(Clone)]
pub struct IngestOrchestrator {
    inner: Arc<Inner>,
}

impl IngestOrchestrator {
    /// # Arguments
    /// * `deps` - Archive source, stores, artifact sink and clock
    /// * `worker_pool_size` - Runs executing at once (at least 1)
    /// * `dataset_prefix` - Dataset names are `{prefix}-{subject}`
    /// * `event_bus` - Receives run and month events
    pub fn new(
        deps: Collaborators,
        worker_pool_size: usize,
        dataset_prefix: impl Into<String>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                deps,
                event_bus,
                dataset_prefix: dataset_prefix.into(),
                workers: Arc::new(Semaphore::new(worker_pool_size.max(1))),
                handles: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn from_settings(deps: Collaborators, settings: &IngestSettings, event_bus: EventBus) -> Self {
        Self::new(
            deps,
            settings.worker_pool_size,
            settings.dataset_prefix.clone(),
            event_bus,
        )
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.inner.event_bus
    }

    /// Dataset a subject's games are cataloged under
    pub fn dataset_name(&self, subject: &str) -> String {
        format!("{}-{}", self.inner.dataset_prefix, subject.trim()).to_lowercase()
    }

    /// Create a `PENDING` run and queue it for a worker
    ///
    /// Returns as soon as the run is persisted. Months are processed in the
    /// order given; a repeated month is dropped after its first occurrence.
    pub async fn start_run(&self, subject: &str, months: Vec<YearMonth>) -> IngestResult<Uuid> {
        let subject = subject.trim();
        if subject.is_empty() {
            return Err(IngestError::InvalidRequest("Subject must not be empty".to_string()));
        }

        let months = dedup_in_order(months);

        let now = self.inner.deps.clock.now();
        let run = IngestRun::new(subject, self.dataset_name(subject), months, now);
        self.inner.deps.runs.save_run(&run).await?;

        let run_id = run.id;
        info!(
            run_id = %run_id,
            subject = %run.subject,
            months = run.requested_months.len(),
            "Ingest run queued"
        );

        let span = info_span!("ingest_run", run_id = %run_id, subject = %run.subject);
        let orchestrator = self.clone();
        let handle = tokio::spawn(async move { orchestrator.run_worker(run).await }.instrument(span));

        let mut handles = self.inner.handles.lock().await;
        handles.retain(|_, h| !h.is_finished());
        handles.insert(run_id, handle);

        Ok(run_id)
    }

    /// Start a run over every archived month within `[from, to]`
    ///
    /// Either bound may be omitted.
    pub async fn start_run_range(
        &self,
        subject: &str,
        from: Option<YearMonth>,
        to: Option<YearMonth>,
    ) -> IngestResult<Uuid> {
        if let (Some(from), Some(to)) = (from, to) {
            if from > to {
                return Err(IngestError::InvalidRequest(format!(
                    "Range start {} is after end {}",
                    from, to
                )));
            }
        }

        let archives = self.inner.deps.source.list_archives(subject.trim()).await?;
        let mut months: Vec<YearMonth> = archives
            .into_iter()
            .filter(|m| from.map_or(true, |from| *m >= from))
            .filter(|m| to.map_or(true, |to| *m <= to))
            .collect();
        // A range runs oldest first whatever order the listing uses
        months.sort();

        debug!(subject, months = months.len(), "Resolved archive range");
        self.start_run(subject, months).await
    }

    /// Stored state of a run
    pub async fn run_status(&self, run_id: Uuid) -> IngestResult<Option<IngestRun>> {
        Ok(self.inner.deps.runs.load_run(run_id).await?)
    }

    /// Wait for a run's worker task to finish, then return the stored run
    pub async fn wait_for_run(&self, run_id: Uuid) -> IngestResult<Option<IngestRun>> {
        let handle = self.inner.handles.lock().await.remove(&run_id);
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(run_id = %run_id, error = %e, "Ingest worker task ended abnormally");
            }
        }
        self.run_status(run_id).await
    }

    /// Stop handing out worker permits
    ///
    /// Runs already executing finish normally; queued runs fail.
    pub fn close_pool(&self) {
        self.inner.workers.close();
    }

    async fn run_worker(&self, run: IngestRun) {
        let permit = match self.inner.workers.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => {
                self.abandon(run).await;
                return;
            }
        };

        self.execute_run(run).await;
        drop(permit);
    }

    /// `PENDING → FAILED` for a run that never got a worker
    async fn abandon(&self, mut run: IngestRun) {
        let now = self.inner.deps.clock.now();
        match run.fail("Worker pool closed before the run started", now) {
            Ok(transition) => {
                warn!(run_id = %run.id, "Ingest run abandoned: worker pool closed");
                self.persist_final(&run).await;
                self.emit_state_change(&run, transition.old_status, transition.new_status);
                self.emit_finished(&run);
            }
            Err(e) => warn!(run_id = %run.id, error = %e, "Could not abandon run"),
        }
    }

    /// Execute a `PENDING` run to completion and return its final state
    pub async fn execute_run(&self, mut run: IngestRun) -> IngestRun {
        if let Err(e) = self.advance(&mut run, RunStatus::Running).await {
            return self.finish(run, Vec::new(), Err(e)).await;
        }
        info!(run_id = %run.id, months = run.requested_months.len(), "Ingest run started");

        let mut summaries = Vec::with_capacity(run.requested_months.len());
        let outcome = self.ingest_months(&mut run, &mut summaries).await;
        self.finish(run, summaries, outcome).await
    }

    async fn ingest_months(
        &self,
        run: &mut IngestRun,
        summaries: &mut Vec<MonthSummary>,
    ) -> IngestResult<()> {
        let months = run.requested_months.clone();
        for month in months {
            let summary = self
                .ingest_month(run, month)
                .instrument(info_span!("month", month = %month))
                .await?;

            run.months_completed += 1;
            self.inner.deps.runs.save_run(run).await?;

            info!(
                month = %month,
                games_added = summary.games_added,
                games_skipped = summary.games_skipped,
                chunks_skipped = summary.chunks_skipped,
                bytes = summary.bytes,
                "Month ingested"
            );
            self.inner.event_bus.emit_lossy(IngestEvent::MonthIngested {
                run_id: run.id,
                month: month.to_string(),
                games_added: summary.games_added,
                games_skipped: summary.games_skipped,
                chunks_skipped: summary.chunks_skipped,
                bytes: summary.bytes,
                timestamp: self.inner.deps.clock.now(),
            });
            summaries.push(summary);
        }
        Ok(())
    }

    async fn ingest_month(&self, run: &mut IngestRun, month: YearMonth) -> IngestResult<MonthSummary> {
        let deps = &self.inner.deps;
        let mut summary = MonthSummary::new(month);

        let bytes = deps.source.fetch_month(&run.subject, month).await?;
        summary.bytes = bytes.len() as u64;

        let blob_key = format!("datasets/{}/{}/raw.pgn", run.dataset_name, summary.version);
        summary.blob_location = Some(deps.artifacts.write_blob(&blob_key, &bytes).await?);

        let text = String::from_utf8_lossy(&bytes);
        let mut games = Vec::new();
        for outcome in normalize(&text) {
            match outcome {
                ChunkOutcome::Parsed(game) => {
                    if game.truncated.is_some() {
                        summary.games_truncated += 1;
                    }
                    games.push(*game);
                }
                ChunkOutcome::Skipped { index, reason } => {
                    debug!(index, ?reason, "Skipping chunk");
                    summary.chunks_skipped += 1;
                }
            }
        }

        let ids: Vec<String> = games.iter().map(|g| g.external_id.clone()).collect();
        let existing = deps.games.find_existing_ids(&ids).await?;

        for game in &games {
            if existing.contains(&game.external_id) {
                summary.games_skipped += 1;
                run.counts.games_skipped += 1;
                continue;
            }

            match deps.games.insert_game(&run.subject, run.id, game).await? {
                InsertOutcome::Inserted { moves, positions } => {
                    summary.games_added += 1;
                    run.counts.games_added += 1;
                    run.counts.moves_added += moves;
                    run.counts.positions_added += positions;
                }
                InsertOutcome::Duplicate => {
                    debug!(external_id = %game.external_id, "Game already stored");
                    summary.games_skipped += 1;
                    run.counts.games_skipped += 1;
                }
            }
        }

        let created = deps
            .catalog
            .upsert_version(
                &run.dataset_name,
                &summary.version,
                summary.games_added + summary.games_skipped,
                summary.bytes,
            )
            .await?;
        debug!(version = %summary.version, created, "Catalog version recorded");

        Ok(summary)
    }

    /// Move to a terminal state, write the report and persist
    async fn finish(
        &self,
        mut run: IngestRun,
        summaries: Vec<MonthSummary>,
        outcome: IngestResult<()>,
    ) -> IngestRun {
        let now = self.inner.deps.clock.now();
        let old_status = run.status;

        let transition = match &outcome {
            Ok(()) => run.transition_to(RunStatus::Succeeded, now),
            Err(err) => {
                error!(
                    run_id = %run.id,
                    months_completed = run.months_completed,
                    error = %err,
                    "Ingest run failed"
                );
                run.fail(err.to_string(), now)
            }
        };
        if let Err(e) = transition {
            error!(run_id = %run.id, error = %e, "Could not finish run");
            return run;
        }

        let report = RunReport::from_run(&run, &summaries);
        match self.inner.deps.artifacts.put_report(run.id, &report).await {
            Ok(location) => run.report_location = Some(location),
            Err(e) => error!(run_id = %run.id, error = %e, "Failed to write run report"),
        }

        self.persist_final(&run).await;
        self.emit_state_change(&run, old_status, run.status);
        self.emit_finished(&run);

        info!(
            run_id = %run.id,
            status = %run.status,
            games_added = run.counts.games_added,
            games_skipped = run.counts.games_skipped,
            moves_added = run.counts.moves_added,
            "Ingest run finished"
        );
        run
    }

    /// Transition, announce and persist a non-terminal state change
    async fn advance(&self, run: &mut IngestRun, status: RunStatus) -> IngestResult<()> {
        let transition = run.transition_to(status, self.inner.deps.clock.now())?;
        self.emit_state_change(run, transition.old_status, transition.new_status);
        self.inner.deps.runs.save_run(run).await?;
        Ok(())
    }

    async fn persist_final(&self, run: &IngestRun) {
        if let Err(e) = self.inner.deps.runs.save_run(run).await {
            error!(run_id = %run.id, error = %e, "Failed to persist final run state");
        }
    }

    fn emit_state_change(&self, run: &IngestRun, old_status: RunStatus, new_status: RunStatus) {
        self.inner.event_bus.emit_lossy(IngestEvent::RunStateChanged {
            run_id: run.id,
            subject: run.subject.clone(),
            old_status,
            new_status,
            timestamp: self.inner.deps.clock.now(),
        });
    }

    fn emit_finished(&self, run: &IngestRun) {
        self.inner.event_bus.emit_lossy(IngestEvent::RunFinished {
            run_id: run.id,
            status: run.status,
            counts: run.counts,
            report_location: run.report_location.clone(),
            error: run.error.clone(),
            timestamp: self.inner.deps.clock.now(),
        });
    }
}

/// Drop repeats after their first occurrence, keeping request order
fn dedup_in_order(months: Vec<YearMonth>) -> Vec<YearMonth> {
    let mut seen = HashSet::new();
    months.into_iter().filter(|m| seen.insert(*m)).collect()
}
