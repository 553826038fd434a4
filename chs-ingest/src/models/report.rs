//! Run summary report written through the artifact sink

use super::{IngestRun, YearMonth};
use chrono::{DateTime, Utc};
use chs_common::events::{RunCounts, RunStatus};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-month outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthSummary {
    pub month: YearMonth,
    pub version: String,
    pub bytes: u64,
    pub games_added: u64,
    pub games_skipped: u64,
    /// Chunks that produced no game
    pub chunks_skipped: u64,
    /// Games kept with a partial move list
    pub games_truncated: u64,
    pub blob_location: Option<String>,
}

impl MonthSummary {
    pub fn new(month: YearMonth) -> Self {
        Self {
            month,
            version: month.version_label(),
            bytes: 0,
            games_added: 0,
            games_skipped: 0,
            chunks_skipped: 0,
            games_truncated: 0,
            blob_location: None,
        }
    }
}

/// JSON document summarizing a finished run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub subject: String,
    pub dataset_name: String,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub requested_months: Vec<YearMonth>,
    pub months: Vec<MonthSummary>,
    pub counts: RunCounts,
    pub error: Option<String>,
}

impl RunReport {
    pub fn from_run(run: &IngestRun, months: &[MonthSummary]) -> Self {
        Self {
            run_id: run.id,
            subject: run.subject.clone(),
            dataset_name: run.dataset_name.clone(),
            status: run.status,
            started_at: run.started_at,
            finished_at: run.finished_at,
            requested_months: run.requested_months.clone(),
            months: months.to_vec(),
            counts: run.counts,
            error: run.error.clone(),
        }
    }
}
