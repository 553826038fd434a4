//! Ingest run record and its lifecycle transitions

use super::YearMonth;
use crate::error::IngestError;
use chrono::{DateTime, Utc};
use chs_common::events::{RunCounts, RunStatus};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Recorded state transition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub run_id: Uuid,
    pub old_status: RunStatus,
    pub new_status: RunStatus,
    pub transitioned_at: DateTime<Utc>,
}

/// One ingest request for a subject over a list of months
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestRun {
    pub id: Uuid,
    /// Archive user name, lowercased
    pub subject: String,
    pub dataset_name: String,
    pub requested_months: Vec<YearMonth>,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    /// Set on reaching a terminal state
    pub finished_at: Option<DateTime<Utc>>,
    pub counts: RunCounts,
    pub months_completed: u32,
    pub report_location: Option<String>,
    /// Present only when `Failed`
    pub error: Option<String>,
}

impl IngestRun {
    /// New `Pending` run
    pub fn new(
        subject: &str,
        dataset_name: String,
        requested_months: Vec<YearMonth>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            subject: subject.trim().to_lowercase(),
            dataset_name,
            requested_months,
            status: RunStatus::Pending,
            started_at: now,
            finished_at: None,
            counts: RunCounts::default(),
            months_completed: 0,
            report_location: None,
            error: None,
        }
    }

    /// Move to `new_status`, rejecting anything outside the transition table
    pub fn transition_to(
        &mut self,
        new_status: RunStatus,
        now: DateTime<Utc>,
    ) -> Result<StateTransition, IngestError> {
        if !self.status.can_transition_to(new_status) {
            return Err(IngestError::InvalidTransition {
                from: self.status,
                to: new_status,
            });
        }

        let transition = StateTransition {
            run_id: self.id,
            old_status: self.status,
            new_status,
            transitioned_at: now,
        };
        self.status = new_status;

        if new_status.is_terminal() {
            self.finished_at = Some(now);
        }

        Ok(transition)
    }

    /// `Running`/`Pending` → `Failed` with the error text recorded
    pub fn fail(
        &mut self,
        error: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<StateTransition, IngestError> {
        let transition = self.transition_to(RunStatus::Failed, now)?;
        self.error = Some(error.into());
        Ok(transition)
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run() -> IngestRun {
        IngestRun::new(
            "Hikaru",
            "chesscom-hikaru".to_string(),
            vec!["2024-01".parse().unwrap()],
            Utc::now(),
        )
    }

    #[test]
    fn test_new_run_is_pending_and_lowercased() {
        let run = run();
        assert_eq!(run.status, RunStatus::Pending);
        assert_eq!(run.subject, "hikaru");
        assert!(run.finished_at.is_none());
    }

    #[test]
    fn test_happy_path_sets_finished_at() {
        let mut run = run();
        run.transition_to(RunStatus::Running, Utc::now()).unwrap();
        assert!(run.finished_at.is_none());

        let t = run.transition_to(RunStatus::Succeeded, Utc::now()).unwrap();
        assert_eq!(t.old_status, RunStatus::Running);
        assert!(run.finished_at.is_some());
        assert!(run.is_terminal());
    }

    #[test]
    fn test_terminal_state_is_never_left() {
        let mut run = run();
        run.transition_to(RunStatus::Running, Utc::now()).unwrap();
        run.fail("boom", Utc::now()).unwrap();
        assert_eq!(run.error.as_deref(), Some("boom"));

        let err = run.transition_to(RunStatus::Running, Utc::now()).unwrap_err();
        assert!(matches!(
            err,
            IngestError::InvalidTransition {
                from: RunStatus::Failed,
                to: RunStatus::Running
            }
        ));
    }

    #[test]
    fn test_pending_cannot_succeed_directly() {
        let mut run = run();
        assert!(run.transition_to(RunStatus::Succeeded, Utc::now()).is_err());
        assert_eq!(run.status, RunStatus::Pending);
    }
}
