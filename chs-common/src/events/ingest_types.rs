//! Ingest run type definitions
//!
//! Supporting types shared by the ingest orchestrator and anything observing it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Ingest run lifecycle state
///
/// Closed transition table:
/// - `Pending → Running`
/// - `Pending → Failed` (worker could not start the run)
/// - `Running → Succeeded`
/// - `Running → Failed`
///
/// `Succeeded` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RunStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl RunStatus {
    /// Whether `self → next` is an allowed transition
    pub fn can_transition_to(self, next: RunStatus) -> bool {
        matches!(
            (self, next),
            (RunStatus::Pending, RunStatus::Running)
                | (RunStatus::Pending, RunStatus::Failed)
                | (RunStatus::Running, RunStatus::Succeeded)
                | (RunStatus::Running, RunStatus::Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RunStatus::Succeeded | RunStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Pending => "PENDING",
            RunStatus::Running => "RUNNING",
            RunStatus::Succeeded => "SUCCEEDED",
            RunStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunStatus {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(RunStatus::Pending),
            "RUNNING" => Ok(RunStatus::Running),
            "SUCCEEDED" => Ok(RunStatus::Succeeded),
            "FAILED" => Ok(RunStatus::Failed),
            other => Err(crate::Error::InvalidInput(format!(
                "Unknown run status: {}",
                other
            ))),
        }
    }
}

/// Row counters accumulated over one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCounts {
    pub games_added: u64,
    pub games_skipped: u64,
    pub moves_added: u64,
    pub positions_added: u64,
}

impl RunCounts {
    /// Games seen by the run, whether newly stored or already present
    pub fn games_seen(&self) -> u64 {
        self.games_added + self.games_skipped
    }
}
