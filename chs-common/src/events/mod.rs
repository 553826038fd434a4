//! Event types for the ingest event system
//!
//! Provides the shared event enum and an `EventBus` built on a tokio broadcast
//! channel. Observers (CLI progress output, tests, a future status endpoint)
//! subscribe; the orchestrator emits.

mod ingest_types;

pub use ingest_types::{RunCounts, RunStatus};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Ingest event types
///
/// Events are broadcast via `EventBus` and serialize with a `type` tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum IngestEvent {
    /// Run moved between lifecycle states
    RunStateChanged {
        run_id: Uuid,
        subject: String,
        old_status: RunStatus,
        new_status: RunStatus,
        timestamp: DateTime<Utc>,
    },

    /// One requested month finished (fetched, parsed, persisted, cataloged)
    MonthIngested {
        run_id: Uuid,
        /// `YYYY-MM`
        month: String,
        games_added: u64,
        games_skipped: u64,
        chunks_skipped: u64,
        bytes: u64,
        timestamp: DateTime<Utc>,
    },

    /// Run reached a terminal state
    RunFinished {
        run_id: Uuid,
        status: RunStatus,
        counts: RunCounts,
        report_location: Option<String>,
        error: Option<String>,
        timestamp: DateTime<Utc>,
    },
}

impl IngestEvent {
    /// Run the event belongs to
    pub fn run_id(&self) -> Uuid {
        match self {
            IngestEvent::RunStateChanged { run_id, .. }
            | IngestEvent::MonthIngested { run_id, .. }
            | IngestEvent::RunFinished { run_id, .. } => *run_id,
        }
    }
}

/// Broadcast bus for ingest events
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<IngestEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus buffering `capacity` events per lagging receiver
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<IngestEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, returning the number of subscribers that received it
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: IngestEvent,
    ) -> Result<usize, broadcast::error::SendError<IngestEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: IngestEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
