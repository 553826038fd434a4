//! Ingest services
//!
//! - `archive_client`: throttled, retried HTTP client for the monthly archive
//! - `artifact_sink`: filesystem storage for raw blobs and run reports
//! - `orchestrator`: run scheduling and the per-month pipeline
//! - `retry` / `throttle`: request pacing primitives used by the client

pub mod archive_client;
pub mod artifact_sink;
pub mod orchestrator;
pub mod retry;
pub mod throttle;

pub use archive_client::{ChessComClient, HttpTransport, ReqwestTransport};
pub use artifact_sink::FsArtifactSink;
pub use orchestrator::{Collaborators, IngestOrchestrator};
pub use retry::RetryPolicy;
pub use throttle::SubjectThrottle;
