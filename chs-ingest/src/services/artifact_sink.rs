//! Filesystem artifact sink
//!
//! Layout under the artifact root:
//! - `reports/ingest/{run_id}/report.json`
//! - `{key}` for raw blobs (e.g. `datasets/chesscom-alice/v2024-01/raw.pgn`)

use crate::models::RunReport;
use crate::types::ArtifactSink;
use async_trait::async_trait;
use chs_common::{Error, Result};
use std::path::{Component, Path, PathBuf};
use uuid::Uuid;

/// Writes artifacts as files and returns `file://` locations
#[derive(Debug, Clone)]
pub struct FsArtifactSink {
    root: PathBuf,
}

impl FsArtifactSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Report key for a run
    pub fn report_key(run_id: Uuid) -> String {
        format!("reports/ingest/{}/report.json", run_id)
    }

    /// Resolve a relative key, rejecting anything escaping the root
    fn resolve(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let safe = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if key.is_empty() || !safe {
            return Err(Error::InvalidInput(format!("Invalid artifact key: {:?}", key)));
        }
        Ok(self.root.join(relative))
    }

    async fn write_file(&self, key: &str, bytes: &[u8]) -> Result<String> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Temp file + rename so readers never observe a partial artifact.
        // One temp file per write: concurrent writers of a key must not share it.
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let temp_path = path.with_file_name(format!("{}.{}.tmp", file_name, Uuid::new_v4()));
        tokio::fs::write(&temp_path, bytes).await?;
        if let Err(e) = tokio::fs::rename(&temp_path, &path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        let absolute = tokio::fs::canonicalize(&path).await.unwrap_or(path);
        Ok(format!("file://{}", absolute.display()))
    }
}

#[async_trait]
impl ArtifactSink for FsArtifactSink {
    async fn put_report(&self, run_id: Uuid, report: &RunReport) -> Result<String> {
        let data = serde_json::to_vec_pretty(report)?;
        let location = self.write_file(&Self::report_key(run_id), &data).await?;
        tracing::debug!(run_id = %run_id, location = %location, "Wrote run report");
        Ok(location)
    }

    async fn write_blob(&self, key: &str, bytes: &[u8]) -> Result<String> {
        self.write_file(key, bytes).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::IngestRun;
    use chrono::Utc;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_blob_written_under_key() {
        let dir = TempDir::new().unwrap();
        let sink = FsArtifactSink::new(dir.path());

        let location = sink
            .write_blob("datasets/chesscom-a/v2024-01/raw.pgn", b"[Event \"x\"]")
            .await
            .unwrap();

        assert!(location.starts_with("file://"));
        assert!(location.ends_with("datasets/chesscom-a/v2024-01/raw.pgn"));
        let on_disk = std::fs::read(dir.path().join("datasets/chesscom-a/v2024-01/raw.pgn")).unwrap();
        assert_eq!(on_disk, b"[Event \"x\"]");
    }

    #[tokio::test]
    async fn test_report_round_trips_as_json() {
        let dir = TempDir::new().unwrap();
        let sink = FsArtifactSink::new(dir.path());
        let run = IngestRun::new("a", "chesscom-a".into(), vec![], Utc::now());
        let report = RunReport::from_run(&run, &[]);

        let location = sink.put_report(run.id, &report).await.unwrap();
        assert!(location.ends_with(&format!("reports/ingest/{}/report.json", run.id)));

        let path = dir.path().join(FsArtifactSink::report_key(run.id));
        let back: RunReport = serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap();
        assert_eq!(back, report);
    }

    #[tokio::test]
    async fn test_concurrent_writes_to_one_key_all_succeed() {
        let dir = TempDir::new().unwrap();
        let sink = std::sync::Arc::new(FsArtifactSink::new(dir.path()));
        let key = "datasets/chesscom-a/v2024-01/raw.pgn";

        for _ in 0..20 {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let sink = sink.clone();
                    tokio::spawn(async move { sink.write_blob(key, b"same bytes").await })
                })
                .collect();
            for handle in handles {
                handle.await.unwrap().unwrap();
            }
        }

        let on_disk = std::fs::read(dir.path().join(key)).unwrap();
        assert_eq!(on_disk, b"same bytes");

        // No temp files left behind
        let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("datasets/chesscom-a/v2024-01"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers, vec![std::ffi::OsString::from("raw.pgn")]);
    }

    #[tokio::test]
    async fn test_rejects_escaping_keys() {
        let dir = TempDir::new().unwrap();
        let sink = FsArtifactSink::new(dir.path());
        for key in ["../x", "/etc/passwd", "", "a/../../b"] {
            assert!(
                matches!(sink.write_blob(key, b"x").await, Err(Error::InvalidInput(_))),
                "{:?}",
                key
            );
        }
    }
}
