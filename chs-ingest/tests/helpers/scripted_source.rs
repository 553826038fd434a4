//! In-memory archive source with scripted month responses

use async_trait::async_trait;
use chs_ingest::models::YearMonth;
use chs_ingest::types::ArchiveSource;
use chs_ingest::FetchError;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// Serves fixed bytes (or a fixed error) per month and records fetches
#[derive(Default)]
pub struct ScriptedSource {
    responses: HashMap<YearMonth, Result<Vec<u8>, FetchError>>,
    fetch_delay: Duration,
    fetched: Mutex<Vec<YearMonth>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_month(mut self, month: &str, bytes: Vec<u8>) -> Self {
        self.responses.insert(month.parse().unwrap(), Ok(bytes));
        self
    }

    pub fn with_failure(mut self, month: &str, error: FetchError) -> Self {
        self.responses.insert(month.parse().unwrap(), Err(error));
        self
    }

    /// Sleep before answering each fetch
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = delay;
        self
    }

    /// Months fetched so far, in call order
    pub fn fetched(&self) -> Vec<YearMonth> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl ArchiveSource for ScriptedSource {
    async fn list_archives(&self, _subject: &str) -> Result<Vec<YearMonth>, FetchError> {
        let mut months: Vec<YearMonth> = self.responses.keys().copied().collect();
        months.sort();
        Ok(months)
    }

    async fn fetch_month(&self, subject: &str, month: YearMonth) -> Result<Vec<u8>, FetchError> {
        if !self.fetch_delay.is_zero() {
            tokio::time::sleep(self.fetch_delay).await;
        }
        self.fetched.lock().unwrap().push(month);

        self.responses.get(&month).cloned().unwrap_or_else(|| {
            Err(FetchError::Status {
                status: 404,
                url: format!("scripted://{}/{}", subject, month),
            })
        })
    }
}
