//! Chess.com published-data archive client
//!
//! Endpoints:
//! - `{base}/pub/player/{subject}/games/archives` - JSON list of month URLs
//! - `{base}/pub/player/{subject}/games/{YYYY}/{MM}/pgn` - raw PGN for one month
//!
//! Every attempt (retries included) first takes the subject's throttle slot.

use crate::error::FetchError;
use crate::models::YearMonth;
use crate::services::retry::RetryPolicy;
use crate::services::throttle::SubjectThrottle;
use crate::types::ArchiveSource;
use async_trait::async_trait;
use chs_common::config::IngestSettings;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// Raw HTTP GET, separated from the client so retry/throttle logic runs offline in tests
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// GET `url`, returning the body of a 2xx response
    async fn get(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// `reqwest`-backed transport with separate connect and read timeouts
pub struct ReqwestTransport {
    http_client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(
        user_agent: &str,
        connect_timeout: Duration,
        read_timeout: Duration,
    ) -> chs_common::Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(user_agent)
            .connect_timeout(connect_timeout)
            .timeout(read_timeout)
            .build()
            .map_err(|e| chs_common::Error::Config(format!("HTTP client build failed: {}", e)))?;

        Ok(Self { http_client })
    }

    fn map_error(url: &str, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
            }
        } else {
            FetchError::Connect {
                url: url.to_string(),
                message: err.to_string(),
            }
        }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        tracing::debug!(url = %url, "GET");

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| Self::map_error(url, e))?;

        if let Some(err) = FetchError::from_status(response.status().as_u16(), url) {
            return Err(err);
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| Self::map_error(url, e))?;
        Ok(body.to_vec())
    }
}

/// Archive list response
#[derive(Debug, Deserialize)]
struct ArchiveList {
    #[serde(default)]
    archives: Vec<String>,
}

/// Throttled, retrying archive client
pub struct ChessComClient<T: HttpTransport = ReqwestTransport> {
    transport: T,
    base_url: String,
    throttle: Arc<SubjectThrottle>,
    retry: RetryPolicy,
}

impl ChessComClient<ReqwestTransport> {
    /// Client over a real HTTP transport, configured from `[ingest]` settings
    pub fn from_settings(settings: &IngestSettings) -> chs_common::Result<Self> {
        let transport = ReqwestTransport::new(
            &settings.user_agent,
            settings.connect_timeout(),
            settings.read_timeout(),
        )?;
        Ok(Self::new(
            transport,
            &settings.base_url,
            Arc::new(SubjectThrottle::new(settings.min_request_interval())),
            RetryPolicy::from_settings(settings),
        ))
    }
}

impl<T: HttpTransport> ChessComClient<T> {
    pub fn new(
        transport: T,
        base_url: &str,
        throttle: Arc<SubjectThrottle>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            transport,
            base_url: base_url.trim_end_matches('/').to_string(),
            throttle,
            retry,
        }
    }

    pub fn throttle(&self) -> &Arc<SubjectThrottle> {
        &self.throttle
    }

    pub fn archives_url(&self, subject: &str) -> String {
        format!(
            "{}/pub/player/{}/games/archives",
            self.base_url,
            normalize_subject(subject)
        )
    }

    pub fn month_url(&self, subject: &str, month: YearMonth) -> String {
        format!(
            "{}/pub/player/{}/games/{:04}/{}/pgn",
            self.base_url,
            normalize_subject(subject),
            month.year(),
            month.month_padded()
        )
    }

    /// GET through throttle and retry policy
    async fn get(&self, operation: &str, subject: &str, url: &str) -> Result<Vec<u8>, FetchError> {
        self.retry
            .run(operation, || async {
                self.throttle.acquire(subject).await;
                self.transport.get(url).await
            })
            .await
    }
}

fn normalize_subject(subject: &str) -> String {
    subject.trim().to_lowercase()
}

/// Month from an archive URL ending in `/YYYY/MM`
fn month_from_archive_url(url: &str) -> Option<YearMonth> {
    let mut segments = url.trim_end_matches('/').rsplit('/');
    let month: u32 = segments.next()?.parse().ok()?;
    let year: i32 = segments.next()?.parse().ok()?;
    YearMonth::new(year, month).ok()
}

#[async_trait]
impl<T: HttpTransport> ArchiveSource for ChessComClient<T> {
    async fn list_archives(&self, subject: &str) -> Result<Vec<YearMonth>, FetchError> {
        let url = self.archives_url(subject);
        let body = self.get("list archives", subject, &url).await?;

        let list: ArchiveList = serde_json::from_slice(&body).map_err(|e| FetchError::Malformed {
            url: url.clone(),
            message: e.to_string(),
        })?;

        let mut months = Vec::with_capacity(list.archives.len());
        for entry in &list.archives {
            match month_from_archive_url(entry) {
                Some(month) => months.push(month),
                None => {
                    return Err(FetchError::Malformed {
                        url,
                        message: format!("Unrecognized archive entry: {}", entry),
                    })
                }
            }
        }
        months.sort();
        months.dedup();

        tracing::debug!(subject = %subject, months = months.len(), "Listed archives");
        Ok(months)
    }

    async fn fetch_month(&self, subject: &str, month: YearMonth) -> Result<Vec<u8>, FetchError> {
        let url = self.month_url(subject, month);
        let body = self.get("fetch month", subject, &url).await?;
        tracing::debug!(subject = %subject, month = %month, bytes = body.len(), "Fetched month");
        Ok(body)
    }
}
