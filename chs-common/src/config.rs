//! Configuration loading and root folder resolution
//!
//! Root folder priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`CHS_ROOT_FOLDER`)
//! 3. TOML config file
//! 4. OS-dependent compiled default (fallback)
//!
//! A missing or unreadable TOML file never aborts startup: a warning is logged
//! and compiled defaults are used.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable naming the root folder
pub const ROOT_FOLDER_ENV: &str = "CHS_ROOT_FOLDER";

/// Environment variable overriding the archive API base URL
pub const BASE_URL_ENV: &str = "CHS_INGEST_BASE_URL";

/// Environment variable overriding the worker pool size
pub const WORKER_POOL_ENV: &str = "CHS_INGEST_WORKERS";

/// Top-level TOML configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TomlConfig {
    /// Folder holding the database and artifact directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_folder: Option<PathBuf>,

    /// Logging options
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Ingest pipeline tuning
    #[serde(default)]
    pub ingest: IngestSettings,
}

/// Logging section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// `[ingest]` section: fetch client, retry and worker pool settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IngestSettings {
    /// Archive API base URL
    pub base_url: String,
    /// User-Agent sent with every archive request
    pub user_agent: String,
    /// Minimum spacing between two requests for the same subject
    pub min_request_interval_ms: u64,
    /// Total attempts per request, first try included
    pub max_attempts: u32,
    /// First retry delay before jitter
    pub initial_backoff_ms: u64,
    /// Upper bound for a single retry delay
    pub max_backoff_ms: u64,
    /// TCP connect timeout
    pub connect_timeout_ms: u64,
    /// Response read timeout
    pub read_timeout_ms: u64,
    /// Number of runs allowed to execute concurrently
    pub worker_pool_size: usize,
    /// Dataset names are `{dataset_prefix}-{subject}`
    pub dataset_prefix: String,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.chess.com".to_string(),
            user_agent: concat!("chs-ingest/", env!("CARGO_PKG_VERSION")).to_string(),
            min_request_interval_ms: 1000,
            max_attempts: 3,
            initial_backoff_ms: 300,
            max_backoff_ms: 3000,
            connect_timeout_ms: 5000,
            read_timeout_ms: 15000,
            worker_pool_size: 4,
            dataset_prefix: "chesscom".to_string(),
        }
    }
}

impl IngestSettings {
    pub fn min_request_interval(&self) -> Duration {
        Duration::from_millis(self.min_request_interval_ms)
    }

    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Apply `CHS_INGEST_*` environment overrides on top of file values
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var(BASE_URL_ENV) {
            if !url.trim().is_empty() {
                info!("Archive base URL overridden from {}", BASE_URL_ENV);
                self.base_url = url.trim().to_string();
            }
        }

        if let Ok(workers) = std::env::var(WORKER_POOL_ENV) {
            match workers.trim().parse::<usize>() {
                Ok(n) => self.worker_pool_size = n,
                Err(_) => warn!(value = %workers, "Ignoring invalid {}", WORKER_POOL_ENV),
            }
        }
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(Error::Config("ingest.base_url must not be empty".to_string()));
        }
        if self.max_attempts == 0 {
            return Err(Error::Config("ingest.max_attempts must be at least 1".to_string()));
        }
        if self.worker_pool_size == 0 {
            return Err(Error::Config(
                "ingest.worker_pool_size must be at least 1".to_string(),
            ));
        }
        if self.initial_backoff_ms > self.max_backoff_ms {
            return Err(Error::Config(format!(
                "ingest.initial_backoff_ms ({}) exceeds ingest.max_backoff_ms ({})",
                self.initial_backoff_ms, self.max_backoff_ms
            )));
        }
        if self.dataset_prefix.trim().is_empty() {
            return Err(Error::Config(
                "ingest.dataset_prefix must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Default config file location: `{config_dir}/chs/chs-ingest.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("chs").join("chs-ingest.toml"))
}

/// Load TOML configuration, falling back to defaults when the file is missing
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        warn!(
            path = %path.display(),
            "Config file not found, using compiled defaults"
        );
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed: {}", e)))?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?;

    info!(path = %path.display(), "Loaded config file");
    Ok(config)
}

/// Write TOML configuration atomically (temp file + rename)
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let temp_path = path.with_extension("toml.tmp");
    std::fs::write(&temp_path, content)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&temp_path, std::fs::Permissions::from_mode(0o600))?;
    }

    std::fs::rename(&temp_path, path)?;
    Ok(())
}

/// Resolve the root folder: CLI argument, then `CHS_ROOT_FOLDER`, then TOML, then OS default
pub fn resolve_root_folder(cli_arg: Option<&Path>, config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &config.root_folder {
        return path.clone();
    }

    default_root_folder()
}

/// OS-dependent default root folder path
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("chs"))
        .unwrap_or_else(|| PathBuf::from("./chs_data"))
}

/// Database file inside a root folder
pub fn database_path(root_folder: &Path) -> PathBuf {
    root_folder.join("chs.db")
}

/// Artifact directory inside a root folder
pub fn artifact_dir(root_folder: &Path) -> PathBuf {
    root_folder.join("artifacts")
}
