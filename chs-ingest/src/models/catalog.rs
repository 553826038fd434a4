//! Dataset catalog records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One version of a cataloged dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogVersion {
    pub dataset_name: String,
    /// `vYYYY-MM`
    pub version: String,
    pub rows: u64,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Dataset-level row pointing at its most recently written version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    pub name: String,
    pub latest_version: Option<String>,
    pub size_rows: u64,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
