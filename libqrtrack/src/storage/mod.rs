//! Interchangeable places to keep location records

use crate::{LastKnown, Location, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, sync::Arc};
use tracing::warn;

mod json;
mod sheets;
mod sqlite;

pub use json::JsonFileBackend;
pub use sheets::{SheetsBackend, SheetsConfig};
pub use sqlite::SqliteBackend;

/// Somewhere location records can be written to and read back from
#[async_trait]
pub trait Backend: Send + Sync + std::fmt::Debug {
    /// Store a new record
    async fn save(&self, location: &Location) -> Result<()>;

    /// The most recently stored record, if there is one
    async fn latest(&self) -> Result<Option<Location>>;

    /// Stored records, newest first
    async fn history(&self, limit: Option<u32>) -> Result<Vec<Location>>;

    /// A short human-readable description used in log messages
    fn describe(&self) -> String;

    /// The latest record for display. Read failures are logged and turned
    /// into a placeholder so that pages can still be rendered.
    async fn last_known(&self) -> LastKnown {
        match self.latest().await {
            Ok(loc) => loc.into(),
            Err(e) => {
                warn!(backend = %self.describe(), "Unable to read location: {e}");
                LastKnown::read_failed()
            }
        }
    }
}

/// Problems choosing a backend from environment variables
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Unknown storage backend '{0}'")]
    UnknownBackend(String),
    #[error("{0} must be set to use this storage backend")]
    MissingVariable(&'static str),
}

/// A shareable handle to a storage backend
pub type DynBackend = Arc<dyn Backend>;

/// Which backend to use and how to reach it
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub enum StorageConfig {
    /// Keep only the latest record in a json file. Point the path into a
    /// mounted volume to keep it across restarts.
    JsonFile(PathBuf),
    /// Keep every record in a sqlite database
    Sqlite(PathBuf),
    /// Append every record to a google spreadsheet
    GoogleSheets(SheetsConfig),
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::JsonFile(PathBuf::from(DEFAULT_DATA_FILE))
    }
}

const DEFAULT_DATA_FILE: &str = "location.json";
const DEFAULT_DATABASE: &str = "locations.sqlite";
const DEFAULT_CREDENTIALS_FILE: &str = "credentials.json";
const DEFAULT_WORKSHEET: &str = "Sheet1";

impl StorageConfig {
    /// Choose a backend from variables such as the process environment:
    ///
    /// - `QRTRACK_STORAGE`: `json` (default), `sqlite` or `sheets`
    /// - `QRTRACK_DATA_FILE`: path of the json file
    /// - `QRTRACK_DATABASE`: path of the sqlite database
    /// - `GOOGLE_SHEET_ID`, `GOOGLE_SHEET_NAME`, `GOOGLE_CREDENTIALS_FILE`:
    ///   the spreadsheet and the service account key
    pub fn from_vars<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(match var("QRTRACK_STORAGE").as_deref().unwrap_or("json") {
            "json" => StorageConfig::JsonFile(
                var("QRTRACK_DATA_FILE")
                    .unwrap_or_else(|| DEFAULT_DATA_FILE.to_string())
                    .into(),
            ),
            "sqlite" => StorageConfig::Sqlite(
                var("QRTRACK_DATABASE")
                    .unwrap_or_else(|| DEFAULT_DATABASE.to_string())
                    .into(),
            ),
            "sheets" => StorageConfig::GoogleSheets(SheetsConfig::new(
                var("GOOGLE_SHEET_ID").ok_or(ConfigError::MissingVariable("GOOGLE_SHEET_ID"))?,
                var("GOOGLE_SHEET_NAME").unwrap_or_else(|| DEFAULT_WORKSHEET.to_string()),
                var("GOOGLE_CREDENTIALS_FILE")
                    .unwrap_or_else(|| DEFAULT_CREDENTIALS_FILE.to_string())
                    .into(),
            )),
            other => return Err(ConfigError::UnknownBackend(other.to_string())),
        })
    }

    /// Create the backend described by this configuration
    pub async fn open(&self) -> Result<DynBackend> {
        Ok(match self {
            StorageConfig::JsonFile(path) => Arc::new(JsonFileBackend::new(path)),
            StorageConfig::Sqlite(path) => Arc::new(SqliteBackend::open(path).await?),
            StorageConfig::GoogleSheets(cfg) => Arc::new(SheetsBackend::new(cfg.clone())?),
        })
    }
}
