//! Environment-driven settings for the warehouse connection and cache.
//!
//! Values are read after `dotenvy` has loaded `.env`:
//!
//! | Variable                         | Default                |
//! |----------------------------------|------------------------|
//! | `GCP_PROJECT_ID`                 | from credentials file  |
//! | `GOOGLE_APPLICATION_CREDENTIALS` | none                   |
//! | `GOOGLE_ACCESS_TOKEN`            | required               |
//! | `BIGQUERY_DATASET`               | `crash_analysis`       |
//! | `BIGQUERY_TABLE`                 | `processed_crash_data` |
//! | `BIGQUERY_MODEL`                 | `crash_severity_model` |
//! | `BIGQUERY_LOCATION`              | none                   |
//! | `CACHE_TTL_SECS`                 | `3600` (`0` = never)   |

use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

pub const DEFAULT_DATASET: &str = "crash_analysis";
pub const DEFAULT_TABLE: &str = "processed_crash_data";
pub const DEFAULT_MODEL: &str = "crash_severity_model";
pub const DEFAULT_CACHE_TTL_SECS: u64 = 3600;

/// The subset of a service-account key file this tool reads.
///
/// ```json
/// { "type": "service_account", "project_id": "my-project", "client_email": "..." }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountInfo {
    pub project_id: String,
    #[serde(default)]
    pub client_email: Option<String>,
}

impl ServiceAccountInfo {
    /// Loads the key file at `path`.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let credentials_error = |reason: String| ConfigError::Credentials {
            path: path.to_string(),
            reason,
        };
        let content = std::fs::read_to_string(path).map_err(|e| credentials_error(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| credentials_error(e.to_string()))
    }
}

/// Where the crash table and severity model live, and how to reach them.
#[derive(Clone)]
pub struct WarehouseSettings {
    pub project_id: String,
    pub access_token: String,
    pub dataset: String,
    pub table: String,
    pub model: String,
    pub location: Option<String>,
}

impl std::fmt::Debug for WarehouseSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WarehouseSettings")
            .field("project_id", &self.project_id)
            .field("access_token", &"<redacted>")
            .field("dataset", &self.dataset)
            .field("table", &self.table)
            .field("model", &self.model)
            .field("location", &self.location)
            .finish()
    }
}

impl WarehouseSettings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds settings from any variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let project_id = match get("GCP_PROJECT_ID") {
            Some(project) => project,
            None => match get("GOOGLE_APPLICATION_CREDENTIALS") {
                Some(path) => ServiceAccountInfo::load(&path)?.project_id,
                None => return Err(ConfigError::Missing("GCP_PROJECT_ID")),
            },
        };

        let settings = Self {
            project_id,
            access_token: get("GOOGLE_ACCESS_TOKEN")
                .ok_or(ConfigError::Missing("GOOGLE_ACCESS_TOKEN"))?,
            dataset: get("BIGQUERY_DATASET").unwrap_or_else(|| DEFAULT_DATASET.to_string()),
            table: get("BIGQUERY_TABLE").unwrap_or_else(|| DEFAULT_TABLE.to_string()),
            model: get("BIGQUERY_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            location: get("BIGQUERY_LOCATION"),
        };

        validate_identifier("GCP_PROJECT_ID", &settings.project_id)?;
        validate_identifier("BIGQUERY_DATASET", &settings.dataset)?;
        validate_identifier("BIGQUERY_TABLE", &settings.table)?;
        validate_identifier("BIGQUERY_MODEL", &settings.model)?;

        Ok(settings)
    }
}

/// Identifiers are spliced into SQL between backticks, so only plain
/// project/dataset/table characters are allowed.
fn validate_identifier(name: &'static str, value: &str) -> Result<(), ConfigError> {
    let valid = value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | ':' | '.'));
    if valid {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            name,
            reason: format!("'{value}' contains characters not allowed in an identifier"),
        })
    }
}

/// Cache time-to-live from `CACHE_TTL_SECS`. `None` means never expire.
pub fn cache_ttl(lookup: impl Fn(&str) -> Option<String>) -> Result<Option<Duration>, ConfigError> {
    let secs = match lookup("CACHE_TTL_SECS").filter(|v| !v.trim().is_empty()) {
        Some(raw) => raw.trim().parse::<u64>().map_err(|e| ConfigError::Invalid {
            name: "CACHE_TTL_SECS",
            reason: e.to_string(),
        })?,
        None => DEFAULT_CACHE_TTL_SECS,
    };
    Ok((secs > 0).then(|| Duration::from_secs(secs)))
}
