//! Settings read from the environment.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use recipe_search_ingest::{IngestConfig, RetryPolicy};
use recipe_search_repository::{SchemaSettings, SearchIndexConfig, DEFAULT_INDEX_NAME};

use crate::AppError;

/// Default OpenSearch URL.
const DEFAULT_OPENSEARCH_URL: &str = "http://localhost:9200";

/// Default number of documents per bulk request.
const DEFAULT_BULK_SIZE: usize = 100;

/// Default OpenSearch request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Values given on the command line. Each one that is set replaces the
/// environment's.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    pub opensearch_url: Option<String>,
    pub index_name: Option<String>,
    pub bulk_size: Option<usize>,
}

/// Settings for every command.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub opensearch_url: String,
    pub index_name: String,
    pub schema: SchemaSettings,
    pub bulk_size: usize,
    pub bulk_max_retries: u32,
    pub timeout: Duration,
    pub log_format: LogFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            opensearch_url: DEFAULT_OPENSEARCH_URL.to_string(),
            index_name: DEFAULT_INDEX_NAME.to_string(),
            schema: SchemaSettings::default(),
            bulk_size: DEFAULT_BULK_SIZE,
            bulk_max_retries: 0,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            log_format: LogFormat::Text,
        }
    }
}

impl AppConfig {
    /// Load settings from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `OPENSEARCH_URL`: OpenSearch server URL (default: http://localhost:9200)
    /// - `RECIPE_INDEX`: Index name (default: recipes)
    /// - `RECIPE_INDEX_SHARDS`: Shards for a new index (default: 1)
    /// - `RECIPE_INDEX_REPLICAS`: Replicas for a new index (default: 0)
    /// - `BULK_SIZE`: Documents per bulk request (default: 100)
    /// - `BULK_MAX_RETRIES`: Retries of a failed bulk request (default: 0)
    /// - `OPENSEARCH_TIMEOUT_SECS`: Request timeout (default: 30)
    /// - `LOG_FORMAT`: `json` for JSON logs, anything else for text
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load settings through `lookup`, which returns the value of a variable
    /// if it is set.
    ///
    /// Values are parsed but not validated; call [`AppConfig::validate`] or
    /// [`AppConfig::with_overrides`] once every source has been applied.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let config = Self {
            opensearch_url: lookup("OPENSEARCH_URL").unwrap_or(defaults.opensearch_url),
            index_name: lookup("RECIPE_INDEX").unwrap_or(defaults.index_name),
            schema: SchemaSettings {
                shards: parse_var(&lookup, "RECIPE_INDEX_SHARDS", defaults.schema.shards)?,
                replicas: parse_var(&lookup, "RECIPE_INDEX_REPLICAS", defaults.schema.replicas)?,
            },
            bulk_size: parse_var(&lookup, "BULK_SIZE", defaults.bulk_size)?,
            bulk_max_retries: parse_var(&lookup, "BULK_MAX_RETRIES", defaults.bulk_max_retries)?,
            timeout: Duration::from_secs(parse_var(
                &lookup,
                "OPENSEARCH_TIMEOUT_SECS",
                DEFAULT_TIMEOUT_SECS,
            )?),
            log_format: match lookup("LOG_FORMAT") {
                Some(format) if format.eq_ignore_ascii_case("json") => LogFormat::Json,
                _ => LogFormat::Text,
            },
        };

        Ok(config)
    }

    /// Apply command line overrides, then validate the result.
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Result<Self, AppError> {
        if let Some(url) = overrides.opensearch_url {
            self.opensearch_url = url;
        }
        if let Some(index_name) = overrides.index_name {
            self.index_name = index_name;
        }
        if let Some(bulk_size) = overrides.bulk_size {
            self.bulk_size = bulk_size;
        }

        self.validate()?;
        Ok(self)
    }

    /// Check values that parse but cannot be used.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.index_name.trim().is_empty() {
            return Err(AppError::config("RECIPE_INDEX must not be empty"));
        }
        if self.schema.shards == 0 {
            return Err(AppError::config("RECIPE_INDEX_SHARDS must be at least 1"));
        }
        if self.bulk_size == 0 {
            return Err(AppError::config("BULK_SIZE must be at least 1"));
        }
        Ok(())
    }

    /// Settings for the OpenSearch backend.
    pub fn search_index_config(&self) -> SearchIndexConfig {
        SearchIndexConfig::new(self.index_name.clone())
            .with_schema_settings(self.schema)
            .with_timeout(self.timeout)
    }

    /// Settings for the bulk ingester.
    pub fn ingest_config(&self) -> IngestConfig {
        IngestConfig::with_batch_size(self.bulk_size)
            .with_retry(RetryPolicy::with_max_retries(self.bulk_max_retries))
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T, AppError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e| {
            AppError::config(format!("Invalid value {:?} for {}: {}", raw, key, e))
        }),
    }
}
