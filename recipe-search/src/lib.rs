//! # Recipe Search
//!
//! Command line for the recipe search index.
//!
//! This crate provides the configuration, wiring and command handlers behind
//! the `recipe-search` binary.

pub mod commands;
pub mod config;
pub mod logging;

pub use config::{AppConfig, Dependencies};

use recipe_search_ingest::IngestError;
use recipe_search_repository::{ClusterHealth, SearchError};
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The cluster cannot serve requests.
    #[error("OpenSearch cluster is unhealthy: status {0}")]
    Unhealthy(ClusterHealth),

    /// Search error.
    #[error("Search error: {0}")]
    SearchError(#[from] SearchError),

    /// Ingestion error.
    #[error("Ingest error: {0}")]
    IngestError(#[from] IngestError),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl AppError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
