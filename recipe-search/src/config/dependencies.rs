//! Dependency initialization and wiring for the command line.

use std::sync::Arc;
use tracing::info;

use crate::config::AppConfig;
use crate::AppError;
use recipe_search_ingest::BulkIngester;
use recipe_search_repository::{OpenSearchBackend, RecipeSearchClient, SearchBackend};

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// Facade for index management and queries.
    pub client: RecipeSearchClient,
    /// Bulk loader sharing the client's backend.
    pub ingester: BulkIngester,
}

impl Dependencies {
    /// Connect to OpenSearch using the given settings.
    ///
    /// No request is sent here; an unreachable cluster surfaces on the first
    /// command.
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies
    /// * `Err(AppError)` - If the URL is invalid or the settings are unusable
    pub fn new(config: &AppConfig) -> Result<Self, AppError> {
        info!(
            opensearch_url = %config.opensearch_url,
            index = %config.index_name,
            "Initializing dependencies"
        );

        let backend = OpenSearchBackend::new(&config.opensearch_url, config.search_index_config())
            .map_err(|e| AppError::config(format!("Failed to create OpenSearch client: {}", e)))?;

        Self::with_backend(Arc::new(backend), config)
    }

    /// Wire the client and the ingester around an existing backend.
    pub fn with_backend(
        backend: Arc<dyn SearchBackend>,
        config: &AppConfig,
    ) -> Result<Self, AppError> {
        let client = RecipeSearchClient::with_schema_settings(Arc::clone(&backend), config.schema);
        let ingester = BulkIngester::with_config(backend, config.ingest_config())?;

        Ok(Self { client, ingester })
    }
}
