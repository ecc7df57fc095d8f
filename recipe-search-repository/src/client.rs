//! Recipe search client.
//!
//! This module provides the facade application code uses to manage the
//! recipe index and to query it. It builds queries, validates pagination and
//! decodes hits into recipes; everything else is delegated to the backend.

use std::sync::Arc;

use recipe_search_shared::{QuerySpec, Recipe, SearchHit, SearchResult};
use tracing::{debug, info, instrument, warn};

use crate::errors::SearchError;
use crate::interfaces::SearchBackend;
use crate::query::{build_autocomplete_query, build_search_query};
use crate::schema::{define_schema_with, SchemaSettings};
use crate::types::{ClusterHealth, RawHit};

/// The main client for querying and managing the recipe index.
#[derive(Clone)]
pub struct RecipeSearchClient {
    backend: Arc<dyn SearchBackend>,
    schema_settings: SchemaSettings,
}

impl RecipeSearchClient {
    /// Create a client that creates indexes with default settings.
    pub fn new(backend: Arc<dyn SearchBackend>) -> Self {
        Self {
            backend,
            schema_settings: SchemaSettings::default(),
        }
    }

    /// Create a client with custom shard and replica counts.
    pub fn with_schema_settings(
        backend: Arc<dyn SearchBackend>,
        schema_settings: SchemaSettings,
    ) -> Self {
        Self {
            backend,
            schema_settings,
        }
    }

    /// The backend this client delegates to.
    pub fn backend(&self) -> Arc<dyn SearchBackend> {
        Arc::clone(&self.backend)
    }

    /// Execute a query and decode one page of recipes.
    ///
    /// # Arguments
    ///
    /// * `query` - What to match and how to score it
    /// * `from` - Offset of the first hit
    /// * `size` - Maximum number of hits, must be positive
    ///
    /// # Returns
    ///
    /// * `Ok(SearchResult)` - Hits in ranking order and the total match count
    /// * `Err(SearchError::QueryError)` - If `size` is zero
    ///
    /// Stored documents that do not decode as recipes are left out of the
    /// page and logged.
    #[instrument(skip(self, query), fields(clauses = query.clauses().len()))]
    pub async fn search(
        &self,
        query: &QuerySpec,
        from: usize,
        size: usize,
    ) -> Result<SearchResult, SearchError> {
        if size == 0 {
            return Err(SearchError::query("size must be greater than zero"));
        }

        let response = self.backend.search(query, from, size).await?;
        let hits: Vec<SearchHit> = response
            .hits
            .into_iter()
            .filter_map(|hit| match decode_hit(hit) {
                Ok(hit) => Some(hit),
                Err(e) => {
                    warn!(error = %e, "Skipping stored document");
                    None
                }
            })
            .collect();

        debug!(total = response.total, returned = hits.len(), "Search completed");

        Ok(SearchResult {
            from,
            size,
            total: response.total,
            hits,
        })
    }

    /// Free-text relevance search over titles and descriptions.
    pub async fn search_text(
        &self,
        query: &str,
        from: usize,
        size: usize,
    ) -> Result<SearchResult, SearchError> {
        self.search(&build_search_query(query), from, size).await
    }

    /// Prefix search over titles.
    pub async fn autocomplete(
        &self,
        query: &str,
        from: usize,
        size: usize,
    ) -> Result<SearchResult, SearchError> {
        self.search(&build_autocomplete_query(query), from, size)
            .await
    }

    pub async fn health_status(&self) -> Result<ClusterHealth, SearchError> {
        self.backend.health().await
    }

    /// Create the recipe index. Fails if it already exists.
    pub async fn create_index(&self) -> Result<(), SearchError> {
        let schema = define_schema_with(&self.schema_settings);
        self.backend.create_index(&schema).await?;
        info!(
            shards = self.schema_settings.shards,
            replicas = self.schema_settings.replicas,
            "Created recipe index"
        );
        Ok(())
    }

    pub async fn delete_index(&self) -> Result<(), SearchError> {
        self.backend.delete_index().await?;
        info!("Deleted recipe index");
        Ok(())
    }

    pub async fn index_exists(&self) -> Result<bool, SearchError> {
        self.backend.index_exists().await
    }

    /// Create the recipe index unless it exists.
    ///
    /// Returns whether the index was created.
    pub async fn ensure_index(&self) -> Result<bool, SearchError> {
        if self.index_exists().await? {
            debug!("Recipe index already exists");
            return Ok(false);
        }
        self.create_index().await?;
        Ok(true)
    }

    /// Make all indexed recipes visible to search.
    pub async fn refresh(&self) -> Result<(), SearchError> {
        self.backend.refresh().await
    }
}

fn decode_hit(hit: RawHit) -> Result<SearchHit, SearchError> {
    let recipe: Recipe = serde_json::from_value(hit.source).map_err(|e| {
        SearchError::parse(format!("Document {} is not a recipe: {}", hit.id, e))
    })?;

    Ok(SearchHit {
        id: hit.id,
        score: hit.score,
        recipe,
    })
}
