//! Search backend trait definition.

use async_trait::async_trait;
use recipe_search_shared::QuerySpec;

use crate::errors::SearchError;
use crate::schema::IndexSchema;
use crate::types::{BulkItemResult, BulkOperation, ClusterHealth, RawSearchResponse};

/// Capabilities the recipe search layer needs from a search engine.
///
/// An implementation is bound to a single index. Implementations are
/// injected as `Arc<dyn SearchBackend>` into the search client and the bulk
/// ingester, so they must be `Send + Sync`.
///
/// # Error Handling
///
/// Operation-level failures are returned as `Err`. `bulk_write` is the
/// exception for item-level failures: those are reported per item in the
/// returned results, and `Err` is reserved for the request as a whole.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Report the cluster status.
    async fn health(&self) -> Result<ClusterHealth, SearchError>;

    /// Create the index with the given settings and mappings.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If the index was created
    /// * `Err(SearchError::SchemaError)` - If it already exists or the schema was refused
    async fn create_index(&self, schema: &IndexSchema) -> Result<(), SearchError>;

    /// Delete the index and all its documents.
    async fn delete_index(&self) -> Result<(), SearchError>;

    /// Check whether the index exists.
    async fn index_exists(&self) -> Result<bool, SearchError>;

    /// Make all writes so far visible to search.
    async fn refresh(&self) -> Result<(), SearchError>;

    /// Write a batch of documents in a single request.
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<BulkItemResult>)` - One result per operation, in order
    /// * `Err(SearchError)` - If the request as a whole failed
    async fn bulk_write(
        &self,
        operations: &[BulkOperation],
    ) -> Result<Vec<BulkItemResult>, SearchError>;

    /// Execute a query and return one page of hits.
    ///
    /// # Arguments
    ///
    /// * `query` - What to match and how to score it
    /// * `from` - Offset of the first hit
    /// * `size` - Maximum number of hits
    async fn search(
        &self,
        query: &QuerySpec,
        from: usize,
        size: usize,
    ) -> Result<RawSearchResponse, SearchError>;
}
