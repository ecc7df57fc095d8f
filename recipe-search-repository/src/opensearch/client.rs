//! OpenSearch client implementation.
//!
//! This module provides the concrete implementation of `SearchBackend`
//! using the OpenSearch Rust client.

use async_trait::async_trait;
use opensearch::{
    cluster::ClusterHealthParts,
    http::request::JsonBody,
    http::response::Response,
    http::transport::{SingleNodeConnectionPool, TransportBuilder},
    indices::{IndicesCreateParts, IndicesDeleteParts, IndicesExistsParts, IndicesRefreshParts},
    BulkParts, OpenSearch, SearchParts,
};
use serde_json::{json, Value};
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use recipe_search_shared::QuerySpec;

use crate::config::SearchIndexConfig;
use crate::errors::SearchError;
use crate::interfaces::SearchBackend;
use crate::opensearch::index_config::create_index_body;
use crate::opensearch::queries::build_search_body;
use crate::schema::IndexSchema;
use crate::types::{BulkItemResult, BulkOperation, ClusterHealth, RawHit, RawSearchResponse};

/// OpenSearch backend bound to one index.
///
/// # Example
///
/// ```ignore
/// use recipe_search_repository::{OpenSearchBackend, SearchIndexConfig};
///
/// let config = SearchIndexConfig::new("recipes");
/// let backend = OpenSearchBackend::new("http://localhost:9200", config)?;
/// let health = backend.health().await?;
/// ```
pub struct OpenSearchBackend {
    client: OpenSearch,
    index_name: String,
}

impl OpenSearchBackend {
    /// Create a new OpenSearch backend connected to the specified URL.
    ///
    /// # Arguments
    ///
    /// * `url` - The OpenSearch server URL (e.g., "http://localhost:9200")
    /// * `config` - Index name and transport settings
    ///
    /// # Returns
    ///
    /// * `Ok(OpenSearchBackend)` - A new backend instance
    /// * `Err(SearchError)` - If the URL is invalid or the transport cannot be built
    pub fn new(url: &str, config: SearchIndexConfig) -> Result<Self, SearchError> {
        let parsed_url = Url::parse(url).map_err(|e| SearchError::transport(e.to_string()))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let mut builder = TransportBuilder::new(conn_pool).disable_proxy();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let transport = builder
            .build()
            .map_err(|e| SearchError::transport(e.to_string()))?;

        let client = OpenSearch::new(transport);

        info!(
            url = %url,
            index = %config.index_name,
            "Created OpenSearch backend"
        );

        Ok(Self {
            client,
            index_name: config.index_name,
        })
    }

    /// Name of the index this backend targets.
    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    /// Build the newline-delimited bulk body: an action line followed by the
    /// document source for every operation.
    fn bulk_body(&self, operations: &[BulkOperation]) -> Vec<JsonBody<Value>> {
        let mut body: Vec<JsonBody<Value>> = Vec::with_capacity(operations.len() * 2);
        for op in operations {
            body.push(json!({ op.mode.action(): { "_index": self.index_name, "_id": op.id } }).into());
            body.push(op.body.clone().into());
        }
        body
    }

    /// Parse a bulk response into one result per operation.
    ///
    /// Each entry of `items` is keyed by the action name and carries the
    /// item's `status` and, on failure, an `error` object.
    fn parse_bulk_response(
        response: &Value,
        operations: &[BulkOperation],
    ) -> Result<Vec<BulkItemResult>, SearchError> {
        let items = response
            .get("items")
            .and_then(|items| items.as_array())
            .ok_or_else(|| SearchError::parse("Bulk response has no items"))?;

        if items.len() != operations.len() {
            return Err(SearchError::parse(format!(
                "Bulk response has {} items for {} operations",
                items.len(),
                operations.len()
            )));
        }

        let results = items
            .iter()
            .zip(operations)
            .map(|(item, op)| {
                let outcome = item.get(op.mode.action()).unwrap_or(&Value::Null);
                let id = outcome
                    .get("_id")
                    .and_then(|id| id.as_str())
                    .unwrap_or(&op.id)
                    .to_string();
                let status = outcome
                    .get("status")
                    .and_then(|s| s.as_u64())
                    .and_then(|s| u16::try_from(s).ok());

                match outcome.get("error") {
                    Some(err) => BulkItemResult::rejected(id, status, Self::error_reason(err)),
                    None if status.is_some_and(|s| (200..300).contains(&s)) => {
                        BulkItemResult::written(id, status.unwrap_or(200))
                    }
                    None => BulkItemResult::rejected(id, status, "No outcome reported for item"),
                }
            })
            .collect();

        Ok(results)
    }

    /// Format an OpenSearch error object as `type: reason`.
    fn error_reason(error: &Value) -> String {
        let kind = error.get("type").and_then(|t| t.as_str());
        let reason = error.get("reason").and_then(|r| r.as_str());
        match (kind, reason) {
            (Some(kind), Some(reason)) => format!("{}: {}", kind, reason),
            (Some(kind), None) => kind.to_string(),
            (None, Some(reason)) => reason.to_string(),
            (None, None) => error.to_string(),
        }
    }

    /// Parse a search response into total and hits.
    fn parse_search_response(response: &Value) -> Result<RawSearchResponse, SearchError> {
        let hits = response
            .get("hits")
            .ok_or_else(|| SearchError::parse("Search response has no hits"))?;

        // `hits.total` is an object since OpenSearch 1.0 and a number before.
        let total = match hits.get("total") {
            Some(Value::Number(n)) => n.as_u64(),
            Some(total) => total.get("value").and_then(|v| v.as_u64()),
            None => None,
        }
        .ok_or_else(|| SearchError::parse("Search response has no total"))?;

        let hits = hits
            .get("hits")
            .and_then(|h| h.as_array())
            .map(|hits| hits.iter().filter_map(Self::parse_hit).collect())
            .unwrap_or_default();

        Ok(RawSearchResponse { total, hits })
    }

    /// Parse a single hit. Hits without an id or source are skipped.
    fn parse_hit(hit: &Value) -> Option<RawHit> {
        let id = hit.get("_id")?.as_str()?.to_string();
        let source = hit.get("_source")?.clone();
        let score = hit.get("_score").and_then(|s| s.as_f64());
        Some(RawHit { id, score, source })
    }

    /// Read the body of a failed response for error reporting.
    async fn error_body(response: Response) -> String {
        response.text().await.unwrap_or_default()
    }
}

#[async_trait]
impl SearchBackend for OpenSearchBackend {
    async fn health(&self) -> Result<ClusterHealth, SearchError> {
        let response = self
            .client
            .cluster()
            .health(ClusterHealthParts::None)
            .send()
            .await
            .map_err(|e| SearchError::transport(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let body = Self::error_body(response).await;
            return Err(SearchError::transport(format!(
                "Health check failed with status {}: {}",
                status, body
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| SearchError::parse(e.to_string()))?;
        let cluster_status = body
            .get("status")
            .and_then(|s| s.as_str())
            .ok_or_else(|| SearchError::parse("Health response has no status"))?;

        debug!(status = %cluster_status, "Cluster health");
        cluster_status.parse()
    }

    #[instrument(skip(self, schema), fields(index = %self.index_name))]
    async fn create_index(&self, schema: &IndexSchema) -> Result<(), SearchError> {
        let body = create_index_body(schema)?;

        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(&self.index_name))
            .body(body)
            .send()
            .await
            .map_err(|e| SearchError::transport(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let body = Self::error_body(response).await;
            error!(status = %status, body = %body, "Create index request failed");
            return Err(SearchError::schema(format!(
                "Create index failed with status {}: {}",
                status, body
            )));
        }

        info!("Index created");
        Ok(())
    }

    #[instrument(skip(self), fields(index = %self.index_name))]
    async fn delete_index(&self) -> Result<(), SearchError> {
        let response = self
            .client
            .indices()
            .delete(IndicesDeleteParts::Index(&[self.index_name.as_str()]))
            .send()
            .await
            .map_err(|e| SearchError::transport(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let body = Self::error_body(response).await;
            error!(status = %status, body = %body, "Delete index request failed");
            return Err(SearchError::schema(format!(
                "Delete index failed with status {}: {}",
                status, body
            )));
        }

        info!("Index deleted");
        Ok(())
    }

    async fn index_exists(&self) -> Result<bool, SearchError> {
        let response = self
            .client
            .indices()
            .exists(IndicesExistsParts::Index(&[self.index_name.as_str()]))
            .send()
            .await
            .map_err(|e| SearchError::transport(e.to_string()))?;

        match response.status_code().as_u16() {
            200 => Ok(true),
            404 => Ok(false),
            other => Err(SearchError::transport(format!(
                "Index exists check failed with status {}",
                other
            ))),
        }
    }

    async fn refresh(&self) -> Result<(), SearchError> {
        let response = self
            .client
            .indices()
            .refresh(IndicesRefreshParts::Index(&[self.index_name.as_str()]))
            .send()
            .await
            .map_err(|e| SearchError::transport(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let body = Self::error_body(response).await;
            return Err(SearchError::transport(format!(
                "Refresh failed with status {}: {}",
                status, body
            )));
        }
        Ok(())
    }

    #[instrument(skip(self, operations), fields(count = operations.len()))]
    async fn bulk_write(
        &self,
        operations: &[BulkOperation],
    ) -> Result<Vec<BulkItemResult>, SearchError> {
        if operations.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .bulk(BulkParts::Index(&self.index_name))
            .body(self.bulk_body(operations))
            .send()
            .await
            .map_err(|e| SearchError::transport(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let body = Self::error_body(response).await;
            error!(status = %status, body = %body, "Bulk request failed");
            return Err(SearchError::transport(format!(
                "Bulk request failed with status {}: {}",
                status, body
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| SearchError::parse(e.to_string()))?;
        let results = Self::parse_bulk_response(&body, operations)?;

        let failed = results.iter().filter(|r| !r.success).count();
        if failed > 0 {
            warn!(failed = failed, "Bulk request had rejected items");
        }

        Ok(results)
    }

    #[instrument(skip(self, query))]
    async fn search(
        &self,
        query: &QuerySpec,
        from: usize,
        size: usize,
    ) -> Result<RawSearchResponse, SearchError> {
        let body = build_search_body(query, from, size);

        let response = self
            .client
            .search(SearchParts::Index(&[self.index_name.as_str()]))
            .body(body)
            .send()
            .await
            .map_err(|e| SearchError::transport(e.to_string()))?;

        let status = response.status_code();
        if status.is_client_error() {
            let body = Self::error_body(response).await;
            return Err(SearchError::query(format!(
                "Search rejected with status {}: {}",
                status, body
            )));
        }
        if !status.is_success() {
            let body = Self::error_body(response).await;
            error!(status = %status, body = %body, "Search request failed");
            return Err(SearchError::transport(format!(
                "Search failed with status {}: {}",
                status, body
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| SearchError::parse(e.to_string()))?;
        Self::parse_search_response(&body)
    }
}
