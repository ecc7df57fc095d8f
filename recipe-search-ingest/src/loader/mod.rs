//! Loader module for recipe ingestion.
//!
//! Groups a stream of documents into bounded batches and writes each batch
//! as one bulk request.

use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;

use futures::{Stream, StreamExt};
use recipe_search_repository::{BulkItemResult, BulkOperation, SearchBackend, SearchError};
use tracing::{debug, error, info, instrument, warn};

use crate::document::IndexDocument;
use crate::errors::{IngestError, SourceError};

/// Retry behaviour for bulk requests that fail as a whole.
///
/// Only transport failures are retried. Documents rejected individually by
/// the backend are reported, never resent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt. Zero disables retrying.
    pub max_retries: u32,
    /// Delay before the first retry; doubled for every further one.
    pub initial_delay: Duration,
    /// Upper bound on the delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Retry up to `max_retries` times with the default delays.
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    /// Delay before retry number `retry` (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.initial_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }
}

/// Configuration for the bulk ingester.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestConfig {
    /// Number of documents per bulk request. Must be positive.
    pub max_batch_size: usize,
    pub retry: RetryPolicy,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_batch_size: 100,
            retry: RetryPolicy::default(),
        }
    }
}

impl IngestConfig {
    /// Default configuration with the given batch size.
    pub fn with_batch_size(max_batch_size: usize) -> Self {
        Self {
            max_batch_size,
            ..Self::default()
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// A document that was not stored.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemFailure {
    /// Document id, or the source location when no document could be read.
    pub id: String,
    pub reason: String,
    /// Backend status for the item, when the backend rejected it.
    pub status: Option<u16>,
}

/// Outcome of an ingestion run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestionReport {
    /// Items taken from the stream, failed ones included.
    pub processed: usize,
    /// Documents the backend accepted.
    pub succeeded: usize,
    /// Size of every bulk request, in order.
    pub batch_sizes: Vec<usize>,
    pub failures: Vec<ItemFailure>,
}

impl IngestionReport {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// Number of bulk requests sent.
    pub fn flushes(&self) -> usize {
        self.batch_sizes.len()
    }

    /// Whether every processed item was stored.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    fn record_failure(&mut self, failure: ItemFailure) {
        warn!(
            id = %failure.id,
            status = ?failure.status,
            reason = %failure.reason,
            "Document not indexed"
        );
        self.failures.push(failure);
    }
}

/// Writes streams of documents to the search backend in bounded batches.
///
/// The current batch lives only inside a single `ingest` call, so one
/// ingester can serve concurrent runs. Dropping an `ingest` future discards
/// its unflushed batch.
pub struct BulkIngester {
    backend: Arc<dyn SearchBackend>,
    config: IngestConfig,
}

impl BulkIngester {
    /// Create an ingester with the default configuration.
    pub fn new(backend: Arc<dyn SearchBackend>) -> Self {
        Self {
            backend,
            config: IngestConfig::default(),
        }
    }

    /// Create an ingester with a custom configuration.
    ///
    /// Fails with [`IngestError::ConfigError`] when the batch size is zero.
    pub fn with_config(
        backend: Arc<dyn SearchBackend>,
        config: IngestConfig,
    ) -> Result<Self, IngestError> {
        if config.max_batch_size == 0 {
            return Err(IngestError::config("max_batch_size must be greater than zero"));
        }
        Ok(Self { backend, config })
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Index every document of the stream.
    ///
    /// Documents are upserted, keyed by their id. A full batch is flushed as
    /// soon as it is complete and the trailing partial batch when the stream
    /// ends.
    ///
    /// # Returns
    ///
    /// * `Ok(IngestionReport)` - Once every document was processed; rejected
    ///   documents are listed in the report
    /// * `Err(IngestError::TransportError)` - If a bulk request failed after
    ///   any configured retries; earlier batches stay written
    pub async fn ingest<S, D>(&self, documents: S) -> Result<IngestionReport, IngestError>
    where
        S: Stream<Item = D>,
        D: IndexDocument,
    {
        self.ingest_results(documents.map(Ok::<D, SourceError>))
            .await
    }

    /// Like [`ingest`](Self::ingest), for sources that can fail per item.
    ///
    /// Source errors are recorded as failures keyed by their location and
    /// count as processed.
    pub async fn ingest_results<S, D>(&self, documents: S) -> Result<IngestionReport, IngestError>
    where
        S: Stream<Item = Result<D, SourceError>>,
        D: IndexDocument,
    {
        let mut documents = pin!(documents);
        let mut report = IngestionReport::default();
        let mut batch = Vec::with_capacity(self.config.max_batch_size);

        while let Some(item) = documents.next().await {
            report.processed += 1;

            let document = match item {
                Ok(document) => document,
                Err(e) => {
                    report.record_failure(ItemFailure {
                        id: e.location(),
                        reason: e.to_string(),
                        status: None,
                    });
                    continue;
                }
            };

            match prepare(&document) {
                Ok(operation) => batch.push(operation),
                Err(failure) => {
                    report.record_failure(failure);
                    continue;
                }
            }

            if batch.len() >= self.config.max_batch_size {
                self.flush(&mut batch, &mut report).await?;
            }
        }

        if !batch.is_empty() {
            self.flush(&mut batch, &mut report).await?;
        }

        info!(
            processed = report.processed,
            succeeded = report.succeeded,
            failed = report.failed(),
            flushes = report.flushes(),
            "Ingestion completed"
        );

        Ok(report)
    }

    /// Write the batch as one bulk request and empty it.
    #[instrument(skip(self, batch, report), fields(batch_size = batch.len()))]
    async fn flush(
        &self,
        batch: &mut Vec<BulkOperation>,
        report: &mut IngestionReport,
    ) -> Result<(), IngestError> {
        let results = self.bulk_write_with_retry(batch).await?;
        if results.len() != batch.len() {
            return Err(IngestError::SearchError(SearchError::parse(format!(
                "Bulk response has {} items for {} operations",
                results.len(),
                batch.len()
            ))));
        }

        report.batch_sizes.push(batch.len());
        let mut written = 0;
        for result in results {
            if result.success {
                written += 1;
            } else {
                report.record_failure(rejection(result));
            }
        }
        report.succeeded += written;

        debug!(written, rejected = batch.len() - written, "Flushed batch");
        batch.clear();
        Ok(())
    }

    /// Send a bulk request with exponential backoff on transport failures.
    async fn bulk_write_with_retry(
        &self,
        batch: &[BulkOperation],
    ) -> Result<Vec<BulkItemResult>, IngestError> {
        let policy = &self.config.retry;
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            match self.backend.bulk_write(batch).await {
                Ok(results) => {
                    if attempt > 1 {
                        info!(
                            attempt,
                            count = batch.len(),
                            "Bulk write succeeded after retry"
                        );
                    }
                    return Ok(results);
                }
                Err(e) if e.is_transport() && attempt <= policy.max_retries => {
                    let delay = policy.delay_for(attempt);
                    warn!(
                        attempt,
                        max_retries = policy.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Bulk write failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    error!(
                        attempt,
                        count = batch.len(),
                        error = %e,
                        "Bulk write failed"
                    );
                    return Err(IngestError::from_flush(e, attempt));
                }
            }
        }
    }
}

/// Turn a document into an upsert, or a failure when it has no usable id
/// or body.
fn prepare<D: IndexDocument>(document: &D) -> Result<BulkOperation, ItemFailure> {
    let id = document.document_id();
    if id.trim().is_empty() {
        return Err(ItemFailure {
            id,
            reason: "document has an empty id".to_string(),
            status: None,
        });
    }

    match document.to_body() {
        Ok(body) => Ok(BulkOperation::upsert(id, body)),
        Err(e) => Err(ItemFailure {
            id,
            reason: e.to_string(),
            status: None,
        }),
    }
}

fn rejection(result: BulkItemResult) -> ItemFailure {
    let reason = match result.error {
        Some(SearchError::ItemRejected { reason, .. }) => reason,
        Some(other) => other.to_string(),
        None => "rejected without a reason".to_string(),
    };

    ItemFailure {
        id: result.id,
        reason,
        status: result.status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::RawDocument;
    use async_trait::async_trait;
    use futures::stream;
    use recipe_search_repository::{
        define_schema, ClusterHealth, IndexSchema, InMemoryBackend, RawSearchResponse,
    };
    use recipe_search_shared::{QuerySpec, Recipe};
    use serde_json::{json, Value};

    fn recipes(count: usize) -> Vec<Recipe> {
        (0..count)
            .map(|i| {
                Recipe::new(
                    format!("https://example.com/recipes/{}", i),
                    format!("Recipe {}", i),
                    "",
                )
            })
            .collect()
    }

    fn backend() -> Arc<InMemoryBackend> {
        Arc::new(InMemoryBackend::with_index(define_schema()))
    }

    fn ingester(backend: Arc<InMemoryBackend>, config: IngestConfig) -> BulkIngester {
        BulkIngester::with_config(backend, config).unwrap()
    }

    #[test]
    fn test_zero_batch_size_is_rejected() {
        let result = BulkIngester::with_config(backend(), IngestConfig::with_batch_size(0));
        assert!(matches!(result, Err(IngestError::ConfigError(_))));
    }

    #[test]
    fn test_retry_delay_doubles_up_to_max() {
        let policy = RetryPolicy {
            max_retries: 5,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(350),
        };

        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(350));
        assert_eq!(policy.delay_for(40), Duration::from_millis(350));
    }

    #[tokio::test]
    async fn test_batches_are_bounded() {
        for (count, batch_size, expected) in [
            (10, 3, vec![3, 3, 3, 1]),
            (9, 3, vec![3, 3, 3]),
            (2, 5, vec![2]),
            (4, 1, vec![1, 1, 1, 1]),
        ] {
            let backend = backend();
            let ingester = ingester(backend.clone(), IngestConfig::with_batch_size(batch_size));

            let report = ingester
                .ingest(stream::iter(recipes(count)))
                .await
                .unwrap();

            assert_eq!(report.batch_sizes, expected);
            assert_eq!(backend.committed_batches().await, expected);
            assert_eq!(report.flushes(), count.div_ceil(batch_size));
            assert_eq!(report.processed, count);
            assert_eq!(report.succeeded, count);
            assert!(report.is_complete());
        }
    }

    #[tokio::test]
    async fn test_empty_stream_sends_nothing() {
        let backend = backend();
        let ingester = ingester(backend.clone(), IngestConfig::with_batch_size(10));

        let report = ingester
            .ingest(stream::iter(Vec::<Recipe>::new()))
            .await
            .unwrap();

        assert_eq!(report, IngestionReport::default());
        assert_eq!(backend.bulk_request_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_ingest_discards_partial_batch() {
        let backend = backend();
        let ingester = ingester(backend.clone(), IngestConfig::with_batch_size(3));
        let documents = stream::iter(recipes(2)).chain(stream::pending());

        let result =
            tokio::time::timeout(Duration::from_secs(1), ingester.ingest(documents)).await;

        assert!(result.is_err());
        assert_eq!(backend.bulk_request_count(), 0);
        assert_eq!(backend.document_count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_ingest_keeps_flushed_batches() {
        let backend = backend();
        let ingester = ingester(backend.clone(), IngestConfig::with_batch_size(3));
        let documents = stream::iter(recipes(5)).chain(stream::pending());

        let result =
            tokio::time::timeout(Duration::from_secs(1), ingester.ingest(documents)).await;

        assert!(result.is_err());
        assert_eq!(backend.committed_batches().await, vec![3]);
        assert_eq!(backend.document_count().await, 3);
    }

    #[tokio::test]
    async fn test_same_id_twice_keeps_latest_body() {
        let backend = backend();
        let ingester = ingester(backend.clone(), IngestConfig::with_batch_size(1));
        let url = "https://example.com/soup";

        let report = ingester
            .ingest(stream::iter([
                Recipe::new(url, "Soup", "First draft"),
                Recipe::new(url, "Soup", "Final"),
            ]))
            .await
            .unwrap();

        assert_eq!(report.succeeded, 2);
        assert_eq!(backend.document_count().await, 1);
        assert_eq!(backend.document(url).await.unwrap()["description"], "Final");
    }

    #[tokio::test]
    async fn test_processed_matches_input_for_any_batch_size() {
        for batch_size in [1, 2, 7, 25, 100] {
            let ingester = ingester(backend(), IngestConfig::with_batch_size(batch_size));

            let report = ingester.ingest(stream::iter(recipes(25))).await.unwrap();
            assert_eq!(report.processed, 25, "batch size {}", batch_size);
        }
    }

    #[tokio::test]
    async fn test_malformed_item_does_not_block_batch() {
        let backend = backend();
        let ingester = ingester(backend.clone(), IngestConfig::with_batch_size(3));

        let documents = vec![
            RawDocument::new("a", json!({ "title": "A", "servings": 2 })),
            RawDocument::new("b", json!({ "title": "B", "servings": "plenty" })),
            RawDocument::new("c", json!({ "title": "C" })),
        ];
        let report = ingester.ingest(stream::iter(documents)).await.unwrap();

        assert_eq!(report.batch_sizes, vec![3]);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].id, "b");
        assert_eq!(report.failures[0].status, Some(400));
        assert!(report.failures[0].reason.contains("mapper_parsing_exception"));

        assert!(backend.document("a").await.is_some());
        assert!(backend.document("c").await.is_some());
        assert_eq!(backend.bulk_request_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_id_is_not_sent() {
        let backend = backend();
        let ingester = ingester(backend.clone(), IngestConfig::with_batch_size(2));

        let report = ingester
            .ingest(stream::iter([
                Recipe::new("", "Nameless", ""),
                Recipe::new("https://example.com/a", "A", ""),
            ]))
            .await
            .unwrap();

        assert_eq!(report.processed, 2);
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.batch_sizes, vec![1]);
        assert_eq!(report.failures[0].reason, "document has an empty id");
    }

    #[tokio::test]
    async fn test_source_errors_are_recorded() {
        let backend = backend();
        let ingester = ingester(backend.clone(), IngestConfig::with_batch_size(10));

        let decode_error = serde_json::from_str::<Value>("{").unwrap_err();
        let items = vec![
            Ok(Recipe::new("https://example.com/a", "A", "")),
            Err(SourceError::Decode {
                path: "recipes/broken.json".into(),
                source: decode_error,
            }),
        ];
        let report = ingester.ingest_results(stream::iter(items)).await.unwrap();

        assert_eq!(report.processed, 2);
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failures[0].id, "recipes/broken.json");
        assert_eq!(report.failures[0].status, None);
    }

    #[tokio::test]
    async fn test_transport_failure_keeps_earlier_batches() {
        let backend = backend();
        backend.fail_bulk_requests([1]).await;
        let ingester = ingester(backend.clone(), IngestConfig::with_batch_size(2));

        let result = ingester.ingest(stream::iter(recipes(6))).await;

        match result {
            Err(IngestError::TransportError { attempts, .. }) => assert_eq!(attempts, 1),
            other => panic!("expected transport error, got {:?}", other),
        }
        assert_eq!(backend.committed_batches().await, vec![2]);
        assert_eq!(backend.document_count().await, 2);
        assert_eq!(backend.bulk_request_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_recovers_after_transient_failures() {
        let backend = backend();
        backend.fail_bulk_requests([0, 1]).await;
        let config =
            IngestConfig::with_batch_size(5).with_retry(RetryPolicy::with_max_retries(2));
        let ingester = ingester(backend.clone(), config);

        let report = ingester.ingest(stream::iter(recipes(5))).await.unwrap();

        assert_eq!(report.succeeded, 5);
        assert_eq!(report.batch_sizes, vec![5]);
        assert_eq!(backend.bulk_request_count(), 3);
        assert_eq!(backend.committed_batches().await, vec![5]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_gives_up_after_max_retries() {
        let backend = backend();
        backend.fail_bulk_requests([0, 1, 2]).await;
        let config =
            IngestConfig::with_batch_size(5).with_retry(RetryPolicy::with_max_retries(1));
        let ingester = ingester(backend.clone(), config);

        let result = ingester.ingest(stream::iter(recipes(3))).await;

        match result {
            Err(IngestError::TransportError { attempts, .. }) => assert_eq!(attempts, 2),
            other => panic!("expected transport error, got {:?}", other),
        }
        assert_eq!(backend.bulk_request_count(), 2);
        assert_eq!(backend.document_count().await, 0);
    }

    #[tokio::test]
    async fn test_rejections_are_not_retried() {
        let backend = backend();
        let config =
            IngestConfig::with_batch_size(5).with_retry(RetryPolicy::with_max_retries(3));
        let ingester = ingester(backend.clone(), config);

        let report = ingester
            .ingest(stream::iter([RawDocument::new(
                "a",
                json!({ "author": "not an object" }),
            )]))
            .await
            .unwrap();

        assert_eq!(report.failed(), 1);
        assert_eq!(backend.bulk_request_count(), 1);
    }

    /// Backend whose bulk responses drop the last item.
    struct TruncatingBackend;

    #[async_trait]
    impl SearchBackend for TruncatingBackend {
        async fn health(&self) -> Result<ClusterHealth, SearchError> {
            Ok(ClusterHealth::Green)
        }

        async fn create_index(&self, _schema: &IndexSchema) -> Result<(), SearchError> {
            Ok(())
        }

        async fn delete_index(&self) -> Result<(), SearchError> {
            Ok(())
        }

        async fn index_exists(&self) -> Result<bool, SearchError> {
            Ok(true)
        }

        async fn refresh(&self) -> Result<(), SearchError> {
            Ok(())
        }

        async fn bulk_write(
            &self,
            operations: &[BulkOperation],
        ) -> Result<Vec<BulkItemResult>, SearchError> {
            Ok(operations
                .iter()
                .skip(1)
                .map(|op| BulkItemResult::written(&op.id, 201))
                .collect())
        }

        async fn search(
            &self,
            _query: &QuerySpec,
            _from: usize,
            _size: usize,
        ) -> Result<RawSearchResponse, SearchError> {
            Ok(RawSearchResponse::default())
        }
    }

    #[tokio::test]
    async fn test_mismatched_bulk_response_is_an_error() {
        let ingester = BulkIngester::new(Arc::new(TruncatingBackend));

        let result = ingester.ingest(stream::iter(recipes(2))).await;
        assert!(matches!(
            result,
            Err(IngestError::SearchError(SearchError::ParseError(_)))
        ));
    }
}
