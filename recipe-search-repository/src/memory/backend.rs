//! In-memory search backend.

use std::cmp::Ordering as CmpOrdering;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use recipe_search_shared::{ClauseKind, QueryClause, QuerySpec};

use crate::errors::SearchError;
use crate::interfaces::SearchBackend;
use crate::memory::analysis::{Analyzer, Token};
use crate::schema::{FieldMapping, FieldType, IndexSchema};
use crate::types::{
    BulkItemResult, BulkOperation, ClusterHealth, RawHit, RawSearchResponse, WriteMode,
};

/// Largest `from + size` a search may request.
pub const MAX_RESULT_WINDOW: usize = 10_000;

/// Gap inserted between the positions of consecutive values of a
/// multi-valued field, so phrases never span two values.
const POSITION_GAP: usize = 100;

/// A search backend that keeps a single index in memory.
///
/// Besides the `SearchBackend` operations it exposes hooks to simulate an
/// unreachable cluster and failing bulk requests, and accessors to inspect
/// what was written.
#[derive(Default)]
pub struct InMemoryBackend {
    state: RwLock<IndexState>,
    unavailable: AtomicBool,
    unassigned_primaries: AtomicBool,
    bulk_requests: AtomicUsize,
    failing_bulk_requests: Mutex<HashSet<usize>>,
    committed_batches: Mutex<Vec<usize>>,
}

#[derive(Default)]
struct IndexState {
    schema: Option<IndexSchema>,
    documents: HashMap<String, StoredDocument>,
    next_seq: u64,
}

struct StoredDocument {
    /// Order of first insertion; breaks score ties.
    seq: u64,
    source: Value,
}

impl InMemoryBackend {
    /// Create a backend with no index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend whose index already exists with `schema`.
    pub fn with_index(schema: IndexSchema) -> Self {
        Self {
            state: RwLock::new(IndexState {
                schema: Some(schema),
                ..IndexState::default()
            }),
            ..Self::default()
        }
    }

    /// Make every operation fail with a transport error, or stop doing so.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Report a red cluster from `health`, or stop doing so.
    pub fn set_unassigned_primaries(&self, unassigned: bool) {
        self.unassigned_primaries.store(unassigned, Ordering::SeqCst);
    }

    /// Make the given bulk requests (0-based, counted over the backend's
    /// lifetime, retries included) fail with a transport error.
    pub async fn fail_bulk_requests(&self, requests: impl IntoIterator<Item = usize>) {
        self.failing_bulk_requests.lock().await.extend(requests);
    }

    /// Number of bulk requests received, failed ones included.
    pub fn bulk_request_count(&self) -> usize {
        self.bulk_requests.load(Ordering::SeqCst)
    }

    /// Sizes of the bulk requests that reached the index, in order.
    pub async fn committed_batches(&self) -> Vec<usize> {
        self.committed_batches.lock().await.clone()
    }

    /// Stored source of a document.
    pub async fn document(&self, id: &str) -> Option<Value> {
        self.state
            .read()
            .await
            .documents
            .get(id)
            .map(|doc| doc.source.clone())
    }

    /// Number of stored documents.
    pub async fn document_count(&self) -> usize {
        self.state.read().await.documents.len()
    }

    fn check_available(&self) -> Result<(), SearchError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(SearchError::transport("Connection refused"));
        }
        Ok(())
    }
}

impl IndexState {
    fn write(&mut self, op: &BulkOperation) -> BulkItemResult {
        let Some(schema) = self.schema.as_ref() else {
            return BulkItemResult::rejected(&op.id, Some(404), "index_not_found_exception");
        };
        if op.id.is_empty() {
            return BulkItemResult::rejected(
                &op.id,
                Some(400),
                "action_request_validation_exception: id is missing",
            );
        }
        if let Err(reason) = validate_object(&schema.mappings.properties, &op.body, "") {
            return BulkItemResult::rejected(
                &op.id,
                Some(400),
                format!("mapper_parsing_exception: {}", reason),
            );
        }

        if let Some(existing) = self.documents.get_mut(&op.id) {
            if op.mode == WriteMode::Create {
                return BulkItemResult::rejected(
                    &op.id,
                    Some(409),
                    format!(
                        "version_conflict_engine_exception: [{}]: document already exists",
                        op.id
                    ),
                );
            }
            existing.source = op.body.clone();
            return BulkItemResult::written(&op.id, 200);
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.documents.insert(
            op.id.clone(),
            StoredDocument {
                seq,
                source: op.body.clone(),
            },
        );
        BulkItemResult::written(&op.id, 201)
    }
}

/// Check a document source against object mappings. Unmapped fields are
/// accepted as dynamic fields.
fn validate_object(
    properties: &std::collections::BTreeMap<String, FieldMapping>,
    value: &Value,
    prefix: &str,
) -> Result<(), String> {
    let Value::Object(map) = value else {
        return Err(format!("[{}] must be an object", display_path(prefix)));
    };

    for (name, field_value) in map {
        let Some(mapping) = properties.get(name) else {
            continue;
        };
        let path = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{}.{}", prefix, name)
        };
        validate_value(mapping, field_value, &path)?;
    }
    Ok(())
}

fn validate_value(mapping: &FieldMapping, value: &Value, path: &str) -> Result<(), String> {
    match value {
        Value::Null => Ok(()),
        Value::Array(items) => items
            .iter()
            .try_for_each(|item| validate_value(mapping, item, path)),
        _ => match mapping.field_type {
            FieldType::Integer if is_integer(value) => Ok(()),
            FieldType::Integer => Err(format!(
                "failed to parse field [{}] of type [integer]",
                path
            )),
            FieldType::Text | FieldType::Keyword if value.is_object() => Err(format!(
                "failed to parse field [{}] of type [{}]",
                path,
                if mapping.field_type == FieldType::Text {
                    "text"
                } else {
                    "keyword"
                }
            )),
            FieldType::Text | FieldType::Keyword => Ok(()),
            FieldType::Object if value.is_object() => {
                validate_object(&mapping.properties, value, path)
            }
            FieldType::Object => Err(format!(
                "object mapping for [{}] tried to parse field as object, but found a concrete value",
                path
            )),
        },
    }
}

/// Integers, and strings or whole floats that coerce to a 32-bit integer.
fn is_integer(value: &Value) -> bool {
    let in_range = |n: f64| n.fract() == 0.0 && n >= i32::MIN as f64 && n <= i32::MAX as f64;
    match value {
        Value::Number(n) => n.as_f64().is_some_and(in_range),
        Value::String(s) => s.trim().parse::<f64>().is_ok_and(in_range),
        _ => false,
    }
}

fn display_path(path: &str) -> &str {
    if path.is_empty() {
        "_source"
    } else {
        path
    }
}

/// A clause with its query analyzed and its field resolved.
struct PreparedClause {
    kind: ClauseKind,
    boost: f64,
    terms: Vec<Token>,
    /// Source paths whose values make up the field, including `copy_to`
    /// sources for catch-all fields. Empty for unmapped fields.
    source_paths: Vec<Vec<String>>,
    index_analyzer: Analyzer,
}

impl PreparedClause {
    fn new(schema: &IndexSchema, clause: &QueryClause) -> Result<Self, SearchError> {
        let (index_analyzer, search_analyzer, mut source_paths) =
            match schema.resolve_field(&clause.field) {
                Some((mapping, source_path)) => {
                    let (index, search) = field_analyzers(schema, mapping)?;
                    let paths = if mapping.field_type == FieldType::Object {
                        Vec::new()
                    } else {
                        vec![source_path]
                    };
                    (index, search, paths)
                }
                None => (Analyzer::standard(), Analyzer::standard(), Vec::new()),
            };
        source_paths.extend(schema.copy_sources(&clause.field));

        Ok(Self {
            kind: clause.kind,
            boost: f64::from(clause.effective_boost()),
            terms: search_analyzer.analyze(&clause.query),
            source_paths,
            index_analyzer,
        })
    }

    /// Score a document, or `None` when the clause does not match it.
    fn score(&self, source: &Value) -> Option<f64> {
        if self.terms.is_empty() || self.source_paths.is_empty() {
            return None;
        }

        let mut tokens = Vec::new();
        let mut offset = 0;
        for path in &self.source_paths {
            for text in values_at(source, path) {
                let analyzed = self.index_analyzer.analyze(&text);
                let width = analyzed.iter().map(|t| t.position + 1).max().unwrap_or(0);
                tokens.extend(analyzed.into_iter().map(|t| Token {
                    term: t.term,
                    position: t.position + offset,
                }));
                offset += width + POSITION_GAP;
            }
        }

        let matched = match self.kind {
            ClauseKind::Match => {
                let distinct: HashSet<&str> = self.terms.iter().map(|t| t.term.as_str()).collect();
                distinct
                    .iter()
                    .filter(|term| tokens.iter().any(|t| t.term == **term))
                    .count()
            }
            ClauseKind::MatchPhrase => {
                if contains_phrase(&tokens, &self.terms) {
                    self.terms.len()
                } else {
                    0
                }
            }
        };

        (matched > 0).then(|| self.boost * matched as f64)
    }
}

/// Index-time and search-time analyzers of a field.
fn field_analyzers(
    schema: &IndexSchema,
    mapping: &FieldMapping,
) -> Result<(Analyzer, Analyzer), SearchError> {
    match mapping.field_type {
        FieldType::Text => {
            let index_name = mapping.analyzer.as_deref().unwrap_or("standard");
            let search_name = mapping.search_analyzer.as_deref().unwrap_or(index_name);
            Ok((
                Analyzer::resolve(schema, index_name)?,
                Analyzer::resolve(schema, search_name)?,
            ))
        }
        FieldType::Keyword | FieldType::Integer | FieldType::Object => {
            Ok((Analyzer::keyword(), Analyzer::keyword()))
        }
    }
}

/// Whether `phrase` occurs in `tokens` at consecutive relative positions.
fn contains_phrase(tokens: &[Token], phrase: &[Token]) -> bool {
    let Some(first) = phrase.first() else {
        return false;
    };

    tokens
        .iter()
        .filter(|t| t.term == first.term)
        .any(|start| {
            phrase.iter().all(|p| {
                let position = start.position + (p.position - first.position);
                tokens
                    .iter()
                    .any(|t| t.position == position && t.term == p.term)
            })
        })
}

/// Leaf values found at `path`, descending into arrays.
fn values_at(source: &Value, path: &[String]) -> Vec<String> {
    let mut current = vec![source];
    for segment in path {
        current = current
            .into_iter()
            .flat_map(|value| match value {
                Value::Array(items) => items.iter().collect::<Vec<_>>(),
                other => vec![other],
            })
            .filter_map(|value| value.get(segment))
            .collect();
    }

    let mut values = Vec::new();
    for value in current {
        collect_leaves(value, &mut values);
    }
    values
}

fn collect_leaves(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => out.push(s.clone()),
        Value::Number(n) => out.push(n.to_string()),
        Value::Bool(b) => out.push(b.to_string()),
        Value::Array(items) => items.iter().for_each(|item| collect_leaves(item, out)),
        Value::Null | Value::Object(_) => {}
    }
}

/// A query with every clause prepared.
enum PreparedQuery {
    MatchAll,
    Any(Vec<PreparedClause>),
}

impl PreparedQuery {
    fn new(schema: &IndexSchema, query: &QuerySpec) -> Result<Self, SearchError> {
        match query {
            QuerySpec::MatchAll => Ok(Self::MatchAll),
            QuerySpec::Bool { should } if should.is_empty() => Ok(Self::MatchAll),
            QuerySpec::Bool { .. } | QuerySpec::Match(_) => query
                .clauses()
                .iter()
                .map(|clause| PreparedClause::new(schema, clause))
                .collect::<Result<Vec<_>, _>>()
                .map(Self::Any),
        }
    }

    /// Sum of the scores of all matching clauses, or `None` when no clause
    /// matches.
    fn score(&self, source: &Value) -> Option<f64> {
        match self {
            Self::MatchAll => Some(1.0),
            Self::Any(clauses) => clauses
                .iter()
                .filter_map(|clause| clause.score(source))
                .fold(None, |total, score| Some(total.unwrap_or(0.0) + score)),
        }
    }
}

#[async_trait]
impl SearchBackend for InMemoryBackend {
    async fn health(&self) -> Result<ClusterHealth, SearchError> {
        self.check_available()?;
        if self.unassigned_primaries.load(Ordering::SeqCst) {
            return Ok(ClusterHealth::Red);
        }

        // A single node cannot allocate replicas.
        let state = self.state.read().await;
        match &state.schema {
            Some(schema) if schema.settings.replicas > 0 => Ok(ClusterHealth::Yellow),
            _ => Ok(ClusterHealth::Green),
        }
    }

    async fn create_index(&self, schema: &IndexSchema) -> Result<(), SearchError> {
        self.check_available()?;

        let mut state = self.state.write().await;
        if state.schema.is_some() {
            return Err(SearchError::schema(
                "resource_already_exists_exception: index already exists",
            ));
        }

        check_analyzers(schema, &schema.mappings.properties)?;

        state.schema = Some(schema.clone());
        state.documents.clear();
        debug!("In-memory index created");
        Ok(())
    }

    async fn delete_index(&self) -> Result<(), SearchError> {
        self.check_available()?;

        let mut state = self.state.write().await;
        if state.schema.take().is_none() {
            return Err(SearchError::schema("index_not_found_exception: no such index"));
        }
        state.documents.clear();
        Ok(())
    }

    async fn index_exists(&self) -> Result<bool, SearchError> {
        self.check_available()?;
        Ok(self.state.read().await.schema.is_some())
    }

    async fn refresh(&self) -> Result<(), SearchError> {
        self.check_available()
    }

    async fn bulk_write(
        &self,
        operations: &[BulkOperation],
    ) -> Result<Vec<BulkItemResult>, SearchError> {
        self.check_available()?;

        let request = self.bulk_requests.fetch_add(1, Ordering::SeqCst);
        if self.failing_bulk_requests.lock().await.contains(&request) {
            return Err(SearchError::transport(format!(
                "Connection reset during bulk request {}",
                request
            )));
        }

        let mut state = self.state.write().await;
        let results = operations.iter().map(|op| state.write(op)).collect();
        self.committed_batches.lock().await.push(operations.len());
        Ok(results)
    }

    async fn search(
        &self,
        query: &QuerySpec,
        from: usize,
        size: usize,
    ) -> Result<RawSearchResponse, SearchError> {
        self.check_available()?;

        let window = from.saturating_add(size);
        if window > MAX_RESULT_WINDOW {
            return Err(SearchError::query(format!(
                "Result window is too large, from + size must be less than or equal to: [{}] but was [{}]",
                MAX_RESULT_WINDOW, window
            )));
        }

        let state = self.state.read().await;
        let schema = state
            .schema
            .as_ref()
            .ok_or_else(|| SearchError::query("index_not_found_exception: no such index"))?;
        let prepared = PreparedQuery::new(schema, query)?;

        let mut scored: Vec<(f64, u64, &String, &Value)> = state
            .documents
            .iter()
            .filter_map(|(id, doc)| {
                prepared
                    .score(&doc.source)
                    .map(|score| (score, doc.seq, id, &doc.source))
            })
            .collect();

        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(CmpOrdering::Equal)
                .then(a.1.cmp(&b.1))
        });

        let total = scored.len() as u64;
        let hits = scored
            .into_iter()
            .skip(from)
            .take(size)
            .map(|(score, _, id, source)| RawHit {
                id: id.clone(),
                score: Some(score),
                source: source.clone(),
            })
            .collect();

        Ok(RawSearchResponse { total, hits })
    }
}

/// Every analyzer referenced by a text mapping must resolve.
fn check_analyzers(
    schema: &IndexSchema,
    properties: &std::collections::BTreeMap<String, FieldMapping>,
) -> Result<(), SearchError> {
    for mapping in properties.values() {
        if mapping.field_type == FieldType::Text {
            field_analyzers(schema, mapping)?;
        }
        check_analyzers(schema, &mapping.fields)?;
        check_analyzers(schema, &mapping.properties)?;
    }
    Ok(())
}
