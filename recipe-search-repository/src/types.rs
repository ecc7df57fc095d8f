//! Request and response types for search backend operations.

use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::errors::SearchError;

/// How a bulk item is written when a document with the same id exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Create the document or replace the existing one (upsert).
    #[default]
    Index,
    /// Create the document, rejecting the item if the id already exists.
    Create,
}

impl WriteMode {
    /// The bulk action name for this mode.
    pub fn action(&self) -> &'static str {
        match self {
            WriteMode::Index => "index",
            WriteMode::Create => "create",
        }
    }
}

/// One pending write in a bulk request.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkOperation {
    /// Document id.
    pub id: String,
    /// Document source.
    pub body: Value,
    pub mode: WriteMode,
}

impl BulkOperation {
    /// Create an upsert of `body` under `id`.
    pub fn upsert(id: impl Into<String>, body: Value) -> Self {
        Self {
            id: id.into(),
            body,
            mode: WriteMode::Index,
        }
    }
}

/// Outcome of a single item within a bulk write.
///
/// A bulk write succeeds or fails per item. A rejected item carries the
/// backend's reason and leaves its siblings unaffected.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkItemResult {
    /// Document id.
    pub id: String,
    /// HTTP-style status reported by the backend for this item.
    pub status: Option<u16>,
    /// Whether the item was written.
    pub success: bool,
    /// Error if the item was rejected.
    pub error: Option<SearchError>,
}

impl BulkItemResult {
    /// A written item.
    pub fn written(id: impl Into<String>, status: u16) -> Self {
        Self {
            id: id.into(),
            status: Some(status),
            success: true,
            error: None,
        }
    }

    /// A rejected item.
    pub fn rejected(id: impl Into<String>, status: Option<u16>, reason: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            error: Some(SearchError::item_rejected(id.clone(), reason)),
            id,
            status,
            success: false,
        }
    }
}

/// Cluster status as reported by the backend's health endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterHealth {
    /// All shards allocated.
    Green,
    /// Primaries allocated, some replicas missing.
    Yellow,
    /// Some primaries unallocated.
    Red,
}

impl ClusterHealth {
    /// Whether the cluster can serve reads and writes.
    pub fn is_available(&self) -> bool {
        matches!(self, ClusterHealth::Green | ClusterHealth::Yellow)
    }
}

impl fmt::Display for ClusterHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = match self {
            ClusterHealth::Green => "green",
            ClusterHealth::Yellow => "yellow",
            ClusterHealth::Red => "red",
        };
        f.write_str(status)
    }
}

impl FromStr for ClusterHealth {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "green" => Ok(ClusterHealth::Green),
            "yellow" => Ok(ClusterHealth::Yellow),
            "red" => Ok(ClusterHealth::Red),
            other => Err(SearchError::parse(format!(
                "Unknown cluster status: {}",
                other
            ))),
        }
    }
}

/// A hit as returned by the backend, before decoding the source.
#[derive(Debug, Clone, PartialEq)]
pub struct RawHit {
    pub id: String,
    pub score: Option<f64>,
    pub source: Value,
}

/// A page of hits as returned by the backend.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawSearchResponse {
    /// Total number of matching documents.
    pub total: u64,
    /// Hits in ranking order.
    pub hits: Vec<RawHit>,
}
