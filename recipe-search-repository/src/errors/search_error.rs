//! Search error types.
//!
//! This module defines the error types that can occur while talking to the
//! search backend.

use thiserror::Error;

/// Errors that can occur during search backend operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SearchError {
    /// The backend could not be reached or failed server-side.
    #[error("Transport error: {0}")]
    TransportError(String),

    /// A single document in a bulk write was rejected.
    #[error("Item {id} rejected: {reason}")]
    ItemRejected { id: String, reason: String },

    /// Index creation or deletion failed.
    #[error("Schema error: {0}")]
    SchemaError(String),

    /// The query or pagination window was refused.
    #[error("Query error: {0}")]
    QueryError(String),

    /// Failed to parse a response from the backend.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Failed to serialize data for the backend.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl SearchError {
    /// Create a transport error.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::TransportError(msg.into())
    }

    /// Create an item rejection.
    pub fn item_rejected(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ItemRejected {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Create a schema error.
    pub fn schema(msg: impl Into<String>) -> Self {
        Self::SchemaError(msg.into())
    }

    /// Create a query error.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::QueryError(msg.into())
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }

    /// Create a serialization error.
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::SerializationError(msg.into())
    }

    /// Whether the error means the backend itself was unavailable.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::TransportError(_))
    }
}

impl From<serde_json::Error> for SearchError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}
