//! OpenSearch index settings and mappings.
//!
//! The recipe schema already mirrors the shape of the create-index API, so
//! the request body is its direct serialization.

use serde_json::Value;

use crate::errors::SearchError;
use crate::schema::IndexSchema;

/// Build the body of a create-index request for `schema`.
pub fn create_index_body(schema: &IndexSchema) -> Result<Value, SearchError> {
    serde_json::to_value(schema).map_err(|e| SearchError::serialization(e.to_string()))
}
