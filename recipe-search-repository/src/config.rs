//! Configuration types for the search backend.

use std::time::Duration;

use crate::schema::SchemaSettings;

/// Default name of the recipe index.
pub const DEFAULT_INDEX_NAME: &str = "recipes";

/// Configuration for a search backend bound to one index.
#[derive(Debug, Clone)]
pub struct SearchIndexConfig {
    /// Name of the index all operations target.
    pub index_name: String,
    /// Shards and replicas used when the index is created.
    pub schema: SchemaSettings,
    /// Per-request timeout. `None` leaves the transport default.
    pub timeout: Option<Duration>,
}

impl Default for SearchIndexConfig {
    fn default() -> Self {
        Self {
            index_name: DEFAULT_INDEX_NAME.to_string(),
            schema: SchemaSettings::default(),
            timeout: None,
        }
    }
}

impl SearchIndexConfig {
    /// Create a config targeting the given index.
    pub fn new(index_name: impl Into<String>) -> Self {
        Self {
            index_name: index_name.into(),
            ..Self::default()
        }
    }

    /// Set the shard and replica counts for index creation.
    pub fn with_schema_settings(mut self, schema: SchemaSettings) -> Self {
        self.schema = schema;
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SearchIndexConfig::default();
        assert_eq!(config.index_name, "recipes");
        assert_eq!(config.schema, SchemaSettings::default());
        assert!(config.timeout.is_none());
    }

    #[test]
    fn test_builders() {
        let config = SearchIndexConfig::new("recipes-v2")
            .with_schema_settings(SchemaSettings {
                shards: 2,
                replicas: 1,
            })
            .with_timeout(Duration::from_secs(5));

        assert_eq!(config.index_name, "recipes-v2");
        assert_eq!(config.schema.shards, 2);
        assert_eq!(config.timeout, Some(Duration::from_secs(5)));
    }
}
