//! Error types for recipe ingestion.

use std::path::PathBuf;

use recipe_search_repository::SearchError;
use thiserror::Error;

/// Errors that abort an ingestion run.
///
/// Documents rejected one at a time are not errors; they are recorded in the
/// [`IngestionReport`](crate::loader::IngestionReport).
#[derive(Error, Debug)]
pub enum IngestError {
    /// The ingester was configured with invalid values.
    #[error("Config error: {0}")]
    ConfigError(String),

    /// The document source could not be opened.
    #[error("Source error: {0}")]
    SourceError(#[from] SourceError),

    /// A bulk request failed as a whole, after any configured retries.
    #[error("Transport error after {attempts} attempt(s): {source}")]
    TransportError {
        attempts: u32,
        #[source]
        source: SearchError,
    },

    /// Any other error from the search backend.
    #[error("Search error: {0}")]
    SearchError(#[from] SearchError),
}

impl IngestError {
    /// Create a config error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Wrap a backend error, classifying transport failures.
    pub fn from_flush(error: SearchError, attempts: u32) -> Self {
        if error.is_transport() {
            Self::TransportError {
                attempts,
                source: error,
            }
        } else {
            Self::SearchError(error)
        }
    }

    /// Whether the run failed because the backend was unavailable.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::TransportError { .. })
    }
}

/// Errors reading documents from a source.
#[derive(Error, Debug)]
pub enum SourceError {
    /// A file or directory could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file did not contain a valid document.
    #[error("Failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl SourceError {
    /// Where the error happened, used as the failure key in reports.
    pub fn location(&self) -> String {
        match self {
            Self::Io { path, .. } | Self::Decode { path, .. } => path.display().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_flush_classifies_transport() {
        let error = IngestError::from_flush(SearchError::transport("Connection refused"), 3);
        assert!(error.is_transport());
        assert_eq!(
            error.to_string(),
            "Transport error after 3 attempt(s): Transport error: Connection refused"
        );

        let error = IngestError::from_flush(SearchError::parse("bad body"), 1);
        assert!(matches!(error, IngestError::SearchError(SearchError::ParseError(_))));
    }

    #[test]
    fn test_source_error_location() {
        let error = SourceError::Io {
            path: PathBuf::from("recipes/soup.json"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        assert_eq!(error.location(), "recipes/soup.json");
    }
}
