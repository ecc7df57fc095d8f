//! Documents the ingester can write.

use recipe_search_repository::SearchError;
use recipe_search_shared::Recipe;
use serde_json::Value;

/// A document with a stable identity and a JSON body.
pub trait IndexDocument {
    /// The id the document is stored under. Writing a document with an
    /// existing id replaces it.
    fn document_id(&self) -> String;

    /// The body sent to the index.
    fn to_body(&self) -> Result<Value, SearchError>;
}

impl IndexDocument for Recipe {
    fn document_id(&self) -> String {
        self.source_url.clone()
    }

    fn to_body(&self) -> Result<Value, SearchError> {
        Ok(serde_json::to_value(self)?)
    }
}

/// A pre-built body written as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDocument {
    pub id: String,
    pub body: Value,
}

impl RawDocument {
    pub fn new(id: impl Into<String>, body: Value) -> Self {
        Self {
            id: id.into(),
            body,
        }
    }
}

impl IndexDocument for RawDocument {
    fn document_id(&self) -> String {
        self.id.clone()
    }

    fn to_body(&self) -> Result<Value, SearchError> {
        Ok(self.body.clone())
    }
}

impl<D: IndexDocument + ?Sized> IndexDocument for &D {
    fn document_id(&self) -> String {
        (**self).document_id()
    }

    fn to_body(&self) -> Result<Value, SearchError> {
        (**self).to_body()
    }
}
