//! Index schema for the recipe index.
//!
//! The schema is a plain configuration structure: index settings with the
//! custom analysis chain, plus an explicit map of field name to mapping. It
//! serializes directly into the body of a create-index request.
//!
//! Autocomplete relies on an asymmetric analyzer pair. At index time the
//! `autocomplete` analyzer expands every word of the title into its edge
//! n-grams (`ch`, `cho`, `choc`, ...). At search time `autocomplete_search`
//! only lowercases, so a partial word typed by the user matches the stored
//! prefix directly.

use std::collections::BTreeMap;

use serde::Serialize;

/// Field names used by the schema and the query builder.
pub mod fields {
    pub const ALL_FIELDS: &str = "allfields";
    pub const TITLE: &str = "title";
    pub const TITLE_AUTOCOMPLETE: &str = "title.autocomplete";
    pub const DESCRIPTION: &str = "description";
    pub const PREP_TIME_MIN: &str = "prep_time_min";
    pub const COOK_TIME_MIN: &str = "cook_time_min";
    pub const SERVINGS: &str = "servings";
    pub const TAGS: &str = "tags";
    pub const AUTHOR: &str = "author";
}

/// Name of the edge n-gram tokenizer and of the index-time analyzer.
pub const AUTOCOMPLETE_ANALYZER: &str = "autocomplete";

/// Name of the search-time analyzer paired with [`AUTOCOMPLETE_ANALYZER`].
pub const AUTOCOMPLETE_SEARCH_ANALYZER: &str = "autocomplete_search";

/// Shortest prefix emitted by the autocomplete tokenizer.
pub const AUTOCOMPLETE_MIN_GRAM: usize = 2;

/// Longest prefix emitted by the autocomplete tokenizer.
pub const AUTOCOMPLETE_MAX_GRAM: usize = 10;

/// Shard and replica counts for a new index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaSettings {
    pub shards: u32,
    pub replicas: u32,
}

impl Default for SchemaSettings {
    /// Single-node defaults: one shard, no replicas.
    fn default() -> Self {
        Self {
            shards: 1,
            replicas: 0,
        }
    }
}

/// Settings and mappings of a recipe index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexSchema {
    pub settings: IndexSettings,
    pub mappings: Mappings,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexSettings {
    #[serde(rename = "number_of_shards")]
    pub shards: u32,
    #[serde(rename = "number_of_replicas")]
    pub replicas: u32,
    pub analysis: Analysis,
}

/// Custom tokenizers and analyzers, keyed by name.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Analysis {
    pub tokenizer: BTreeMap<String, TokenizerDef>,
    pub analyzer: BTreeMap<String, AnalyzerDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TokenizerDef {
    /// Emits the prefixes of every token, from `min_gram` to `max_gram`
    /// characters. Tokens are runs of the given character classes.
    EdgeNgram {
        min_gram: usize,
        max_gram: usize,
        token_chars: Vec<TokenChars>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenChars {
    Letter,
    Digit,
    Whitespace,
    Punctuation,
    Symbol,
}

impl TokenChars {
    /// Whether `c` belongs to this character class.
    pub fn contains(&self, c: char) -> bool {
        match self {
            TokenChars::Letter => c.is_alphabetic(),
            TokenChars::Digit => c.is_numeric(),
            TokenChars::Whitespace => c.is_whitespace(),
            TokenChars::Punctuation => c.is_ascii_punctuation() && !is_symbol(c),
            TokenChars::Symbol => is_symbol(c),
        }
    }
}

fn is_symbol(c: char) -> bool {
    matches!(c, '$' | '+' | '<' | '=' | '>' | '^' | '`' | '|' | '~')
}

/// A custom analyzer: a tokenizer followed by token filters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyzerDef {
    pub tokenizer: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub filter: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Mappings {
    pub properties: BTreeMap<String, FieldMapping>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Keyword,
    Integer,
    Object,
}

/// Mapping of a single field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldMapping {
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analyzer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_analyzer: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub copy_to: Vec<String>,
    /// Multi-fields: the same source value indexed differently.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, FieldMapping>,
    /// Children of an object field.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, FieldMapping>,
}

impl FieldMapping {
    fn of(field_type: FieldType) -> Self {
        Self {
            field_type,
            analyzer: None,
            search_analyzer: None,
            copy_to: Vec::new(),
            fields: BTreeMap::new(),
            properties: BTreeMap::new(),
        }
    }

    pub fn text() -> Self {
        Self::of(FieldType::Text)
    }

    pub fn keyword() -> Self {
        Self::of(FieldType::Keyword)
    }

    pub fn integer() -> Self {
        Self::of(FieldType::Integer)
    }

    pub fn object(properties: impl IntoIterator<Item = (&'static str, FieldMapping)>) -> Self {
        let mut mapping = Self::of(FieldType::Object);
        mapping.properties = named(properties);
        mapping
    }
}

impl IndexSchema {
    /// Look up a field by dotted path, descending into object properties and
    /// multi-fields.
    ///
    /// Returns the mapping and the path of the source value it is built
    /// from. The two differ for multi-fields: `title.autocomplete` reads
    /// `title`.
    pub fn resolve_field(&self, path: &str) -> Option<(&FieldMapping, Vec<String>)> {
        let mut current = &self.mappings.properties;
        let mut source_path = Vec::new();
        let mut found: Option<&FieldMapping> = None;

        for segment in path.split('.') {
            match found {
                None => {
                    let mapping = current.get(segment)?;
                    source_path.push(segment.to_string());
                    found = Some(mapping);
                }
                Some(parent) => {
                    if let Some(child) = parent.properties.get(segment) {
                        source_path.push(segment.to_string());
                        found = Some(child);
                    } else {
                        // Multi-fields share the parent's source value.
                        found = Some(parent.fields.get(segment)?);
                    }
                }
            }
            if let Some(mapping) = found {
                current = &mapping.properties;
            }
        }

        found.map(|mapping| (mapping, source_path))
    }

    /// Top-level and nested fields that copy their values into `target`,
    /// as source paths.
    pub fn copy_sources(&self, target: &str) -> Vec<Vec<String>> {
        let mut sources = Vec::new();
        collect_copy_sources(&self.mappings.properties, target, &mut Vec::new(), &mut sources);
        sources
    }
}

fn collect_copy_sources(
    properties: &BTreeMap<String, FieldMapping>,
    target: &str,
    prefix: &mut Vec<String>,
    sources: &mut Vec<Vec<String>>,
) {
    for (name, mapping) in properties {
        prefix.push(name.clone());
        if mapping.copy_to.iter().any(|t| t == target) {
            sources.push(prefix.clone());
        }
        collect_copy_sources(&mapping.properties, target, prefix, sources);
        prefix.pop();
    }
}

fn named(
    entries: impl IntoIterator<Item = (&'static str, FieldMapping)>,
) -> BTreeMap<String, FieldMapping> {
    entries
        .into_iter()
        .map(|(name, mapping)| (name.to_string(), mapping))
        .collect()
}

/// The recipe index schema with single-node defaults.
pub fn define_schema() -> IndexSchema {
    define_schema_with(&SchemaSettings::default())
}

/// The recipe index schema with the given shard and replica counts.
pub fn define_schema_with(settings: &SchemaSettings) -> IndexSchema {
    let mut analysis = Analysis::default();
    analysis.tokenizer.insert(
        AUTOCOMPLETE_ANALYZER.to_string(),
        TokenizerDef::EdgeNgram {
            min_gram: AUTOCOMPLETE_MIN_GRAM,
            max_gram: AUTOCOMPLETE_MAX_GRAM,
            token_chars: vec![TokenChars::Letter],
        },
    );
    analysis.analyzer.insert(
        AUTOCOMPLETE_ANALYZER.to_string(),
        AnalyzerDef {
            tokenizer: AUTOCOMPLETE_ANALYZER.to_string(),
            filter: vec!["lowercase".to_string()],
        },
    );
    analysis.analyzer.insert(
        AUTOCOMPLETE_SEARCH_ANALYZER.to_string(),
        AnalyzerDef {
            tokenizer: "lowercase".to_string(),
            filter: Vec::new(),
        },
    );

    let mut autocomplete = FieldMapping::text();
    autocomplete.analyzer = Some(AUTOCOMPLETE_ANALYZER.to_string());
    autocomplete.search_analyzer = Some(AUTOCOMPLETE_SEARCH_ANALYZER.to_string());

    let mut title = FieldMapping::text();
    title.copy_to = vec![fields::ALL_FIELDS.to_string()];
    title.fields = named([("autocomplete", autocomplete)]);

    let mut description = FieldMapping::text();
    description.copy_to = vec![fields::ALL_FIELDS.to_string()];

    let properties = named([
        (fields::ALL_FIELDS, FieldMapping::text()),
        (fields::TITLE, title),
        (fields::DESCRIPTION, description),
        (fields::PREP_TIME_MIN, FieldMapping::integer()),
        (fields::COOK_TIME_MIN, FieldMapping::integer()),
        (fields::SERVINGS, FieldMapping::integer()),
        (fields::TAGS, FieldMapping::keyword()),
        (
            fields::AUTHOR,
            FieldMapping::object([("name", FieldMapping::text()), ("url", FieldMapping::keyword())]),
        ),
    ]);

    IndexSchema {
        settings: IndexSettings {
            shards: settings.shards,
            replicas: settings.replicas,
            analysis,
        },
        mappings: Mappings { properties },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let schema = define_schema();
        assert_eq!(schema.settings.shards, 1);
        assert_eq!(schema.settings.replicas, 0);
    }

    #[test]
    fn test_custom_settings() {
        let schema = define_schema_with(&SchemaSettings {
            shards: 3,
            replicas: 2,
        });
        assert_eq!(schema.settings.shards, 3);
        assert_eq!(schema.settings.replicas, 2);
    }

    #[test]
    fn test_autocomplete_analysis_chain() {
        let schema = define_schema();
        let analysis = &schema.settings.analysis;

        assert_eq!(
            analysis.tokenizer[AUTOCOMPLETE_ANALYZER],
            TokenizerDef::EdgeNgram {
                min_gram: 2,
                max_gram: 10,
                token_chars: vec![TokenChars::Letter],
            }
        );
        assert_eq!(analysis.analyzer[AUTOCOMPLETE_ANALYZER].tokenizer, "autocomplete");
        assert_eq!(analysis.analyzer[AUTOCOMPLETE_ANALYZER].filter, vec!["lowercase"]);
        assert_eq!(analysis.analyzer[AUTOCOMPLETE_SEARCH_ANALYZER].tokenizer, "lowercase");
    }

    #[test]
    fn test_resolve_multi_field() {
        let schema = define_schema();

        let (mapping, source_path) = schema.resolve_field(fields::TITLE_AUTOCOMPLETE).unwrap();
        assert_eq!(mapping.analyzer.as_deref(), Some("autocomplete"));
        assert_eq!(mapping.search_analyzer.as_deref(), Some("autocomplete_search"));
        assert_eq!(source_path, vec!["title"]);
    }

    #[test]
    fn test_resolve_object_property() {
        let schema = define_schema();

        let (mapping, source_path) = schema.resolve_field("author.url").unwrap();
        assert_eq!(mapping.field_type, FieldType::Keyword);
        assert_eq!(source_path, vec!["author", "url"]);

        assert!(schema.resolve_field("author.email").is_none());
        assert!(schema.resolve_field("calories").is_none());
    }

    #[test]
    fn test_copy_sources() {
        let schema = define_schema();
        let sources = schema.copy_sources(fields::ALL_FIELDS);

        assert_eq!(
            sources,
            vec![vec!["description".to_string()], vec!["title".to_string()]]
        );
    }
}
