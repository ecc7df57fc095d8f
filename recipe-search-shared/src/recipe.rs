//! The recipe document stored in the search index.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

/// A recipe as it is stored in, and returned from, the search index.
///
/// `source_url` is the identity of a recipe: indexing two recipes with the
/// same `source_url` leaves a single document holding the latest body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    /// Where the recipe was published. Used as the document id.
    #[serde(alias = "sourceUrl")]
    pub source_url: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(
        default,
        alias = "prepTimeMin",
        deserialize_with = "deserialize_optional_integer",
        skip_serializing_if = "Option::is_none"
    )]
    pub prep_time_min: Option<i32>,
    #[serde(
        default,
        alias = "cookTimeMin",
        deserialize_with = "deserialize_optional_integer",
        skip_serializing_if = "Option::is_none"
    )]
    pub cook_time_min: Option<i32>,
    #[serde(
        default,
        deserialize_with = "deserialize_optional_integer",
        skip_serializing_if = "Option::is_none"
    )]
    pub servings: Option<i32>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<Author>,
}

/// The person or site credited for a recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Recipe {
    /// Create a recipe with only the identity, title and description set.
    pub fn new(
        source_url: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            source_url: source_url.into(),
            title: title.into(),
            description: description.into(),
            prep_time_min: None,
            cook_time_min: None,
            servings: None,
            tags: Vec::new(),
            author: None,
        }
    }

    /// Set the tags.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Set the author.
    pub fn with_author(mut self, name: impl Into<String>, url: Option<String>) -> Self {
        self.author = Some(Author {
            name: name.into(),
            url,
        });
        self
    }

    /// Set preparation time, cooking time and servings.
    pub fn with_times(mut self, prep_time_min: i32, cook_time_min: i32, servings: i32) -> Self {
        self.prep_time_min = Some(prep_time_min);
        self.cook_time_min = Some(cook_time_min);
        self.servings = Some(servings);
        self
    }
}

/// A number as the index's `integer` mapping accepts it.
#[derive(Deserialize)]
#[serde(untagged)]
enum LooseInteger {
    Number(f64),
    Text(String),
}

/// Deserialize an optional 32-bit integer, also accepting numeric strings
/// and whole floats like `"4"` and `4.0`.
fn deserialize_optional_integer<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = match Option::<LooseInteger>::deserialize(deserializer)? {
        None => return Ok(None),
        Some(LooseInteger::Number(n)) => n,
        Some(LooseInteger::Text(s)) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| <D::Error as de::Error>::custom(format!("invalid integer {:?}", s)))?,
    };

    if value.fract() != 0.0 || value < i32::MIN as f64 || value > i32::MAX as f64 {
        return Err(de::Error::custom(format!(
            "{} is not a 32-bit integer",
            value
        )));
    }
    Ok(Some(value as i32))
}
