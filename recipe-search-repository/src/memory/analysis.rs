//! Text analysis for the in-memory backend.

use crate::errors::SearchError;
use crate::schema::{IndexSchema, TokenChars, TokenizerDef};

/// A term produced by analysis, with its word position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub term: String,
    pub position: usize,
}

#[derive(Debug, Clone, PartialEq)]
enum Tokenizer {
    /// Runs of letters and digits.
    Standard,
    /// Runs of letters.
    Letter,
    /// Runs of letters, lowercased.
    Lowercase,
    /// Runs of non-whitespace.
    Whitespace,
    /// The whole input as one token.
    Keyword,
    /// Prefixes of every run of `token_chars`.
    EdgeNgram {
        min_gram: usize,
        max_gram: usize,
        token_chars: Vec<TokenChars>,
    },
}

/// A tokenizer plus an optional lowercase filter.
#[derive(Debug, Clone, PartialEq)]
pub struct Analyzer {
    tokenizer: Tokenizer,
    lowercase: bool,
}

impl Analyzer {
    /// The default analyzer for text fields.
    pub fn standard() -> Self {
        Self {
            tokenizer: Tokenizer::Standard,
            lowercase: true,
        }
    }

    /// Exact-value analysis used for keyword and numeric fields.
    pub fn keyword() -> Self {
        Self {
            tokenizer: Tokenizer::Keyword,
            lowercase: false,
        }
    }

    /// Resolve an analyzer by name: custom analyzers declared in `schema`
    /// first, then the built-in ones.
    pub fn resolve(schema: &IndexSchema, name: &str) -> Result<Self, SearchError> {
        if let Some(def) = schema.settings.analysis.analyzer.get(name) {
            let tokenizer = resolve_tokenizer(schema, &def.tokenizer)?;
            let mut lowercase = false;
            for filter in &def.filter {
                match filter.as_str() {
                    "lowercase" => lowercase = true,
                    other => {
                        return Err(SearchError::schema(format!(
                            "Unsupported token filter [{}] in analyzer [{}]",
                            other, name
                        )))
                    }
                }
            }
            return Ok(Self {
                tokenizer,
                lowercase,
            });
        }

        match name {
            "standard" => Ok(Self::standard()),
            "simple" => Ok(Self {
                tokenizer: Tokenizer::Lowercase,
                lowercase: true,
            }),
            "whitespace" => Ok(Self {
                tokenizer: Tokenizer::Whitespace,
                lowercase: false,
            }),
            "keyword" => Ok(Self::keyword()),
            other => Err(SearchError::schema(format!(
                "Unknown analyzer [{}]",
                other
            ))),
        }
    }

    /// Split `text` into terms.
    pub fn analyze(&self, text: &str) -> Vec<Token> {
        let words: Vec<&str> = match &self.tokenizer {
            Tokenizer::Standard => split_runs(text, |c| c.is_alphanumeric()),
            Tokenizer::Letter | Tokenizer::Lowercase => split_runs(text, char::is_alphabetic),
            Tokenizer::Whitespace => text.split_whitespace().collect(),
            Tokenizer::Keyword if text.is_empty() => Vec::new(),
            Tokenizer::Keyword => vec![text],
            Tokenizer::EdgeNgram { token_chars, .. } if token_chars.is_empty() => {
                if text.is_empty() {
                    Vec::new()
                } else {
                    vec![text]
                }
            }
            Tokenizer::EdgeNgram { token_chars, .. } => {
                split_runs(text, |c| token_chars.iter().any(|class| class.contains(c)))
            }
        };

        let lowercase = self.lowercase || self.tokenizer == Tokenizer::Lowercase;
        let normalize = |term: &str| {
            if lowercase {
                term.to_lowercase()
            } else {
                term.to_string()
            }
        };

        let mut tokens = Vec::new();
        for (position, word) in words.into_iter().enumerate() {
            match &self.tokenizer {
                Tokenizer::EdgeNgram {
                    min_gram, max_gram, ..
                } => {
                    for gram in edge_ngrams(word, *min_gram, *max_gram) {
                        tokens.push(Token {
                            term: normalize(gram),
                            position,
                        });
                    }
                }
                _ => tokens.push(Token {
                    term: normalize(word),
                    position,
                }),
            }
        }
        tokens
    }
}

fn resolve_tokenizer(schema: &IndexSchema, name: &str) -> Result<Tokenizer, SearchError> {
    if let Some(def) = schema.settings.analysis.tokenizer.get(name) {
        return Ok(match def {
            TokenizerDef::EdgeNgram {
                min_gram,
                max_gram,
                token_chars,
            } => Tokenizer::EdgeNgram {
                min_gram: *min_gram,
                max_gram: *max_gram,
                token_chars: token_chars.clone(),
            },
        });
    }

    match name {
        "standard" => Ok(Tokenizer::Standard),
        "letter" => Ok(Tokenizer::Letter),
        "lowercase" => Ok(Tokenizer::Lowercase),
        "whitespace" => Ok(Tokenizer::Whitespace),
        "keyword" => Ok(Tokenizer::Keyword),
        other => Err(SearchError::schema(format!("Unknown tokenizer [{}]", other))),
    }
}

/// Maximal runs of characters accepted by `keep`.
fn split_runs(text: &str, keep: impl Fn(char) -> bool) -> Vec<&str> {
    text.split(|c: char| !keep(c))
        .filter(|run| !run.is_empty())
        .collect()
}

/// Prefixes of `word` from `min_gram` to `max_gram` characters. Words
/// shorter than `min_gram` produce nothing.
fn edge_ngrams(word: &str, min_gram: usize, max_gram: usize) -> Vec<&str> {
    let boundaries: Vec<usize> = word
        .char_indices()
        .map(|(i, _)| i)
        .skip(1)
        .chain(std::iter::once(word.len()))
        .collect();

    (min_gram.max(1)..=max_gram)
        .filter_map(|len| boundaries.get(len - 1).map(|&end| &word[..end]))
        .collect()
}
