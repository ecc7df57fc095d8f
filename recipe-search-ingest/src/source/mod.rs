//! Document sources for ingestion.
//!
//! The loader accepts any `Stream` of documents; this module provides the
//! one used by the command line: a directory of recipe JSON files.

use std::path::{Path, PathBuf};

use futures::{future, stream, Stream, StreamExt, TryStreamExt};
use recipe_search_shared::Recipe;
use tokio_stream::wrappers::ReadDirStream;
use tracing::debug;

use crate::errors::SourceError;

/// A directory holding one recipe per `*.json` file.
#[derive(Debug, Clone)]
pub struct RecipeDirectory {
    path: PathBuf,
}

impl RecipeDirectory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The JSON files of the directory, sorted by name. Subdirectories are
    /// not visited.
    pub async fn files(&self) -> Result<Vec<PathBuf>, SourceError> {
        let read_dir = tokio::fs::read_dir(&self.path)
            .await
            .map_err(|source| SourceError::Io {
                path: self.path.clone(),
                source,
            })?;

        let mut files: Vec<PathBuf> = ReadDirStream::new(read_dir)
            .map_ok(|entry| entry.path())
            .try_filter(|path| future::ready(is_json_file(path)))
            .try_collect()
            .await
            .map_err(|source| SourceError::Io {
                path: self.path.clone(),
                source,
            })?;
        files.sort();

        debug!(path = %self.path.display(), count = files.len(), "Listed recipe files");
        Ok(files)
    }

    /// Stream the recipes of the directory in file name order.
    ///
    /// Files are read one at a time as the stream is polled. A file that
    /// cannot be read or decoded yields an error item and the stream goes
    /// on with the next file.
    pub async fn recipes(
        &self,
    ) -> Result<impl Stream<Item = Result<Recipe, SourceError>>, SourceError> {
        let files = self.files().await?;
        Ok(stream::iter(files).then(read_recipe))
    }
}

fn is_json_file(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

async fn read_recipe(path: PathBuf) -> Result<Recipe, SourceError> {
    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(source) => return Err(SourceError::Io { path, source }),
    };
    serde_json::from_slice(&bytes).map_err(|source| SourceError::Decode { path, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, name: &str, contents: &str) {
        fs::write(dir.join(name), contents).unwrap();
    }

    fn recipe_json(url: &str, title: &str) -> String {
        format!(r#"{{"sourceUrl": "{}", "title": "{}"}}"#, url, title)
    }

    #[tokio::test]
    async fn test_files_are_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "b.json", "{}");
        write(dir.path(), "a.json", "{}");
        write(dir.path(), "notes.txt", "not a recipe");
        fs::create_dir(dir.path().join("nested")).unwrap();
        write(&dir.path().join("nested"), "c.json", "{}");

        let files = RecipeDirectory::new(dir.path()).files().await.unwrap();

        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.json", "b.json"]);
    }

    #[tokio::test]
    async fn test_recipes_stream_in_order() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "02-soup.json", &recipe_json("https://example.com/soup", "Soup"));
        write(dir.path(), "01-cake.json", &recipe_json("https://example.com/cake", "Cake"));

        let recipes: Vec<Recipe> = RecipeDirectory::new(dir.path())
            .recipes()
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();

        let titles: Vec<&str> = recipes.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["Cake", "Soup"]);
    }

    #[tokio::test]
    async fn test_undecodable_file_yields_error_and_continues() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.json", &recipe_json("https://example.com/a", "A"));
        write(dir.path(), "b.json", "{ not json");
        write(dir.path(), "c.json", &recipe_json("https://example.com/c", "C"));

        let items: Vec<Result<Recipe, SourceError>> = RecipeDirectory::new(dir.path())
            .recipes()
            .await
            .unwrap()
            .collect()
            .await;

        assert_eq!(items.len(), 3);
        assert!(items[0].is_ok());
        match &items[1] {
            Err(error @ SourceError::Decode { .. }) => {
                assert!(error.location().ends_with("b.json"));
            }
            other => panic!("expected decode error, got {:?}", other),
        }
        assert!(items[2].is_ok());
    }

    #[tokio::test]
    async fn test_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let missing = RecipeDirectory::new(dir.path().join("missing"));

        let result = missing.files().await;
        assert!(matches!(result, Err(SourceError::Io { .. })));
    }
}
