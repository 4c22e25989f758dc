//! The closed vocabulary of expense categories, their subcategories, and saving sources.
//!
//! The vocabulary is configured by two JSON documents in the home directory:
//!
//! - `categories.json`: an object mapping each category to an ordered list of subcategories, e.g.
//!   `{"food": ["groceries", "dining_out", "other"], "misc": ["other"]}`
//! - `saving_sources.json`: an ordered list of sources, e.g. `["salary", "bonus", "other"]`
//!
//! The documents are re-read every time a vocabulary is needed, so edits take effect without a
//! restart.

mod normalize;

use crate::error::{ErrorType, IntoResult, Res, Result};
use crate::utils;
use anyhow::{ensure, Context};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use tracing::trace;

/// The category that unknown or blank categories are mapped onto. It must exist in every
/// vocabulary.
pub const FALLBACK_CATEGORY: &str = "misc";

/// The preferred replacement for unknown or blank subcategories and saving sources.
pub const FALLBACK_ENTRY: &str = "other";

/// The default `categories.json` written by `init`.
pub(crate) const DEFAULT_CATEGORIES_JSON: &str = include_str!("default_categories.json");

/// The default `saving_sources.json` written by `init`.
pub(crate) const DEFAULT_SAVING_SOURCES_JSON: &str = include_str!("default_saving_sources.json");

/// Anything that can produce the current `Vocabulary`.
#[async_trait]
pub trait VocabularySource: Debug + Send + Sync {
    /// Loads the vocabulary. Fails with `ErrorType::Config` if it is missing or malformed.
    async fn load(&self) -> Result<Vocabulary>;
}

/// A validated vocabulary.
///
/// Every category has at least one subcategory, the `misc` category exists, and there is at least
/// one saving source. All entries are trimmed and lowercased. These guarantees are what allow
/// normalization to always produce a valid value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Vocabulary {
    categories: BTreeMap<String, Vec<String>>,
    saving_sources: Vec<String>,
}

impl Vocabulary {
    /// Validates and constructs a `Vocabulary`.
    pub fn new(
        categories: BTreeMap<String, Vec<String>>,
        saving_sources: Vec<String>,
    ) -> Res<Self> {
        let mut clean = BTreeMap::new();
        for (category, subcategories) in categories {
            let category = clean_entry(&category);
            ensure!(!category.is_empty(), "Blank category names are not allowed");
            let subcategories = dedup(subcategories.iter().map(|s| clean_entry(s)));
            ensure!(
                !subcategories.is_empty(),
                "Category '{category}' must have at least one subcategory"
            );
            ensure!(
                clean.insert(category.clone(), subcategories).is_none(),
                "Category '{category}' is declared more than once"
            );
        }
        ensure!(
            clean.contains_key(FALLBACK_CATEGORY),
            "The '{FALLBACK_CATEGORY}' category is required"
        );

        let saving_sources = dedup(saving_sources.iter().map(|s| clean_entry(s)));
        ensure!(
            !saving_sources.is_empty(),
            "At least one saving source is required"
        );

        Ok(Self {
            categories: clean,
            saving_sources,
        })
    }

    /// Parses the two vocabulary JSON documents.
    pub fn from_json(categories_json: &str, saving_sources_json: &str) -> Res<Self> {
        let categories: BTreeMap<String, Vec<String>> = serde_json::from_str(categories_json)
            .context("Unable to parse the categories document")?;
        let saving_sources: Vec<String> = serde_json::from_str(saving_sources_json)
            .context("Unable to parse the saving sources document")?;
        Self::new(categories, saving_sources)
    }

    /// The vocabulary that `init` writes to disk.
    pub fn builtin() -> Res<Self> {
        Self::from_json(DEFAULT_CATEGORIES_JSON, DEFAULT_SAVING_SOURCES_JSON)
    }

    /// Categories, sorted by name, mapped to their subcategories in declaration order.
    pub fn categories(&self) -> &BTreeMap<String, Vec<String>> {
        &self.categories
    }

    /// The subcategories of `category`, or `None` if the category is unknown.
    pub fn subcategories(&self, category: &str) -> Option<&[String]> {
        self.categories.get(category).map(Vec::as_slice)
    }

    /// Saving sources in declaration order.
    pub fn saving_sources(&self) -> &[String] {
        &self.saving_sources
    }
}

#[async_trait]
impl VocabularySource for Vocabulary {
    async fn load(&self) -> Result<Vocabulary> {
        Ok(self.clone())
    }
}

/// Loads the vocabulary from its JSON documents on every call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileVocabulary {
    categories_path: PathBuf,
    saving_sources_path: PathBuf,
}

impl FileVocabulary {
    pub fn new(categories_path: impl Into<PathBuf>, saving_sources_path: impl Into<PathBuf>) -> Self {
        Self {
            categories_path: categories_path.into(),
            saving_sources_path: saving_sources_path.into(),
        }
    }

    pub fn categories_path(&self) -> &Path {
        &self.categories_path
    }

    pub fn saving_sources_path(&self) -> &Path {
        &self.saving_sources_path
    }

    async fn load_inner(&self) -> Res<Vocabulary> {
        trace!(
            "Loading vocabulary from {} and {}",
            self.categories_path.display(),
            self.saving_sources_path.display()
        );
        let categories: BTreeMap<String, Vec<String>> =
            utils::deserialize(&self.categories_path).await?;
        let saving_sources: Vec<String> = utils::deserialize(&self.saving_sources_path).await?;
        Vocabulary::new(categories, saving_sources).with_context(|| {
            format!(
                "Invalid vocabulary in {} or {}",
                self.categories_path.display(),
                self.saving_sources_path.display()
            )
        })
    }
}

#[async_trait]
impl VocabularySource for FileVocabulary {
    async fn load(&self) -> Result<Vocabulary> {
        self.load_inner().await.pub_result(ErrorType::Config)
    }
}

fn clean_entry(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Drops blanks and repeated entries while preserving the first-seen order.
fn dedup(entries: impl Iterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for entry in entries {
        if !entry.is_empty() && !out.contains(&entry) {
            out.push(entry);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_builtin_vocabulary_is_valid() {
        let vocabulary = Vocabulary::builtin().unwrap();
        assert!(vocabulary.subcategories(FALLBACK_CATEGORY).is_some());
        assert!(!vocabulary.saving_sources().is_empty());
    }

    #[test]
    fn test_entries_are_cleaned() {
        let vocabulary = Vocabulary::from_json(
            r#"{" Food ": ["Groceries", " groceries", "", "Other"], "MISC": ["other"]}"#,
            r#"["Salary", "salary ", "OTHER"]"#,
        )
        .unwrap();
        assert_eq!(
            vocabulary.subcategories("food").unwrap(),
            &["groceries".to_string(), "other".to_string()]
        );
        assert_eq!(vocabulary.saving_sources(), &["salary", "other"]);
    }

    #[test]
    fn test_misc_is_required() {
        let err = Vocabulary::from_json(r#"{"food": ["other"]}"#, r#"["other"]"#).unwrap_err();
        assert!(err.to_string().contains("misc"), "{err}");
    }

    #[test]
    fn test_empty_subcategories_are_rejected() {
        let err = Vocabulary::from_json(r#"{"misc": [], "food": ["x"]}"#, r#"["other"]"#)
            .unwrap_err();
        assert!(err.to_string().contains("at least one subcategory"), "{err}");
    }

    #[test]
    fn test_empty_sources_are_rejected() {
        assert!(Vocabulary::from_json(r#"{"misc": ["other"]}"#, r#"[]"#).is_err());
    }

    #[tokio::test]
    async fn test_file_vocabulary_missing_is_config_error() {
        let dir = TempDir::new().unwrap();
        let source = FileVocabulary::new(
            dir.path().join("categories.json"),
            dir.path().join("saving_sources.json"),
        );
        let err = source.load().await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Config);
    }

    #[tokio::test]
    async fn test_file_vocabulary_malformed_is_config_error() {
        let dir = TempDir::new().unwrap();
        let categories = dir.path().join("categories.json");
        let sources = dir.path().join("saving_sources.json");
        utils::write(&categories, "{ not json").await.unwrap();
        utils::write(&sources, DEFAULT_SAVING_SOURCES_JSON).await.unwrap();
        let err = FileVocabulary::new(&categories, &sources)
            .load()
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Config);
    }

    #[tokio::test]
    async fn test_file_vocabulary_is_reloaded() {
        let dir = TempDir::new().unwrap();
        let categories = dir.path().join("categories.json");
        let sources = dir.path().join("saving_sources.json");
        utils::write(&categories, r#"{"misc": ["other"]}"#)
            .await
            .unwrap();
        utils::write(&sources, r#"["other"]"#).await.unwrap();
        let source = FileVocabulary::new(&categories, &sources);
        assert!(source.load().await.unwrap().subcategories("pets").is_none());

        utils::write(&categories, r#"{"misc": ["other"], "pets": ["food", "vet"]}"#)
            .await
            .unwrap();
        let reloaded = source.load().await.unwrap();
        assert_eq!(reloaded.subcategories("pets").unwrap().len(), 2);
    }
}
