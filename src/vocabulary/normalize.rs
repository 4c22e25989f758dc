//! Maps free-form category, subcategory and source strings onto the vocabulary.
//!
//! Normalization never fails. Unknown or blank values are replaced with a fallback instead of
//! being rejected, and callers get the normalized values back so a substitution can be detected.

use super::{Vocabulary, FALLBACK_CATEGORY, FALLBACK_ENTRY};
use tracing::warn;

impl Vocabulary {
    /// Returns a `(category, subcategory)` pair that is valid in this vocabulary.
    ///
    /// - Both inputs are trimmed and lowercased.
    /// - A blank or unknown category becomes `misc`.
    /// - A blank subcategory, or one that does not belong to the resolved category, becomes
    ///   `other` if the category has it, otherwise the category's first subcategory.
    pub fn normalize_category(&self, raw_category: &str, raw_subcategory: &str) -> (String, String) {
        let requested = raw_category.trim().to_lowercase();
        let (category, subcategories) = match self.categories.get_key_value(requested.as_str()) {
            Some((category, subcategories)) => (category.as_str(), subcategories.as_slice()),
            None => {
                warn!("Unknown category '{raw_category}', using '{FALLBACK_CATEGORY}'");
                (FALLBACK_CATEGORY, self.subcategories(FALLBACK_CATEGORY).unwrap_or(&[]))
            }
        };
        let subcategory = pick(subcategories, raw_subcategory);
        (category.to_string(), subcategory)
    }

    /// Returns a saving source that is valid in this vocabulary, using the same fallback policy as
    /// subcategories.
    pub fn normalize_saving_source(&self, raw_source: &str) -> String {
        pick(&self.saving_sources, raw_source)
    }
}

/// Picks `raw` from `allowed` if present, otherwise `other`, otherwise the first entry.
fn pick(allowed: &[String], raw: &str) -> String {
    let requested = raw.trim().to_lowercase();
    if !requested.is_empty() && allowed.contains(&requested) {
        return requested;
    }
    let fallback = if allowed.iter().any(|s| s == FALLBACK_ENTRY) {
        FALLBACK_ENTRY.to_string()
    } else {
        // A validated vocabulary never has an empty list here.
        allowed.first().cloned().unwrap_or_default()
    };
    if !requested.is_empty() {
        warn!("Unknown value '{raw}', using '{fallback}'");
    }
    fallback
}
