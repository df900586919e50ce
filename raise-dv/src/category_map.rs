//! Indicator → category lookup
//!
//! Loaded once at startup from a JSON object file
//! (`{"<indicator id>": "<category id>", ...}`) and shared read-only by
//! every processing cycle.

use crate::error::{Result, VerifyError};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Immutable mapping from indicator identifier to category identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndicatorCategoryMap {
    categories: HashMap<String, String>,
}

impl IndicatorCategoryMap {
    /// Build from `(indicator, category)` pairs
    ///
    /// Fails on an empty map or on empty indicator/category names.
    pub fn from_entries<I, K, V>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut categories = HashMap::new();
        for (indicator, category) in entries {
            let indicator = indicator.into();
            let category = category.into();
            if indicator.trim().is_empty() {
                return Err(VerifyError::CategoryMap(
                    "Empty indicator identifier".to_string(),
                ));
            }
            if category.trim().is_empty() {
                return Err(VerifyError::CategoryMap(format!(
                    "Empty category for indicator '{}'",
                    indicator
                )));
            }
            categories.insert(indicator, category);
        }

        if categories.is_empty() {
            return Err(VerifyError::CategoryMap(
                "Category map has no entries".to_string(),
            ));
        }

        Ok(Self { categories })
    }

    /// Parse a JSON object of string → string
    pub fn from_json_str(content: &str) -> Result<Self> {
        let entries: HashMap<String, String> = serde_json::from_str(content).map_err(|e| {
            VerifyError::CategoryMap(format!(
                "Expected a JSON object of indicator → category strings: {}",
                e
            ))
        })?;
        Self::from_entries(entries)
    }

    /// Load the map from a file; missing or malformed content is an error
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            VerifyError::CategoryMap(format!("Cannot read {}: {}", path.display(), e))
        })?;
        let map = Self::from_json_str(&content).map_err(|e| match e {
            VerifyError::CategoryMap(msg) => {
                VerifyError::CategoryMap(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })?;

        tracing::info!(
            path = %path.display(),
            indicators = map.len(),
            categories = map.category_count(),
            "Loaded indicator category map"
        );
        Ok(map)
    }

    /// Category of `indicator_id`, or `UnknownIndicator`
    pub fn lookup(&self, indicator_id: &str) -> Result<&str> {
        self.categories
            .get(indicator_id)
            .map(String::as_str)
            .ok_or_else(|| VerifyError::UnknownIndicator(indicator_id.to_string()))
    }

    /// Number of mapped indicators
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Number of distinct categories
    pub fn category_count(&self) -> usize {
        self.categories.values().collect::<HashSet<_>>().len()
    }
}
