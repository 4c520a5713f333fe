//! Metadata filtering for retrieval.
//!
//! A pure predicate over chunk records, applied to vector candidates and to
//! the lexical fallback scan alike.

use crate::types::ChunkRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Per-query metadata filters. Unset filters pass every record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    /// Only these source filenames
    pub doc_filter: Option<BTreeSet<String>>,

    /// Only records from this year
    pub year_filter: Option<i32>,

    /// Exact category match
    pub category_filter: Option<String>,

    /// Records sharing at least one of these topics
    pub topic_filter: Option<BTreeSet<String>>,
}

impl FilterSpec {
    /// Create a new empty filter set
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_docs<I, S>(mut self, docs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.doc_filter = Some(docs.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year_filter = Some(year);
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category_filter = Some(category.into());
        self
    }

    pub fn with_topics<I, S>(mut self, topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.topic_filter = Some(topics.into_iter().map(Into::into).collect());
        self
    }

    /// Check if any filters are set
    pub fn has_filters(&self) -> bool {
        self.doc_filter.is_some()
            || self.year_filter.is_some()
            || self.category_filter.is_some()
            || self.topic_filter.is_some()
    }

    /// Whether a record passes every set filter.
    ///
    /// With `legacy_year_inference`, a record without a year passes the year
    /// filter when its filename starts with `"{year}_"`.
    pub fn matches(&self, record: &ChunkRecord, legacy_year_inference: bool) -> bool {
        if let Some(docs) = &self.doc_filter {
            if !docs.contains(&record.doc) {
                return false;
            }
        }

        if let Some(year) = self.year_filter {
            let year_ok = match record.year {
                Some(record_year) => record_year == year,
                None => legacy_year_inference && record.doc.starts_with(&format!("{}_", year)),
            };
            if !year_ok {
                return false;
            }
        }

        if let Some(category) = &self.category_filter {
            if &record.category != category {
                return false;
            }
        }

        // Any single shared topic qualifies
        if let Some(topics) = &self.topic_filter {
            if record.topics.is_disjoint(topics) {
                return false;
            }
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(doc: &str, year: Option<i32>, category: &str, topics: &[&str]) -> ChunkRecord {
        ChunkRecord {
            doc: doc.to_string(),
            page: 1,
            chunk_id: 0,
            text: "text".to_string(),
            year,
            category: category.to_string(),
            topics: topics.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[test]
    fn test_no_filters_pass_everything() {
        let filters = FilterSpec::new();
        assert!(!filters.has_filters());
        assert!(filters.matches(&record("a.pdf", None, "general", &[]), false));
    }

    #[test]
    fn test_doc_filter() {
        let filters = FilterSpec::new().with_docs(["a.pdf", "b.pdf"]);
        assert!(filters.matches(&record("b.pdf", None, "general", &[]), false));
        assert!(!filters.matches(&record("c.pdf", None, "general", &[]), false));
    }

    #[test]
    fn test_year_filter_exact() {
        let filters = FilterSpec::new().with_year(2021);
        assert!(filters.matches(&record("x.pdf", Some(2021), "general", &[]), false));
        assert!(!filters.matches(&record("x.pdf", Some(2020), "general", &[]), false));
    }

    #[test]
    fn test_missing_year_needs_legacy_inference() {
        let filters = FilterSpec::new().with_year(2021);
        let legacy = record("2021_telehealth.pdf", None, "general", &[]);

        assert!(!filters.matches(&legacy, false));
        assert!(filters.matches(&legacy, true));
        assert!(!filters.matches(&record("2020_telehealth.pdf", None, "general", &[]), true));
    }

    #[test]
    fn test_category_is_exact() {
        let filters = FilterSpec::new().with_category("policy");
        assert!(filters.matches(&record("a.pdf", None, "policy", &[]), false));
        assert!(!filters.matches(&record("a.pdf", None, "Policy", &[]), false));
    }

    #[test]
    fn test_topic_filter_any_overlap() {
        let filters = FilterSpec::new().with_topics(["a", "b"]);
        assert!(filters.matches(&record("x.pdf", None, "general", &["b", "c"]), false));
        assert!(!filters.matches(&record("x.pdf", None, "general", &["c"]), false));
        assert!(!filters.matches(&record("x.pdf", None, "general", &[]), false));
    }

    #[test]
    fn test_filters_combine() {
        let filters = FilterSpec::new()
            .with_year(2022)
            .with_topics(["telemedicine"]);
        assert!(filters.matches(&record("x.pdf", Some(2022), "technology", &["telemedicine"]), false));
        assert!(!filters.matches(&record("x.pdf", Some(2021), "technology", &["telemedicine"]), false));
    }
}
