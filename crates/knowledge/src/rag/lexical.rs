//! Keyword fallback retrieval.
//!
//! Used when vector search leaves nothing usable. Scores every record that
//! passes the filters by how many distinct domain keywords its text
//! contains.

use crate::config::RetrievalConfig;
use crate::rag::classify::PhraseClassifier;
use crate::rag::filter::FilterSpec;
use crate::types::{ChunkRecord, Context, Score};
use once_cell::sync::Lazy;
use std::cmp::Reverse;

/// Vocabulary of barriers and implementation constraints.
pub const BARRIER_TERMS: &[&str] = &[
    "barrier",
    "barriers",
    "challenge",
    "challenges",
    "limitation",
    "limitations",
    "obstacle",
    "obstacles",
    "constraint",
    "constraints",
    "implementation",
    "implementing",
    "adoption",
    "workflow",
    "reimbursement",
    "infrastructure",
    "regulatory",
    "privacy",
    "security",
    "training",
    "licensure",
    "access",
    "connectivity",
];

static BARRIER_KEYWORDS: Lazy<PhraseClassifier> = Lazy::new(|| PhraseClassifier::new(BARRIER_TERMS));

/// Distinct barrier keywords found in `text`.
pub fn keyword_hits(text: &str) -> u32 {
    BARRIER_KEYWORDS.matches(text).len() as u32
}

/// Up to `max(top_k, lexical_min_results)` keyword-scored contexts.
///
/// Records with no hits are excluded. Ordered by hits, then by text length,
/// both descending; remaining ties keep store order.
pub fn lexical_fallback(
    records: &[ChunkRecord],
    top_k: usize,
    filters: &FilterSpec,
    config: &RetrievalConfig,
) -> Vec<Context> {
    let mut scored: Vec<(u32, &ChunkRecord)> = records
        .iter()
        .filter(|r| filters.matches(r, config.legacy_year_inference))
        .map(|r| (keyword_hits(&r.text), r))
        .filter(|(hits, _)| *hits > 0)
        .collect();

    scored.sort_by_key(|(hits, r)| (Reverse(*hits), Reverse(r.text.chars().count())));

    let take = top_k.max(config.lexical_min_results);
    let contexts: Vec<Context> = scored
        .into_iter()
        .take(take)
        .map(|(hits, r)| Context::new(r.clone(), Score::KeywordHits(hits)))
        .collect();

    tracing::debug!("Keyword fallback produced {} contexts", contexts.len());
    contexts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(doc: &str, text: &str) -> ChunkRecord {
        ChunkRecord {
            doc: doc.to_string(),
            page: 1,
            chunk_id: 0,
            text: text.to_string(),
            year: None,
            category: "general".to_string(),
            topics: Default::default(),
        }
    }

    #[test]
    fn test_keyword_hits_counts_distinct_terms() {
        // "barriers" also contains "barrier"
        assert_eq!(keyword_hits("Barriers and barriers again"), 2);
        assert_eq!(keyword_hits("Reimbursement and LICENSURE"), 2);
        assert_eq!(keyword_hits("nothing relevant here"), 0);
    }

    #[test]
    fn test_zero_hit_records_excluded() {
        let records = vec![record("a.pdf", "nothing here"), record("b.pdf", "privacy")];
        let contexts = lexical_fallback(&records, 5, &FilterSpec::new(), &RetrievalConfig::default());

        assert_eq!(contexts.len(), 1);
        assert_eq!(contexts[0].record.doc, "b.pdf");
        assert_eq!(contexts[0].score, Score::KeywordHits(1));
    }

    #[test]
    fn test_order_by_hits_then_length() {
        let records = vec![
            record("short.pdf", "privacy"),
            record("long.pdf", "privacy concerns were raised repeatedly"),
            record("rich.pdf", "privacy and security and training"),
        ];
        let contexts = lexical_fallback(&records, 5, &FilterSpec::new(), &RetrievalConfig::default());

        let docs: Vec<&str> = contexts.iter().map(|c| c.record.doc.as_str()).collect();
        assert_eq!(docs, vec!["rich.pdf", "long.pdf", "short.pdf"]);
    }

    #[test]
    fn test_takes_at_least_min_results() {
        let records: Vec<ChunkRecord> = (0..20)
            .map(|i| record(&format!("{}.pdf", i), "workflow"))
            .collect();
        let config = RetrievalConfig::default();

        assert_eq!(lexical_fallback(&records, 2, &FilterSpec::new(), &config).len(), 8);
        assert_eq!(lexical_fallback(&records, 12, &FilterSpec::new(), &config).len(), 12);
    }

    #[test]
    fn test_filters_apply() {
        let records = vec![record("a.pdf", "adoption"), record("b.pdf", "adoption")];
        let filters = FilterSpec::new().with_docs(["b.pdf"]);
        let contexts = lexical_fallback(&records, 5, &filters, &RetrievalConfig::default());

        assert_eq!(contexts.len(), 1);
        assert_eq!(contexts[0].record.doc, "b.pdf");
    }
}
