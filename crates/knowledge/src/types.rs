//! Core types for the document knowledge store and answering pipeline.

use crate::rag::filter::FilterSpec;
use docqa_core::{AppError, AppResult};
use docqa_prompt::REFUSAL_SENTENCE;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One chunk of extracted document text, as persisted in the metadata store.
///
/// Identity is `(doc, page, chunk_id)`. The record at position `i` in the
/// store owns vector `i` in the similarity index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// Source filename
    pub doc: String,

    /// 1-based page number
    pub page: u32,

    /// Order of the chunk within its document
    pub chunk_id: u32,

    pub text: String,

    #[serde(default)]
    pub year: Option<i32>,

    #[serde(default = "default_category")]
    pub category: String,

    #[serde(default)]
    pub topics: BTreeSet<String>,
}

fn default_category() -> String {
    "general".to_string()
}

impl ChunkRecord {
    /// Check the fields the pipeline relies on.
    pub fn validate(&self) -> AppResult<()> {
        if self.doc.trim().is_empty() {
            return Err(AppError::Storage("Chunk record has an empty doc".to_string()));
        }
        if self.page == 0 {
            return Err(AppError::Storage(format!(
                "Chunk record {}#{} has page 0; pages are 1-based",
                self.doc, self.chunk_id
            )));
        }
        if self.text.trim().is_empty() {
            return Err(AppError::Storage(format!(
                "Chunk record {}#{} has empty text",
                self.doc, self.chunk_id
            )));
        }
        Ok(())
    }

    pub fn source_ref(&self) -> SourceRef {
        SourceRef {
            doc: self.doc.clone(),
            page: self.page,
        }
    }
}

/// Extracted text of one PDF page, as produced by the external extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRecord {
    pub doc: String,
    pub page: u32,
    pub text: String,
}

/// How a context was found. The two scales are not comparable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Score {
    /// Inner product of normalized vectors, in [-1, 1]
    Similarity(f32),
    /// Number of distinct domain keywords present in the text
    KeywordHits(u32),
}

impl Score {
    pub fn similarity(&self) -> Option<f32> {
        match self {
            Score::Similarity(s) => Some(*s),
            Score::KeywordHits(_) => None,
        }
    }

    pub fn keyword_hits(&self) -> Option<u32> {
        match self {
            Score::KeywordHits(h) => Some(*h),
            Score::Similarity(_) => None,
        }
    }
}

/// A chunk retrieved for one query.
#[derive(Debug, Clone, PartialEq)]
pub struct Context {
    pub record: ChunkRecord,
    pub score: Score,
}

impl Context {
    pub fn new(record: ChunkRecord, score: Score) -> Self {
        Self { record, score }
    }

    pub fn text(&self) -> &str {
        &self.record.text
    }
}

/// A cited `(doc, page)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceRef {
    pub doc: String,
    pub page: u32,
}

/// A short supporting quote and the context number it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub quote: String,
    pub source_index: i64,
}

/// Answer confidence, derived from the number of distinct sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    /// 0 sources is low, 1 or 2 is medium, 3 or more is high.
    pub fn from_source_count(count: usize) -> Self {
        match count {
            0 => Confidence::Low,
            1 | 2 => Confidence::Medium,
            _ => Confidence::High,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
        }
    }
}

/// The caller-facing answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerResult {
    pub answer: String,
    pub sources: Vec<SourceRef>,
    pub quotes: Vec<Quote>,
    pub confidence: Confidence,
}

impl AnswerResult {
    /// The uniform "no answer" result.
    pub fn refusal() -> Self {
        Self {
            answer: REFUSAL_SENTENCE.to_string(),
            sources: Vec::new(),
            quotes: Vec::new(),
            confidence: Confidence::Low,
        }
    }

    /// Assemble a result, enforcing grounding.
    ///
    /// A refusal answer or an answer without sources collapses to
    /// [`AnswerResult::refusal`]. Confidence is always derived from the
    /// source count, never supplied.
    pub fn grounded(answer: String, sources: Vec<SourceRef>, quotes: Vec<Quote>) -> Self {
        if answer == REFUSAL_SENTENCE || sources.is_empty() {
            return Self::refusal();
        }

        let confidence = Confidence::from_source_count(sources.len());
        Self {
            answer,
            sources,
            quotes,
            confidence,
        }
    }

    pub fn is_refusal(&self) -> bool {
        self.answer == REFUSAL_SENTENCE
    }
}

/// Options for answering a question.
#[derive(Debug, Clone, Default)]
pub struct AskOptions {
    pub question: String,

    /// Requested number of contexts; the configured default when unset
    pub top_k: Option<usize>,

    pub filters: FilterSpec,

    /// Earlier questions in this conversation, oldest first
    pub history: Vec<String>,
}

impl AskOptions {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            ..Default::default()
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }

    pub fn with_filters(mut self, filters: FilterSpec) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_history(mut self, history: Vec<String>) -> Self {
        self.history = history;
        self
    }
}

/// Statistics from an offline index build.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexBuildStats {
    pub documents: usize,
    pub duplicate_documents: usize,
    pub pages: usize,
    pub chunks: usize,
    pub dimensions: usize,
    pub duration_secs: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_from_source_count() {
        assert_eq!(Confidence::from_source_count(0), Confidence::Low);
        assert_eq!(Confidence::from_source_count(1), Confidence::Medium);
        assert_eq!(Confidence::from_source_count(2), Confidence::Medium);
        assert_eq!(Confidence::from_source_count(3), Confidence::High);
        assert_eq!(Confidence::from_source_count(40), Confidence::High);
    }

    #[test]
    fn test_grounded_without_sources_is_refusal() {
        let result = AnswerResult::grounded(
            "Telehealth improves access.".to_string(),
            vec![],
            vec![Quote {
                quote: "improves access".to_string(),
                source_index: 1,
            }],
        );
        assert_eq!(result, AnswerResult::refusal());
    }

    #[test]
    fn test_refusal_answer_drops_sources() {
        let result = AnswerResult::grounded(
            REFUSAL_SENTENCE.to_string(),
            vec![SourceRef {
                doc: "a.pdf".to_string(),
                page: 1,
            }],
            vec![],
        );
        assert!(result.sources.is_empty());
        assert_eq!(result.confidence, Confidence::Low);
    }

    #[test]
    fn test_confidence_serializes_lowercase() {
        let json = serde_json::to_string(&AnswerResult::refusal()).unwrap();
        assert!(json.contains("\"confidence\":\"low\""));
    }

    #[test]
    fn test_chunk_record_defaults() {
        let record: ChunkRecord =
            serde_json::from_str(r#"{"doc":"a.pdf","page":2,"chunk_id":0,"text":"t"}"#).unwrap();
        assert_eq!(record.category, "general");
        assert!(record.topics.is_empty());
        assert!(record.year.is_none());
        assert!(record.validate().is_ok());
    }

    #[test]
    fn test_chunk_record_page_zero_rejected() {
        let record: ChunkRecord =
            serde_json::from_str(r#"{"doc":"a.pdf","page":0,"chunk_id":0,"text":"t"}"#).unwrap();
        assert!(matches!(record.validate(), Err(AppError::Storage(_))));
    }

    #[test]
    fn test_score_scales_are_distinct() {
        assert_eq!(Score::Similarity(0.4).keyword_hits(), None);
        assert_eq!(Score::KeywordHits(3).keyword_hits(), Some(3));
        assert_eq!(Score::KeywordHits(3).similarity(), None);
    }
}
