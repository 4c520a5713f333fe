//! Validation of generator output.
//!
//! The generator is asked for a fixed JSON schema but never trusted to
//! follow it. Anything malformed degrades to the refusal result instead of
//! an error.

use crate::types::{AnswerResult, Quote, SourceRef};
use docqa_prompt::REFUSAL_SENTENCE;
use serde_json::{Map, Value};
use std::collections::HashSet;
use unicode_segmentation::UnicodeSegmentation;

/// Turn raw generator output into a grounded answer.
pub fn validate_answer(raw: &str, max_quote_words: usize) -> AnswerResult {
    let object = match serde_json::from_str::<Value>(raw.trim()) {
        Ok(Value::Object(object)) => object,
        Ok(_) => {
            tracing::warn!("Generator output is JSON but not an object");
            return AnswerResult::refusal();
        }
        Err(e) => {
            tracing::warn!("Generator output is not valid JSON: {}", e);
            return AnswerResult::refusal();
        }
    };

    let answer = object
        .get("answer")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .unwrap_or(REFUSAL_SENTENCE)
        .to_string();

    let sources = unique_sources(object.get("sources"));
    let quotes = parse_quotes(&object, max_quote_words);

    let result = AnswerResult::grounded(answer, sources, quotes);
    tracing::debug!(
        "Validated answer: {} sources, {} quotes, confidence {}",
        result.sources.len(),
        result.quotes.len(),
        result.confidence.as_str()
    );
    result
}

/// Well-typed `(doc, page)` pairs, first occurrence kept.
fn unique_sources(value: Option<&Value>) -> Vec<SourceRef> {
    let Some(Value::Array(entries)) = value else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    entries
        .iter()
        .filter_map(|entry| {
            let doc = entry.get("doc")?.as_str()?;
            let page = u32::try_from(entry.get("page")?.as_u64()?).ok()?;
            if doc.is_empty() || page == 0 {
                return None;
            }
            Some(SourceRef {
                doc: doc.to_string(),
                page,
            })
        })
        .filter(|source| seen.insert(source.clone()))
        .collect()
}

fn parse_quotes(object: &Map<String, Value>, max_words: usize) -> Vec<Quote> {
    let Some(Value::Array(entries)) = object.get("quotes") else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| {
            let quote = entry.get("quote")?.as_str()?.trim();
            let source_index = entry.get("source_index")?.as_i64()?;
            if quote.is_empty() {
                return None;
            }
            Some(Quote {
                quote: truncate_words(quote, max_words),
                source_index,
            })
        })
        .collect()
}

/// Cut text after `max_words` words, keeping the original spacing.
pub fn truncate_words(text: &str, max_words: usize) -> String {
    match text.unicode_word_indices().nth(max_words) {
        Some((start, _)) => text[..start]
            .trim_end_matches(|c: char| c.is_whitespace() || c.is_ascii_punctuation())
            .to_string(),
        None => text.to_string(),
    }
}

/// Drop cited sources that were not among the presented contexts.
///
/// Grounding is re-applied, so an answer left without sources becomes the
/// refusal.
pub fn restrict_to_presented(result: AnswerResult, presented: &HashSet<SourceRef>) -> AnswerResult {
    if result.is_refusal() {
        return result;
    }

    let before = result.sources.len();
    let sources: Vec<SourceRef> = result
        .sources
        .into_iter()
        .filter(|s| presented.contains(s))
        .collect();

    if sources.len() < before {
        tracing::warn!(
            "Dropped {} cited sources that were not presented",
            before - sources.len()
        );
    }

    AnswerResult::grounded(result.answer, sources, result.quotes)
}
