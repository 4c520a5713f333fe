//! Heuristic text classifiers.
//!
//! Each classifier is a pure function of its input, so pattern sets can be
//! swapped or tested without touching the answering pipeline.

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

/// Yes/no classification of a piece of text.
pub trait TextClassifier: Send + Sync {
    fn classify(&self, text: &str) -> bool;
}

/// Numeric relevance of a piece of text. Higher is more relevant.
pub trait TextScorer: Send + Sync {
    fn score(&self, text: &str) -> f32;
}

/// Classifies text as positive when any pattern matches anywhere in it.
#[derive(Debug, Clone)]
pub struct RegexClassifier {
    patterns: Vec<Regex>,
}

impl RegexClassifier {
    /// Compile case-insensitive patterns.
    pub fn new(patterns: &[&str]) -> Result<Self, regex::Error> {
        let patterns = patterns
            .iter()
            .map(|p| RegexBuilder::new(p).case_insensitive(true).build())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    pub fn from_regexes(patterns: Vec<Regex>) -> Self {
        Self { patterns }
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

impl TextClassifier for RegexClassifier {
    fn classify(&self, text: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(text))
    }
}

/// Classifies text as positive when it contains any phrase, ignoring case.
#[derive(Debug, Clone)]
pub struct PhraseClassifier {
    phrases: Vec<String>,
}

impl PhraseClassifier {
    pub fn new(phrases: &[&str]) -> Self {
        Self {
            phrases: phrases.iter().map(|p| p.to_lowercase()).collect(),
        }
    }

    /// Phrases found in the text, in declaration order.
    pub fn matches<'a>(&'a self, text: &str) -> Vec<&'a str> {
        let lower = text.to_lowercase();
        self.phrases
            .iter()
            .filter(|p| lower.contains(p.as_str()))
            .map(String::as_str)
            .collect()
    }
}

impl TextClassifier for PhraseClassifier {
    fn classify(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        self.phrases.iter().any(|p| lower.contains(p.as_str()))
    }
}

impl TextScorer for PhraseClassifier {
    /// Number of distinct phrases present.
    fn score(&self, text: &str) -> f32 {
        self.matches(text).len() as f32
    }
}

static BARRIERISH: Lazy<Regex> = Lazy::new(|| {
    RegexBuilder::new(
        r"\b(barrier(s)?|challenge(s)?|limitation(s)?|obstacle(s)?|constraint(s)?|implement(ation|ing)?|adoption)\b",
    )
    .case_insensitive(true)
    .build()
    .unwrap()
});

static COMPARATIVE: Lazy<Regex> = Lazy::new(|| {
    RegexBuilder::new(
        r"\b(compare[sd]?|comparing|comparison|versus|vs\.?|differ(s|ence|ences)?|contrast(s|ing)?|similarit(y|ies))\b",
    )
    .case_insensitive(true)
    .build()
    .unwrap()
});

/// Detects questions about challenges, limitations or adoption.
#[derive(Debug, Clone, Copy, Default)]
pub struct BarrierDetector;

impl TextClassifier for BarrierDetector {
    fn classify(&self, text: &str) -> bool {
        BARRIERISH.is_match(text)
    }
}

/// Detects questions that ask to compare two subjects.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComparisonDetector;

impl TextClassifier for ComparisonDetector {
    fn classify(&self, text: &str) -> bool {
        COMPARATIVE.is_match(text)
    }
}
