//! Topic anchoring of retrieved contexts.
//!
//! When a question is clearly about an anchor topic, contexts from other
//! domains that only matched on generic wording ("limitations", "impact")
//! are removed or pushed down.

use crate::rag::classify::{PhraseClassifier, TextClassifier, TextScorer};
use crate::rag::expand::TELEMEDICINE_TERMS;
use crate::types::Context;
use std::cmp::Reverse;

const FILENAME_WEIGHT: u32 = 3;
const TAG_WEIGHT: u32 = 3;

/// How an anchor reshapes the context list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorMode {
    /// Keep only anchor-matching contexts
    Strict,
    /// Stable sort by relevance, remove nothing
    Soft,
}

/// A subject that narrows acceptable contexts when a question names it.
#[derive(Debug, Clone)]
pub struct TopicAnchor {
    name: String,
    topic_tag: String,
    question_terms: PhraseClassifier,
    text_terms: PhraseClassifier,
    filename_terms: PhraseClassifier,
}

impl TopicAnchor {
    pub fn new(
        name: impl Into<String>,
        topic_tag: impl Into<String>,
        question_terms: &[&str],
        text_terms: &[&str],
        filename_terms: &[&str],
    ) -> Self {
        Self {
            name: name.into(),
            topic_tag: topic_tag.into(),
            question_terms: PhraseClassifier::new(question_terms),
            text_terms: PhraseClassifier::new(text_terms),
            filename_terms: PhraseClassifier::new(filename_terms),
        }
    }

    pub fn telemedicine() -> Self {
        Self::new(
            "telemedicine",
            "telemedicine",
            TELEMEDICINE_TERMS,
            &["telemedicine", "telehealth", "tele-med", "tele-health"],
            &[
                "telemedicine",
                "telehealth",
                "tele-med",
                "tele_med",
                "tele-health",
                "tele_health",
                "virtual_care",
                "virtual-care",
                "telecare",
            ],
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the question names this topic.
    pub fn applies_to(&self, question: &str) -> bool {
        self.question_terms.classify(question)
    }

    /// Filename and tag matches weigh 3 each; every distinct anchor term
    /// found in the text adds 1.
    pub fn relevance(&self, context: &Context) -> u32 {
        let record = &context.record;
        let mut score = 0;
        if self.filename_terms.classify(&record.doc) {
            score += FILENAME_WEIGHT;
        }
        if record.topics.contains(&self.topic_tag) {
            score += TAG_WEIGHT;
        }
        score + self.text_terms.score(&record.text) as u32
    }

    pub fn context_matches(&self, context: &Context) -> bool {
        self.relevance(context) > 0
    }
}

impl TextClassifier for TopicAnchor {
    fn classify(&self, text: &str) -> bool {
        self.applies_to(text)
    }
}

/// The anchors checked against every question.
#[derive(Debug, Clone)]
pub struct AnchorSet {
    anchors: Vec<TopicAnchor>,
}

impl Default for AnchorSet {
    fn default() -> Self {
        Self::new(vec![TopicAnchor::telemedicine()])
    }
}

impl AnchorSet {
    pub fn new(anchors: Vec<TopicAnchor>) -> Self {
        Self { anchors }
    }

    pub fn matching(&self, question: &str) -> Vec<&TopicAnchor> {
        self.anchors.iter().filter(|a| a.applies_to(question)).collect()
    }

    /// Strict for a single unambiguous anchor, soft for comparison
    /// questions or several anchors, `None` when no anchor applies.
    pub fn mode(&self, question: &str, comparison: bool) -> Option<AnchorMode> {
        match self.matching(question).len() {
            0 => None,
            1 if !comparison => Some(AnchorMode::Strict),
            _ => Some(AnchorMode::Soft),
        }
    }

    /// Filter or re-rank contexts for the question.
    pub fn apply(&self, question: &str, comparison: bool, contexts: Vec<Context>) -> Vec<Context> {
        let anchors = self.matching(question);
        let Some(mode) = self.mode(question, comparison) else {
            return contexts;
        };

        let before = contexts.len();
        let contexts = match mode {
            AnchorMode::Strict => contexts
                .into_iter()
                .filter(|c| anchors.iter().all(|a| a.context_matches(c)))
                .collect(),
            AnchorMode::Soft => {
                let mut contexts = contexts;
                contexts.sort_by_cached_key(|c| {
                    Reverse(anchors.iter().map(|a| a.relevance(c)).sum::<u32>())
                });
                contexts
            }
        };

        tracing::debug!(
            "Anchor {:?} ({}) kept {} of {} contexts",
            mode,
            anchors.iter().map(|a| a.name()).collect::<Vec<_>>().join(", "),
            contexts.len(),
            before
        );
        contexts
    }
}
