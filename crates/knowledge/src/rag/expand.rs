//! Retrieval query expansion.
//!
//! Appends domain hint terms to the text that gets embedded. The question
//! shown to the generator is never expanded.

use crate::rag::classify::{BarrierDetector, ComparisonDetector, PhraseClassifier, TextClassifier};
use std::collections::HashSet;

/// Heading of the appended hint block.
pub const HINTS_HEADING: &str = "Helpful retrieval hints:";

/// Anchor terms shared with the telemedicine topic anchor.
pub const TELEMEDICINE_TERMS: &[&str] = &[
    "telemedicine",
    "telehealth",
    "tele-med",
    "tele-health",
    "virtual care",
    "telecare",
];

/// A detector plus the hint terms it contributes.
pub struct HintFamily {
    pub name: &'static str,
    detector: Box<dyn TextClassifier>,
    hints: Vec<String>,
}

impl HintFamily {
    pub fn new(
        name: &'static str,
        detector: impl TextClassifier + 'static,
        hints: &[&str],
    ) -> Self {
        Self {
            name,
            detector: Box::new(detector),
            hints: hints.iter().map(|h| h.to_string()).collect(),
        }
    }

    pub fn hints(&self) -> &[String] {
        &self.hints
    }
}

impl std::fmt::Debug for HintFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HintFamily")
            .field("name", &self.name)
            .field("hints", &self.hints)
            .finish()
    }
}

/// Deterministic, order-stable query expander.
#[derive(Debug)]
pub struct QueryExpander {
    families: Vec<HintFamily>,
}

impl Default for QueryExpander {
    fn default() -> Self {
        Self::new(default_families())
    }
}

impl QueryExpander {
    pub fn new(families: Vec<HintFamily>) -> Self {
        Self { families }
    }

    /// Names of the families detected in the query, in family order.
    pub fn matched_families(&self, query: &str) -> Vec<&'static str> {
        self.families
            .iter()
            .filter(|f| f.detector.classify(query))
            .map(|f| f.name)
            .collect()
    }

    /// Expand a query. Returns it unchanged when no family matches.
    pub fn expand(&self, query: &str) -> String {
        let mut seen = HashSet::new();
        let hints: Vec<&str> = self
            .families
            .iter()
            .filter(|f| f.detector.classify(query))
            .flat_map(|f| f.hints.iter().map(String::as_str))
            .filter(|h| seen.insert(*h))
            .collect();

        if hints.is_empty() {
            return query.to_string();
        }

        tracing::debug!("Expanded retrieval query with {} hints", hints.len());
        format!(
            "{}\n\n{}\n- {}",
            query.trim_end(),
            HINTS_HEADING,
            hints.join("\n- ")
        )
    }
}

/// The built-in families, in the order their hints are appended.
pub fn default_families() -> Vec<HintFamily> {
    vec![
        HintFamily::new(
            "prior-authorization",
            PhraseClassifier::new(&[
                "prior authorization",
                "prior auth",
                "utilization management",
                "prior-authorization",
            ]),
            &[
                "delays in care",
                "administrative burden",
                "paperwork",
                "denials",
                "appeals",
                "cost",
                "access",
                "quality",
                "patient outcomes",
            ],
        ),
        HintFamily::new(
            "pay-for-performance",
            PhraseClassifier::new(&[
                "pay for performance",
                "pay-for-performance",
                "p4p",
                "performance-based payment",
                "performance based payment",
                "performance-based reimbursement",
            ]),
            &[
                "financial incentives",
                "provider incentives",
                "quality measures",
                "performance metrics",
                "outcomes",
                "process measures",
                "service delivery",
                "unintended consequences",
                "equity",
                "gaming",
            ],
        ),
        HintFamily::new(
            "impact",
            PhraseClassifier::new(&["impact", "effect", "consequence"]),
            &["trade-offs", "benefits", "risks", "barriers", "limitations"],
        ),
        HintFamily::new(
            "barrier",
            BarrierDetector,
            &[
                "challenges",
                "barriers",
                "limitations",
                "obstacles",
                "provider acceptance",
                "workflow",
                "reimbursement",
                "infrastructure",
                "privacy",
                "security",
                "licensure",
                "regulatory constraints",
            ],
        ),
        HintFamily::new(
            "telemedicine",
            PhraseClassifier::new(TELEMEDICINE_TERMS),
            &[
                "telehealth",
                "virtual care",
                "remote consultation",
                "video visits",
                "telemedicine adoption",
            ],
        ),
        HintFamily::new(
            "comparison",
            ComparisonDetector,
            &[
                "differences",
                "similarities",
                "advantages",
                "disadvantages",
                "compared with",
            ],
        ),
    ]
}
