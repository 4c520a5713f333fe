//! Retrieval and grounded answering.
//!
//! Leaf stages (filter, expander, retrievers, guard, anchor, validator) are
//! pure or read-only; `ask` wires them into the answering state machine.

pub mod anchor;
pub mod ask;
pub mod classify;
pub mod expand;
pub mod filter;
pub mod guard;
pub mod lexical;
pub mod retrieve;
pub mod validate;

pub use anchor::{AnchorMode, AnchorSet, TopicAnchor};
pub use ask::{AnswerPipeline, RetrievalPlan};
pub use classify::{
    BarrierDetector, ComparisonDetector, PhraseClassifier, RegexClassifier, TextClassifier,
    TextScorer,
};
pub use expand::{HintFamily, QueryExpander};
pub use filter::FilterSpec;
pub use guard::InjectionGuard;
pub use lexical::lexical_fallback;
pub use retrieve::{oversample_count, retrieve};
pub use validate::validate_answer;
