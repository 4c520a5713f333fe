//! Grounded question answering.
//!
//! Sequences the guard, retrieval, anchoring, fallback, generation and
//! validation stages as an explicit state machine. Every logical failure
//! ends in the refusal result; only service and configuration errors are
//! returned as `Err`.

use crate::config::RetrievalConfig;
use crate::embeddings::EmbeddingProvider;
use crate::rag::anchor::AnchorSet;
use crate::rag::classify::{BarrierDetector, ComparisonDetector, TextClassifier};
use crate::rag::expand::QueryExpander;
use crate::rag::guard::InjectionGuard;
use crate::rag::lexical::lexical_fallback;
use crate::rag::retrieve::retrieve;
use crate::rag::validate::{restrict_to_presented, validate_answer};
use crate::store::KnowledgeStore;
use crate::types::{AnswerResult, AskOptions, Context, SourceRef};
use docqa_core::AppResult;
use docqa_llm::{LlmClient, LlmRequest};
use docqa_prompt::{build_answer_prompt, default_answer_prompt, PromptContext, PromptDefinition};
use std::collections::HashSet;
use std::sync::Arc;

const COMPARISON_DIRECTIVE: &str = "Answer format: write two labeled sections, one for each subject \
being compared, then a section labeled \"Overlap\" that describes common points cautiously and \
only where the context supports them.";

/// How a question will be retrieved for.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalPlan {
    /// Text handed to the embedding step
    pub query: String,
    pub effective_top_k: usize,
    pub barrier: bool,
    pub comparison: bool,

    /// Prior questions carried into the query and the prompt
    pub history: Vec<String>,
}

enum Stage {
    InjectionCheck,
    Retrieve,
    Anchor(Vec<Context>),
    Fallback,
    Generate(Vec<Context>),
    RetryWithFallback,
    Done(AnswerResult),
}

/// Answers questions against a loaded knowledge store.
///
/// Holds only read-only state, so one pipeline can serve concurrent
/// questions.
pub struct AnswerPipeline {
    store: Arc<KnowledgeStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    llm: Arc<dyn LlmClient>,
    model: String,
    prompt: PromptDefinition,
    config: RetrievalConfig,
    guard: InjectionGuard,
    expander: QueryExpander,
    anchors: AnchorSet,
}

impl AnswerPipeline {
    pub fn new(
        store: Arc<KnowledgeStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmClient>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            store,
            embedder,
            llm,
            model: model.into(),
            prompt: default_answer_prompt(),
            config: RetrievalConfig::default(),
            guard: InjectionGuard::default(),
            expander: QueryExpander::default(),
            anchors: AnchorSet::default(),
        }
    }

    pub fn with_prompt(mut self, prompt: PromptDefinition) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn with_retrieval_config(mut self, config: RetrievalConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_anchors(mut self, anchors: AnchorSet) -> Self {
        self.anchors = anchors;
        self
    }

    pub fn store(&self) -> &KnowledgeStore {
        &self.store
    }

    /// Classify the question and build the retrieval query.
    pub fn plan(&self, options: &AskOptions) -> RetrievalPlan {
        let question = options.question.trim();
        let barrier = BarrierDetector.classify(question);
        let comparison = ComparisonDetector.classify(question);

        let mut effective_top_k = options.top_k.unwrap_or(self.config.default_top_k);
        if barrier {
            effective_top_k = effective_top_k.max(self.config.barrier_top_k_floor);
        }
        if comparison {
            effective_top_k = effective_top_k.max(self.config.comparison_top_k_floor);
        }

        let skip = options.history.len().saturating_sub(self.config.history_window);
        let history: Vec<String> = options.history[skip..].to_vec();

        let mut query = question.to_string();
        if !history.is_empty() {
            query.push_str("\n\nPrevious questions:\n");
            query.push_str(&history.join("\n"));
        }

        RetrievalPlan {
            query: self.expander.expand(&query),
            effective_top_k,
            barrier,
            comparison,
            history,
        }
    }

    /// Answer a question.
    ///
    /// Returns the refusal result for injected questions, exhausted
    /// retrieval, malformed generator output and ungrounded answers.
    pub async fn answer(&self, options: AskOptions) -> AppResult<AnswerResult> {
        let question = options.question.trim();
        let plan = self.plan(&options);
        let mut retried = false;

        tracing::info!(
            barrier = plan.barrier,
            comparison = plan.comparison,
            top_k = plan.effective_top_k,
            filtered = options.filters.has_filters(),
            "Answering question"
        );

        let mut stage = Stage::InjectionCheck;
        loop {
            stage = match stage {
                Stage::InjectionCheck => {
                    if self.guard.looks_malicious(question) {
                        tracing::warn!("Question rejected by injection guard");
                        Stage::Done(AnswerResult::refusal())
                    } else {
                        Stage::Retrieve
                    }
                }

                Stage::Retrieve => {
                    let contexts = retrieve(
                        &plan.query,
                        self.embedder.as_ref(),
                        &self.store,
                        plan.effective_top_k,
                        &options.filters,
                        &self.config,
                    )
                    .await?;
                    Stage::Anchor(self.drop_injections(contexts))
                }

                Stage::Anchor(contexts) => {
                    let contexts = self.anchors.apply(question, plan.comparison, contexts);
                    if contexts.is_empty() {
                        Stage::Fallback
                    } else {
                        Stage::Generate(contexts)
                    }
                }

                Stage::Fallback => {
                    tracing::info!("Vector retrieval left no usable contexts, trying keyword fallback");
                    let contexts = self.fallback_contexts(question, &plan, &options);
                    if contexts.is_empty() {
                        tracing::info!("Keyword fallback found nothing");
                        Stage::Done(AnswerResult::refusal())
                    } else {
                        Stage::Generate(contexts)
                    }
                }

                Stage::Generate(contexts) => {
                    let result = self.generate(question, &plan, &contexts).await?;
                    if result.is_refusal() && plan.barrier && !retried {
                        Stage::RetryWithFallback
                    } else {
                        Stage::Done(result)
                    }
                }

                Stage::RetryWithFallback => {
                    retried = true;
                    tracing::info!("Refused a barrier question, retrying once with keyword fallback");
                    let contexts = self.fallback_contexts(question, &plan, &options);
                    if contexts.is_empty() {
                        Stage::Done(AnswerResult::refusal())
                    } else {
                        Stage::Generate(contexts)
                    }
                }

                Stage::Done(result) => {
                    tracing::info!(
                        sources = result.sources.len(),
                        confidence = result.confidence.as_str(),
                        refused = result.is_refusal(),
                        "Answer ready"
                    );
                    return Ok(result);
                }
            };
        }
    }

    fn drop_injections(&self, contexts: Vec<Context>) -> Vec<Context> {
        let before = contexts.len();
        let kept: Vec<Context> = contexts
            .into_iter()
            .filter(|c| !self.guard.looks_malicious(c.text()))
            .collect();

        if kept.len() < before {
            tracing::warn!("Dropped {} contexts flagged by injection guard", before - kept.len());
        }
        kept
    }

    fn fallback_contexts(&self, question: &str, plan: &RetrievalPlan, options: &AskOptions) -> Vec<Context> {
        let contexts = lexical_fallback(
            self.store.records(),
            plan.effective_top_k,
            &options.filters,
            &self.config,
        );
        let contexts = self.drop_injections(contexts);
        self.anchors.apply(question, plan.comparison, contexts)
    }

    /// One prompt, one completion, one validation.
    async fn generate(
        &self,
        question: &str,
        plan: &RetrievalPlan,
        contexts: &[Context],
    ) -> AppResult<AnswerResult> {
        let mut prompt_question = memory_block(&plan.history);
        prompt_question.push_str(question);
        if plan.comparison {
            prompt_question.push_str("\n\n");
            prompt_question.push_str(COMPARISON_DIRECTIVE);
        }

        let prompt_contexts: Vec<PromptContext> = contexts
            .iter()
            .enumerate()
            .map(|(i, c)| PromptContext {
                index: i + 1,
                doc: c.record.doc.clone(),
                page: c.record.page,
                text: c.record.text.clone(),
            })
            .collect();

        let built = build_answer_prompt(&self.prompt, &prompt_question, &prompt_contexts)?;

        let mut request = LlmRequest::new(built.user, &self.model).with_temperature(0.0);
        if built.json_output {
            request = request.with_json_mode();
        }

        tracing::debug!(
            provider = self.llm.provider_name(),
            contexts = contexts.len(),
            "Requesting generation"
        );
        let response = self.llm.complete(&request).await?;

        let result = validate_answer(&response.content, self.config.max_quote_words);
        if !self.config.require_presented_sources {
            return Ok(result);
        }

        let presented: HashSet<SourceRef> = contexts.iter().map(|c| c.record.source_ref()).collect();
        Ok(restrict_to_presented(result, &presented))
    }
}

/// Prior questions rendered ahead of the current one.
fn memory_block(history: &[String]) -> String {
    if history.is_empty() {
        return String::new();
    }

    let lines: Vec<String> = history.iter().map(|q| format!("- {}", q)).collect();
    format!(
        "Conversation memory (previous user questions):\n{}\n\n",
        lines.join("\n")
    )
}
