//! Service wiring shared by the answering commands.

use docqa_core::{config::AppConfig, AppResult};
use docqa_knowledge::config::load_config;
use docqa_knowledge::{create_provider, AnswerPipeline, EmbeddingProvider, KnowledgeConfig, KnowledgeStore};
use docqa_llm::create_client;
use docqa_prompt::{load_prompt_or_default, ANSWER_PROMPT_ID};
use std::sync::Arc;

/// Build the embedding provider described by the knowledge config.
pub fn embedder(config: &AppConfig, knowledge: &KnowledgeConfig) -> AppResult<Arc<dyn EmbeddingProvider>> {
    let api_key = match knowledge.embedding.provider.as_str() {
        "openai" => config.resolve_api_key("openai"),
        _ => None,
    };
    create_provider(&knowledge.embedding, api_key.as_deref())
}

/// Load the store and connect the services, once per process.
pub async fn open_pipeline(config: &AppConfig) -> AppResult<AnswerPipeline> {
    config.validate()?;

    let knowledge = load_config(&config.workspace)?;
    let embedder = embedder(config, &knowledge)?;
    let store = KnowledgeStore::open(&config.workspace, &knowledge).await?;
    tracing::info!("Loaded {} chunks", store.records().len());

    let endpoint = config.resolve_endpoint(&config.provider);
    let api_key = config.resolve_api_key(&config.provider);
    let llm = create_client(&config.provider, Some(&endpoint), api_key.as_deref())?;

    let prompt = load_prompt_or_default(&config.workspace, ANSWER_PROMPT_ID)?;

    Ok(AnswerPipeline::new(Arc::new(store), embedder, llm, config.model.clone())
        .with_retrieval_config(knowledge.retrieval)
        .with_prompt(prompt))
}
