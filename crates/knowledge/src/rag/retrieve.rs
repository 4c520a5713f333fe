//! Oversampled, metadata-filtered vector retrieval.

use crate::config::RetrievalConfig;
use crate::embeddings::EmbeddingProvider;
use crate::rag::filter::FilterSpec;
use crate::store::KnowledgeStore;
use crate::types::{Context, Score};
use crate::vector_index::normalize_l2;
use docqa_core::AppResult;

/// Number of raw candidates to request from the index.
///
/// `min(total, max(top_k * factor, floor))`: filtering may discard most raw
/// hits, so far more are fetched than are kept.
pub fn oversample_count(total: usize, top_k: usize, config: &RetrievalConfig) -> usize {
    total.min(
        top_k
            .saturating_mul(config.oversample_factor)
            .max(config.oversample_floor),
    )
}

/// Retrieve up to `top_k` contexts for a query, best first.
///
/// Candidates are walked in descending similarity. Positions with no
/// matching record are skipped, as are records rejected by `filters`.
/// Injection screening is left to the caller.
pub async fn retrieve(
    query: &str,
    embedder: &dyn EmbeddingProvider,
    store: &KnowledgeStore,
    top_k: usize,
    filters: &FilterSpec,
    config: &RetrievalConfig,
) -> AppResult<Vec<Context>> {
    let records = store.records();
    if records.is_empty() || top_k == 0 {
        tracing::debug!("Nothing to retrieve from (records: {}, top_k: {})", records.len(), top_k);
        return Ok(Vec::new());
    }

    let mut query_vector = embedder.embed(query).await?;
    normalize_l2(&mut query_vector);

    let k = oversample_count(records.len(), top_k, config);
    let candidates = store.index().search(&query_vector, k).await?;

    tracing::debug!(
        "Vector search returned {} of {} requested candidates",
        candidates.len(),
        k
    );

    let mut contexts = Vec::with_capacity(top_k);
    for (similarity, position) in candidates {
        let Some(record) = records.get(position) else {
            tracing::warn!("Index position {} has no metadata record, skipping", position);
            continue;
        };

        if !filters.matches(record, config.legacy_year_inference) {
            continue;
        }

        contexts.push(Context::new(record.clone(), Score::Similarity(similarity)));
        if contexts.len() >= top_k {
            break;
        }
    }

    if let (Some(first), Some(last)) = (contexts.first(), contexts.last()) {
        tracing::debug!(
            "Retrieved {} contexts (top: {:.3}, lowest: {:.3})",
            contexts.len(),
            first.score.similarity().unwrap_or_default(),
            last.score.similarity().unwrap_or_default()
        );
    }

    Ok(contexts)
}
