//! Cross-module tests and their test doubles.

mod rag_ranking;

use crate::embeddings::providers::TrigramProvider;
use crate::embeddings::EmbeddingProvider;
use crate::store::KnowledgeStore;
use crate::types::ChunkRecord;
use crate::lancedb_index::LanceDbIndex;
use crate::vector_index::{normalize_l2, SimilarityIndex};
use docqa_core::{AppError, AppResult};
use docqa_llm::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use docqa_prompt::REFUSAL_SENTENCE;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub(crate) const DIMS: usize = 128;

pub(crate) fn record(doc: &str, page: u32, text: &str, topics: &[&str]) -> ChunkRecord {
    ChunkRecord {
        doc: doc.to_string(),
        page,
        chunk_id: 0,
        text: text.to_string(),
        year: None,
        category: "general".to_string(),
        topics: topics.iter().map(|t| t.to_string()).collect(),
    }
}

/// Generator double that replays canned outputs and records every request.
///
/// Once the script runs out it answers with a refusal.
#[derive(Default)]
pub(crate) struct ScriptedLlm {
    outputs: Mutex<VecDeque<String>>,
    requests: Mutex<Vec<LlmRequest>>,
}

impl ScriptedLlm {
    pub fn new<I, S>(outputs: I) -> Arc<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Arc::new(Self {
            outputs: Mutex::new(outputs.into_iter().map(Into::into).collect()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.prompt.clone())
            .collect()
    }

    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl LlmClient for ScriptedLlm {
    fn provider_name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        self.requests.lock().unwrap().push(request.clone());
        let content = self
            .outputs
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(refusal_json);

        Ok(LlmResponse {
            content,
            model: request.model.clone(),
            usage: LlmUsage::new(0, 0),
        })
    }
}

pub(crate) fn refusal_json() -> String {
    serde_json::json!({
        "answer": REFUSAL_SENTENCE,
        "sources": [],
        "quotes": [],
        "confidence": "low"
    })
    .to_string()
}

pub(crate) fn answer_json(answer: &str, sources: &[(&str, u32)]) -> String {
    let sources: Vec<_> = sources
        .iter()
        .map(|(doc, page)| serde_json::json!({"doc": doc, "page": page}))
        .collect();
    serde_json::json!({
        "answer": answer,
        "sources": sources,
        "quotes": [{"quote": "supporting words", "source_index": 1}],
        "confidence": "high"
    })
    .to_string()
}

/// Trigram embedder that counts how often it is called.
#[derive(Debug)]
pub(crate) struct CountingEmbedder {
    inner: TrigramProvider,
    calls: AtomicUsize,
}

impl CountingEmbedder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: TrigramProvider::new(DIMS),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for CountingEmbedder {
    fn provider_name(&self) -> &str {
        self.inner.provider_name()
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.embed_batch(texts).await
    }
}

/// Embeds every text to the same vector, so tests control similarity
/// through the stored vectors alone.
#[derive(Debug)]
pub(crate) struct StaticEmbedder {
    vector: Vec<f32>,
}

impl StaticEmbedder {
    pub fn new(vector: Vec<f32>) -> Arc<Self> {
        Arc::new(Self { vector })
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for StaticEmbedder {
    fn provider_name(&self) -> &str {
        "static"
    }

    fn model_name(&self) -> &str {
        "static"
    }

    fn dimensions(&self) -> usize {
        self.vector.len()
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|_| self.vector.clone()).collect())
    }
}

/// Store whose vectors come from the trigram embedder.
pub(crate) async fn trigram_store(records: Vec<ChunkRecord>) -> Arc<KnowledgeStore> {
    let embedder = TrigramProvider::new(DIMS);
    let texts: Vec<String> = records.iter().map(|r| r.text.clone()).collect();
    let vectors = embedder.embed_batch(&texts).await.unwrap();
    vector_store(records, vectors)
}

/// In-memory exact-scan index for tests that do not need LanceDB.
pub(crate) struct MemoryIndex {
    dimensions: usize,
    vectors: Vec<Vec<f32>>,
}

impl MemoryIndex {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            vectors: Vec::new(),
        }
    }

    pub fn add(&mut self, mut vector: Vec<f32>) {
        assert_eq!(vector.len(), self.dimensions);
        normalize_l2(&mut vector);
        self.vectors.push(vector);
    }
}

#[async_trait::async_trait]
impl SimilarityIndex for MemoryIndex {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn len(&self) -> usize {
        self.vectors.len()
    }

    async fn search(&self, query: &[f32], k: usize) -> AppResult<Vec<(f32, usize)>> {
        if query.len() != self.dimensions {
            return Err(AppError::Knowledge("query dimension mismatch".to_string()));
        }
        let mut hits: Vec<(f32, usize)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(position, v)| (v.iter().zip(query).map(|(a, b)| a * b).sum(), position))
            .collect();
        // Stable sort keeps insertion order for ties
        hits.sort_by(|a, b| b.0.total_cmp(&a.0));
        hits.truncate(k);
        Ok(hits)
    }
}

/// Store with explicit vectors, one per record, held in memory.
pub(crate) fn vector_store(records: Vec<ChunkRecord>, vectors: Vec<Vec<f32>>) -> Arc<KnowledgeStore> {
    let dims = vectors.first().map(Vec::len).unwrap_or(DIMS);
    let mut index = MemoryIndex::new(dims);
    for vector in vectors {
        index.add(vector);
    }
    Arc::new(KnowledgeStore::from_parts(Box::new(index), records).unwrap())
}

/// Store with explicit vectors written to a LanceDB table on disk.
///
/// The returned directory must outlive the store.
pub(crate) async fn lance_store(
    records: Vec<ChunkRecord>,
    vectors: Vec<Vec<f32>>,
) -> (tempfile::TempDir, Arc<KnowledgeStore>) {
    let temp = tempfile::TempDir::new().unwrap();
    let dims = vectors.first().map(Vec::len).unwrap_or(DIMS);
    let index = LanceDbIndex::create(&temp.path().join("index.lance"), dims, &vectors)
        .await
        .unwrap();
    let store = KnowledgeStore::from_parts(Box::new(index), records).unwrap();
    (temp, Arc::new(store))
}
