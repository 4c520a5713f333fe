//! Document knowledge store and grounded question answering.
//!
//! The offline builder turns extracted page text into a metadata store and a
//! LanceDB similarity index. At query time both are loaded once, read-only, and
//! [`AnswerPipeline`] answers questions from them with cited sources.

pub mod chunker;
pub mod config;
pub mod embeddings;
pub mod index;
pub mod lancedb_index;
pub mod metadata;
pub mod rag;
pub mod store;
pub mod types;
pub mod vector_index;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use config::{KnowledgeConfig, RetrievalConfig};
pub use embeddings::{create_provider, EmbeddingConfig, EmbeddingProvider};
pub use index::build_index;
pub use rag::{AnswerPipeline, FilterSpec};
pub use store::{KnowledgeStore, MetadataCatalog};
pub use types::{
    AnswerResult, AskOptions, ChunkRecord, Confidence, Context, IndexBuildStats, PageRecord, Quote,
    Score, SourceRef,
};
