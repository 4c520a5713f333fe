//! Embedding service boundary.
//!
//! One provider instance is built at startup from [`EmbeddingConfig`] and
//! handed to both the index builder and the answering pipeline.

pub mod config;
pub mod provider;
pub mod providers;

pub use config::EmbeddingConfig;
pub use provider::{create_provider, EmbeddingProvider};
