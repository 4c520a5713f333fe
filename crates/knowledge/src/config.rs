//! Knowledge store configuration and storage paths.
//!
//! Everything lives under `.docqa/`: `knowledge.yaml` for settings,
//! `storage/` for the similarity index and the metadata store.

use crate::embeddings::EmbeddingConfig;
use docqa_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Complete knowledge configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeConfig {
    pub embedding: EmbeddingConfig,
    pub retrieval: RetrievalConfig,
    pub chunking: ChunkingConfig,
}

/// Retrieval and answering tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Contexts requested when the caller gives no top_k
    pub default_top_k: usize,

    /// Candidates fetched per requested context before filtering
    pub oversample_factor: usize,

    /// Minimum candidate count fetched before filtering
    pub oversample_floor: usize,

    /// Minimum top_k for barrier-type questions
    pub barrier_top_k_floor: usize,

    /// Minimum top_k for comparison questions
    pub comparison_top_k_floor: usize,

    /// Minimum number of lexical fallback contexts
    pub lexical_min_results: usize,

    /// Prior questions carried into retrieval and the prompt
    pub history_window: usize,

    /// Quotes longer than this are cut to this many words
    pub max_quote_words: usize,

    /// Let records without a year match a year filter by filename prefix
    pub legacy_year_inference: bool,

    /// Drop cited sources that were not shown to the generator
    pub require_presented_sources: bool,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_top_k: 5,
            oversample_factor: 30,
            oversample_floor: 200,
            barrier_top_k_floor: 10,
            comparison_top_k_floor: 12,
            lexical_min_results: 8,
            history_window: 2,
            max_quote_words: 20,
            legacy_year_inference: false,
            require_presented_sources: true,
        }
    }
}

impl RetrievalConfig {
    pub fn validate(&self) -> AppResult<()> {
        if self.default_top_k == 0 {
            return Err(AppError::Config(
                "retrieval.default_top_k must be at least 1".to_string(),
            ));
        }
        if self.oversample_factor == 0 {
            return Err(AppError::Config(
                "retrieval.oversample_factor must be at least 1".to_string(),
            ));
        }
        if self.max_quote_words == 0 {
            return Err(AppError::Config(
                "retrieval.max_quote_words must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Chunking settings for the offline index builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum characters per chunk
    pub chunk_size: usize,

    /// Characters shared between neighbouring chunks
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 150,
        }
    }
}

/// Load the knowledge configuration.
///
/// Reads `.docqa/knowledge.yaml` if it exists, otherwise returns defaults.
pub fn load_config(workspace: &Path) -> AppResult<KnowledgeConfig> {
    let config_path = get_config_path(workspace);

    if !config_path.exists() {
        tracing::debug!("No knowledge config at {:?}, using defaults", config_path);
        return Ok(KnowledgeConfig::default());
    }

    let content = fs::read_to_string(&config_path).map_err(|e| {
        AppError::Config(format!("Failed to read config at {:?}: {}", config_path, e))
    })?;

    let config: KnowledgeConfig = serde_yaml::from_str(&content).map_err(|e| {
        AppError::Config(format!("Failed to parse config at {:?}: {}", config_path, e))
    })?;

    config.retrieval.validate()?;

    tracing::debug!("Loaded knowledge config from {:?}", config_path);
    Ok(config)
}

/// Save the knowledge configuration.
pub fn save_config(workspace: &Path, config: &KnowledgeConfig) -> AppResult<()> {
    let config_path = get_config_path(workspace);

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            AppError::Config(format!("Failed to create config directory: {}", e))
        })?;
    }

    let yaml = serde_yaml::to_string(config)?;

    fs::write(&config_path, yaml).map_err(|e| {
        AppError::Config(format!("Failed to write config to {:?}: {}", config_path, e))
    })?;

    tracing::debug!("Saved knowledge config to {:?}", config_path);
    Ok(())
}

/// Path to `.docqa/knowledge.yaml`.
pub fn get_config_path(workspace: &Path) -> PathBuf {
    workspace.join(".docqa").join("knowledge.yaml")
}

/// Directory holding the index and metadata files.
pub fn get_storage_dir(workspace: &Path) -> PathBuf {
    workspace.join(".docqa").join("storage")
}

/// Path to the LanceDB similarity index directory.
pub fn get_index_path(workspace: &Path) -> PathBuf {
    get_storage_dir(workspace).join("index.lance")
}

/// Path to the header describing how the index was built.
pub fn get_index_header_path(workspace: &Path) -> PathBuf {
    get_storage_dir(workspace).join("index_header.json")
}

/// Path to the line-delimited metadata store.
pub fn get_metadata_path(workspace: &Path) -> PathBuf {
    get_storage_dir(workspace).join("index_meta.jsonl")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_default_config() {
        let temp = TempDir::new().unwrap();
        let config = load_config(temp.path()).unwrap();

        assert_eq!(config.embedding.provider, "openai");
        assert_eq!(config.retrieval.default_top_k, 5);
        assert_eq!(config.retrieval.oversample_factor, 30);
        assert_eq!(config.retrieval.oversample_floor, 200);
        assert_eq!(config.chunking.chunk_size, 1000);
        assert_eq!(config.chunking.chunk_overlap, 150);
    }

    #[test]
    fn test_save_and_load_config() {
        let temp = TempDir::new().unwrap();
        let mut config = KnowledgeConfig::default();
        config.embedding = EmbeddingConfig::trigram(256);
        config.retrieval.barrier_top_k_floor = 14;

        save_config(temp.path(), &config).unwrap();

        let loaded = load_config(temp.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let temp = TempDir::new().unwrap();
        let path = get_config_path(temp.path());
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "retrieval:\n  legacy_year_inference: true\n").unwrap();

        let loaded = load_config(temp.path()).unwrap();
        assert!(loaded.retrieval.legacy_year_inference);
        assert_eq!(loaded.retrieval.history_window, 2);
        assert_eq!(loaded.embedding, EmbeddingConfig::default());
    }

    #[test]
    fn test_zero_top_k_rejected() {
        let temp = TempDir::new().unwrap();
        let path = get_config_path(temp.path());
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "retrieval:\n  default_top_k: 0\n").unwrap();

        assert!(matches!(load_config(temp.path()), Err(AppError::Config(_))));
    }

    #[test]
    fn test_storage_paths() {
        let ws = Path::new("/ws");
        assert_eq!(get_index_path(ws), PathBuf::from("/ws/.docqa/storage/index.lance"));
        assert_eq!(
            get_index_header_path(ws),
            PathBuf::from("/ws/.docqa/storage/index_header.json")
        );
        assert_eq!(
            get_metadata_path(ws),
            PathBuf::from("/ws/.docqa/storage/index_meta.jsonl")
        );
    }
}
