//! Similarity index abstraction and the persisted index header.
//!
//! Vectors are L2-normalized before they are stored, so cosine similarity
//! equals inner product and scores stay in [-1, 1].

use crate::embeddings::EmbeddingConfig;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use docqa_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Trait for similarity index backends.
///
/// Positions returned by `search` are insertion order, which is also the
/// position of the owning record in the metadata store.
#[async_trait]
pub trait SimilarityIndex: Send + Sync {
    /// Vector dimensions.
    fn dimensions(&self) -> usize;

    /// Number of stored vectors.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The `k` nearest vectors as `(similarity, position)`, best first.
    ///
    /// Returns fewer than `k` hits when the index is smaller. Ties keep
    /// insertion order.
    async fn search(&self, query: &[f32], k: usize) -> AppResult<Vec<(f32, usize)>>;
}

/// Scale a vector to unit length in place. Zero vectors are left as is.
pub fn normalize_l2(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in vector.iter_mut() {
            *v /= norm;
        }
    }
}

/// Describes how a persisted index was built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexHeader {
    pub provider: String,
    pub model: String,
    pub dimensions: usize,
    pub built_at: DateTime<Utc>,

    /// SHA-256 of the metadata file written alongside this index
    pub metadata_digest: String,
}

impl IndexHeader {
    /// Read a header file. A missing or malformed file is a `Storage` error.
    pub fn load(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            return Err(AppError::Storage(format!(
                "Missing index header: {:?}. Run 'docqa index build' first.",
                path
            )));
        }

        let content = fs::read_to_string(path)
            .map_err(|e| AppError::Storage(format!("Failed to read {:?}: {}", path, e)))?;

        serde_json::from_str(&content)
            .map_err(|e| AppError::Storage(format!("Corrupt index header {:?}: {}", path, e)))
    }

    /// Write the header with write-then-replace.
    pub fn save(&self, path: &Path) -> AppResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        crate::store::write_replace(path, json.as_bytes())
    }

    /// Check the index was built with the configured embedding model.
    pub fn check_embedding(&self, config: &EmbeddingConfig) -> AppResult<()> {
        let built_with = EmbeddingConfig {
            provider: self.provider.clone(),
            model: self.model.clone(),
            dimensions: self.dimensions,
            ..config.clone()
        };
        config.validate_consistency(&built_with).map_err(|e| {
            AppError::Storage(format!(
                "Index was built with {}/{} ({} dims); rebuild it for the configured embedding. {}",
                self.provider, self.model, self.dimensions, e
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn header(dimensions: usize) -> IndexHeader {
        IndexHeader {
            provider: "trigram".to_string(),
            model: "trigram-v1".to_string(),
            dimensions,
            built_at: Utc::now(),
            metadata_digest: "abc".to_string(),
        }
    }

    #[test]
    fn test_normalize_l2() {
        let mut v = vec![3.0, 4.0];
        normalize_l2(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);

        let mut zero = vec![0.0, 0.0];
        normalize_l2(&mut zero);
        assert_eq!(zero, vec![0.0, 0.0]);
    }

    #[test]
    fn test_header_save_and_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("storage/index_header.json");

        let header = header(2);
        header.save(&path).unwrap();

        assert_eq!(IndexHeader::load(&path).unwrap(), header);
        assert!(!temp.path().join("storage/index_header.json.tmp").exists());
    }

    #[test]
    fn test_missing_header_is_storage_error() {
        let temp = TempDir::new().unwrap();
        let result = IndexHeader::load(&temp.path().join("index_header.json"));
        assert!(matches!(result, Err(AppError::Storage(_))));
    }

    #[test]
    fn test_corrupt_header_is_storage_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("index_header.json");
        fs::write(&path, "{\"provider\":").unwrap();
        assert!(matches!(IndexHeader::load(&path), Err(AppError::Storage(_))));
    }

    #[test]
    fn test_header_embedding_check() {
        let header = header(64);
        assert!(header.check_embedding(&EmbeddingConfig::trigram(64)).is_ok());
        assert!(matches!(
            header.check_embedding(&EmbeddingConfig::trigram(128)),
            Err(AppError::Storage(_))
        ));
    }
}
