//! Persisted metadata store and the loaded knowledge store.
//!
//! Metadata is one JSON `ChunkRecord` per line, in the same order as the
//! vectors of the similarity index. Both files are read once at startup
//! and never written on the query path.

use crate::config::{get_index_header_path, get_index_path, get_metadata_path, KnowledgeConfig};
use crate::lancedb_index::LanceDbIndex;
use crate::types::ChunkRecord;
use crate::vector_index::{IndexHeader, SimilarityIndex};
use docqa_core::{AppError, AppResult};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Write a file by writing a sibling temp file and renaming it over the target.
pub fn write_replace(path: &Path, contents: &[u8]) -> AppResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = staging_path(path);
    {
        let mut file = File::create(&tmp_path).map_err(|e| {
            AppError::Storage(format!("Failed to create {:?}: {}", tmp_path, e))
        })?;
        file.write_all(contents)
            .map_err(|e| AppError::Storage(format!("Failed to write {:?}: {}", tmp_path, e)))?;
        file.sync_all()
            .map_err(|e| AppError::Storage(format!("Failed to sync {:?}: {}", tmp_path, e)))?;
    }

    fs::rename(&tmp_path, path).map_err(|e| {
        AppError::Storage(format!("Failed to replace {:?}: {}", path, e))
    })?;

    Ok(())
}

/// Sibling path used while a file or directory is being written.
pub fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Move a fully written directory over `target`, removing the old one.
pub fn replace_dir(staging: &Path, target: &Path) -> AppResult<()> {
    if target.exists() {
        fs::remove_dir_all(target).map_err(|e| {
            AppError::Storage(format!("Failed to remove {:?}: {}", target, e))
        })?;
    }
    fs::rename(staging, target).map_err(|e| {
        AppError::Storage(format!("Failed to replace {:?}: {}", target, e))
    })
}

/// Serialize records as JSON lines.
pub fn encode_metadata(records: &[ChunkRecord]) -> AppResult<Vec<u8>> {
    let mut out = Vec::new();
    for record in records {
        serde_json::to_writer(&mut out, record)?;
        out.push(b'\n');
    }
    Ok(out)
}

/// Hex SHA-256 of metadata file contents.
pub fn metadata_digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Load every record from a metadata file.
///
/// A missing file, an unparseable line or an invalid record is a
/// `Storage` error. Blank lines are skipped.
pub fn load_metadata(path: &Path) -> AppResult<Vec<ChunkRecord>> {
    if !path.exists() {
        return Err(AppError::Storage(format!(
            "Missing metadata file: {:?}. Run 'docqa index build' first.",
            path
        )));
    }

    let file = File::open(path)
        .map_err(|e| AppError::Storage(format!("Failed to open {:?}: {}", path, e)))?;

    let mut records = Vec::new();
    for (line_num, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| {
            AppError::Storage(format!("Failed to read line {}: {}", line_num + 1, e))
        })?;

        if line.trim().is_empty() {
            continue;
        }

        let record: ChunkRecord = serde_json::from_str(&line).map_err(|e| {
            AppError::Storage(format!(
                "Failed to parse line {} in {:?}: {}",
                line_num + 1,
                path,
                e
            ))
        })?;
        record.validate()?;
        records.push(record);
    }

    tracing::debug!("Loaded {} records from {:?}", records.len(), path);
    Ok(records)
}

/// Read-only index plus metadata, shared by every query.
pub struct KnowledgeStore {
    index: Box<dyn SimilarityIndex>,
    records: Vec<ChunkRecord>,
}

impl std::fmt::Debug for KnowledgeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnowledgeStore")
            .field("records", &self.records.len())
            .field("dimensions", &self.index.dimensions())
            .finish()
    }
}

impl KnowledgeStore {
    /// Pair an index with its records, checking they line up.
    pub fn from_parts(index: Box<dyn SimilarityIndex>, records: Vec<ChunkRecord>) -> AppResult<Self> {
        if index.len() != records.len() {
            return Err(AppError::Storage(format!(
                "Index holds {} vectors but metadata holds {} records",
                index.len(),
                records.len()
            )));
        }
        Ok(Self { index, records })
    }

    /// Open the workspace store.
    ///
    /// Fails with `Storage` if either file is missing, the files were not
    /// written together, or the index was built with a different embedding
    /// provider, model or dimension than configured.
    pub async fn open(workspace: &Path, config: &KnowledgeConfig) -> AppResult<Self> {
        let metadata_path = get_metadata_path(workspace);
        let records = load_metadata(&metadata_path)?;
        let header = IndexHeader::load(&get_index_header_path(workspace))?;

        header.check_embedding(&config.embedding)?;

        let bytes = fs::read(&metadata_path)?;
        if metadata_digest(&bytes) != header.metadata_digest {
            return Err(AppError::Storage(format!(
                "{:?} does not match the index it was built with; rebuild the index",
                metadata_path
            )));
        }

        let index = LanceDbIndex::open(&get_index_path(workspace)).await?;
        if index.dimensions() != header.dimensions {
            return Err(AppError::Storage(format!(
                "Index holds {}-dim vectors but its header records {}",
                index.dimensions(),
                header.dimensions
            )));
        }

        let store = Self::from_parts(Box::new(index), records)?;
        tracing::info!(
            records = store.records.len(),
            dimensions = store.index.dimensions(),
            "Opened knowledge store"
        );
        Ok(store)
    }

    pub fn index(&self) -> &dyn SimilarityIndex {
        self.index.as_ref()
    }

    pub fn records(&self) -> &[ChunkRecord] {
        &self.records
    }

    pub fn catalog(&self) -> MetadataCatalog {
        MetadataCatalog::from_records(&self.records)
    }
}

/// Distinct facet values present in the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetadataCatalog {
    pub record_count: usize,
    pub docs: Vec<String>,
    pub years: Vec<i32>,
    pub categories: Vec<String>,
    pub topics: Vec<String>,
}

impl MetadataCatalog {
    pub fn from_records(records: &[ChunkRecord]) -> Self {
        let mut docs = BTreeSet::new();
        let mut years = BTreeSet::new();
        let mut categories = BTreeSet::new();
        let mut topics = BTreeSet::new();

        for record in records {
            docs.insert(record.doc.clone());
            if let Some(year) = record.year {
                years.insert(year);
            }
            categories.insert(record.category.clone());
            topics.extend(record.topics.iter().cloned());
        }

        Self {
            record_count: records.len(),
            docs: docs.into_iter().collect(),
            years: years.into_iter().collect(),
            categories: categories.into_iter().collect(),
            topics: topics.into_iter().collect(),
        }
    }
}
