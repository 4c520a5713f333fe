//! Offline index builder.
//!
//! Turns extracted page text (JSON lines of `{doc, page, text}`) into the
//! metadata store and the similarity index under `.docqa/storage/`.

use crate::chunker::{clean_text, Chunker};
use crate::config::{get_index_header_path, get_index_path, get_metadata_path, KnowledgeConfig};
use crate::embeddings::EmbeddingProvider;
use crate::metadata::infer_metadata;
use crate::store::{encode_metadata, metadata_digest, write_replace};
use crate::types::{ChunkRecord, IndexBuildStats, PageRecord};
use crate::lancedb_index::LanceDbIndex;
use crate::vector_index::IndexHeader;
use chrono::Utc;
use docqa_core::{AppError, AppResult};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use walkdir::WalkDir;

/// Expand inputs into page files. Directories are walked for `*.jsonl`.
pub fn collect_input_files(inputs: &[PathBuf]) -> AppResult<Vec<PathBuf>> {
    let mut files = Vec::new();

    for input in inputs {
        if input.is_file() {
            files.push(input.clone());
        } else if input.is_dir() {
            for entry in WalkDir::new(input)
                .follow_links(false)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let path = entry.path();
                if path.is_file() && path.extension().is_some_and(|ext| ext == "jsonl") {
                    files.push(path.to_path_buf());
                }
            }
        } else {
            return Err(AppError::Knowledge(format!("Input not found: {:?}", input)));
        }
    }

    Ok(files)
}

/// Read one page file. Malformed lines are logged and skipped.
pub fn read_page_file(path: &Path) -> AppResult<Vec<PageRecord>> {
    let content = fs::read_to_string(path)
        .map_err(|e| AppError::Knowledge(format!("Failed to read {:?}: {}", path, e)))?;

    let mut pages = Vec::new();
    for (line_num, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<PageRecord>(line) {
            Ok(page) if page.doc.trim().is_empty() || page.page == 0 => {
                tracing::warn!("{:?}:{}: page record needs a doc and a 1-based page", path, line_num + 1);
            }
            Ok(page) => pages.push(page),
            Err(e) => {
                tracing::warn!("{:?}:{}: skipping malformed page record: {}", path, line_num + 1, e);
            }
        }
    }

    Ok(pages)
}

/// Build and persist the metadata store and similarity index.
///
/// A document name seen in an earlier input file wins over later
/// duplicates. Chunk ids are numbered per document across its pages.
pub async fn build_index(
    workspace: &Path,
    inputs: &[PathBuf],
    config: &KnowledgeConfig,
    embedder: &dyn EmbeddingProvider,
) -> AppResult<IndexBuildStats> {
    let start = Instant::now();

    if embedder.dimensions() != config.embedding.dimensions {
        return Err(AppError::Config(format!(
            "Embedding provider yields {} dims but {} are configured",
            embedder.dimensions(),
            config.embedding.dimensions
        )));
    }

    let chunker = Chunker::new(&config.chunking)?;
    let files = collect_input_files(inputs)?;
    tracing::info!("Building index from {} page files", files.len());

    let mut doc_owner: HashMap<String, usize> = HashMap::new();
    let mut duplicates: HashSet<String> = HashSet::new();
    let mut next_chunk_id: HashMap<String, u32> = HashMap::new();
    let mut records = Vec::new();
    let mut pages_count = 0;

    for (file_idx, file) in files.iter().enumerate() {
        for page in read_page_file(file)? {
            let owner = *doc_owner.entry(page.doc.clone()).or_insert(file_idx);
            if owner != file_idx {
                if duplicates.insert(page.doc.clone()) {
                    tracing::warn!("Skipping duplicate document {} in {:?}", page.doc, file);
                }
                continue;
            }

            let text = clean_text(&page.text);
            if text.is_empty() {
                continue;
            }
            pages_count += 1;

            let inferred = infer_metadata(&page.doc);
            for chunk in chunker.split(&text) {
                let chunk_id = next_chunk_id.entry(page.doc.clone()).or_insert(0);
                records.push(ChunkRecord {
                    doc: page.doc.clone(),
                    page: page.page,
                    chunk_id: *chunk_id,
                    text: chunk,
                    year: inferred.year,
                    category: inferred.category.clone(),
                    topics: inferred.topics.clone(),
                });
                *chunk_id += 1;
            }
        }
    }

    tracing::info!("Embedding {} chunks from {} pages", records.len(), pages_count);

    let dimensions = config.embedding.dimensions;
    let mut vectors = Vec::with_capacity(records.len());
    let batch_size = config.embedding.batch_size.max(1);
    for (batch_num, batch) in records.chunks(batch_size).enumerate() {
        let texts: Vec<String> = batch.iter().map(|r| r.text.clone()).collect();
        let embedded = embedder.embed_batch(&texts).await?;
        if embedded.len() != texts.len() {
            return Err(AppError::Embedding(format!(
                "Requested {} embeddings, received {}",
                texts.len(),
                embedded.len()
            )));
        }
        for vector in embedded {
            if vector.len() != dimensions {
                return Err(AppError::Embedding(format!(
                    "Embedding has {} dims, config expects {}",
                    vector.len(),
                    dimensions
                )));
            }
            vectors.push(vector);
        }
        tracing::debug!(
            "Embedded batch {} ({}/{} chunks)",
            batch_num + 1,
            vectors.len(),
            records.len()
        );
    }

    // Metadata first; the index header pins its digest
    let metadata = encode_metadata(&records)?;
    write_replace(&get_metadata_path(workspace), &metadata)?;

    LanceDbIndex::create(&get_index_path(workspace), dimensions, &vectors).await?;

    let header = IndexHeader {
        provider: config.embedding.provider.clone(),
        model: config.embedding.model.clone(),
        dimensions,
        built_at: Utc::now(),
        metadata_digest: metadata_digest(&metadata),
    };
    header.save(&get_index_header_path(workspace))?;

    let stats = IndexBuildStats {
        documents: doc_owner.len(),
        duplicate_documents: duplicates.len(),
        pages: pages_count,
        chunks: records.len(),
        dimensions: config.embedding.dimensions,
        duration_secs: start.elapsed().as_secs_f64(),
    };

    tracing::info!(
        "Index built: {} documents, {} chunks in {:.2}s",
        stats.documents,
        stats.chunks,
        stats.duration_secs
    );

    Ok(stats)
}
