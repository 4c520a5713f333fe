//! LanceDB-backed similarity index.
//!
//! One table of `(position, vector)` rows. `position` is the row's index in
//! the metadata store; search runs an exhaustive cosine scan in LanceDB.

use crate::store::{replace_dir, staging_path};
use crate::vector_index::{normalize_l2, SimilarityIndex};
use arrow_array::types::Float32Type;
use arrow_array::{Array, FixedSizeListArray, Float32Array, RecordBatch, RecordBatchIterator, UInt64Array};
use arrow_schema::{ArrowError, DataType, Field, Schema, SchemaRef};
use async_trait::async_trait;
use docqa_core::{AppError, AppResult};
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{DistanceType, Table};
use std::cmp::Ordering;
use std::fs;
use std::path::Path;
use std::sync::Arc;

const TABLE_NAME: &str = "chunks";

/// Rows per record batch when writing.
const WRITE_BATCH_ROWS: usize = 1024;

/// Read-only handle on a persisted vector table.
pub struct LanceDbIndex {
    table: Table,
    dimensions: usize,
    rows: usize,
}

impl std::fmt::Debug for LanceDbIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LanceDbIndex")
            .field("dimensions", &self.dimensions)
            .field("rows", &self.rows)
            .finish()
    }
}

impl LanceDbIndex {
    fn schema(dimensions: usize) -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("position", DataType::UInt64, false),
            Field::new(
                "vector",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, true)),
                    dimensions as i32,
                ),
                false,
            ),
        ]))
    }

    /// Write `vectors` as a new index at `path`, replacing any previous one.
    ///
    /// The table is built in a staging directory and moved into place once
    /// complete. Vectors are normalized on the way in.
    pub async fn create(path: &Path, dimensions: usize, vectors: &[Vec<f32>]) -> AppResult<Self> {
        if dimensions == 0 {
            return Err(AppError::Knowledge("Index dimensions must be greater than zero".to_string()));
        }
        if let Some((position, v)) = vectors.iter().enumerate().find(|(_, v)| v.len() != dimensions) {
            return Err(AppError::Knowledge(format!(
                "Vector {} has {} dims, index expects {}",
                position,
                v.len(),
                dimensions
            )));
        }

        let staging = staging_path(path);
        if staging.exists() {
            fs::remove_dir_all(&staging)?;
        }
        fs::create_dir_all(&staging)?;

        let schema = Self::schema(dimensions);
        let mut batches = Vec::new();
        for (n, chunk) in vectors.chunks(WRITE_BATCH_ROWS).enumerate() {
            batches.push(Self::to_batch(&schema, n * WRITE_BATCH_ROWS, chunk, dimensions));
        }
        if batches.is_empty() {
            batches.push(Ok(RecordBatch::new_empty(schema.clone())));
        }

        let uri = staging.to_string_lossy().to_string();
        let conn = lancedb::connect(&uri)
            .execute()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to open LanceDB at {:?}: {}", staging, e)))?;

        conn.create_table(TABLE_NAME, RecordBatchIterator::new(batches, schema))
            .execute()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to write vector table: {}", e)))?;
        drop(conn);

        replace_dir(&staging, path)?;
        tracing::debug!("Wrote {} vectors to {:?}", vectors.len(), path);

        Self::open(path).await
    }

    fn to_batch(
        schema: &SchemaRef,
        first_position: usize,
        vectors: &[Vec<f32>],
        dimensions: usize,
    ) -> Result<RecordBatch, ArrowError> {
        let positions = UInt64Array::from_iter_values(
            (first_position..first_position + vectors.len()).map(|p| p as u64),
        );

        let values = vectors.iter().map(|v| {
            let mut v = v.clone();
            normalize_l2(&mut v);
            Some(v.into_iter().map(Some).collect::<Vec<_>>())
        });
        let vectors = FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(values, dimensions as i32);

        RecordBatch::try_new(schema.clone(), vec![Arc::new(positions), Arc::new(vectors)])
    }

    /// Open an existing index. A missing or unreadable table is a
    /// `Storage` error.
    pub async fn open(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            return Err(AppError::Storage(format!(
                "Missing similarity index: {:?}. Run 'docqa index build' first.",
                path
            )));
        }

        let uri = path.to_string_lossy().to_string();
        let conn = lancedb::connect(&uri)
            .execute()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to open LanceDB at {:?}: {}", path, e)))?;

        let table = conn
            .open_table(TABLE_NAME)
            .execute()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to open vector table in {:?}: {}", path, e)))?;

        let schema = table
            .schema()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to read vector table schema: {}", e)))?;

        let dimensions = match schema.field_with_name("vector").map(|f| f.data_type()) {
            Ok(DataType::FixedSizeList(_, size)) if *size > 0 => *size as usize,
            _ => {
                return Err(AppError::Storage(format!(
                    "Vector table in {:?} has no fixed-size vector column",
                    path
                )))
            }
        };

        let rows = table
            .count_rows(None)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to count vectors: {}", e)))?;

        tracing::debug!("Opened LanceDB index {:?}: {} vectors, {} dims", path, rows, dimensions);

        Ok(Self {
            table,
            dimensions,
            rows,
        })
    }
}

#[async_trait]
impl SimilarityIndex for LanceDbIndex {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn len(&self) -> usize {
        self.rows
    }

    async fn search(&self, query: &[f32], k: usize) -> AppResult<Vec<(f32, usize)>> {
        if query.len() != self.dimensions {
            return Err(AppError::Knowledge(format!(
                "Query has {} dims, index expects {}",
                query.len(),
                self.dimensions
            )));
        }
        if k == 0 || self.rows == 0 {
            return Ok(Vec::new());
        }

        let batches: Vec<RecordBatch> = self
            .table
            .vector_search(query.to_vec())
            .map_err(|e| AppError::Knowledge(format!("Failed to create query: {}", e)))?
            .distance_type(DistanceType::Cosine)
            .limit(k)
            .execute()
            .await
            .map_err(|e| AppError::Knowledge(format!("Failed to execute search: {}", e)))?
            .try_collect()
            .await
            .map_err(|e| AppError::Knowledge(format!("Failed to collect results: {}", e)))?;

        let mut hits = Vec::with_capacity(k);
        for batch in &batches {
            let positions = batch
                .column_by_name("position")
                .and_then(|c| c.as_any().downcast_ref::<UInt64Array>())
                .ok_or_else(|| AppError::Knowledge("Invalid position column".to_string()))?;
            let distances = batch
                .column_by_name("_distance")
                .and_then(|c| c.as_any().downcast_ref::<Float32Array>())
                .ok_or_else(|| AppError::Knowledge("Search results carry no distances".to_string()))?;

            for row in 0..batch.num_rows() {
                hits.push((similarity(distances.value(row)), positions.value(row) as usize));
            }
        }

        hits.sort_by(|a, b| match b.0.total_cmp(&a.0) {
            Ordering::Equal => a.1.cmp(&b.1),
            other => other,
        });
        hits.truncate(k);

        Ok(hits)
    }
}

/// Cosine distance back to similarity, clamped to [-1, 1].
fn similarity(distance: f32) -> f32 {
    let similarity = 1.0 - distance;
    if similarity.is_finite() {
        similarity.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_create_then_open() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("storage/index.lance");

        let created = LanceDbIndex::create(&path, 3, &[vec![1.0, 0.0, 0.0], vec![0.0, 2.0, 0.0]])
            .await
            .unwrap();
        assert_eq!(created.len(), 2);

        let opened = LanceDbIndex::open(&path).await.unwrap();
        assert_eq!(opened.len(), 2);
        assert_eq!(opened.dimensions(), 3);
        assert!(!temp.path().join("storage/index.lance.tmp").exists());
    }

    #[tokio::test]
    async fn test_search_best_first_within_unit_range() {
        let temp = TempDir::new().unwrap();
        let index = LanceDbIndex::create(
            &temp.path().join("index.lance"),
            2,
            &[vec![-5.0, 0.0], vec![10.0, 0.0], vec![1.0, 1.0]],
        )
        .await
        .unwrap();

        let hits = index.search(&[1.0, 0.0], 5).await.unwrap();

        let positions: Vec<usize> = hits.iter().map(|(_, p)| *p).collect();
        assert_eq!(positions, vec![1, 2, 0]);
        assert!((hits[0].0 - 1.0).abs() < 1e-4);
        assert!((hits[1].0 - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-4);
        assert!((hits[2].0 + 1.0).abs() < 1e-4);
    }

    #[tokio::test]
    async fn test_search_respects_k() {
        let temp = TempDir::new().unwrap();
        let index = LanceDbIndex::create(
            &temp.path().join("index.lance"),
            2,
            &[vec![1.0, 0.0], vec![0.9, 0.1], vec![0.0, 1.0]],
        )
        .await
        .unwrap();

        let hits = index.search(&[1.0, 0.0], 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].1, 0);
        assert!(index.search(&[1.0, 0.0], 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ties_keep_insertion_order() {
        let temp = TempDir::new().unwrap();
        let index = LanceDbIndex::create(
            &temp.path().join("index.lance"),
            2,
            &[vec![1.0, 0.0], vec![2.0, 0.0], vec![3.0, 0.0]],
        )
        .await
        .unwrap();

        let positions: Vec<usize> = index
            .search(&[1.0, 0.0], 3)
            .await
            .unwrap()
            .into_iter()
            .map(|(_, p)| p)
            .collect();
        assert_eq!(positions, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_rebuild_replaces_previous_table() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("index.lance");

        LanceDbIndex::create(&path, 2, &[vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 1.0]])
            .await
            .unwrap();
        LanceDbIndex::create(&path, 2, &[vec![0.0, 1.0]]).await.unwrap();

        let index = LanceDbIndex::open(&path).await.unwrap();
        assert_eq!(index.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_index() {
        let temp = TempDir::new().unwrap();
        let index = LanceDbIndex::create(&temp.path().join("index.lance"), 4, &[])
            .await
            .unwrap();

        assert!(index.is_empty());
        assert_eq!(index.dimensions(), 4);
        assert!(index.search(&[1.0, 0.0, 0.0, 0.0], 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dimension_mismatches_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("index.lance");

        assert!(LanceDbIndex::create(&path, 3, &[vec![1.0, 0.0]]).await.is_err());

        let index = LanceDbIndex::create(&path, 2, &[vec![1.0, 0.0]]).await.unwrap();
        assert!(matches!(
            index.search(&[1.0, 0.0, 0.0], 1).await,
            Err(AppError::Knowledge(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_index_is_storage_error() {
        let temp = TempDir::new().unwrap();
        let result = LanceDbIndex::open(&temp.path().join("index.lance")).await;
        assert!(matches!(result, Err(AppError::Storage(_))));
    }

    #[test]
    fn test_similarity_from_distance() {
        assert_eq!(similarity(0.0), 1.0);
        assert_eq!(similarity(2.0), -1.0);
        assert_eq!(similarity(2.5), -1.0);
        assert_eq!(similarity(f32::NAN), 0.0);
    }
}
